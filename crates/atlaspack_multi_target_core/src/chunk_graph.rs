use std::collections::HashMap;

use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::module_graph::ModuleId;
use crate::types::Chunk;
use crate::types::ChunkGroup;
use crate::types::ChunkGroupId;
use crate::types::ChunkGroupKind;
use crate::types::ChunkId;

/// An emitted output file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmittedAsset {
  pub contents: String,
}

/// Chunk graph materialized by the host once modules are assigned to chunks
///
/// Owns chunks, chunk groups, chunk membership and the emitted assets of the build.
#[derive(Clone, Debug, Default)]
pub struct ChunkGraph {
  chunks: Vec<Chunk>,
  groups: Vec<ChunkGroup>,
  chunk_modules: HashMap<ChunkId, IndexSet<ModuleId>>,
  chunk_entry_modules: HashMap<ChunkId, Vec<ModuleId>>,
  assets: IndexMap<String, EmittedAsset>,
}

impl ChunkGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_chunk(&mut self, chunk: Chunk) -> ChunkId {
    self.chunks.push(chunk);
    self.chunks.len() - 1
  }

  pub fn add_chunk_group(&mut self, group: ChunkGroup) -> ChunkGroupId {
    self.groups.push(group);
    self.groups.len() - 1
  }

  /// Creates a new group with a single new chunk, both named `name`
  pub fn add_chunk_in_group(&mut self, name: &str) -> (ChunkGroupId, ChunkId) {
    let group_id = self.add_chunk_group(ChunkGroup {
      name: Some(name.to_string()),
      kind: ChunkGroupKind::Async,
      ..ChunkGroup::default()
    });
    let chunk_id = self.add_chunk(Chunk::named(name));
    self.connect_chunk_and_group(&chunk_id, &group_id);
    (group_id, chunk_id)
  }

  pub fn connect_chunk_and_group(&mut self, chunk_id: &ChunkId, group_id: &ChunkGroupId) {
    if let Some(group) = self.groups.get_mut(*group_id) {
      if !group.chunks.contains(chunk_id) {
        group.chunks.push(*chunk_id);
      }
    }
    if let Some(chunk) = self.chunks.get_mut(*chunk_id) {
      if !chunk.groups.contains(group_id) {
        chunk.groups.push(*group_id);
      }
    }
  }

  pub fn connect_group_parent(&mut self, group_id: &ChunkGroupId, parent_id: &ChunkGroupId) {
    if let Some(group) = self.groups.get_mut(*group_id) {
      if !group.parents.contains(parent_id) {
        group.parents.push(*parent_id);
      }
    }
  }

  pub fn connect_chunk_and_module(&mut self, chunk_id: &ChunkId, module_id: &ModuleId) {
    self
      .chunk_modules
      .entry(*chunk_id)
      .or_default()
      .insert(*module_id);
  }

  pub fn disconnect_chunk_and_module(&mut self, chunk_id: &ChunkId, module_id: &ModuleId) {
    if let Some(modules) = self.chunk_modules.get_mut(chunk_id) {
      modules.shift_remove(module_id);
    }
  }

  pub fn connect_chunk_and_entry_module(&mut self, chunk_id: &ChunkId, module_id: &ModuleId) {
    self.connect_chunk_and_module(chunk_id, module_id);
    let entries = self.chunk_entry_modules.entry(*chunk_id).or_default();
    if !entries.contains(module_id) {
      entries.push(*module_id);
    }
  }

  pub fn chunks(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> {
    self.chunks.iter().enumerate()
  }

  pub fn chunk_ids(&self) -> Vec<ChunkId> {
    (0..self.chunks.len()).collect()
  }

  pub fn get_chunk(&self, chunk_id: &ChunkId) -> Option<&Chunk> {
    self.chunks.get(*chunk_id)
  }

  pub fn get_chunk_mut(&mut self, chunk_id: &ChunkId) -> Option<&mut Chunk> {
    self.chunks.get_mut(*chunk_id)
  }

  pub fn groups(&self) -> impl Iterator<Item = (ChunkGroupId, &ChunkGroup)> {
    self.groups.iter().enumerate()
  }

  pub fn get_group(&self, group_id: &ChunkGroupId) -> Option<&ChunkGroup> {
    self.groups.get(*group_id)
  }

  pub fn get_group_mut(&mut self, group_id: &ChunkGroupId) -> Option<&mut ChunkGroup> {
    self.groups.get_mut(*group_id)
  }

  pub fn get_chunk_modules(&self, chunk_id: &ChunkId) -> Vec<ModuleId> {
    self
      .chunk_modules
      .get(chunk_id)
      .map(|modules| modules.iter().copied().collect())
      .unwrap_or_default()
  }

  pub fn get_chunk_entry_modules(&self, chunk_id: &ChunkId) -> Vec<ModuleId> {
    self
      .chunk_entry_modules
      .get(chunk_id)
      .cloned()
      .unwrap_or_default()
  }

  pub fn emit_asset(&mut self, file: impl Into<String>, asset: EmittedAsset) {
    self.assets.insert(file.into(), asset);
  }

  pub fn delete_asset(&mut self, file: &str) -> Option<EmittedAsset> {
    self.assets.shift_remove(file)
  }

  pub fn assets(&self) -> &IndexMap<String, EmittedAsset> {
    &self.assets
  }
}
