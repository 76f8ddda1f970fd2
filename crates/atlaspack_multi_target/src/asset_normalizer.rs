use atlaspack_multi_target_core::chunk_graph::ChunkGraph;
use atlaspack_multi_target_core::module_graph::ModuleGraph;
use atlaspack_multi_target_core::module_graph::ModuleId;
use atlaspack_multi_target_core::types::ChunkId;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::propagator::chunk_target;
use crate::propagator::module_entry;

/// A chunk whose shared modules move to the chunk of its logical entry
struct Extraction {
  chunk_id: ChunkId,
  entry_name: String,
  modules: Vec<ModuleId>,
}

/// Moves target independent modules (stylesheets) out of per-target chunks
///
/// Every target produces its own chunks, so a stylesheet imported by an entry would be emitted
/// once per target with identical content. The stylesheets are moved into one chunk per declared
/// entry instead. Untagged targets already share their output names, so nothing is moved when
/// any target does not tag its assets.
#[derive(Debug, Default)]
pub struct AssetNormalizer;

impl AssetNormalizer {
  pub fn new() -> Self {
    AssetNormalizer
  }

  /// Extracts shared modules into new entry chunks, returning the chunks created
  #[tracing::instrument(level = "debug", skip_all)]
  pub fn optimize_chunks(&self, graph: &ModuleGraph, chunk_graph: &mut ChunkGraph) -> Vec<ChunkId> {
    let Some(extractions) = self.plan(graph, chunk_graph) else {
      tracing::debug!("A target does not tag its assets, shared modules stay in place");
      return Vec::new();
    };

    let mut shared: IndexMap<String, IndexSet<ModuleId>> = IndexMap::new();
    for extraction in extractions {
      for module_id in &extraction.modules {
        chunk_graph.disconnect_chunk_and_module(&extraction.chunk_id, module_id);
      }

      shared
        .entry(extraction.entry_name)
        .or_default()
        .extend(extraction.modules);
    }

    let mut created = Vec::new();
    for (entry_name, modules) in shared {
      if modules.is_empty() {
        continue;
      }

      let (group_id, chunk_id) = chunk_graph.add_chunk_in_group(&entry_name);

      // Markup generation includes initial chunks by default
      if let Some(group) = chunk_graph.get_group_mut(&group_id) {
        group.initial = true;
      }
      if let Some(chunk) = chunk_graph.get_chunk_mut(&chunk_id) {
        chunk.initial = true;
        chunk.has_runtime = false;
        chunk.generated_for_targets = true;
      }

      for module_id in &modules {
        chunk_graph.connect_chunk_and_module(&chunk_id, module_id);
      }

      tracing::debug!(
        entry = entry_name,
        modules = modules.len(),
        "Created shared chunk"
      );
      created.push(chunk_id);
    }

    created
  }

  /// Finds the shared modules of every chunk without touching the chunk graph
  ///
  /// Returns `None` when the pass must be skipped.
  fn plan(&self, graph: &ModuleGraph, chunk_graph: &ChunkGraph) -> Option<Vec<Extraction>> {
    let mut extractions = Vec::new();

    for (chunk_id, chunk) in chunk_graph.chunks() {
      // Created by an earlier run of this pass
      if chunk.generated_for_targets {
        continue;
      }

      if chunk_target(graph, chunk_graph, &chunk_id).is_some_and(|target| !target.tag_assets_with_key)
      {
        return None;
      }

      let modules = chunk_graph
        .get_chunk_modules(&chunk_id)
        .into_iter()
        .filter(|module_id| {
          graph
            .get_module(module_id)
            .is_some_and(|module| module.is_stylesheet())
        })
        .collect::<Vec<_>>();

      if modules.is_empty() {
        continue;
      }

      let Some(entry_name) = self.entry_name(graph, chunk_graph, &chunk_id) else {
        tracing::debug!(chunk = chunk_id, "No entry found for chunk, shared modules stay in place");
        continue;
      };

      extractions.push(Extraction {
        chunk_id,
        entry_name,
        modules,
      });
    }

    Some(extractions)
  }

  /// The declared (untagged) name of the entry a chunk belongs to
  fn entry_name(
    &self,
    graph: &ModuleGraph,
    chunk_graph: &ChunkGraph,
    chunk_id: &ChunkId,
  ) -> Option<String> {
    let original_name = |module_id: &ModuleId| {
      module_entry(graph, module_id).map(|entry| entry.original_name.clone())
    };

    if let Some(name) = self
      .entry_module(chunk_graph, chunk_id)
      .and_then(|entry_module| original_name(&entry_module))
    {
      return Some(name);
    }

    chunk_graph
      .get_chunk_modules(chunk_id)
      .iter()
      .find_map(original_name)
  }

  /// The chunk's own entry module, or the entry module of a chunk in a parent group
  fn entry_module(&self, chunk_graph: &ChunkGraph, chunk_id: &ChunkId) -> Option<ModuleId> {
    if let Some(entry) = chunk_graph.get_chunk_entry_modules(chunk_id).first() {
      return Some(*entry);
    }

    let chunk = chunk_graph.get_chunk(chunk_id)?;
    chunk
      .groups
      .iter()
      .filter_map(|group_id| chunk_graph.get_group(group_id))
      .flat_map(|group| group.parents.iter())
      .filter_map(|parent_id| chunk_graph.get_group(parent_id))
      .flat_map(|parent| parent.chunks.iter())
      .find_map(|parent_chunk| chunk_graph.get_chunk_entry_modules(parent_chunk).first().copied())
  }

  /// Deletes the script files the host emits for the chunks created by [`Self::optimize_chunks`]
  #[tracing::instrument(level = "debug", skip_all)]
  pub fn clean_generated_chunks(&self, chunk_graph: &mut ChunkGraph) {
    let generated = chunk_graph
      .chunks()
      .filter(|(_, chunk)| chunk.generated_for_targets)
      .map(|(chunk_id, _)| chunk_id)
      .collect::<Vec<_>>();

    for chunk_id in generated {
      let Some(chunk) = chunk_graph.get_chunk_mut(&chunk_id) else {
        continue;
      };

      let (scripts, files): (IndexSet<String>, IndexSet<String>) = std::mem::take(&mut chunk.files)
        .into_iter()
        .partition(|file| file.ends_with(".js"));
      chunk.files = files;

      for script in scripts {
        chunk_graph.delete_asset(&script);
      }
    }
  }
}
