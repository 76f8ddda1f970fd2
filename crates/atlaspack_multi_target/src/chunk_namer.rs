use std::collections::HashMap;
use std::collections::HashSet;

use atlaspack_multi_target_core::chunk_graph::ChunkGraph;
use atlaspack_multi_target_core::module_graph::ModuleGraph;
use atlaspack_multi_target_core::types::ChunkId;
use atlaspack_multi_target_core::types::TargetRef;
use indexmap::IndexSet;

use crate::propagator::chunk_target;
use crate::propagator::module_entry;
use crate::propagator::module_target;
use crate::tagger::request_basename;
use crate::tagger::tagged_asset_name;

/// Names derived from the groups a chunk belongs to
#[derive(Debug, Default)]
struct ChunkOrigins {
  names: IndexSet<String>,
  target: Option<TargetRef>,
}

/// Gives recognizable ids to chunks created by code splitting and lazy routes
#[derive(Debug, Default)]
pub struct ChunkNamer;

impl ChunkNamer {
  pub fn new() -> Self {
    ChunkNamer
  }

  /// Assigns an id to every chunk that has neither an id nor a name
  ///
  /// Chunks are processed in order. A name taken earlier in the same pass gets the first free `.N` suffix.
  #[tracing::instrument(level = "debug", skip_all)]
  pub fn assign_chunk_ids(&self, graph: &ModuleGraph, chunk_graph: &mut ChunkGraph) {
    let mut used_names = HashMap::<String, usize>::new();
    let mut assigned = HashSet::<String>::new();

    for chunk_id in chunk_graph.chunk_ids() {
      let Some(chunk) = chunk_graph.get_chunk(&chunk_id) else {
        continue;
      };
      if chunk.id.is_some() || chunk.name.is_some() {
        continue;
      }

      let origins = self.origins(graph, chunk_graph, &chunk_id);
      let mut name = origins.names.into_iter().collect::<Vec<_>>().join("~");
      if name.is_empty() {
        tracing::debug!(chunk = chunk_id, "No origins to name chunk after");
        continue;
      }

      let target = origins
        .target
        .or_else(|| chunk_target(graph, chunk_graph, &chunk_id));
      if let Some(target) = target {
        name = tagged_asset_name(&name, &target);
      }

      if chunk.is_vendors() {
        name = format!("vendors~{name}");
      }

      let seen = used_names.entry(name.clone()).or_insert(0);
      let mut id = name.clone();
      while assigned.contains(&id) {
        *seen += 1;
        id = format!("{name}.{seen}");
      }
      assigned.insert(id.clone());
      name = id;

      tracing::debug!(chunk = chunk_id, name, "Named chunk");
      if let Some(chunk) = chunk_graph.get_chunk_mut(&chunk_id) {
        chunk.id = Some(name);
      }
    }
  }

  fn origins(&self, graph: &ModuleGraph, chunk_graph: &ChunkGraph, chunk_id: &ChunkId) -> ChunkOrigins {
    let mut origins = ChunkOrigins::default();
    let mut is_entry = false;

    let Some(chunk) = chunk_graph.get_chunk(chunk_id) else {
      return origins;
    };

    for group in chunk.groups.iter().filter_map(|id| chunk_graph.get_group(id)) {
      if group.runtime_chunk.as_ref() == Some(chunk_id) {
        let entry = chunk_graph
          .get_chunk_entry_modules(chunk_id)
          .first()
          .and_then(|module_id| module_entry(graph, module_id));

        if let Some(entry) = entry {
          origins.names = IndexSet::from([entry.original_name.clone()]);
          is_entry = true;
        }
      }

      for origin in &group.origins {
        let Some(request) = &origin.request else {
          continue;
        };

        if origins.target.is_none() {
          origins.target = origin
            .module
            .and_then(|module_id| module_target(graph, &module_id));
        }

        if !is_entry {
          origins.names.insert(request_basename(request));
        }
      }
    }

    origins
  }
}
