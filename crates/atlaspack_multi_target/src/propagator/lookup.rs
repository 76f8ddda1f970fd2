use std::collections::HashSet;

use atlaspack_multi_target_core::chunk_graph::ChunkGraph;
use atlaspack_multi_target_core::module_graph::ModuleGraph;
use atlaspack_multi_target_core::module_graph::ModuleId;
use atlaspack_multi_target_core::types::ChunkGroupId;
use atlaspack_multi_target_core::types::ChunkId;
use atlaspack_multi_target_core::types::TargetEntryDependency;
use atlaspack_multi_target_core::types::TargetRef;

/// Walks from `start` up through the modules that depend on it, depth first
///
/// Visits each module once, so cycles terminate. Returns the first value `visit` produces.
fn walk_up<T>(
  graph: &ModuleGraph,
  start: &ModuleId,
  mut visit: impl FnMut(&ModuleId) -> Option<T>,
) -> Option<T> {
  let mut visited = HashSet::new();
  let mut stack = vec![*start];

  while let Some(module_id) = stack.pop() {
    if !visited.insert(module_id) {
      continue;
    }

    if let Some(found) = visit(&module_id) {
      return Some(found);
    }

    let origins = graph
      .get_incoming_dependencies(&module_id)
      .iter()
      .filter_map(|dependency_id| graph.get_parent_module(dependency_id))
      .filter(|origin| *origin != module_id)
      .collect::<Vec<_>>();

    // Reversed so the first origin is walked first
    stack.extend(origins.into_iter().rev());
  }

  None
}

/// The entry dependency among the module's incoming dependencies
fn incoming_entry<'a>(
  graph: &'a ModuleGraph,
  module_id: &ModuleId,
) -> Option<&'a TargetEntryDependency> {
  graph
    .get_incoming_dependencies(module_id)
    .iter()
    .find_map(|dependency_id| graph.get_dependency(dependency_id)?.as_entry())
}

/// The target that owns a module
///
/// An explicit association wins, then a tagged entry dependency pointing at the module, then the
/// target of the modules that depend on it.
pub fn module_target(graph: &ModuleGraph, module_id: &ModuleId) -> Option<TargetRef> {
  walk_up(graph, module_id, |module_id| {
    if let Some(target) = graph.get_module(module_id).and_then(|m| m.target()) {
      return Some(target.clone());
    }

    incoming_entry(graph, module_id).map(|entry| entry.target.clone())
  })
}

/// The nearest entry dependency above a module
pub fn module_entry<'a>(
  graph: &'a ModuleGraph,
  module_id: &ModuleId,
) -> Option<&'a TargetEntryDependency> {
  walk_up(graph, module_id, |module_id| incoming_entry(graph, module_id))
}

/// The target of a chunk, resolved through its first entry module
pub fn chunk_target(
  graph: &ModuleGraph,
  chunk_graph: &ChunkGraph,
  chunk_id: &ChunkId,
) -> Option<TargetRef> {
  let entry = chunk_graph.get_chunk_entry_modules(chunk_id).first().copied()?;
  module_target(graph, &entry)
}

/// The target of an entrypoint, resolved through its runtime chunk
///
/// Groups that are not entrypoints have no target of their own.
pub fn group_target(
  graph: &ModuleGraph,
  chunk_graph: &ChunkGraph,
  group_id: &ChunkGroupId,
) -> Option<TargetRef> {
  let group = chunk_graph.get_group(group_id)?;
  if !group.is_entrypoint() {
    return None;
  }

  chunk_target(graph, chunk_graph, &group.runtime_chunk?)
}

/// The target of a chunk seen through one of its groups
pub fn targeted_chunk_target(
  graph: &ModuleGraph,
  chunk_graph: &ChunkGraph,
  group_id: &ChunkGroupId,
  chunk_id: &ChunkId,
) -> Option<TargetRef> {
  group_target(graph, chunk_graph, group_id).or_else(|| chunk_target(graph, chunk_graph, chunk_id))
}
