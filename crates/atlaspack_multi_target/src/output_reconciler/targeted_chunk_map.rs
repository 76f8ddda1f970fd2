use std::collections::HashMap;

use atlaspack_multi_target_core::chunk_graph::ChunkGraph;
use atlaspack_multi_target_core::module_graph::ModuleGraph;
use atlaspack_multi_target_core::types::ChunkGroupId;
use atlaspack_multi_target_core::types::ChunkId;
use atlaspack_multi_target_core::types::TargetRef;

use crate::propagator::targeted_chunk_target;

/// A chunk as seen from one of its groups
#[derive(Clone, Debug, PartialEq)]
pub struct TargetedChunk {
  pub group: ChunkGroupId,
  pub chunk: ChunkId,
  pub target: Option<TargetRef>,
}

/// The chunks that produced each public file reference
#[derive(Debug, Default)]
pub struct TargetedChunkMap {
  public_path: String,
  chunks: HashMap<String, Vec<TargetedChunk>>,
}

impl TargetedChunkMap {
  pub fn new(public_path: &str) -> Self {
    // Resolved by the browser at runtime, so references are plain file names
    let public_path = match public_path {
      "auto" => "",
      public_path => public_path,
    };

    TargetedChunkMap {
      public_path: public_path.to_string(),
      chunks: HashMap::new(),
    }
  }

  /// Maps the files of every chunk in every group
  pub fn from_chunk_graph(public_path: &str, graph: &ModuleGraph, chunk_graph: &ChunkGraph) -> Self {
    let mut map = TargetedChunkMap::new(public_path);

    for (group_id, group) in chunk_graph.groups() {
      for chunk_id in &group.chunks {
        let Some(chunk) = chunk_graph.get_chunk(chunk_id) else {
          continue;
        };

        for file in &chunk.files {
          map.insert(
            file,
            TargetedChunk {
              group: group_id,
              chunk: *chunk_id,
              target: targeted_chunk_target(graph, chunk_graph, &group_id, chunk_id),
            },
          );
        }
      }
    }

    map
  }

  pub fn insert(&mut self, file: &str, targeted_chunk: TargetedChunk) {
    let chunks = self
      .chunks
      .entry(format!("{}{}", self.public_path, file))
      .or_default();

    if !chunks
      .iter()
      .any(|chunk| chunk.group == targeted_chunk.group && chunk.chunk == targeted_chunk.chunk)
    {
      chunks.push(targeted_chunk);
    }
  }

  /// The chunks behind a reference, `None` for files emitted by other tools
  pub fn get(&self, src: &str) -> Option<&[TargetedChunk]> {
    self.chunks.get(src).map(Vec::as_slice)
  }

  /// The single target that produced a reference
  ///
  /// `None` when the reference is unknown, untargeted, or shared by different targets.
  pub fn unique_target(&self, src: &str) -> Option<&TargetRef> {
    let mut targets = self.get(src)?.iter().map(|chunk| chunk.target.as_ref());
    let first = targets.next()??;

    targets
      .all(|target| target.is_some_and(|target| target.key == first.key))
      .then_some(first)
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::test_utils::add_entrypoint;
  use crate::test_utils::target;

  use super::*;

  #[test]
  fn keys_references_by_public_path() {
    let modern = target("modern", true);
    let mut map = TargetedChunkMap::new("/static/");
    map.insert(
      "main.modern.js",
      TargetedChunk {
        group: 0,
        chunk: 0,
        target: Some(modern),
      },
    );

    assert!(map.get("main.modern.js").is_none());
    assert_eq!(map.get("/static/main.modern.js").map(<[_]>::len), Some(1));
  }

  #[test]
  fn treats_an_automatic_public_path_as_empty() {
    let mut map = TargetedChunkMap::new("auto");
    map.insert(
      "main.js",
      TargetedChunk {
        group: 0,
        chunk: 0,
        target: None,
      },
    );

    assert!(map.get("main.js").is_some());
  }

  #[test]
  fn resolves_the_target_shared_by_a_reference() {
    let modern = target("modern", true);
    let legacy = target("legacy", false);
    let mut graph = ModuleGraph::new();
    let mut chunk_graph = ChunkGraph::new();

    let modern_entry = add_entrypoint(&mut graph, &mut chunk_graph, "main", "./main.js", &modern);
    let legacy_entry = add_entrypoint(&mut graph, &mut chunk_graph, "main", "./main.js", &legacy);

    let vendors = chunk_graph.add_chunk(Default::default());
    for (entry, file) in [(&modern_entry, "main.modern.js"), (&legacy_entry, "main.js")] {
      chunk_graph.connect_chunk_and_group(&vendors, &entry.group);
      if let Some(chunk) = chunk_graph.get_chunk_mut(&entry.chunk) {
        chunk.files.insert(file.to_string());
      }
    }
    if let Some(chunk) = chunk_graph.get_chunk_mut(&vendors) {
      chunk.files.insert(String::from("vendors.js"));
    }

    let map = TargetedChunkMap::from_chunk_graph("", &graph, &chunk_graph);

    assert_eq!(
      map.unique_target("main.modern.js").map(|t| t.key.as_str()),
      Some("modern")
    );
    assert_eq!(
      map.unique_target("main.js").map(|t| t.key.as_str()),
      Some("legacy")
    );
    assert_eq!(map.get("vendors.js").map(<[_]>::len), Some(2));
    assert_eq!(map.unique_target("vendors.js"), None);
    assert_eq!(map.unique_target("polyfills.js"), None);
  }
}
