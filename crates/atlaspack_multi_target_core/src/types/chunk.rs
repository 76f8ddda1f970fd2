use indexmap::IndexSet;
use serde::Serialize;

pub type ChunkId = usize;
pub type ChunkGroupId = usize;

/// The reason the host gives vendor chunks created by code splitting
pub const VENDORS_CHUNK_REASON: &str = "split chunk (cache group: vendors)";

/// An output unit of the build
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
  /// Assigned id, if any. Dynamically created chunks start without one.
  pub id: Option<String>,

  pub name: Option<String>,

  /// Why the host created the chunk (e.g. a split-chunks cache group)
  pub reason: Option<String>,

  /// Files emitted for the chunk
  pub files: IndexSet<String>,

  /// Groups this chunk belongs to
  pub groups: Vec<ChunkGroupId>,

  /// Whether the chunk is loaded on initial page load
  pub initial: bool,

  pub has_runtime: bool,

  /// Set on chunks materialized by asset normalization
  pub generated_for_targets: bool,
}

impl Chunk {
  pub fn named(name: impl Into<String>) -> Self {
    Chunk {
      name: Some(name.into()),
      ..Chunk::default()
    }
  }

  pub fn is_vendors(&self) -> bool {
    self.reason.as_deref() == Some(VENDORS_CHUNK_REASON)
  }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum ChunkGroupKind {
  /// Created for a build entry
  Entrypoint,
  #[default]
  Async,
}

/// The request that caused a chunk group to be created
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChunkOrigin {
  pub module: Option<usize>,
  pub request: Option<String>,
}

/// A set of chunks loaded together
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkGroup {
  pub name: Option<String>,
  pub kind: ChunkGroupKind,
  pub chunks: Vec<ChunkId>,
  pub parents: Vec<ChunkGroupId>,
  pub origins: Vec<ChunkOrigin>,
  /// Only entrypoints have a runtime chunk
  pub runtime_chunk: Option<ChunkId>,
  /// Treated like an entrypoint by markup generation
  pub initial: bool,
}

impl ChunkGroup {
  pub fn entrypoint(name: impl Into<String>) -> Self {
    ChunkGroup {
      name: Some(name.into()),
      kind: ChunkGroupKind::Entrypoint,
      initial: true,
      ..ChunkGroup::default()
    }
  }

  pub fn is_entrypoint(&self) -> bool {
    self.kind == ChunkGroupKind::Entrypoint
  }
}
