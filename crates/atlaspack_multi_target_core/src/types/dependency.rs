use serde::Serialize;

use super::ContextOptions;
use super::TargetRef;

pub type BlockId = usize;

/// Where an entry dependency was declared
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct EntryLoc {
  pub name: String,
  pub index: Option<usize>,
}

/// An entry dependency created for one target variant of a declared entry
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEntryDependency {
  /// The target this entry variant belongs to
  pub target: TargetRef,

  /// The entry name as declared by the user
  pub original_name: String,

  /// The target-suffixed entry name
  pub name: String,

  pub loc: EntryLoc,
}

impl TargetEntryDependency {
  /// Identifier used by the host graph to tell apart the variants of the same request
  pub fn resource_identifier(&self, request: &str) -> String {
    format!("module{}!{}", request, self.target.key)
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DependencyKind {
  /// A target-tagged entry dependency
  Entry(TargetEntryDependency),
  /// A regular static or dynamic import
  Module,
  /// A dependency injected by a shim provider, never tagged
  Provided,
  /// A dependency on a context module; its options carry the request that gets tagged
  ImportContext(ContextOptions),
}

/// A dependency denotes a connection between two modules
///
/// The request may be rewritten while targets are propagated.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
  pub request: Option<String>,
  pub kind: DependencyKind,
  /// The async block this dependency belongs to, if it was created by a dynamic import
  pub block: Option<BlockId>,
}

impl Dependency {
  pub fn new(request: impl Into<String>) -> Self {
    Dependency {
      request: Some(request.into()),
      kind: DependencyKind::Module,
      block: None,
    }
  }

  pub fn entry(request: impl Into<String>, entry: TargetEntryDependency) -> Self {
    Dependency {
      request: Some(request.into()),
      kind: DependencyKind::Entry(entry),
      block: None,
    }
  }

  pub fn provided(request: impl Into<String>) -> Self {
    Dependency {
      request: Some(request.into()),
      kind: DependencyKind::Provided,
      block: None,
    }
  }

  pub fn import_context(options: ContextOptions) -> Self {
    Dependency {
      request: Some(options.request.clone()),
      kind: DependencyKind::ImportContext(options),
      block: None,
    }
  }

  pub fn in_block(mut self, block: BlockId) -> Self {
    self.block = Some(block);
    self
  }

  pub fn as_entry(&self) -> Option<&TargetEntryDependency> {
    match &self.kind {
      DependencyKind::Entry(entry) => Some(entry),
      _ => None,
    }
  }

  /// The target this dependency was tagged with at creation, only set for entry dependencies
  pub fn entry_target(&self) -> Option<&TargetRef> {
    self.as_entry().map(|entry| &entry.target)
  }
}

/// A block of dependencies loaded asynchronously, e.g. the body of a dynamic `import()`
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncBlock {
  pub request: Option<String>,
  pub chunk_name: Option<String>,
}
