use serde::Deserialize;
use serde::Serialize;

use super::TargetRef;

/// What kind of content a module contributes to its chunk
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
  #[default]
  Script,
  /// Extracted stylesheet content, identical for every target
  Stylesheet,
  Asset,
}

/// How a context module resolves the requests it matches
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
  Sync,
  Lazy,
  Eager,
  Weak,
}

/// Options of a context module or import-context dependency
///
/// Context modules are created for dynamically constructed requests, e.g.
/// `import(\`./routes/${name}\`)`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextOptions {
  pub mode: ContextMode,
  pub request: String,
  #[serde(default)]
  pub chunk_name: Option<String>,
}

impl ContextOptions {
  pub fn is_lazy(&self) -> bool {
    self.mode == ContextMode::Lazy
  }
}

/// A node of the module graph
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
  /// Stable identity of the module, used to deduplicate graph nodes
  pub identifier: String,

  /// The request that created the module. May be rewritten when the module is tagged.
  pub request: String,

  /// The resolved resource path, if any
  pub resource: Option<String>,

  pub content_kind: ContentKind,

  /// Present for context modules
  pub context: Option<ContextOptions>,

  /// The target that owns this module. Written once, never overwritten.
  target: Option<TargetRef>,
}

impl Module {
  pub fn new(identifier: impl Into<String>, request: impl Into<String>) -> Self {
    Module {
      identifier: identifier.into(),
      request: request.into(),
      ..Module::default()
    }
  }

  pub fn target(&self) -> Option<&TargetRef> {
    self.target.as_ref()
  }

  /// Associates the module with a target unless it already has one
  ///
  /// Returns whether the association was made.
  pub fn associate_target(&mut self, target: TargetRef) -> bool {
    if self.target.is_some() {
      return false;
    }

    self.target = Some(target);
    true
  }

  pub fn is_lazy_context(&self) -> bool {
    self.context.as_ref().is_some_and(ContextOptions::is_lazy)
  }

  pub fn is_stylesheet(&self) -> bool {
    self.content_kind == ContentKind::Stylesheet
  }
}
