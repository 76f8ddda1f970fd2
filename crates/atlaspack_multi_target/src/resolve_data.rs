use std::path::PathBuf;

use atlaspack_multi_target_core::module_graph::DependencyId;
use atlaspack_multi_target_core::types::ContextMode;
use atlaspack_multi_target_core::types::TargetRef;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

/// A loader applied to a module's source
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Loader {
  pub loader: String,
  pub options: Option<serde_json::Value>,
  pub ident: Option<String>,
}

/// An entry of a module's loader chain
///
/// Loaders wrapped by the multi-target build are swapped for their target specific version once
/// the module's target is known.
#[derive(Clone, Debug, PartialEq)]
pub enum LoaderEntry {
  Plain(Loader),
  MultiTarget(Loader),
}

impl LoaderEntry {
  pub fn is_multi_target(&self) -> bool {
    matches!(self, LoaderEntry::MultiTarget(_))
  }
}

/// A value of the package.json `browser` object
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BrowserReplacement {
  Path(String),
  /// `false` asks the bundler to ignore the module
  Ignored(bool),
}

/// The package.json `browser` field in any of its forms
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BrowserField {
  EntryPoint(String),
  List(Vec<String>),
  Replacements(IndexMap<String, BrowserReplacement>),
}

/// The package.json that describes a resolved resource
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescription {
  /// Directory containing the package.json
  pub root: PathBuf,
  pub main: Option<String>,
  pub browser: Option<BrowserField>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceResolveData {
  pub description: Option<PackageDescription>,
  /// Target recorded in the resolver context by an earlier resolution
  pub context_target: Option<TargetRef>,
}

/// The module the host is about to create for a resolution
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateData {
  pub request: String,
  pub raw_request: String,
  pub resource: Option<String>,
  pub resource_resolve_data: Option<ResourceResolveData>,
  pub loaders: Vec<LoaderEntry>,
}

/// A finished module resolution, handed to the propagator before the module is created
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolveData {
  /// Identifier of the module that issued the request
  pub issuer: String,
  /// Target recorded for the issuer by a previous resolution
  pub context_target: Option<TargetRef>,
  /// Set when the resolution belongs to a context module
  pub mode: Option<ContextMode>,
  /// The dependencies this resolution serves
  pub dependencies: Vec<DependencyId>,
  pub create_data: CreateData,
}

/// A context module resolution, e.g. a dynamically constructed `import()`
#[derive(Clone, Debug, PartialEq)]
pub struct ContextResolveData {
  pub request: String,
  /// Only known after resolution
  pub resource: Option<String>,
  pub mode: ContextMode,
  pub chunk_name: Option<String>,
  pub dependencies: Vec<DependencyId>,
}

impl ContextResolveData {
  pub fn is_lazy(&self) -> bool {
    self.mode == ContextMode::Lazy
  }
}
