use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

pub type TargetRef = Arc<TargetProfile>;

/// A target profile represents one variant of the build output
///
/// For example, a "modern" profile would output code that can run on browsers supporting
/// `<script type="module">` while a "legacy" profile generates code compatible with older browsers.
///
/// Profiles are created once when the build is configured and never change afterwards.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetProfile {
  /// The name of the profile this target was created from (e.g. "modern")
  pub profile_name: String,

  /// Unique key used when tagging requests, modules and assets
  pub key: String,

  /// The browserslist query the transform engine compiles for
  pub browsers: Vec<String>,

  /// Whether output names of this target get a `.<key>` suffix
  pub tag_assets_with_key: bool,

  /// Script references produced by this target are ES modules
  pub es_module: bool,

  /// Script references produced by this target are skipped by ES module capable engines
  pub no_module: bool,

  /// Extra modules added ahead of every entry of this target
  pub additional_modules: Vec<String>,

  /// Options handed to the transform engine for modules owned by this target
  pub transform_options: TransformOptions,
}

impl TargetProfile {
  pub fn is_key(&self, key: &str) -> bool {
    self.key == key
  }
}

/// Fully merged options for the source transformation engine
///
/// These are computed per target and never applied by the multi-target build itself.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
  pub presets: Vec<serde_json::Value>,
  pub plugins: Vec<serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cache_directory: Option<PathBuf>,
}
