use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_DEV_SERVER_CLIENT: &str = "webpack-dev-server/client";
pub const DEFAULT_TRANSFORM_LOADER: &str = "babel-loader";

/// The options passed into the multi-target build
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MultiTargetOptions {
  /// Target profiles by profile name, in declaration order
  ///
  /// When empty, the standard "modern" and "legacy" profiles are used.
  pub targets: IndexMap<String, TargetOptions>,

  /// Options merged into the transform options of every target
  pub babel: BabelOptions,

  pub cache_directory: CacheDirectoryOption,

  /// Patterns of resources that should never be transformed
  pub exclude: Vec<String>,

  /// Patterns of requests that should never be tagged
  pub do_not_target: Vec<String>,

  /// Requests resolved as externals are never tagged
  #[serde(skip_serializing)]
  pub externals: Option<Externals>,

  /// Requests starting with this prefix are tagged with a `#` separator
  pub dev_server_client: String,

  /// Fail the build when a transformable module has no discoverable target
  pub strict_targeting: bool,

  /// The loader that gets replaced with the target specific transform loader
  pub transform_loader: String,
}

impl Default for MultiTargetOptions {
  fn default() -> Self {
    Self {
      targets: IndexMap::new(),
      babel: BabelOptions::default(),
      cache_directory: CacheDirectoryOption::default(),
      exclude: Vec::new(),
      do_not_target: Vec::new(),
      externals: None,
      dev_server_client: String::from(DEFAULT_DEV_SERVER_CLIENT),
      strict_targeting: false,
      transform_loader: String::from(DEFAULT_TRANSFORM_LOADER),
    }
  }
}

impl MultiTargetOptions {
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }
}

/// User supplied overrides for one target profile
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetOptions {
  pub key: Option<String>,
  pub browsers: Option<Vec<String>>,
  pub tag_assets_with_key: Option<bool>,
  pub es_module: Option<bool>,
  pub no_module: Option<bool>,
  pub additional_modules: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BabelOptions {
  pub preset_options: serde_json::Map<String, serde_json::Value>,
  pub plugins: Option<Vec<serde_json::Value>>,
  pub presets: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CacheDirectoryOption {
  Enabled(bool),
  Path(PathBuf),
}

impl Default for CacheDirectoryOption {
  fn default() -> Self {
    CacheDirectoryOption::Enabled(true)
  }
}

/// A regular expression matcher in the externals configuration, written `{ "$regex": "..." }`
///
/// Package names cannot start with `$`, so the key never shadows an object external.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalPattern {
  #[serde(rename = "$regex")]
  pub regex: String,
}

/// Externals as the host bundler accepts them
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Externals {
  /// Matches a request exactly
  Request(String),
  Pattern(ExternalPattern),
  List(Vec<Externals>),
  /// Matches any of the object's keys exactly
  Object(serde_json::Map<String, serde_json::Value>),
  /// Computed externals cannot be evaluated ahead of resolution and are rejected
  #[serde(skip_deserializing)]
  Function(ExternalsFunction),
}

#[derive(Clone)]
pub struct ExternalsFunction(pub Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl Debug for ExternalsFunction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("ExternalsFunction")
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn defaults_when_empty() {
    let options = MultiTargetOptions::from_json("{}").unwrap();

    assert!(options.targets.is_empty());
    assert_eq!(options.cache_directory, CacheDirectoryOption::Enabled(true));
    assert_eq!(options.dev_server_client, DEFAULT_DEV_SERVER_CLIENT);
    assert_eq!(options.transform_loader, DEFAULT_TRANSFORM_LOADER);
    assert!(!options.strict_targeting);
  }

  #[test]
  fn keeps_target_declaration_order() {
    let options = MultiTargetOptions::from_json(
      r#"{
        "targets": {
          "legacy": { "tagAssetsWithKey": true },
          "modern": { "key": "es2017" }
        },
        "cacheDirectory": "/tmp/cache"
      }"#,
    )
    .unwrap();

    assert_eq!(
      options.targets.keys().collect::<Vec<_>>(),
      vec!["legacy", "modern"]
    );
    assert_eq!(
      options.targets["modern"].key.as_deref(),
      Some("es2017")
    );
    assert_eq!(
      options.cache_directory,
      CacheDirectoryOption::Path(PathBuf::from("/tmp/cache"))
    );
  }

  #[test]
  fn parses_each_externals_form() {
    let options = MultiTargetOptions::from_json(
      r#"{
        "externals": [
          "jquery",
          { "$regex": "^@angular/" },
          { "react": "React" },
          { "regex": "Regex" }
        ]
      }"#,
    )
    .unwrap();

    let Some(Externals::List(externals)) = options.externals else {
      panic!("expected a list of externals");
    };

    assert!(matches!(&externals[0], Externals::Request(r) if r == "jquery"));
    assert!(matches!(&externals[1], Externals::Pattern(p) if p.regex == "^@angular/"));
    assert!(matches!(&externals[2], Externals::Object(o) if o.contains_key("react")));
    assert!(matches!(&externals[3], Externals::Object(o) if o.contains_key("regex")));
  }
}
