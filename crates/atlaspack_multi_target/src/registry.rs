use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::LazyLock;

use atlaspack_multi_target_core::error::MultiTargetError;
use atlaspack_multi_target_core::types::TargetProfile;
use atlaspack_multi_target_core::types::TargetRef;
use atlaspack_multi_target_core::types::TransformOptions;
use regex::Regex;
use serde_json::json;
use serde_json::Value;

use crate::options::BabelOptions;
use crate::options::CacheDirectoryOption;
use crate::options::MultiTargetOptions;
use crate::options::TargetOptions;

/// Profiles used when no targets are configured
pub const DEFAULT_PROFILES: [&str; 2] = ["modern", "legacy"];

pub const DEFAULT_MODERN_BROWSERS: &[&str] = &[
  // The last two versions of each browser, excluding versions
  // that don't support <script type="module">.
  "browserslist config and supports es6-module",
];

pub const DEFAULT_LEGACY_BROWSERS: &[&str] = &["browserslist config and not supports es6-module"];

pub const DEFAULT_BABEL_PLUGINS: &[&str] = &[
  "@babel/plugin-syntax-dynamic-import",
  "@babel/plugin-transform-runtime",
];

static TARGET_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+$").unwrap());

/// Default settings of the standard profiles
///
/// This is the only place that decides what a profile looks like when the user does not say.
pub fn standard_target_options(profile_name: &str) -> Option<TargetOptions> {
  let to_strings = |browsers: &[&str]| browsers.iter().map(|b| b.to_string()).collect();

  match profile_name {
    "modern" => Some(TargetOptions {
      key: None,
      browsers: Some(to_strings(DEFAULT_MODERN_BROWSERS)),
      tag_assets_with_key: Some(true),
      es_module: Some(true),
      no_module: Some(false),
      additional_modules: None,
    }),
    "legacy" => Some(TargetOptions {
      key: None,
      browsers: Some(to_strings(DEFAULT_LEGACY_BROWSERS)),
      tag_assets_with_key: Some(false),
      es_module: Some(false),
      no_module: Some(true),
      additional_modules: None,
    }),
    _ => None,
  }
}

/// Creates target profiles and their transform options
struct TargetFactory<'a> {
  babel: &'a BabelOptions,
  cache_directory: &'a CacheDirectoryOption,
}

impl TargetFactory<'_> {
  fn create_target(
    &self,
    profile_name: &str,
    options: &TargetOptions,
  ) -> Result<TargetProfile, MultiTargetError> {
    let standard = standard_target_options(profile_name).unwrap_or_default();

    let key = options
      .key
      .clone()
      .unwrap_or_else(|| profile_name.to_string());

    if !TARGET_KEY.is_match(&key) {
      return Err(MultiTargetError::InvalidConfiguration(format!(
        "Target key \"{key}\" may only contain word characters"
      )));
    }

    let browsers = options
      .browsers
      .clone()
      .or(standard.browsers)
      .ok_or_else(|| {
        MultiTargetError::InvalidConfiguration(format!(
          "Target profile \"{profile_name}\" is not a standard profile and has no browsers configured"
        ))
      })?;

    let transform_options = self.create_transform_options(&key, &browsers);

    Ok(TargetProfile {
      profile_name: profile_name.to_string(),
      tag_assets_with_key: options
        .tag_assets_with_key
        .or(standard.tag_assets_with_key)
        .unwrap_or(false),
      es_module: options.es_module.or(standard.es_module).unwrap_or(false),
      no_module: options.no_module.or(standard.no_module).unwrap_or(false),
      additional_modules: options
        .additional_modules
        .clone()
        .or(standard.additional_modules)
        .unwrap_or_default(),
      key,
      browsers,
      transform_options,
    })
  }

  fn create_transform_options(&self, key: &str, browsers: &[String]) -> TransformOptions {
    let mut preset_options = serde_json::Map::new();
    preset_options.insert(String::from("modules"), Value::Bool(false));
    preset_options.insert(String::from("useBuiltIns"), json!("usage"));
    // Recommended to specify the minor core-js version
    preset_options.insert(String::from("corejs"), json!(3.6));
    preset_options.extend(self.babel.preset_options.clone());
    preset_options.insert(String::from("targets"), json!({ "browsers": browsers }));
    preset_options.insert(String::from("modules"), Value::Bool(false));

    let mut presets = vec![json!(["@babel/preset-env", preset_options])];
    presets.extend(self.babel.presets.iter().cloned());

    let plugins = match &self.babel.plugins {
      Some(plugins) => plugins.clone(),
      None => DEFAULT_BABEL_PLUGINS.iter().map(|p| json!(p)).collect(),
    };

    TransformOptions {
      presets,
      plugins,
      cache_directory: self.cache_directory(key),
    }
  }

  fn cache_directory(&self, key: &str) -> Option<PathBuf> {
    match self.cache_directory {
      CacheDirectoryOption::Enabled(false) => None,
      CacheDirectoryOption::Enabled(true) => Some(
        PathBuf::from("node_modules")
          .join(".cache")
          .join("babel-loader")
          .join(key),
      ),
      CacheDirectoryOption::Path(path) => Some(path.clone()),
    }
  }
}

/// Immutable set of target profiles for a build, in declaration order
#[derive(Clone, Debug)]
pub struct TargetRegistry {
  targets: Vec<TargetRef>,
}

impl TargetRegistry {
  pub fn new(targets: Vec<TargetRef>) -> Result<Self, MultiTargetError> {
    if targets.is_empty() {
      return Err(MultiTargetError::InvalidConfiguration(String::from(
        "At least one target must be configured",
      )));
    }

    let mut keys = HashSet::new();
    for target in &targets {
      if !keys.insert(target.key.as_str()) {
        return Err(MultiTargetError::InvalidConfiguration(format!(
          "Target key \"{}\" is used by more than one target",
          target.key
        )));
      }
    }

    Ok(TargetRegistry { targets })
  }

  pub fn from_options(options: &MultiTargetOptions) -> Result<Self, MultiTargetError> {
    let factory = TargetFactory {
      babel: &options.babel,
      cache_directory: &options.cache_directory,
    };

    let targets = if options.targets.is_empty() {
      DEFAULT_PROFILES
        .iter()
        .map(|profile| factory.create_target(profile, &TargetOptions::default()))
        .collect::<Result<Vec<_>, _>>()?
    } else {
      options
        .targets
        .iter()
        .map(|(profile, target_options)| factory.create_target(profile, target_options))
        .collect::<Result<Vec<_>, _>>()?
    };

    Self::new(targets.into_iter().map(Arc::new).collect())
  }

  pub fn targets(&self) -> &[TargetRef] {
    &self.targets
  }

  pub fn get(&self, key: &str) -> Option<&TargetRef> {
    self.targets.iter().find(|target| target.is_key(key))
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }

  /// Whether every target suffixes its output names with its key
  pub fn all_tag_assets_with_key(&self) -> bool {
    self.targets.iter().all(|target| target.tag_assets_with_key)
  }
}

#[cfg(test)]
mod tests {
  use indexmap::IndexMap;
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn uses_standard_profiles_by_default() {
    let registry = TargetRegistry::from_options(&MultiTargetOptions::default()).unwrap();

    let modern = &registry.targets()[0];
    let legacy = &registry.targets()[1];

    assert_eq!(modern.key, "modern");
    assert!(modern.tag_assets_with_key);
    assert!(modern.es_module);
    assert!(!modern.no_module);
    assert_eq!(legacy.key, "legacy");
    assert!(!legacy.tag_assets_with_key);
    assert!(legacy.no_module);
    assert!(!registry.all_tag_assets_with_key());
  }

  #[test]
  fn merges_preset_options_into_transform_options() {
    let mut preset_options = serde_json::Map::new();
    preset_options.insert(String::from("debug"), json!(true));
    preset_options.insert(String::from("modules"), json!("commonjs"));

    let registry = TargetRegistry::from_options(&MultiTargetOptions {
      babel: BabelOptions {
        preset_options,
        plugins: None,
        presets: vec![json!("@babel/preset-typescript")],
      },
      ..MultiTargetOptions::default()
    })
    .unwrap();

    let options = &registry.get("modern").unwrap().transform_options;

    assert_eq!(
      options.presets,
      vec![
        json!(["@babel/preset-env", {
          "modules": false,
          "useBuiltIns": "usage",
          "corejs": 3.6,
          "debug": true,
          "targets": { "browsers": ["browserslist config and supports es6-module"] }
        }]),
        json!("@babel/preset-typescript"),
      ]
    );
    assert_eq!(
      options.plugins,
      vec![
        json!("@babel/plugin-syntax-dynamic-import"),
        json!("@babel/plugin-transform-runtime")
      ]
    );
    assert_eq!(
      options.cache_directory,
      Some(PathBuf::from("node_modules/.cache/babel-loader/modern"))
    );
  }

  #[test]
  fn disables_the_cache_directory() {
    let registry = TargetRegistry::from_options(&MultiTargetOptions {
      cache_directory: CacheDirectoryOption::Enabled(false),
      ..MultiTargetOptions::default()
    })
    .unwrap();

    assert_eq!(registry.targets()[0].transform_options.cache_directory, None);
  }

  #[test]
  fn rejects_duplicate_keys() {
    let mut targets = IndexMap::new();
    targets.insert(
      String::from("modern"),
      TargetOptions {
        key: Some(String::from("es")),
        ..TargetOptions::default()
      },
    );
    targets.insert(
      String::from("legacy"),
      TargetOptions {
        key: Some(String::from("es")),
        ..TargetOptions::default()
      },
    );

    let result = TargetRegistry::from_options(&MultiTargetOptions {
      targets,
      ..MultiTargetOptions::default()
    });

    assert!(matches!(
      result,
      Err(MultiTargetError::InvalidConfiguration(message)) if message.contains("\"es\"")
    ));
  }

  #[test]
  fn requires_browsers_for_custom_profiles() {
    let mut targets = IndexMap::new();
    targets.insert(String::from("ie11"), TargetOptions::default());

    let result = TargetRegistry::from_options(&MultiTargetOptions {
      targets,
      ..MultiTargetOptions::default()
    });

    assert!(matches!(
      result,
      Err(MultiTargetError::InvalidConfiguration(_))
    ));
  }

  #[test]
  fn rejects_keys_that_cannot_be_tagged() {
    let mut targets = IndexMap::new();
    targets.insert(
      String::from("modern"),
      TargetOptions {
        key: Some(String::from("es-2017")),
        ..TargetOptions::default()
      },
    );

    let result = TargetRegistry::from_options(&MultiTargetOptions {
      targets,
      ..MultiTargetOptions::default()
    });

    assert!(result.is_err());
  }
}
