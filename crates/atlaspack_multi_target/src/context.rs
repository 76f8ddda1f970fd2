use std::sync::Arc;

use atlaspack_multi_target_core::error::MultiTargetError;
use atlaspack_multi_target_core::types::TargetRef;

use crate::exclusion::ExclusionPolicy;
use crate::options::MultiTargetOptions;
use crate::registry::TargetRegistry;
use crate::tagger::key_of;
use crate::tagger::RequestTagger;

pub type MultiTargetContextRef = Arc<MultiTargetContext>;

/// Immutable configuration shared by every component of a multi-target build
#[derive(Clone, Debug)]
pub struct MultiTargetContext {
  pub registry: TargetRegistry,
  pub tagger: RequestTagger,
  pub exclusion: ExclusionPolicy,
  pub strict_targeting: bool,
  pub transform_loader: String,
}

impl MultiTargetContext {
  /// Validates the options and builds the context
  pub fn from_options(options: &MultiTargetOptions) -> Result<Self, MultiTargetError> {
    Ok(MultiTargetContext {
      registry: TargetRegistry::from_options(options)?,
      tagger: RequestTagger::new(options.dev_server_client.clone()),
      exclusion: ExclusionPolicy::from_options(options)?,
      strict_targeting: options.strict_targeting,
      transform_loader: options.transform_loader.clone(),
    })
  }

  pub fn targets(&self) -> &[TargetRef] {
    self.registry.targets()
  }

  /// The registered target named by the request's tag
  ///
  /// A tag naming an unknown key is an error, an untagged request yields `None`.
  pub fn target_for_request(&self, request: &str) -> Result<Option<TargetRef>, MultiTargetError> {
    let Some(key) = key_of(request) else {
      return Ok(None);
    };

    self
      .registry
      .get(key)
      .cloned()
      .map(Some)
      .ok_or_else(|| MultiTargetError::MissingTarget {
        key: key.to_string(),
      })
  }

  pub fn is_targeted_request(&self, request: &str) -> bool {
    self.exclusion.is_targeted_request(request)
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn finds_the_target_named_by_a_tag() {
    let context = MultiTargetContext::from_options(&MultiTargetOptions::default()).unwrap();

    let target = context
      .target_for_request("./a.js?x=1&babel-target=legacy")
      .unwrap();

    assert_eq!(target.map(|t| t.key.clone()), Some(String::from("legacy")));
    assert_eq!(context.target_for_request("./a.js").unwrap(), None);
  }

  #[test]
  fn unknown_keys_are_errors() {
    let context = MultiTargetContext::from_options(&MultiTargetOptions::default()).unwrap();

    assert_eq!(
      context.target_for_request("./a.js?babel-target=es5"),
      Err(MultiTargetError::MissingTarget {
        key: String::from("es5")
      })
    );
  }
}
