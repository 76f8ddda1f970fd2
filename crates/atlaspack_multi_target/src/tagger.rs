use std::sync::LazyLock;

use atlaspack_multi_target_core::error::MultiTargetError;
use atlaspack_multi_target_core::types::TargetProfile;
use regex::Regex;

use crate::options::DEFAULT_DEV_SERVER_CLIENT;

/// The query parameter that carries a target key
pub const TARGET_MARKER: &str = "babel-target";

static TAG: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(&format!(r"[?&#]{TARGET_MARKER}=(\w+)")).unwrap());

static EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.\w+$").unwrap());

static NG_FACTORY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.ngfactory$").unwrap());

/// Encodes target keys into requests
///
/// Requests starting with the live-reload client prefix are tagged behind a `#`, because a query
/// string would break the client's own connection parameters.
#[derive(Clone, Debug)]
pub struct RequestTagger {
  dev_server_client: String,
}

impl Default for RequestTagger {
  fn default() -> Self {
    RequestTagger::new(DEFAULT_DEV_SERVER_CLIENT)
  }
}

impl RequestTagger {
  pub fn new(dev_server_client: impl Into<String>) -> Self {
    RequestTagger {
      dev_server_client: dev_server_client.into(),
    }
  }

  /// Whether the request loads the live-reload client
  pub fn is_dev_server_client(&self, request: &str) -> bool {
    request.starts_with(&self.dev_server_client)
  }

  /// Tags a request with the key of `target`
  ///
  /// Tagging a request twice with the same target returns it unchanged.
  pub fn tag(&self, request: &str, target: &TargetProfile) -> Result<String, MultiTargetError> {
    if let Some(existing) = key_of(request) {
      if target.is_key(existing) {
        return Ok(request.to_string());
      }

      return Err(MultiTargetError::TaggingConflict {
        request: request.to_string(),
        existing: existing.to_string(),
        requested: target.key.clone(),
      });
    }

    let separator = if self.is_dev_server_client(request) {
      '#'
    } else if request.contains('?') {
      '&'
    } else {
      '?'
    };

    Ok(format!("{request}{separator}{TARGET_MARKER}={}", target.key))
  }
}

pub fn is_tagged(request: &str) -> bool {
  TAG.is_match(request)
}

/// The target key embedded in a request, if any
pub fn key_of(request: &str) -> Option<&str> {
  TAG
    .captures(request)
    .and_then(|captures| captures.get(1))
    .map(|key| key.as_str())
}

/// Suffixes an output name with the target key when the target tags its assets
pub fn tagged_asset_name(name: &str, target: &TargetProfile) -> String {
  let suffix = format!(".{}", target.key);
  if target.tag_assets_with_key && !name.ends_with(&suffix) {
    return format!("{name}{suffix}");
  }

  name.to_string()
}

/// Removes the target tag from a request, keeping any other query parameters
pub fn untag(request: &str) -> String {
  let Some(tag) = TAG.find(request) else {
    return request.to_string();
  };

  let before = &request[..tag.start()];
  let after = &request[tag.end()..];

  match request[tag.start()..].chars().next() {
    // The tag opened the query, so the next parameter (if any) takes over the `?`
    Some('?') => match after.strip_prefix('&') {
      Some(rest) => format!("{before}?{rest}"),
      None => format!("{before}{after}"),
    },
    _ => format!("{before}{after}"),
  }
}

/// The file name of a request without directories, query, tag or extension
///
/// Angular factory requests lose their `.ngfactory` suffix instead of the extension.
pub fn request_basename(request: &str) -> String {
  let path = untag(request);
  let path = path
    .split(['?', '#'])
    .next()
    .unwrap_or_default()
    .trim_end_matches(['/', '\\']);

  let file_name = path.rsplit(['/', '\\']).next().unwrap_or_default();

  if NG_FACTORY.is_match(file_name) {
    return NG_FACTORY.replace(file_name, "").into_owned();
  }

  EXTENSION.replace(file_name, "").into_owned()
}
