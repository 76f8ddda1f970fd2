use std::collections::HashMap;
use std::collections::VecDeque;

use atlaspack_multi_target_core::error::MultiTargetError;
use atlaspack_multi_target_core::types::TargetRef;
use parking_lot::Mutex;

/// Hands out targets to resolution sites whose owner cannot be traced
///
/// Every `(issuer, request)` site receives each configured target once, in declaration order.
/// Access is serialized, since the order in which sites draw decides which target they get.
#[derive(Debug, Default)]
pub struct BlindAssignmentPool {
  remaining: Mutex<HashMap<(String, String), VecDeque<TargetRef>>>,
}

impl BlindAssignmentPool {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn assign(
    &self,
    issuer: &str,
    request: &str,
    targets: &[TargetRef],
  ) -> Result<TargetRef, MultiTargetError> {
    let mut remaining = self.remaining.lock();

    let site = remaining
      .entry((issuer.to_string(), request.to_string()))
      .or_insert_with(|| targets.iter().cloned().collect());

    let target = site
      .pop_front()
      .ok_or_else(|| MultiTargetError::BlindAssignmentExhausted {
        request: request.to_string(),
      })?;

    tracing::debug!(
      issuer,
      request,
      target = target.key.as_str(),
      "Blindly assigned target"
    );

    Ok(target)
  }

  /// Forgets every site, called at the start of a build generation
  pub fn reset(&self) {
    self.remaining.lock().clear();
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::test_utils::target;

  use super::*;

  #[test]
  fn hands_out_each_target_once_per_site() {
    let targets = vec![target("modern", true), target("legacy", false)];
    let pool = BlindAssignmentPool::new();

    let first = pool.assign("./app.js", "./lazy.js", &targets).unwrap();
    let second = pool.assign("./app.js", "./lazy.js", &targets).unwrap();
    let third = pool.assign("./app.js", "./lazy.js", &targets);

    assert_eq!(first.key, "modern");
    assert_eq!(second.key, "legacy");
    assert_eq!(
      third,
      Err(MultiTargetError::BlindAssignmentExhausted {
        request: String::from("./lazy.js")
      })
    );
  }

  #[test]
  fn tracks_sites_independently() {
    let targets = vec![target("modern", true), target("legacy", false)];
    let pool = BlindAssignmentPool::new();

    pool.assign("./app.js", "./lazy.js", &targets).unwrap();

    assert_eq!(
      pool.assign("./other.js", "./lazy.js", &targets).unwrap().key,
      "modern"
    );
    assert_eq!(
      pool.assign("./app.js", "./route.js", &targets).unwrap().key,
      "modern"
    );
  }

  #[test]
  fn reset_starts_a_new_generation() {
    let targets = vec![target("modern", true)];
    let pool = BlindAssignmentPool::new();

    pool.assign("./app.js", "./lazy.js", &targets).unwrap();
    assert!(pool.assign("./app.js", "./lazy.js", &targets).is_err());

    pool.reset();

    assert_eq!(
      pool.assign("./app.js", "./lazy.js", &targets).unwrap().key,
      "modern"
    );
  }
}
