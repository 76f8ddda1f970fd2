use thiserror::Error;

use crate::diagnostic::Diagnostic;

pub const DIAGNOSTIC_ORIGIN: &str = "@atlaspack/multi-target";

/// Failures raised while tagging and propagating targets through a build.
///
/// All of these are fatal to the current build generation. Output emitted by a
/// previous generation is never touched.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MultiTargetError {
  #[error("The request {request} was already tagged with target {existing}, cannot tag it with {requested}")]
  TaggingConflict {
    request: String,
    existing: String,
    requested: String,
  },

  #[error("Could not blindly assign a target to {request}: every configured target has already been handed out for this site")]
  BlindAssignmentExhausted { request: String },

  #[error("Unsupported configuration: {0}")]
  UnsupportedConfiguration(String),

  #[error("Invalid configuration: {0}")]
  InvalidConfiguration(String),

  #[error("No target could be determined for {request}")]
  UntargetedModule { request: String },

  #[error("The target {key} is not registered")]
  MissingTarget { key: String },
}

impl MultiTargetError {
  pub fn name(&self) -> &'static str {
    match self {
      MultiTargetError::TaggingConflict { .. } => "TaggingConflict",
      MultiTargetError::BlindAssignmentExhausted { .. } => "BlindAssignmentExhausted",
      MultiTargetError::UnsupportedConfiguration(_) => "UnsupportedConfiguration",
      MultiTargetError::InvalidConfiguration(_) => "InvalidConfiguration",
      MultiTargetError::UntargetedModule { .. } => "UntargetedModule",
      MultiTargetError::MissingTarget { .. } => "MissingTarget",
    }
  }

  fn hints(&self) -> Option<Vec<String>> {
    match self {
      MultiTargetError::BlindAssignmentExhausted { .. } => Some(vec![String::from(
        "A dynamically constructed import was resolved more often than there are targets. Check for duplicate dynamic imports of the same request from one module.",
      )]),
      MultiTargetError::UntargetedModule { .. } => Some(vec![String::from(
        "Add the request to `exclude` or `doNotTarget` if it should not be transformed, or disable `strictTargeting`.",
      )]),
      _ => None,
    }
  }
}

impl From<&MultiTargetError> for Diagnostic {
  fn from(error: &MultiTargetError) -> Self {
    Diagnostic {
      message: error.to_string(),
      origin: Some(String::from(DIAGNOSTIC_ORIGIN)),
      name: Some(String::from(error.name())),
      hints: error.hints(),
    }
  }
}

impl From<MultiTargetError> for Diagnostic {
  fn from(error: MultiTargetError) -> Self {
    Diagnostic::from(&error)
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn exhaustion_names_the_offending_request() {
    let error = MultiTargetError::BlindAssignmentExhausted {
      request: String::from("./lazy/route.js"),
    };

    assert!(error.to_string().contains("./lazy/route.js"));
  }

  #[test]
  fn converts_into_a_diagnostic() {
    let diagnostic = Diagnostic::from(MultiTargetError::TaggingConflict {
      request: String::from("./a.js?babel-target=modern"),
      existing: String::from("modern"),
      requested: String::from("legacy"),
    });

    assert_eq!(diagnostic.name.as_deref(), Some("TaggingConflict"));
    assert_eq!(diagnostic.origin.as_deref(), Some(DIAGNOSTIC_ORIGIN));
    assert!(diagnostic.name_matches("TaggingConflict"));
    assert_eq!(diagnostic.hints, None);
  }
}
