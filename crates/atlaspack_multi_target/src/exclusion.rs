use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use atlaspack_multi_target_core::error::MultiTargetError;
use atlaspack_multi_target_core::types::ContextMode;
use regex::Regex;

use crate::options::Externals;
use crate::options::MultiTargetOptions;
use crate::resolve_data::BrowserField;
use crate::resolve_data::BrowserReplacement;
use crate::resolve_data::PackageDescription;
use crate::resolve_data::ResolveData;
use crate::tagger::untag;

/// Requests that are never tagged, their content is identical for every target
const NOT_TARGETED: &[&str] = &[r"\.s?css$"];

/// Runtime helpers injected by the transform itself
static STANDARD_EXCLUDED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
  compile_constant(&[
    r"[\\/]node_modules[\\/]@babel[\\/]runtime[\\/]",
    r"[\\/]node_modules[\\/]core-js[\\/]",
    r"[\\/]node_modules[\\/]regenerator-runtime[\\/]",
    r"[\\/]node_modules[\\/]webpack[\\/]buildin[\\/]",
    r"[\\/]node_modules[\\/]webpack-dev-server[\\/]client[\\/]",
  ])
});

/// Packages that are already portable or break when transformed
static KNOWN_EXCLUDED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
  compile_constant(&[
    // bundler add-ins and loaders
    r"node_modules[\\/]webpack",
    r"node_modules[\\/]([\w-]+)-loader",
    r"node_modules[\\/]regenerator-runtime",
    r"node_modules[\\/]angular-2-local-storage",
    r"node_modules[\\/]base64-js",
    r"node_modules[\\/]buffer",
    r"node_modules[\\/]core-js",
    r"node_modules[\\/]jquery",
    r"node_modules[\\/]jsrsasign",
    r"node_modules[\\/]moment",
  ])
});

fn compile_constant(patterns: &[&str]) -> Vec<Regex> {
  patterns
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
}

fn compile_pattern(option: &str, pattern: &str) -> Result<Regex, MultiTargetError> {
  Regex::new(pattern).map_err(|error| {
    MultiTargetError::InvalidConfiguration(format!(
      "Invalid pattern \"{pattern}\" in {option}: {error}"
    ))
  })
}

fn compile(option: &str, patterns: &[String]) -> Result<Vec<Regex>, MultiTargetError> {
  patterns
    .iter()
    .map(|pattern| compile_pattern(option, pattern))
    .collect()
}

/// Externals compiled into a matcher over raw requests
#[derive(Clone, Debug)]
enum ExternalMatcher {
  Request(String),
  Pattern(Regex),
  Any(Vec<ExternalMatcher>),
}

impl ExternalMatcher {
  fn from_externals(externals: &Externals) -> Result<Self, MultiTargetError> {
    Ok(match externals {
      Externals::Request(request) => ExternalMatcher::Request(request.clone()),
      Externals::Pattern(pattern) => {
        ExternalMatcher::Pattern(compile_pattern("externals", &pattern.regex)?)
      }
      Externals::List(list) => ExternalMatcher::Any(
        list
          .iter()
          .map(ExternalMatcher::from_externals)
          .collect::<Result<_, _>>()?,
      ),
      Externals::Object(object) => ExternalMatcher::Any(
        object
          .keys()
          .map(|request| ExternalMatcher::Request(request.clone()))
          .collect(),
      ),
      Externals::Function(_) => {
        return Err(MultiTargetError::UnsupportedConfiguration(String::from(
          "Function-valued externals cannot be evaluated ahead of resolution",
        )));
      }
    })
  }

  fn matches(&self, request: &str) -> bool {
    match self {
      ExternalMatcher::Request(external) => external == request,
      ExternalMatcher::Pattern(pattern) => pattern.is_match(request),
      ExternalMatcher::Any(matchers) => matchers.iter().any(|matcher| matcher.matches(request)),
    }
  }
}

/// Decides which requests are tagged and which resources are transformed
#[derive(Clone, Debug)]
pub struct ExclusionPolicy {
  do_not_target: Vec<Regex>,
  exclude: Vec<Regex>,
  externals: Option<ExternalMatcher>,
}

impl ExclusionPolicy {
  pub fn from_options(options: &MultiTargetOptions) -> Result<Self, MultiTargetError> {
    let mut do_not_target = compile_constant(NOT_TARGETED);
    do_not_target.extend(compile("doNotTarget", &options.do_not_target)?);

    Ok(ExclusionPolicy {
      do_not_target,
      exclude: compile("exclude", &options.exclude)?,
      externals: options
        .externals
        .as_ref()
        .map(ExternalMatcher::from_externals)
        .transpose()?,
    })
  }

  /// Whether a request should carry a target tag
  ///
  /// Patterns see the request without its tag, so tagging never changes the answer.
  pub fn is_targeted_request(&self, request: &str) -> bool {
    let request = untag(request);

    if self
      .do_not_target
      .iter()
      .any(|pattern| pattern.is_match(&request))
    {
      return false;
    }

    !self
      .externals
      .as_ref()
      .is_some_and(|externals| externals.matches(&request))
  }

  /// Whether a resource is excluded from transformation by pattern
  pub fn is_excluded_resource(&self, resource: &str) -> bool {
    STANDARD_EXCLUDED
      .iter()
      .chain(KNOWN_EXCLUDED.iter())
      .chain(self.exclude.iter())
      .any(|pattern| pattern.is_match(resource))
  }

  /// Whether the resolved module should go through the transform
  pub fn is_transpiled(&self, data: &ResolveData) -> bool {
    let create_data = &data.create_data;
    let resource = create_data.resource.as_deref().unwrap_or_default();

    if self.is_excluded_resource(resource) {
      return false;
    }

    match data.mode {
      // Dynamic import entry
      Some(ContextMode::Lazy) => return true,
      // require.context modules
      Some(ContextMode::Sync) if create_data.resource_resolve_data.is_none() => return true,
      _ => {}
    }

    let Some(description) = create_data
      .resource_resolve_data
      .as_ref()
      .and_then(|data| data.description.as_ref())
    else {
      return true;
    };

    !is_package_entry_point(description, Path::new(resource))
  }
}

/// Whether a resource is a package's `main` or `browser` entry, which ship already compiled
fn is_package_entry_point(description: &PackageDescription, resource: &Path) -> bool {
  let resolves_to = |entry: &str| resolve_path(&description.root, entry) == resource;

  if description.main.as_deref().is_some_and(resolves_to) {
    return true;
  }

  match &description.browser {
    None => false,
    Some(BrowserField::EntryPoint(entry)) => resolves_to(entry),
    Some(BrowserField::List(entries)) => entries.iter().any(|entry| resolves_to(entry)),
    Some(BrowserField::Replacements(replacements)) => {
      replacements.values().any(|replacement| match replacement {
        BrowserReplacement::Path(entry) => resolves_to(entry),
        BrowserReplacement::Ignored(_) => false,
      })
    }
  }
}

/// Joins `entry` onto `root` and normalizes `.` and `..` segments without touching the file system
fn resolve_path(root: &Path, entry: &str) -> PathBuf {
  let mut resolved = PathBuf::new();
  for component in root.join(entry).components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        resolved.pop();
      }
      component => resolved.push(component),
    }
  }
  resolved
}
