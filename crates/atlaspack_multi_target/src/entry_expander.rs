use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use atlaspack_multi_target_core::error::MultiTargetError;
use atlaspack_multi_target_core::types::Dependency;
use atlaspack_multi_target_core::types::EntryLoc;
use atlaspack_multi_target_core::types::TargetEntryDependency;
use atlaspack_multi_target_core::types::TargetRef;
use indexmap::IndexMap;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::context::MultiTargetContextRef;
use crate::tagger::tagged_asset_name;

/// A declared build entry
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDescription {
  /// Requests loaded by the entry, a single string is accepted as well
  #[serde(deserialize_with = "one_or_many")]
  pub import: Vec<String>,
  pub filename: Option<String>,
  pub runtime: Option<String>,
  pub depend_on: Option<Vec<String>>,
  pub chunk_loading: Option<String>,
  pub wasm_loading: Option<String>,
  pub library: Option<serde_json::Value>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum OneOrMany {
    One(String),
    Many(Vec<String>),
  }

  Ok(match OneOrMany::deserialize(deserializer)? {
    OneOrMany::One(import) => vec![import],
    OneOrMany::Many(imports) => imports,
  })
}

/// Options the host receives with every synthetic entry
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryOptions {
  /// The target-suffixed entry name
  pub name: String,
  pub filename: Option<String>,
  pub runtime: Option<String>,
  pub depend_on: Option<Vec<String>>,
  pub chunk_loading: Option<String>,
  pub wasm_loading: Option<String>,
  pub library: Option<serde_json::Value>,
}

/// Entries computed by a callback on every build
#[derive(Clone)]
pub struct DynamicEntries(pub Arc<dyn Fn() -> IndexMap<String, EntryDescription> + Send + Sync>);

impl Debug for DynamicEntries {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("DynamicEntries")
  }
}

#[derive(Clone, Debug)]
pub enum Entries {
  Static(IndexMap<String, EntryDescription>),
  /// Not supported, entries must be known when the build is configured
  Dynamic(DynamicEntries),
}

impl From<IndexMap<String, EntryDescription>> for Entries {
  fn from(entries: IndexMap<String, EntryDescription>) -> Self {
    Entries::Static(entries)
  }
}

/// The host side of entry creation
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EntrySink {
  async fn add_entry(&self, dependency: Dependency, options: EntryOptions) -> anyhow::Result<()>;
}

pub type EntrySinkRef = Arc<dyn EntrySink + Send + Sync>;

/// Turns every declared entry into one tagged entry per request and target
#[derive(Debug)]
pub struct EntryExpander {
  context: MultiTargetContextRef,
  entries: IndexMap<String, EntryDescription>,
}

impl EntryExpander {
  pub fn new(context: MultiTargetContextRef, entries: Entries) -> Result<Self, MultiTargetError> {
    let Entries::Static(entries) = entries else {
      return Err(MultiTargetError::UnsupportedConfiguration(String::from(
        "Dynamic entries are not supported",
      )));
    };

    Ok(EntryExpander { context, entries })
  }

  pub fn entries(&self) -> &IndexMap<String, EntryDescription> {
    &self.entries
  }

  fn entry_dependency(
    &self,
    request: &str,
    original_name: &str,
    target: &TargetRef,
  ) -> Result<Dependency, MultiTargetError> {
    // The live-reload client is shared by every target and must not carry a query tag
    let request = if self.context.tagger.is_dev_server_client(request) {
      request.to_string()
    } else {
      self.context.tagger.tag(request, target)?
    };

    let entry = TargetEntryDependency {
      target: target.clone(),
      original_name: original_name.to_string(),
      name: tagged_asset_name(original_name, target),
      loc: EntryLoc {
        name: format!("{request}:{}", target.key),
        index: None,
      },
    };

    Ok(Dependency::entry(request, entry))
  }

  /// The synthetic entries of one declared entry, each target's additional modules first
  pub fn expand(
    &self,
    name: &str,
    description: &EntryDescription,
  ) -> Result<Vec<(Dependency, EntryOptions)>, MultiTargetError> {
    let mut variants = Vec::new();

    for target in self.context.targets() {
      let options = EntryOptions {
        name: tagged_asset_name(name, target),
        filename: description.filename.clone(),
        runtime: description.runtime.clone(),
        depend_on: description.depend_on.clone(),
        chunk_loading: description.chunk_loading.clone(),
        wasm_loading: description.wasm_loading.clone(),
        library: description.library.clone(),
      };

      for request in target.additional_modules.iter().chain(&description.import) {
        variants.push((
          self.entry_dependency(request, name, target)?,
          options.clone(),
        ));
      }
    }

    Ok(variants)
  }

  /// Adds all variants of one declared entry together
  ///
  /// The first failing variant aborts the ones still running and its error is returned.
  pub async fn add_entry(
    &self,
    sink: &EntrySinkRef,
    name: &str,
    description: &EntryDescription,
  ) -> anyhow::Result<()> {
    let variants = self.expand(name, description)?;
    let mut jobs = tokio::task::JoinSet::<anyhow::Result<()>>::new();

    for (dependency, options) in variants {
      jobs.spawn({
        let sink = sink.clone();
        async move { sink.add_entry(dependency, options).await }
      });
    }

    while let Some(result) = jobs.join_next().await {
      if let Err(error) = result.map_err(anyhow::Error::from).and_then(|added| added) {
        jobs.abort_all();
        return Err(error.context(format!("Failed to add entry {name}")));
      }
    }

    Ok(())
  }

  /// Adds every declared entry
  #[tracing::instrument(level = "info", skip_all)]
  pub async fn make(&self, sink: &EntrySinkRef) -> anyhow::Result<()> {
    for (name, description) in &self.entries {
      self.add_entry(sink, name, description).await?;
    }

    tracing::info!(
      entries = self.entries.len(),
      targets = self.context.targets().len(),
      "Added target entries"
    );
    Ok(())
  }
}
