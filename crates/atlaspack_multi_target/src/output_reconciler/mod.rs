use atlaspack_multi_target_core::chunk_graph::ChunkGraph;
use atlaspack_multi_target_core::module_graph::ModuleGraph;
use serde::Deserialize;
use serde::Serialize;

pub use self::html_tag::*;
pub use self::targeted_chunk_map::*;
use crate::context::MultiTargetContextRef;
use crate::tagger::is_tagged;
use crate::tagger::tagged_asset_name;
use crate::tagger::untag;

mod html_tag;
mod targeted_chunk_map;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKeyword {
  #[default]
  All,
}

/// The chunks the markup generator includes or excludes
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChunkFilter {
  Keyword(ChunkKeyword),
  Names(Vec<String>),
}

impl Default for ChunkFilter {
  fn default() -> Self {
    ChunkFilter::Keyword(ChunkKeyword::All)
  }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunksSortMode {
  #[default]
  Auto,
  Manual,
  Dependency,
  #[serde(rename = "none")]
  Unsorted,
}

/// The options of the markup generator that decide which chunks are referenced
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupOptions {
  #[serde(default)]
  pub chunks: ChunkFilter,
  #[serde(default)]
  pub exclude_chunks: Vec<String>,
  #[serde(default)]
  pub chunks_sort_mode: ChunksSortMode,
}

/// Adapts the outputs of every target so they can be referenced from one document
#[derive(Debug)]
pub struct OutputReconciler {
  context: MultiTargetContextRef,
}

impl OutputReconciler {
  pub fn new(context: MultiTargetContextRef) -> Self {
    OutputReconciler { context }
  }

  /// Expands chunk names to the names every target gives the chunk
  ///
  /// The bare name is kept when every target tags its assets, since the shared chunks created by
  /// asset normalization use it.
  pub fn map_chunk_names(&self, names: &[String]) -> Vec<String> {
    let all_tagged = self.context.registry.all_tag_assets_with_key();
    let mut mapped = Vec::new();

    for name in names {
      if all_tagged {
        mapped.push(name.clone());
      }

      for target in self.context.targets() {
        mapped.push(tagged_asset_name(name, target));
      }
    }

    mapped
  }

  /// Rewrites the chunk filters of the markup generator, once when the build is configured
  pub fn configure_markup(&self, options: &mut MarkupOptions) {
    // Dependency sorting fails on the cycles lazy routes create between targets
    options.chunks_sort_mode = ChunksSortMode::Unsorted;

    if let ChunkFilter::Names(names) = &mut options.chunks {
      if !names.is_empty() {
        *names = self.map_chunk_names(names);
      }
    }

    if !options.exclude_chunks.is_empty() {
      options.exclude_chunks = self.map_chunk_names(&options.exclude_chunks);
    }
  }

  /// Marks each script with how the engine should load it
  ///
  /// Scripts referenced by several targets (e.g. untransformed vendor chunks) or unknown to the
  /// build are left untouched.
  pub fn update_script_tags(&self, chunk_map: &TargetedChunkMap, tags: &mut [HtmlTag]) {
    for tag in tags.iter_mut().filter(|tag| tag.is_script()) {
      let Some(target) = tag.src().and_then(|src| chunk_map.unique_target(src)) else {
        continue;
      };

      if target.es_module {
        tag.set_attribute("type", "module");
      } else if target.no_module {
        tag.set_attribute("nomodule", true);
      }
    }
  }

  /// Updates the tags the markup generator is about to render
  #[tracing::instrument(level = "debug", skip_all)]
  pub fn alter_asset_tag_groups(
    &self,
    graph: &ModuleGraph,
    chunk_graph: &ChunkGraph,
    public_path: &str,
    head: &mut [HtmlTag],
    body: &mut [HtmlTag],
  ) {
    let chunk_map = TargetedChunkMap::from_chunk_graph(public_path, graph, chunk_graph);

    self.update_script_tags(&chunk_map, head);
    self.update_script_tags(&chunk_map, body);

    order_script_tags(body);
  }

  /// Removes target tags from module ids so ids stay stable between builds
  pub fn normalize_module_ids<'a>(&self, ids: impl IntoIterator<Item = &'a mut String>) {
    for id in ids {
      if is_tagged(id) {
        *id = untag(id);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use atlaspack_multi_target_core::types::ContentKind;
  use indexmap::IndexMap;
  use pretty_assertions::assert_eq;

  use crate::asset_normalizer::AssetNormalizer;
  use crate::options::MultiTargetOptions;
  use crate::options::TargetOptions;
  use crate::test_utils::add_entrypoint;
  use crate::test_utils::add_module_to;
  use crate::test_utils::context;

  use super::*;

  fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
  }

  fn all_tagged() -> MultiTargetOptions {
    let mut targets = IndexMap::new();
    for profile in ["modern", "legacy"] {
      targets.insert(
        profile.to_string(),
        TargetOptions {
          tag_assets_with_key: Some(true),
          ..TargetOptions::default()
        },
      );
    }

    MultiTargetOptions {
      targets,
      ..MultiTargetOptions::default()
    }
  }

  #[test]
  fn maps_chunk_names_to_every_target() {
    let reconciler = OutputReconciler::new(context(MultiTargetOptions::default()));

    assert_eq!(
      reconciler.map_chunk_names(&names(&["main", "admin"])),
      names(&["main.modern", "main", "admin.modern", "admin"])
    );
  }

  #[test]
  fn keeps_the_bare_name_when_every_target_tags_assets() {
    let reconciler = OutputReconciler::new(context(all_tagged()));

    assert_eq!(
      reconciler.map_chunk_names(&names(&["main"])),
      names(&["main", "main.modern", "main.legacy"])
    );
  }

  #[test]
  fn configures_the_markup_generator() {
    let reconciler = OutputReconciler::new(context(MultiTargetOptions::default()));

    let mut options: MarkupOptions = serde_json::from_str(
      r#"{ "chunks": ["main"], "excludeChunks": ["admin"], "chunksSortMode": "dependency" }"#,
    )
    .unwrap();
    reconciler.configure_markup(&mut options);

    assert_eq!(
      options,
      MarkupOptions {
        chunks: ChunkFilter::Names(names(&["main.modern", "main"])),
        exclude_chunks: names(&["admin.modern", "admin"]),
        chunks_sort_mode: ChunksSortMode::Unsorted,
      }
    );

    let mut options: MarkupOptions = serde_json::from_str(r#"{ "chunks": "all" }"#).unwrap();
    reconciler.configure_markup(&mut options);

    assert_eq!(options.chunks, ChunkFilter::Keyword(ChunkKeyword::All));
    assert!(options.exclude_chunks.is_empty());
  }

  #[test]
  fn marks_scripts_by_their_target() {
    let reconciler = OutputReconciler::new(context(MultiTargetOptions::default()));
    let targets = reconciler.context.targets().to_vec();
    let mut graph = ModuleGraph::new();
    let mut chunk_graph = ChunkGraph::new();

    let modern = add_entrypoint(&mut graph, &mut chunk_graph, "main", "./main.js", &targets[0]);
    let legacy = add_entrypoint(&mut graph, &mut chunk_graph, "main", "./main.js", &targets[1]);

    let vendors = chunk_graph.add_chunk(Default::default());
    for (entry, file) in [(&modern, "main.modern.js"), (&legacy, "main.js")] {
      chunk_graph.connect_chunk_and_group(&vendors, &entry.group);
      if let Some(chunk) = chunk_graph.get_chunk_mut(&entry.chunk) {
        chunk.files.insert(file.to_string());
      }
    }
    if let Some(chunk) = chunk_graph.get_chunk_mut(&vendors) {
      chunk.files.insert(String::from("vendors.js"));
    }

    let mut head = Vec::new();
    let mut body = vec![
      HtmlTag::script("/vendors.js"),
      HtmlTag::script("/main.js"),
      HtmlTag::script("/main.modern.js"),
      HtmlTag::script("/analytics.js"),
    ];

    reconciler.alter_asset_tag_groups(&graph, &chunk_graph, "/", &mut head, &mut body);

    assert_eq!(
      body,
      vec![
        HtmlTag::script("/main.modern.js").with_attribute("type", "module"),
        HtmlTag::script("/vendors.js"),
        HtmlTag::script("/main.js")
          .with_attribute("nomodule", true)
          .with_attribute("defer", true),
        HtmlTag::script("/analytics.js"),
      ]
    );
  }

  #[test]
  fn includes_shared_chunks_in_the_markup() {
    let reconciler = OutputReconciler::new(context(all_tagged()));
    let targets = reconciler.context.targets().to_vec();
    let mut graph = ModuleGraph::new();
    let mut chunk_graph = ChunkGraph::new();

    for target in &targets {
      let entry = add_entrypoint(&mut graph, &mut chunk_graph, "main", "./main.js", target);
      add_module_to(
        &mut graph,
        &mut chunk_graph,
        &entry,
        "styles.css",
        "./styles.css",
        ContentKind::Stylesheet,
      );
    }

    let shared = AssetNormalizer::new().optimize_chunks(&graph, &mut chunk_graph);
    let mut options: MarkupOptions = serde_json::from_str(r#"{ "chunks": ["main"] }"#).unwrap();
    reconciler.configure_markup(&mut options);

    let ChunkFilter::Names(included) = options.chunks else {
      panic!("expected chunk names");
    };
    let shared_name = chunk_graph.get_chunk(&shared[0]).and_then(|c| c.name.clone());

    assert!(shared_name.is_some_and(|name| included.contains(&name)));
  }

  #[test]
  fn strips_target_tags_from_module_ids() {
    let reconciler = OutputReconciler::new(context(MultiTargetOptions::default()));
    let mut ids = names(&[
      "./src/main.js?babel-target=modern",
      "./src/a.js?lazy&babel-target=legacy",
      "./src/b.js?babel-target=modern&inline",
      "./src/c.js",
    ]);

    reconciler.normalize_module_ids(ids.iter_mut());

    assert_eq!(
      ids,
      names(&["./src/main.js", "./src/a.js?lazy", "./src/b.js?inline", "./src/c.js"])
    );
  }
}
