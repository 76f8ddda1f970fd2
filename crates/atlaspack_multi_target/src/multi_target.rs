use std::sync::Arc;

use atlaspack_multi_target_core::chunk_graph::ChunkGraph;
use atlaspack_multi_target_core::error::MultiTargetError;
use atlaspack_multi_target_core::module_graph::DependencyId;
use atlaspack_multi_target_core::module_graph::ModuleGraph;
use atlaspack_multi_target_core::types::ChunkId;
use atlaspack_multi_target_core::types::TargetRef;
use atlaspack_multi_target_core::types::TransformOptions;
use indexmap::IndexMap;

use crate::asset_normalizer::AssetNormalizer;
use crate::chunk_namer::ChunkNamer;
use crate::context::MultiTargetContext;
use crate::context::MultiTargetContextRef;
use crate::entry_expander::Entries;
use crate::entry_expander::EntryDescription;
use crate::entry_expander::EntryExpander;
use crate::entry_expander::EntrySinkRef;
use crate::options::MultiTargetOptions;
use crate::output_reconciler::HtmlTag;
use crate::output_reconciler::MarkupOptions;
use crate::output_reconciler::OutputReconciler;
use crate::propagator::GraphPropagator;
use crate::resolve_data::ContextResolveData;
use crate::resolve_data::Loader;
use crate::resolve_data::LoaderEntry;
use crate::resolve_data::ResolveData;

/// Builds one module graph into a variant per configured target
///
/// The host calls each method from the matching phase of its build. Everything is configured
/// once by [`MultiTarget::new`]; per build state is dropped by [`MultiTarget::begin_generation`].
#[derive(Debug)]
pub struct MultiTarget {
  context: MultiTargetContextRef,
  propagator: Arc<GraphPropagator>,
  entry_expander: EntryExpander,
  asset_normalizer: AssetNormalizer,
  chunk_namer: ChunkNamer,
  output_reconciler: OutputReconciler,
}

impl MultiTarget {
  /// Validates the configuration, failing before any build starts
  pub fn new(options: MultiTargetOptions, entries: Entries) -> Result<Self, MultiTargetError> {
    let context = Arc::new(MultiTargetContext::from_options(&options)?);

    tracing::debug!(
      targets = ?context.targets().iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
      "Configured targets"
    );

    Ok(MultiTarget {
      propagator: Arc::new(GraphPropagator::new(context.clone())),
      entry_expander: EntryExpander::new(context.clone(), entries)?,
      asset_normalizer: AssetNormalizer::new(),
      chunk_namer: ChunkNamer::new(),
      output_reconciler: OutputReconciler::new(context.clone()),
      context,
    })
  }

  pub fn from_json(options: &str, entries: &str) -> anyhow::Result<Self> {
    let options = MultiTargetOptions::from_json(options)?;
    let entries = serde_json::from_str::<IndexMap<String, EntryDescription>>(entries)?;

    Ok(MultiTarget::new(options, Entries::Static(entries))?)
  }

  pub fn context(&self) -> &MultiTargetContextRef {
    &self.context
  }

  pub fn targets(&self) -> &[TargetRef] {
    self.context.targets()
  }

  /// The transform options computed for a target
  pub fn transform_options(&self, key: &str) -> Option<&TransformOptions> {
    self
      .context
      .registry
      .get(key)
      .map(|target| &target.transform_options)
  }

  /// Marks a loader declared in the host configuration as target specific
  pub fn loader(&self, loader: Loader) -> LoaderEntry {
    LoaderEntry::MultiTarget(loader)
  }

  /// Starts a build or watch rebuild
  pub fn begin_generation(&self) {
    tracing::debug!("Starting build generation");
    self.propagator.reset();
  }

  /// Lets targets flow through the modules, dependencies and blocks added to `graph`
  pub fn attach(&self, graph: &mut ModuleGraph) {
    graph.add_observer(self.propagator.clone());
  }

  /// Adds the target variants of every declared entry through the host
  pub async fn make(&self, sink: &EntrySinkRef) -> anyhow::Result<()> {
    self.entry_expander.make(sink).await
  }

  pub fn before_context_resolve(
    &self,
    graph: &mut ModuleGraph,
    data: &mut ContextResolveData,
  ) -> Result<(), MultiTargetError> {
    self.propagator.before_context_resolve(graph, data)
  }

  pub fn after_context_resolve(&self, data: &mut ContextResolveData) -> Result<(), MultiTargetError> {
    self.propagator.after_context_resolve(data)
  }

  pub fn context_dependencies_resolved(
    &self,
    graph: &mut ModuleGraph,
    data: &ContextResolveData,
    dependencies: &[DependencyId],
  ) -> Result<(), MultiTargetError> {
    self
      .propagator
      .context_dependencies_resolved(graph, data, dependencies)
  }

  pub fn after_resolve(
    &self,
    graph: &mut ModuleGraph,
    data: &mut ResolveData,
  ) -> Result<(), MultiTargetError> {
    self.propagator.after_resolve(graph, data)
  }

  /// Chunk optimization phase
  pub fn optimize_chunks(&self, graph: &ModuleGraph, chunk_graph: &mut ChunkGraph) -> Vec<ChunkId> {
    self.asset_normalizer.optimize_chunks(graph, chunk_graph)
  }

  /// Runs right before the host assigns chunk ids
  pub fn before_chunk_ids(&self, graph: &ModuleGraph, chunk_graph: &mut ChunkGraph) {
    self.chunk_namer.assign_chunk_ids(graph, chunk_graph);
  }

  /// Asset emission phase
  pub fn process_assets(&self, chunk_graph: &mut ChunkGraph) {
    self.asset_normalizer.clean_generated_chunks(chunk_graph);
  }

  pub fn configure_markup(&self, options: &mut MarkupOptions) {
    self.output_reconciler.configure_markup(options);
  }

  pub fn alter_asset_tag_groups(
    &self,
    graph: &ModuleGraph,
    chunk_graph: &ChunkGraph,
    public_path: &str,
    head: &mut [HtmlTag],
    body: &mut [HtmlTag],
  ) {
    self
      .output_reconciler
      .alter_asset_tag_groups(graph, chunk_graph, public_path, head, body);
  }

  /// Runs before the host persists module ids
  pub fn module_ids<'a>(&self, ids: impl IntoIterator<Item = &'a mut String>) {
    self.output_reconciler.normalize_module_ids(ids);
  }
}
