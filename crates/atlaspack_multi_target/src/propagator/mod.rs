use std::collections::HashMap;
use std::sync::LazyLock;

use atlaspack_multi_target_core::error::MultiTargetError;
use atlaspack_multi_target_core::module_graph::DependencyId;
use atlaspack_multi_target_core::module_graph::GraphObserver;
use atlaspack_multi_target_core::module_graph::ModuleGraph;
use atlaspack_multi_target_core::types::AsyncBlock;
use atlaspack_multi_target_core::types::Dependency;
use atlaspack_multi_target_core::types::DependencyKind;
use atlaspack_multi_target_core::types::Module;
use atlaspack_multi_target_core::types::TargetProfile;
use atlaspack_multi_target_core::types::TargetRef;
use parking_lot::RwLock;
use regex::Regex;

pub use self::blind_pool::*;
pub use self::lookup::*;

use crate::context::MultiTargetContextRef;
use crate::resolve_data::ContextResolveData;
use crate::resolve_data::Loader;
use crate::resolve_data::LoaderEntry;
use crate::resolve_data::ResolveData;
use crate::tagger::tagged_asset_name;

mod blind_pool;
mod lookup;

/// Placeholder of a chunk name template replaced by the imported resource
pub const RESOURCE_PLACEHOLDER: &str = "[resource]";

static EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.\w+$").unwrap());
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Turns a request into something usable inside a chunk name
fn sanitize_resource(request: &str) -> String {
  let without_extension = EXTENSION.replace(request, "");
  NON_WORD
    .replace_all(&without_extension, "-")
    .trim_matches('-')
    .to_string()
}

/// Tags modules, dependencies and loaders with the target that owns them while the host builds
/// the module graph
///
/// Registered with the module graph as a [`GraphObserver`] so targets flow from a module to
/// everything it adds. The resolution hooks are called by the host around each resolution.
#[derive(Debug)]
pub struct GraphPropagator {
  context: MultiTargetContextRef,
  blind_pool: BlindAssignmentPool,
  targeted_loaders: RwLock<HashMap<String, Loader>>,
}

impl GraphPropagator {
  pub fn new(context: MultiTargetContextRef) -> Self {
    GraphPropagator {
      context,
      blind_pool: BlindAssignmentPool::new(),
      targeted_loaders: RwLock::new(HashMap::new()),
    }
  }

  /// Starts a new build generation
  pub fn reset(&self) {
    self.blind_pool.reset();
  }

  /// Tags a dependency with `target` unless it is exempt
  fn target_dependency(
    &self,
    dependency: &mut Dependency,
    target: &TargetProfile,
  ) -> Result<(), MultiTargetError> {
    match &mut dependency.kind {
      // Injected by shim providers, must keep resolving to the shared module
      DependencyKind::Provided => return Ok(()),
      DependencyKind::ImportContext(options) if options.is_lazy() => {
        if self.context.is_targeted_request(&options.request) {
          options.request = self.context.tagger.tag(&options.request, target)?;
        }
        return Ok(());
      }
      _ => {}
    }

    let Some(request) = &dependency.request else {
      return Ok(());
    };

    if !self.context.is_targeted_request(request) {
      return Ok(());
    }

    dependency.request = Some(self.context.tagger.tag(request, target)?);
    Ok(())
  }

  fn target_dependencies(
    &self,
    graph: &mut ModuleGraph,
    dependencies: &[DependencyId],
    target: &TargetProfile,
  ) -> Result<(), MultiTargetError> {
    for dependency_id in dependencies {
      if let Some(dependency) = graph.get_dependency_mut(dependency_id) {
        self.target_dependency(dependency, target)?;
      }
    }
    Ok(())
  }

  /// Re-tags a dynamically constructed import whose target is embedded in its request
  #[tracing::instrument(level = "debug", skip_all, fields(request = %data.request))]
  pub fn before_context_resolve(
    &self,
    graph: &mut ModuleGraph,
    data: &mut ContextResolveData,
  ) -> Result<(), MultiTargetError> {
    if !data.is_lazy() {
      return Ok(());
    }

    let Some(target) = self.context.target_for_request(&data.request)? else {
      tracing::debug!("Lazy context request carries no target");
      return Ok(());
    };

    data.request = self.context.tagger.tag(&data.request, &target)?;
    self.target_dependencies(graph, &data.dependencies, &target)
  }

  /// Suffixes the chunk name and tags the resource of a resolved lazy context
  pub fn after_context_resolve(&self, data: &mut ContextResolveData) -> Result<(), MultiTargetError> {
    if !data.is_lazy() {
      return Ok(());
    }

    let Some(target) = self.context.target_for_request(&data.request)? else {
      return Ok(());
    };

    if let Some(chunk_name) = &data.chunk_name {
      data.chunk_name = Some(tagged_asset_name(chunk_name, &target));
    }

    if let Some(resource) = &data.resource {
      data.resource = Some(self.context.tagger.tag(resource, &target)?);
    }

    Ok(())
  }

  /// Tags the dependencies a lazy context produced once it read its directory
  pub fn context_dependencies_resolved(
    &self,
    graph: &mut ModuleGraph,
    data: &ContextResolveData,
    dependencies: &[DependencyId],
  ) -> Result<(), MultiTargetError> {
    if !data.is_lazy() {
      return Ok(());
    }

    match self.context.target_for_request(&data.request)? {
      Some(target) => self.target_dependencies(graph, dependencies, &target),
      None => Ok(()),
    }
  }

  /// Settles the target of a resolved module and swaps in its target specific loaders
  #[tracing::instrument(level = "debug", skip_all, fields(request = %data.create_data.request))]
  pub fn after_resolve(
    &self,
    graph: &mut ModuleGraph,
    data: &mut ResolveData,
  ) -> Result<(), MultiTargetError> {
    if !data
      .create_data
      .loaders
      .iter()
      .any(LoaderEntry::is_multi_target)
    {
      return Ok(());
    }

    self.check_resolve_target(graph, data)?;
    self.replace_loaders(graph, data)
  }

  fn check_resolve_target(
    &self,
    graph: &mut ModuleGraph,
    data: &mut ResolveData,
  ) -> Result<(), MultiTargetError> {
    if !self.context.is_targeted_request(&data.create_data.request)
      || !self.context.exclusion.is_transpiled(data)
    {
      return Ok(());
    }

    if let Some(target) = self.context.target_for_request(&data.create_data.request)? {
      self.target_chunk_names(graph, data, &target);
      data.context_target = Some(target);
      return Ok(());
    }

    let target = match self.target_from_context(graph, data) {
      Some(target) => {
        // Most likely a dynamic import, its dependencies need the target too
        self.target_dependencies(graph, &data.dependencies, &target)?;
        target
      }
      None => self.blind_pool.assign(
        &data.issuer,
        &data.create_data.request,
        self.context.targets(),
      )?,
    };

    self.target_chunk_names(graph, data, &target);

    let create_data = &mut data.create_data;
    create_data.request = self.context.tagger.tag(&create_data.request, &target)?;
    if let Some(resource) = &create_data.resource {
      create_data.resource = Some(self.context.tagger.tag(resource, &target)?);
    }

    data.context_target = Some(target);
    Ok(())
  }

  /// Suffixes the chunk names of the async blocks the resolution serves
  fn target_chunk_names(&self, graph: &mut ModuleGraph, data: &ResolveData, target: &TargetProfile) {
    for dependency_id in &data.dependencies {
      let Some(block_id) = graph.get_parent_block(dependency_id) else {
        continue;
      };

      if let Some(block) = graph.get_block_mut(&block_id) {
        if let Some(chunk_name) = &block.chunk_name {
          block.chunk_name = Some(tagged_asset_name(chunk_name, target));
        }
      }
    }
  }

  /// The target implied by where a resolution happens
  fn target_from_context(&self, graph: &ModuleGraph, data: &ResolveData) -> Option<TargetRef> {
    if let Some(target) = &data.context_target {
      return Some(target.clone());
    }

    if let Some(target) = data
      .create_data
      .resource_resolve_data
      .as_ref()
      .and_then(|resolve_data| resolve_data.context_target.as_ref())
    {
      return Some(target.clone());
    }

    for dependency_id in &data.dependencies {
      if let Some(target) = graph
        .get_dependency(dependency_id)
        .and_then(Dependency::entry_target)
      {
        return Some(target.clone());
      }

      let target = graph
        .get_parent_module(dependency_id)
        .and_then(|parent| module_target(graph, &parent));

      if target.is_some() {
        return target;
      }
    }

    None
  }

  fn replace_loaders(
    &self,
    graph: &ModuleGraph,
    data: &mut ResolveData,
  ) -> Result<(), MultiTargetError> {
    let is_transpiled = self.context.exclusion.is_transpiled(data);

    let target = if is_transpiled {
      match self.context.target_for_request(&data.create_data.raw_request)? {
        Some(target) => Some(target),
        None => self.target_from_context(graph, data),
      }
    } else {
      None
    };

    if target.is_none()
      && is_transpiled
      && self.context.is_targeted_request(&data.create_data.request)
    {
      self.untargeted(&data.create_data.request)?;
    }

    let loaders = std::mem::take(&mut data.create_data.loaders);
    let mut replaced = Vec::with_capacity(loaders.len());

    for entry in loaders {
      let loader = match entry {
        LoaderEntry::Plain(_) => {
          replaced.push(entry);
          continue;
        }
        LoaderEntry::MultiTarget(loader) => loader,
      };

      // Untagged content is never transformed
      let Some(target) = &target else {
        continue;
      };

      if loader.loader == self.context.transform_loader {
        replaced.push(LoaderEntry::Plain(self.targeted_loader(&loader, target)?));
      } else {
        replaced.push(LoaderEntry::Plain(loader));
      }
    }

    data.create_data.loaders = replaced;
    Ok(())
  }

  /// The transform loader configured for `target`, built once per target
  fn targeted_loader(
    &self,
    loader: &Loader,
    target: &TargetProfile,
  ) -> Result<Loader, MultiTargetError> {
    if let Some(targeted) = self.targeted_loaders.read().get(&target.key) {
      return Ok(targeted.clone());
    }

    let options = serde_json::to_value(&target.transform_options).map_err(|error| {
      MultiTargetError::InvalidConfiguration(format!(
        "Transform options of target {} cannot be serialized: {error}",
        target.key
      ))
    })?;

    let targeted = Loader {
      loader: loader.loader.clone(),
      options: Some(options),
      ident: loader.ident.clone(),
    };

    Ok(
      self
        .targeted_loaders
        .write()
        .entry(target.key.clone())
        .or_insert(targeted)
        .clone(),
    )
  }

  fn untargeted(&self, request: &str) -> Result<(), MultiTargetError> {
    if self.context.strict_targeting {
      return Err(MultiTargetError::UntargetedModule {
        request: request.to_string(),
      });
    }

    tracing::warn!(
      request,
      "No target could be determined, the module will not be transformed"
    );
    Ok(())
  }
}

impl GraphObserver for GraphPropagator {
  fn module_created(&self, module: &mut Module) -> Result<(), MultiTargetError> {
    if module.target().is_some() {
      return Ok(());
    }

    if !self.context.is_targeted_request(&module.request) {
      tracing::debug!(request = module.request, "Module is not targeted");
      return Ok(());
    }

    let tagged_request = match &module.context {
      Some(context) if context.is_lazy() => &context.request,
      _ => &module.request,
    };

    if let Some(target) = self.context.target_for_request(tagged_request)? {
      module.associate_target(target);
    }

    Ok(())
  }

  fn dependency_added(
    &self,
    owner: &Module,
    dependency: &mut Dependency,
  ) -> Result<(), MultiTargetError> {
    match owner.target() {
      Some(target) => self.target_dependency(dependency, target),
      None => Ok(()),
    }
  }

  fn block_added(&self, owner: &Module, block: &mut AsyncBlock) -> Result<(), MultiTargetError> {
    let Some(target) = owner.target() else {
      return Ok(());
    };

    let template = owner
      .context
      .as_ref()
      .filter(|context| context.is_lazy())
      .and_then(|context| context.chunk_name.as_ref())
      .filter(|chunk_name| chunk_name.contains(RESOURCE_PLACEHOLDER));

    if let (Some(template), Some(request)) = (template, &block.request) {
      block.chunk_name = Some(template.replace(RESOURCE_PLACEHOLDER, &sanitize_resource(request)));
    }

    if let Some(request) = &block.request {
      if self.context.is_targeted_request(request) {
        block.request = Some(self.context.tagger.tag(request, target)?);
      }
    }

    Ok(())
  }
}
