use std::path::PathBuf;
use std::sync::Arc;

use atlaspack_multi_target_core::chunk_graph::ChunkGraph;
use atlaspack_multi_target_core::module_graph::DependencyId;
use atlaspack_multi_target_core::module_graph::ModuleGraph;
use atlaspack_multi_target_core::module_graph::ModuleId;
use atlaspack_multi_target_core::types::Chunk;
use atlaspack_multi_target_core::types::ChunkGroup;
use atlaspack_multi_target_core::types::ChunkGroupId;
use atlaspack_multi_target_core::types::ChunkId;
use atlaspack_multi_target_core::types::ContentKind;
use atlaspack_multi_target_core::types::Dependency;
use atlaspack_multi_target_core::types::EntryLoc;
use atlaspack_multi_target_core::types::Module;
use atlaspack_multi_target_core::types::TargetEntryDependency;
use atlaspack_multi_target_core::types::TargetProfile;
use atlaspack_multi_target_core::types::TargetRef;

use crate::context::MultiTargetContext;
use crate::context::MultiTargetContextRef;
use crate::options::MultiTargetOptions;
use crate::resolve_data::CreateData;
use crate::resolve_data::Loader;
use crate::resolve_data::LoaderEntry;
use crate::resolve_data::ResolveData;
use crate::resolve_data::ResourceResolveData;
use crate::tagger::tagged_asset_name;
use crate::tagger::RequestTagger;

/// A target that emits modules when it tags its assets and classic scripts otherwise
pub fn target(key: &str, tag_assets_with_key: bool) -> TargetRef {
  Arc::new(TargetProfile {
    profile_name: key.to_string(),
    key: key.to_string(),
    browsers: Vec::new(),
    tag_assets_with_key,
    es_module: tag_assets_with_key,
    no_module: !tag_assets_with_key,
    additional_modules: Vec::new(),
    transform_options: Default::default(),
  })
}

pub fn context(options: MultiTargetOptions) -> MultiTargetContextRef {
  Arc::new(MultiTargetContext::from_options(&options).unwrap())
}

/// A tagged entry dependency on `request` for the entry `name`
pub fn entry_dependency(request: &str, name: &str, target: &TargetRef) -> Dependency {
  let request = RequestTagger::default().tag(request, target).unwrap();

  Dependency::entry(
    request.clone(),
    TargetEntryDependency {
      target: target.clone(),
      original_name: name.to_string(),
      name: tagged_asset_name(name, target),
      loc: EntryLoc {
        name: format!("{request}:{}", target.key),
        index: None,
      },
    },
  )
}

pub fn targeted_module(identifier: &str, request: &str, target: &TargetRef) -> Module {
  let mut module = Module::new(identifier, request);
  module.associate_target(target.clone());
  module
}

/// A resolution of `request` whose only loader is the wrapped transform loader
pub fn loader_resolution(
  issuer: &str,
  request: &str,
  resource: &str,
  dependencies: Vec<DependencyId>,
) -> ResolveData {
  ResolveData {
    issuer: issuer.to_string(),
    context_target: None,
    mode: None,
    dependencies,
    create_data: CreateData {
      request: request.to_string(),
      raw_request: request.to_string(),
      resource: Some(resource.to_string()),
      resource_resolve_data: Some(ResourceResolveData {
        description: None,
        context_target: None,
      }),
      loaders: vec![LoaderEntry::MultiTarget(Loader {
        loader: String::from("babel-loader"),
        options: None,
        ident: None,
      })],
    },
  }
}

/// An entry module together with its entrypoint and runtime chunk
#[derive(Debug)]
pub struct EntryFixture {
  pub module: ModuleId,
  pub group: ChunkGroupId,
  pub chunk: ChunkId,
}

/// Adds the `target` variant of the entry `name`, as the host would after sealing the graph
pub fn add_entrypoint(
  graph: &mut ModuleGraph,
  chunk_graph: &mut ChunkGraph,
  name: &str,
  request: &str,
  target: &TargetRef,
) -> EntryFixture {
  let dependency = entry_dependency(request, name, target);
  let tagged_request = dependency.request.clone().unwrap();
  let dependency = graph.add_entry_dependency(dependency);

  let module = graph
    .add_module(Module::new(tagged_request.clone(), tagged_request))
    .unwrap();
  graph.resolve_dependency(&dependency, &module);

  let tagged_name = tagged_asset_name(name, target);
  let group = chunk_graph.add_chunk_group(ChunkGroup::entrypoint(tagged_name.clone()));
  let chunk = chunk_graph.add_chunk(Chunk::named(tagged_name));
  chunk_graph.connect_chunk_and_group(&chunk, &group);
  chunk_graph.connect_chunk_and_entry_module(&chunk, &module);
  if let Some(group) = chunk_graph.get_group_mut(&group) {
    group.runtime_chunk = Some(chunk);
  }

  EntryFixture {
    module,
    group,
    chunk,
  }
}

/// Adds a module imported by the entry module and places it in the entry's chunk
pub fn add_module_to(
  graph: &mut ModuleGraph,
  chunk_graph: &mut ChunkGraph,
  entry: &EntryFixture,
  identifier: &str,
  request: &str,
  content_kind: ContentKind,
) -> ModuleId {
  let dependency = graph
    .add_dependency(&entry.module, Dependency::new(request))
    .unwrap();

  let mut module = Module::new(identifier, request);
  module.content_kind = content_kind;
  module.resource = Some(PathBuf::from("/app/src").join(request).display().to_string());
  let module = graph.add_module(module).unwrap();
  graph.resolve_dependency(&dependency, &module);

  chunk_graph.connect_chunk_and_module(&entry.chunk, &module);
  module
}
