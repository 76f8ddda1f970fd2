use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::Direction;

use crate::error::MultiTargetError;
use crate::types::AsyncBlock;
use crate::types::BlockId;
use crate::types::Dependency;
use crate::types::Module;

pub type NodeId = usize;
pub type ModuleId = NodeId;
pub type DependencyId = NodeId;

/// Events the module graph emits while the host builds it
///
/// Observers run before the node is inserted and may rewrite it, e.g. to tag its request.
/// Any error aborts the insertion.
pub trait GraphObserver: Debug + Send + Sync {
  fn module_created(&self, _module: &mut Module) -> Result<(), MultiTargetError> {
    Ok(())
  }

  fn dependency_added(
    &self,
    _owner: &Module,
    _dependency: &mut Dependency,
  ) -> Result<(), MultiTargetError> {
    Ok(())
  }

  fn block_added(&self, _owner: &Module, _block: &mut AsyncBlock) -> Result<(), MultiTargetError> {
    Ok(())
  }
}

pub type GraphObserverRef = Arc<dyn GraphObserver>;

#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum ModuleGraphNode {
  Root,
  Module(Module),
  Dependency(Dependency),
}

/// Module graph built by the host
///
/// Modules point at the dependencies they own, dependencies point at the module they resolved to.
/// Entry dependencies hang off the root node.
#[derive(Clone, Debug)]
pub struct ModuleGraph {
  pub graph: StableDiGraph<NodeId, ()>,
  nodes: Vec<ModuleGraphNode>,
  blocks: Vec<AsyncBlock>,
  content_key_to_node_id: HashMap<String, NodeId>,
  node_id_to_node_index: HashMap<NodeId, NodeIndex>,
  root_node_id: NodeId,
  observers: Vec<GraphObserverRef>,
}

impl Default for ModuleGraph {
  fn default() -> Self {
    Self::new()
  }
}

impl ModuleGraph {
  pub fn new() -> Self {
    let mut graph = StableDiGraph::new();
    let mut node_id_to_node_index = HashMap::new();
    let root_node_id = 0;

    node_id_to_node_index.insert(root_node_id, graph.add_node(root_node_id));

    ModuleGraph {
      graph,
      nodes: vec![ModuleGraphNode::Root],
      blocks: Vec::new(),
      content_key_to_node_id: HashMap::new(),
      node_id_to_node_index,
      root_node_id,
      observers: Vec::new(),
    }
  }

  pub fn add_observer(&mut self, observer: GraphObserverRef) {
    self.observers.push(observer);
  }

  pub fn root_node(&self) -> NodeId {
    self.root_node_id
  }

  pub fn nodes(&self) -> impl Iterator<Item = &ModuleGraphNode> {
    self.nodes.iter()
  }

  pub fn get_node(&self, idx: &NodeId) -> Option<&ModuleGraphNode> {
    self.nodes.get(*idx)
  }

  fn push_node(&mut self, node: ModuleGraphNode) -> NodeId {
    let node_id = self.nodes.len();
    self.nodes.push(node);

    let node_index = self.graph.add_node(node_id);
    self.node_id_to_node_index.insert(node_id, node_index);

    node_id
  }

  /// Adds a module, notifying observers first
  ///
  /// Modules are deduplicated by identifier; adding a known module returns the existing node.
  pub fn add_module(&mut self, mut module: Module) -> Result<ModuleId, MultiTargetError> {
    if let Some(existing) = self.content_key_to_node_id.get(&module.identifier) {
      return Ok(*existing);
    }

    for observer in &self.observers {
      observer.module_created(&mut module)?;
    }

    let content_key = module.identifier.clone();
    let node_id = self.push_node(ModuleGraphNode::Module(module));
    self.content_key_to_node_id.insert(content_key, node_id);

    Ok(node_id)
  }

  pub fn get_module(&self, idx: &ModuleId) -> Option<&Module> {
    let ModuleGraphNode::Module(module) = self.get_node(idx)? else {
      return None;
    };
    Some(module)
  }

  pub fn get_module_mut(&mut self, idx: &ModuleId) -> Option<&mut Module> {
    let ModuleGraphNode::Module(module) = self.nodes.get_mut(*idx)? else {
      return None;
    };
    Some(module)
  }

  /// The module added with `identifier`
  pub fn get_module_id(&self, identifier: &str) -> Option<ModuleId> {
    self.content_key_to_node_id.get(identifier).copied()
  }

  pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
    self
      .nodes
      .iter()
      .enumerate()
      .filter_map(|(node_id, node)| match node {
        ModuleGraphNode::Module(module) => Some((node_id, module)),
        _ => None,
      })
  }

  /// Adds an entry dependency below the root node
  pub fn add_entry_dependency(&mut self, dependency: Dependency) -> DependencyId {
    let dependency_id = self.push_node(ModuleGraphNode::Dependency(dependency));
    let root_node_id = self.root_node_id;
    self.add_edge(&root_node_id, &dependency_id);
    dependency_id
  }

  /// Adds a dependency owned by `owner`, notifying observers first
  pub fn add_dependency(
    &mut self,
    owner: &ModuleId,
    mut dependency: Dependency,
  ) -> Result<DependencyId, MultiTargetError> {
    if let Some(owner_module) = self.get_module(owner) {
      for observer in &self.observers {
        observer.dependency_added(owner_module, &mut dependency)?;
      }
    }

    let dependency_id = self.push_node(ModuleGraphNode::Dependency(dependency));
    self.add_edge(owner, &dependency_id);

    Ok(dependency_id)
  }

  /// Adds an async block owned by `owner`, notifying observers first
  pub fn add_block(
    &mut self,
    owner: &ModuleId,
    mut block: AsyncBlock,
  ) -> Result<BlockId, MultiTargetError> {
    if let Some(owner_module) = self.get_module(owner) {
      for observer in &self.observers {
        observer.block_added(owner_module, &mut block)?;
      }
    }

    self.blocks.push(block);
    Ok(self.blocks.len() - 1)
  }

  pub fn get_block(&self, idx: &BlockId) -> Option<&AsyncBlock> {
    self.blocks.get(*idx)
  }

  pub fn get_block_mut(&mut self, idx: &BlockId) -> Option<&mut AsyncBlock> {
    self.blocks.get_mut(*idx)
  }

  pub fn get_dependency(&self, idx: &DependencyId) -> Option<&Dependency> {
    let ModuleGraphNode::Dependency(dependency) = self.get_node(idx)? else {
      return None;
    };
    Some(dependency)
  }

  pub fn get_dependency_mut(&mut self, idx: &DependencyId) -> Option<&mut Dependency> {
    let ModuleGraphNode::Dependency(dependency) = self.nodes.get_mut(*idx)? else {
      return None;
    };
    Some(dependency)
  }

  /// The async block a dependency belongs to
  pub fn get_parent_block(&self, dependency_id: &DependencyId) -> Option<BlockId> {
    self.get_dependency(dependency_id)?.block
  }

  /// Connects a dependency to the module it resolved to
  pub fn resolve_dependency(&mut self, dependency_id: &DependencyId, module_id: &ModuleId) {
    self.add_edge(dependency_id, module_id);
  }

  pub fn add_edge(&mut self, from_idx: &NodeId, to_idx: &NodeId) {
    self.graph.add_edge(
      self.node_id_to_node_index[from_idx],
      self.node_id_to_node_index[to_idx],
      (),
    );
  }

  fn neighbors(&self, idx: &NodeId, direction: Direction) -> Vec<NodeId> {
    let Some(node_index) = self.node_id_to_node_index.get(idx) else {
      return Vec::new();
    };

    let mut neighbors = self
      .graph
      .neighbors_directed(*node_index, direction)
      .filter_map(|node_index| self.graph.node_weight(node_index).copied())
      .collect::<Vec<_>>();

    // petgraph yields neighbors newest first
    neighbors.sort_unstable();
    neighbors
  }

  /// Dependencies that resolved to the module, in insertion order
  pub fn get_incoming_dependencies(&self, module_id: &ModuleId) -> Vec<DependencyId> {
    self
      .neighbors(module_id, Direction::Incoming)
      .into_iter()
      .filter(|node_id| self.get_dependency(node_id).is_some())
      .collect()
  }

  /// Dependencies owned by the module, in insertion order
  pub fn get_outgoing_dependencies(&self, module_id: &ModuleId) -> Vec<DependencyId> {
    self
      .neighbors(module_id, Direction::Outgoing)
      .into_iter()
      .filter(|node_id| self.get_dependency(node_id).is_some())
      .collect()
  }

  /// The module that owns a dependency. Entry dependencies have none.
  pub fn get_parent_module(&self, dependency_id: &DependencyId) -> Option<ModuleId> {
    self
      .neighbors(dependency_id, Direction::Incoming)
      .into_iter()
      .find(|node_id| self.get_module(node_id).is_some())
  }

  /// The module a dependency resolved to
  pub fn get_resolved_module(&self, dependency_id: &DependencyId) -> Option<ModuleId> {
    self
      .neighbors(dependency_id, Direction::Outgoing)
      .into_iter()
      .find(|node_id| self.get_module(node_id).is_some())
  }
}
