pub mod chunk_graph;
pub mod diagnostic;
pub mod error;
pub mod module_graph;
pub mod types;
