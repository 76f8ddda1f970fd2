pub use atlaspack_multi_target_core as core;
pub use multi_target::*;

pub mod asset_normalizer;
pub mod chunk_namer;
pub mod context;
pub mod entry_expander;
pub mod exclusion;
pub mod options;
pub mod output_reconciler;
pub mod propagator;
pub mod registry;
pub mod resolve_data;
pub mod tagger;

mod multi_target;

#[cfg(test)]
mod test_utils;
