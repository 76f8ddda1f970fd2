pub use self::chunk::*;
pub use self::dependency::*;
pub use self::module::*;
pub use self::target_profile::*;

mod chunk;
mod dependency;
mod module;
mod target_profile;
