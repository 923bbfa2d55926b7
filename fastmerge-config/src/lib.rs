//! Configuration loading for fastmerge.
//!
//! Settings are layered: an optional settings file, then `FASTMERGE_`-prefixed environment
//! variables. Command-line flags are applied on top by the binary.

mod load;
pub mod shared;

pub use load::{Config, LoadConfigError, load_config};
