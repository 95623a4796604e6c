//! Common utilities and types shared across deity crates.

pub mod config;
pub mod error;
pub mod hash;
pub mod table;

pub use config::DeityConfig;
pub use error::{Error, Result};
pub use hash::Digest;
pub use table::TableKind;
