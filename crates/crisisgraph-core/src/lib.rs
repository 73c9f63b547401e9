//! crisisgraph core - types, configuration, and error handling

pub mod config;
pub mod error;
pub mod types;

pub use config::CrisisConfig;
pub use error::{Error, Result};
pub use types::*;
