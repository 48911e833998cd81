//! bioclass-common — Shared errors, HTTP client scoping and run configuration
//! used across all bioclass crates.

pub mod error;
pub mod http;
pub mod run_config;

// Re-export commonly used types
pub use error::{BioclassError, Result};
pub use http::ScopedClient;
pub use run_config::{ChemblConfig, OutputConfig, QueryConfig, RunConfig};
