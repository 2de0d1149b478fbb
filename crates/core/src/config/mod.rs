//! Pipeline configuration.
//!
//! All paths and tool locations the stages need are carried by an explicit
//! [`PipelineConfig`] passed into every component; nothing reads globals or
//! assumes a working directory.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::{PipelineConfig, ToolPaths};
