pub mod config;
pub mod discover;
pub mod error;
pub mod external;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod workspace;

pub use crate::config::{Config, ConfigError, Tool};
pub use crate::error::{ReconError, Result};
pub use crate::workspace::RunContext;
