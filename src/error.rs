use std::path::PathBuf;
use std::process::ExitStatus;

use crate::config::ConfigError;

/// Errors raised while running a pipeline.
///
/// Whether an error ends the run is decided by the caller: configuration errors always do,
/// process errors never do, I/O errors only for the canonical merged list and the sorted
/// probe list.
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("failed to launch {tool} ({program}): {source}")]
    ProcessLaunch {
        tool: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited unsuccessfully: {status}")]
    ProcessExit { tool: String, status: ExitStatus },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("certificate transparency query to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("interrupted by operator")]
    Interrupted,
}

impl ReconError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReconError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
