use std::path::PathBuf;

use thiserror::Error;

/// Conditions that stop a pipeline before (or instead of) running a tool
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No .uproject file found in {}.", .dir.display())]
    MissingDescriptor { dir: PathBuf },

    #[error("'EngineAssociation' key not found in {}.", .path.display())]
    MissingEngineVersion { path: PathBuf },

    #[error("Failed to parse {}: {source}", .path.display())]
    InvalidDescriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{tool} not found at: {}", .path.display())]
    ToolNotFound { tool: &'static str, path: PathBuf },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}
