//! `.uproject` discovery and loading

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use ueforge_core::log::LogChannel;

use super::error::BuildError;

/// .uproject file structure (partial - we only need the engine association)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UprojectFile {
    #[serde(default)]
    engine_association: Option<String>,
}

/// A loaded project descriptor. Built fresh for every pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    /// File stem of the descriptor, e.g. "ShooterGame"
    pub name: String,
    /// Absolute path to the .uproject file
    pub path: PathBuf,
    /// Value of `EngineAssociation`, never empty
    pub engine_version: String,
}

impl ProjectDescriptor {
    /// Find the descriptor in `dir` and load it.
    ///
    /// With several candidates the lexicographically first wins and a
    /// warning goes to the log.
    pub fn locate(dir: &Path, log: &LogChannel) -> Result<Self, BuildError> {
        let candidates = find_uproject_files(dir)?;
        let Some(first) = candidates.first() else {
            return Err(BuildError::MissingDescriptor {
                dir: dir.to_path_buf(),
            });
        };
        if candidates.len() > 1 {
            tracing::warn!("multiple descriptors in {}: {:?}", dir.display(), candidates);
            log.enqueue("More than one .uproject file found. Selecting the first one.");
        }

        let path = std::path::absolute(first).map_err(|e| BuildError::io(first, e))?;
        log.enqueue(format!(".uproject file found: {}", path.display()));
        Self::load(&path)
    }

    /// Load a descriptor from an explicit path
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let content = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        let file: UprojectFile =
            serde_json::from_str(content.trim_start_matches('\u{feff}')).map_err(|source| BuildError::InvalidDescriptor {
                path: path.to_path_buf(),
                source,
            })?;

        let engine_version = file
            .engine_association
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BuildError::MissingEngineVersion {
                path: path.to_path_buf(),
            })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            name,
            path: path.to_path_buf(),
            engine_version,
        })
    }

    /// Directory holding the descriptor; the root for cleanup and outputs
    pub fn project_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Target compiled by the editor build
    pub fn editor_target(&self) -> String {
        format!("{}Editor", self.name)
    }

    /// Target cooked and packaged by UAT
    pub fn game_target(&self) -> &str {
        &self.name
    }

    /// Visual Studio solution generated next to the descriptor
    pub fn solution_path(&self) -> PathBuf {
        self.project_dir().join(format!("{}.sln", self.name))
    }
}

/// Every `*.uproject` file directly inside `dir`, sorted by file name
pub fn find_uproject_files(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let entries = fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))?;

    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "uproject"))
        .collect();
    found.sort();
    Ok(found)
}
