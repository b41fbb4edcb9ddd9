//! Build system types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::EnumString;
use ueforge_core::status::{STATUS_DONE, STATUS_ERROR};

/// Build configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString)]
#[serde(try_from = "String")]
#[strum(ascii_case_insensitive)]
pub enum BuildConfig {
    Debug,
    DebugGame,
    #[default]
    Development,
    Test,
    Shipping,
}

impl BuildConfig {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildConfig::Debug => "Debug",
            BuildConfig::DebugGame => "DebugGame",
            BuildConfig::Development => "Development",
            BuildConfig::Test => "Test",
            BuildConfig::Shipping => "Shipping",
        }
    }
}

impl TryFrom<String> for BuildConfig {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a pipeline does when one of its streamed steps fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// Stop the pipeline and report the failure
    Abort,
    /// Report the failure and run the next step anyway
    #[default]
    Continue,
}

/// Outcome of a streamed step or of a whole pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
    Success,
    /// The process ran and exited with a non-zero code
    ExitCode(i32),
    /// Nothing useful ran: missing prerequisite, spawn failure, signal
    Message(String),
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineResult::Success => Some(0),
            PipelineResult::ExitCode(code) => Some(*code),
            PipelineResult::Message(_) => None,
        }
    }

    /// Label shown next to the log once this result is final
    pub fn status_label(&self) -> &'static str {
        if self.is_success() {
            STATUS_DONE
        } else {
            STATUS_ERROR
        }
    }
}

impl std::fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineResult::Success => write!(f, "success"),
            PipelineResult::ExitCode(code) => write!(f, "exit code {}", code),
            PipelineResult::Message(message) => write!(f, "{}", message),
        }
    }
}

/// Where a resolved engine root came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSource {
    /// `UNREAL_ENGINE_PATH`
    Environment,
    /// Windows registry or the launcher install manifest
    Registry,
    /// Synthesized from the install root; never checked for existence
    Default,
}

/// Engine root chosen for a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEngine {
    pub root: PathBuf,
    pub source: EngineSource,
}

/// Information about an installed Unreal Engine
#[derive(Debug, Clone)]
pub struct InstalledEngine {
    /// Unique identifier (version like "5.3" or GUID for source builds)
    pub id: String,
    /// Display name (e.g., "UE 5.3.2" or "UE 5.3 (Source)")
    pub display_name: String,
    /// Full path to engine root directory
    pub path: PathBuf,
    /// Engine version read from Build.version (e.g., "5.3.2")
    pub version: Option<String>,
    /// Is this a source build (vs Epic Games Launcher install)
    pub is_source_build: bool,
    /// Is this the default/recommended engine
    pub is_default: bool,
}
