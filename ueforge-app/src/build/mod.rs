//! UE5 Build System Module
//!
//! Build orchestration for Unreal Engine projects:
//! - Project descriptor discovery
//! - Engine resolution (environment, install registry, default path)
//! - Artifact cleanup of the project and its plugins
//! - Streaming execution of UBT / RunUAT with merged output
//! - Compile and package pipelines

mod clean;
mod engine;
mod error;
mod pipeline;
mod project;
mod runner;
mod types;

pub use clean::{
    ArtifactCleaner,
    CleanReport,
    CleanerFs,
    RealFs,
};

pub use engine::{
    default_install_root,
    get_automation_script,
    get_build_script,
    get_build_tool,
    get_current_platform,
    get_editor_cmd_executable,
    get_engine_version,
    platform_registry,
    EngineInstallation,
    EngineResolver,
    InstallRegistry,
    LauncherManifest,
    RegistryEntry,
    ENGINE_PATH_ENV,
};

pub use error::BuildError;

pub use pipeline::{
    compile_command,
    compile_pipeline,
    package_command,
    package_pipeline,
    project_files_command,
    BuildOrchestrator,
    CompileOptions,
    Opener,
    PackageOptions,
    Pipeline,
    PipelineContext,
    Step,
    StepKind,
    SystemOpener,
    ToolRequirement,
    DEFAULT_EDITOR_IO_PORT,
};

pub use project::{find_uproject_files, ProjectDescriptor};

pub use runner::{CommandRunner, CommandSpec, ProcessStreamer};

pub use types::{
    BuildConfig,
    EngineSource,
    InstalledEngine,
    PipelineResult,
    ResolvedEngine,
    StepPolicy,
};
