//! Compile and package pipelines
//!
//! A pipeline is an ordered list of steps built from a loaded project and
//! a resolved engine. Missing prerequisites (descriptor, engine version,
//! tool files) always stop it. A streamed step that runs but fails stops
//! it only when that step's policy is [`StepPolicy::Abort`].

use std::io;
use std::path::{Path, PathBuf};

use ueforge_core::log::LogChannel;
use ueforge_core::status::{STATUS_ERROR, StatusCell};

use super::clean::ArtifactCleaner;
use super::engine::{EngineInstallation, EngineResolver};
use super::error::BuildError;
use super::project::ProjectDescriptor;
use super::runner::{CommandRunner, CommandSpec};
use super::types::{BuildConfig, PipelineResult, StepPolicy};

pub const DEFAULT_EDITOR_IO_PORT: u16 = 52904;

pub const COMPILE_STATUS: &str = "Compiling Editor...";
pub const PACKAGE_STATUS: &str = "Starting Build UAT...";

/// Opens files with the desktop's associated application
pub trait Opener: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<()>;
}

pub struct SystemOpener;

impl Opener for SystemOpener {
    fn open(&self, path: &Path) -> io::Result<()> {
        open::that(path)
    }
}

/// A file that must exist before a pipeline or step may run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    pub tool: &'static str,
    pub path: PathBuf,
}

impl ToolRequirement {
    pub fn new(tool: &'static str, path: &Path) -> Self {
        Self {
            tool,
            path: path.to_path_buf(),
        }
    }

    fn check(&self) -> Result<(), BuildError> {
        EngineInstallation::require(self.tool, &self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Best-effort artifact removal; never fails the pipeline
    Clean { root: PathBuf, project_name: String },
    /// One external command streamed into the log
    Stream {
        requires: ToolRequirement,
        command: CommandSpec,
        start_label: String,
        finish_label: String,
    },
    /// Open a file in its associated application if it exists
    Open { path: PathBuf, description: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Banner logged before the step runs
    pub heading: Option<String>,
    pub kind: StepKind,
    pub policy: StepPolicy,
}

impl Step {
    fn new(kind: StepKind) -> Self {
        Self {
            heading: None,
            kind,
            policy: StepPolicy::Continue,
        }
    }

    fn heading(mut self, heading: &str) -> Self {
        self.heading = Some(heading.to_string());
        self
    }

    fn policy(mut self, policy: StepPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Shared handles a pipeline reports through
pub struct PipelineContext<'a> {
    pub log: &'a LogChannel,
    pub status: &'a StatusCell,
    pub runner: &'a dyn CommandRunner,
    pub opener: &'a dyn Opener,
}

impl PipelineContext<'_> {
    fn fail(&self, err: &BuildError) -> PipelineResult {
        tracing::warn!("pipeline stopped: {}", err);
        self.log.enqueue(err.to_string());
        self.status.set(STATUS_ERROR);
        PipelineResult::Message(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub name: &'static str,
    /// Checked before any step runs
    pub prerequisites: Vec<ToolRequirement>,
    pub steps: Vec<Step>,
    /// Logged after the last step when nothing failed
    pub success_message: Option<String>,
}

impl Pipeline {
    /// Run every step in order.
    ///
    /// The result is the last failure seen, or `Success`. The status cell
    /// ends up holding that result's label.
    pub fn run(&self, ctx: &PipelineContext<'_>) -> PipelineResult {
        for requirement in &self.prerequisites {
            if let Err(err) = requirement.check() {
                return ctx.fail(&err);
            }
        }

        let mut outcome = PipelineResult::Success;
        for step in &self.steps {
            if let Some(heading) = &step.heading {
                ctx.log.enqueue(format!("\n=== {} ===", heading));
            }

            match &step.kind {
                StepKind::Clean { root, project_name } => {
                    ArtifactCleaner::new(ctx.log.clone()).clean(root, project_name);
                }
                StepKind::Stream {
                    requires,
                    command,
                    start_label,
                    finish_label,
                } => {
                    if let Err(err) = requires.check() {
                        return ctx.fail(&err);
                    }
                    ctx.log.enqueue(format!("Executing: {}", command));
                    let result = ctx.runner.run(command, start_label, finish_label);
                    if !result.is_success() {
                        tracing::info!("{} step '{}' failed: {}", self.name, start_label, result);
                        if step.policy == StepPolicy::Abort {
                            ctx.status.set(result.status_label());
                            return result;
                        }
                        outcome = result;
                    }
                }
                StepKind::Open { path, description } => {
                    if path.is_file() {
                        ctx.log.enqueue(format!("Opening {}...", description));
                        if let Err(e) = ctx.opener.open(path) {
                            ctx.log
                                .enqueue(format!("Failed to open {}: {}", path.display(), e));
                        }
                    } else {
                        ctx.log.enqueue(format!("{} not found to open.", description));
                    }
                }
            }
        }

        match (&outcome, &self.success_message) {
            (PipelineResult::Success, Some(message)) => ctx.log.enqueue(message.clone()),
            (PipelineResult::Success, None) => {}
            (failure, _) => ctx
                .log
                .enqueue(format!("{} finished with errors ({}).", self.name, failure)),
        }
        ctx.status.set(outcome.status_label());
        outcome
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub configuration: BuildConfig,
    pub platform: String,
    pub open_solution: bool,
    pub open_project: bool,
    /// Applied to both streamed steps
    pub policy: StepPolicy,
}

#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub output_dir: PathBuf,
    pub configuration: BuildConfig,
    pub platform: String,
    pub editor_io_port: u16,
}

/// `dotnet UnrealBuildTool.dll <Target> <Platform> <Config> -Project=... -Rebuild`
pub fn compile_command(
    project: &ProjectDescriptor,
    engine: &EngineInstallation,
    configuration: BuildConfig,
    platform: &str,
) -> CommandSpec {
    CommandSpec::new("dotnet")
        .arg(&engine.build_tool)
        .arg(project.editor_target())
        .arg(platform)
        .arg(configuration.as_str())
        .arg(format!("-Project={}", project.path.display()))
        .args(["-WaitMutex", "-FromMsBuild", "-Rebuild"])
        .current_dir(project.project_dir())
}

/// Build script in `-projectfiles` mode; writes the solution next to the project
pub fn project_files_command(project: &ProjectDescriptor, engine: &EngineInstallation) -> CommandSpec {
    CommandSpec::new(&engine.project_files_script)
        .arg("-projectfiles")
        .arg(format!("-project={}", project.path.display()))
        .args(["-game", "-rocket"])
        .current_dir(project.project_dir())
}

/// RunUAT Turnkey SDK check followed by BuildCookRun
pub fn package_command(
    project: &ProjectDescriptor,
    engine: &EngineInstallation,
    opts: &PackageOptions,
) -> CommandSpec {
    // UAT changes directory before archiving
    let archive_dir = project.project_dir().join(&opts.output_dir);
    let uproject = project.path.display();
    CommandSpec::new(&engine.automation_script)
        .arg(format!("-ScriptsForProject={}", uproject))
        .args(["Turnkey", "-command=VerifySdk"])
        .arg(format!("-platform={}", opts.platform))
        .args(["-UpdateIfNeeded", "-EditorIO"])
        .arg(format!("-EditorIOPort={}", opts.editor_io_port))
        .arg(format!("-project={}", uproject))
        .args([
            "BuildCookRun",
            "-nop4",
            "-utf8output",
            "-nocompileeditor",
            "-skipbuildeditor",
            "-cook",
        ])
        .arg(format!("-project={}", uproject))
        .arg(format!("-target={}", project.game_target()))
        .arg(format!("-unrealexe={}", engine.editor_cmd.display()))
        .arg(format!("-platform={}", opts.platform))
        .args([
            "-installed",
            "-stage",
            "-archive",
            "-package",
            "-build",
            "-pak",
            "-compressed",
            "-prereqs",
        ])
        .arg(format!("-archivedirectory={}", archive_dir.display()))
        .arg(format!("-clientconfig={}", opts.configuration))
        .args(["-nocompile", "-nocompileuat"])
        .current_dir(project.project_dir())
}

/// Clean, regenerate project files, rebuild the editor target, then
/// optionally open the results
pub fn compile_pipeline(
    project: &ProjectDescriptor,
    engine: &EngineInstallation,
    opts: &CompileOptions,
) -> Pipeline {
    let build_tool = ToolRequirement::new("UnrealBuildTool", &engine.build_tool);

    let mut steps = vec![
        Step::new(StepKind::Clean {
            root: project.project_dir().to_path_buf(),
            project_name: project.name.clone(),
        })
        .heading("Cleaning project files for rebuild"),
        Step::new(StepKind::Stream {
            requires: ToolRequirement::new("Build script", &engine.project_files_script),
            command: project_files_command(project, engine),
            start_label: "Recreating SLN".to_string(),
            finish_label: "SLN file recreated successfully".to_string(),
        })
        .heading("Recreating SLN file")
        .policy(opts.policy),
        Step::new(StepKind::Stream {
            requires: build_tool.clone(),
            command: compile_command(project, engine, opts.configuration, &opts.platform),
            start_label: "Compiling project".to_string(),
            finish_label: "Project compiled successfully".to_string(),
        })
        .heading("Compiling the project")
        .policy(opts.policy),
    ];

    if opts.open_solution {
        steps.push(Step::new(StepKind::Open {
            path: project.solution_path(),
            description: "SLN file".to_string(),
        }));
    }
    if opts.open_project {
        steps.push(Step::new(StepKind::Open {
            path: project.path.clone(),
            description: ".uproject file".to_string(),
        }));
    }

    Pipeline {
        name: "Compile",
        prerequisites: vec![build_tool],
        steps,
        success_message: Some("Project files compiled successfully.".to_string()),
    }
}

/// One BuildCookRun invocation; no cleaning or project file generation
pub fn package_pipeline(
    project: &ProjectDescriptor,
    engine: &EngineInstallation,
    opts: &PackageOptions,
) -> Pipeline {
    let automation = ToolRequirement::new("RunUAT script", &engine.automation_script);
    Pipeline {
        name: "Package",
        prerequisites: vec![automation.clone()],
        steps: vec![
            Step::new(StepKind::Stream {
                requires: automation,
                command: package_command(project, engine, opts),
                start_label: PACKAGE_STATUS.to_string(),
                finish_label: "UAT Build completed successfully!".to_string(),
            })
            .heading("Packaging with UAT")
            .policy(StepPolicy::Abort),
        ],
        success_message: None,
    }
}

/// Runs the compile and package pipelines for the project in a directory.
///
/// Each call loads the descriptor and resolves the engine afresh.
pub struct BuildOrchestrator<'a> {
    pub log: LogChannel,
    pub status: StatusCell,
    pub resolver: &'a EngineResolver,
    pub runner: &'a dyn CommandRunner,
    pub opener: &'a dyn Opener,
}

impl BuildOrchestrator<'_> {
    fn context(&self) -> PipelineContext<'_> {
        PipelineContext {
            log: &self.log,
            status: &self.status,
            runner: self.runner,
            opener: self.opener,
        }
    }

    /// Locate the descriptor and resolve its engine
    pub fn prepare(
        &self,
        project_dir: &Path,
    ) -> Result<(ProjectDescriptor, EngineInstallation), BuildError> {
        let project = ProjectDescriptor::locate(project_dir, &self.log)?;
        self.log.enqueue(format!(
            "Unreal Engine version set in project: {}",
            project.engine_version
        ));
        let resolved = self.resolver.resolve(&project.engine_version, &self.log);
        Ok((project, EngineInstallation::new(resolved)))
    }

    pub fn compile(&self, project_dir: &Path, opts: &CompileOptions) -> PipelineResult {
        self.status.set(COMPILE_STATUS);
        let (project, engine) = match self.prepare(project_dir) {
            Ok(prepared) => prepared,
            Err(err) => return self.context().fail(&err),
        };
        self.log
            .enqueue(format!("Target to compile: {}", project.editor_target()));

        compile_pipeline(&project, &engine, opts).run(&self.context())
    }

    pub fn package(&self, project_dir: &Path, opts: &PackageOptions) -> PipelineResult {
        self.status.set(PACKAGE_STATUS);
        let (project, engine) = match self.prepare(project_dir) {
            Ok(prepared) => prepared,
            Err(err) => return self.context().fail(&err),
        };
        self.log
            .enqueue(format!("Target to be built: {}", project.game_target()));

        package_pipeline(&project, &engine, opts).run(&self.context())
    }
}
