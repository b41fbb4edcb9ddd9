//! Terminal front end
//!
//! Each pipeline runs on its own worker thread. The main thread is the
//! log consumer: every tick it drains the channel, renders the lines with
//! their colours and reports status changes.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use ueforge_core::ansi::{parse_ansi, strip_ansi};
use ueforge_core::log::{DRAIN_INTERVAL_MS, LogChannel};
use ueforge_core::status::StatusCell;

use crate::build::{
    ArtifactCleaner, BuildConfig, BuildOrchestrator, CompileOptions, EngineInstallation,
    EngineResolver, PackageOptions, PipelineResult, ProcessStreamer, ProjectDescriptor,
    StepPolicy, SystemOpener,
};
use crate::config::Settings;
use crate::logging;

#[derive(Parser)]
#[command(name = "ueforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean, compile and package Unreal Engine projects", long_about = None)]
struct Cli {
    /// Directory containing the .uproject file (default: current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Enable verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Strip colours from build output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the project, regenerate project files and rebuild the editor target
    Compile {
        /// Open the generated .sln afterwards
        #[arg(long)]
        open_sln: bool,

        /// Open the .uproject afterwards
        #[arg(long)]
        open_project: bool,

        /// Build configuration (default from settings: Development)
        #[arg(short, long)]
        configuration: Option<BuildConfig>,

        /// Stop at the first failing step instead of continuing
        #[arg(long)]
        abort_on_failure: bool,
    },

    /// Cook, stage and package the project with RunUAT BuildCookRun
    Package {
        /// Archive directory (default: <project>/BuildOutput)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Client configuration (default from settings: Shipping)
        #[arg(short, long)]
        configuration: Option<BuildConfig>,
    },

    /// Remove build and IDE artifacts from the project and its plugins
    Clean,

    /// List installed engines
    Engines,

    /// Show which engine the project resolves to
    Resolve,
}

pub fn launch() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot read current directory")?,
    };
    let settings = Settings::load(&project_dir)
        .with_context(|| format!("failed to load settings for {}", project_dir.display()))?;

    let log = LogChannel::new();
    let status = StatusCell::new();
    let mut renderer = Renderer::new(io::stdout(), !cli.no_color);

    let result = match cli.command {
        Commands::Compile {
            open_sln,
            open_project,
            configuration,
            abort_on_failure,
        } => {
            let opts = CompileOptions {
                configuration: configuration.unwrap_or(settings.compile_configuration),
                platform: settings.platform.clone(),
                open_solution: open_sln,
                open_project,
                policy: if abort_on_failure {
                    StepPolicy::Abort
                } else {
                    settings.step_policy
                },
            };
            let (worker_log, worker_status) = (log.clone(), status.clone());
            let install_root = settings.install_root.clone();
            let job = move || {
                let resolver = EngineResolver::from_env(install_root);
                let streamer = ProcessStreamer::new(worker_log.clone(), worker_status.clone());
                BuildOrchestrator {
                    log: worker_log,
                    status: worker_status,
                    resolver: &resolver,
                    runner: &streamer,
                    opener: &SystemOpener,
                }
                .compile(&project_dir, &opts)
            };
            run_in_worker(&log, &status, &mut renderer, job)?
        }
        Commands::Package {
            output,
            configuration,
        } => {
            let output_dir = match output {
                Some(dir) => std::path::absolute(&dir)
                    .with_context(|| format!("cannot resolve output directory {}", dir.display()))?,
                None => settings.output_dir_for(&project_dir),
            };
            let opts = PackageOptions {
                output_dir,
                configuration: configuration.unwrap_or(settings.package_configuration),
                platform: settings.platform.clone(),
                editor_io_port: settings.editor_io_port,
            };
            let (worker_log, worker_status) = (log.clone(), status.clone());
            let install_root = settings.install_root.clone();
            let job = move || {
                let resolver = EngineResolver::from_env(install_root);
                let streamer = ProcessStreamer::new(worker_log.clone(), worker_status.clone());
                BuildOrchestrator {
                    log: worker_log,
                    status: worker_status,
                    resolver: &resolver,
                    runner: &streamer,
                    opener: &SystemOpener,
                }
                .package(&project_dir, &opts)
            };
            run_in_worker(&log, &status, &mut renderer, job)?
        }
        Commands::Clean => clean(&project_dir, &log, &mut renderer)?,
        Commands::Engines => list_engines(&settings, &mut renderer)?,
        Commands::Resolve => resolve(&project_dir, &settings, &log, &mut renderer)?,
    };

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Run `job` on a worker thread while rendering its log on this one
fn run_in_worker<W, F>(
    log: &LogChannel,
    status: &StatusCell,
    renderer: &mut Renderer<W>,
    job: F,
) -> Result<PipelineResult>
where
    W: Write,
    F: FnOnce() -> PipelineResult + Send + 'static,
{
    let worker = thread::Builder::new()
        .name("ueforge-build".to_string())
        .spawn(job)
        .context("failed to start build worker")?;

    let mut shown_status = status.get();
    loop {
        // checked before draining so the last lines are never left behind
        let finished = worker.is_finished();
        for line in log.drain_all() {
            renderer.line(&line)?;
        }
        let current = status.get();
        if current != shown_status {
            renderer.status(&current)?;
            shown_status = current;
        }
        if finished {
            break;
        }
        thread::sleep(Duration::from_millis(DRAIN_INTERVAL_MS));
    }

    worker.join().map_err(|_| anyhow!("build worker panicked"))
}

fn clean<W: Write>(
    project_dir: &Path,
    log: &LogChannel,
    renderer: &mut Renderer<W>,
) -> Result<PipelineResult> {
    let result = match ProjectDescriptor::locate(project_dir, log) {
        Ok(project) => {
            let report = ArtifactCleaner::new(log.clone()).clean(project.project_dir(), &project.name);
            log.enqueue(format!(
                "{} removed, {} failed",
                report.removed.len(),
                report.failed.len()
            ));
            PipelineResult::Success
        }
        Err(err) => {
            log.enqueue(err.to_string());
            PipelineResult::Message(err.to_string())
        }
    };
    renderer.flush_log(log)?;
    Ok(result)
}

fn list_engines<W: Write>(settings: &Settings, renderer: &mut Renderer<W>) -> Result<PipelineResult> {
    let resolver = EngineResolver::from_env(settings.install_root.clone());
    let engines = resolver.list_installed_engines();
    if engines.is_empty() {
        renderer.line("No installed engines found.")?;
    }
    for engine in engines {
        let marker = if engine.is_default { "*" } else { " " };
        renderer.line(&format!(
            "{} {:<20} {:<8} {}",
            marker,
            engine.display_name,
            engine.id,
            engine.path.display()
        ))?;
    }
    Ok(PipelineResult::Success)
}

fn resolve<W: Write>(
    project_dir: &Path,
    settings: &Settings,
    log: &LogChannel,
    renderer: &mut Renderer<W>,
) -> Result<PipelineResult> {
    let project = match ProjectDescriptor::locate(project_dir, log) {
        Ok(project) => project,
        Err(err) => {
            log.enqueue(err.to_string());
            renderer.flush_log(log)?;
            return Ok(PipelineResult::Message(err.to_string()));
        }
    };
    let resolver = EngineResolver::from_env(settings.install_root.clone());
    let engine = EngineInstallation::new(resolver.resolve(&project.engine_version, log));
    renderer.flush_log(log)?;

    let mut all_present = true;
    for (tool, path) in [
        ("UnrealBuildTool", &engine.build_tool),
        ("Build script", &engine.project_files_script),
        ("RunUAT script", &engine.automation_script),
        ("UnrealEditor-Cmd", &engine.editor_cmd),
    ] {
        let present = path.exists();
        all_present &= present;
        let mark = if present { "ok" } else { "missing" };
        renderer.line(&format!("{:<18} {:<8} {}", tool, mark, path.display()))?;
    }

    Ok(if all_present {
        PipelineResult::Success
    } else {
        PipelineResult::Message(format!("engine at {} is incomplete", engine.root.display()))
    })
}

/// Writes log lines, keeping or stripping their colours
struct Renderer<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> Renderer<W> {
    fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    fn line(&mut self, line: &str) -> io::Result<()> {
        if !self.color {
            writeln!(self.out, "{}", strip_ansi(line))?;
            return self.out.flush();
        }
        for segment in parse_ansi(line) {
            match segment.color {
                Some(color) => write!(self.out, "\x1b[{}m{}\x1b[0m", color.sgr_code(), segment.text)?,
                None => write!(self.out, "{}", segment.text)?,
            }
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    fn status(&mut self, status: &str) -> io::Result<()> {
        self.line(&format!("[{}]", status))
    }

    fn flush_log(&mut self, log: &LogChannel) -> io::Result<()> {
        for line in log.drain_all() {
            self.line(&line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(color: bool, lines: &[&str]) -> String {
        let mut renderer = Renderer::new(Vec::new(), color);
        for line in lines {
            renderer.line(line).unwrap();
        }
        String::from_utf8(renderer.out).unwrap()
    }

    #[test]
    fn test_renderer_keeps_base_colours_only() {
        let out = render(true, &["\x1b[1;31merror\x1b[0m C2065"]);
        assert_eq!(out, "\x1b[31merror\x1b[0m C2065\n");
    }

    #[test]
    fn test_renderer_strips_colours() {
        let out = render(false, &["\x1b[33mwarning\x1b[0m: unused", "plain"]);
        assert_eq!(out, "warning: unused\nplain\n");
    }

    #[test]
    fn test_worker_output_is_fully_drained() {
        let log = LogChannel::new();
        let status = StatusCell::new();
        let mut renderer = Renderer::new(Vec::new(), false);

        let (worker_log, worker_status) = (log.clone(), status.clone());
        let result = run_in_worker(&log, &status, &mut renderer, move || {
            worker_status.set("Compiling project");
            for i in 0..3 {
                worker_log.enqueue(format!("line {}", i));
            }
            worker_status.set("Done");
            PipelineResult::Success
        })
        .unwrap();

        assert!(result.is_success());
        let out = String::from_utf8(renderer.out).unwrap();
        let lines: Vec<&str> = out.lines().filter(|l| l.starts_with("line")).collect();
        assert_eq!(lines, vec!["line 0", "line 1", "line 2"]);
        assert!(out.lines().any(|l| l == "[Done]"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_cli_parses_package_flags() {
        let cli = Cli::try_parse_from([
            "ueforge",
            "--no-color",
            "package",
            "--output",
            "/tmp/out",
            "-c",
            "debuggame",
        ])
        .unwrap();
        assert!(cli.no_color);
        match cli.command {
            Commands::Package {
                output,
                configuration,
            } => {
                assert_eq!(output, Some(PathBuf::from("/tmp/out")));
                assert_eq!(configuration, Some(BuildConfig::DebugGame));
            }
            _ => panic!("expected package command"),
        }
    }
}
