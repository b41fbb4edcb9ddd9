//! Streamed execution of external build tools

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

use ueforge_core::log::LogChannel;
use ueforge_core::status::{STATUS_DONE, STATUS_ERROR, StatusCell};

use super::types::PipelineResult;

/// A command line to run, kept as data so pipelines can be inspected and
/// tested without spawning anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(part: &OsString) -> String {
    let part = part.to_string_lossy();
    if part.contains(' ') {
        format!("\"{}\"", part)
    } else {
        part.into_owned()
    }
}

/// Runs one streamed step
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion. Failures come back as the result,
    /// never as a panic or an `Err`.
    fn run(&self, command: &CommandSpec, start_label: &str, finish_label: &str) -> PipelineResult;
}

/// Spawns a process and forwards its merged output to the log line by line
pub struct ProcessStreamer {
    log: LogChannel,
    status: StatusCell,
}

impl ProcessStreamer {
    pub fn new(log: LogChannel, status: StatusCell) -> Self {
        Self { log, status }
    }

    fn fail(&self, message: String) -> PipelineResult {
        self.log.enqueue(format!("Error: {}", message));
        self.status.set(STATUS_ERROR);
        PipelineResult::Message(message)
    }
}

impl CommandRunner for ProcessStreamer {
    fn run(&self, command: &CommandSpec, start_label: &str, finish_label: &str) -> PipelineResult {
        let start_time = Instant::now();
        self.status.set(start_label);
        self.log.enqueue(start_label);

        let mut cmd = command.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!("spawning: {}", command);
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("failed to spawn {:?}: {}", command.program, e);
                return self.fail(format!("{}: {}", command.program.to_string_lossy(), e));
            }
        };

        // stdout and stderr land in the same log as lines arrive
        let readers: Vec<_> = [
            child.stdout.take().map(|out| forward_lines(out, self.log.clone())),
            child.stderr.take().map(|err| forward_lines(err, self.log.clone())),
        ]
        .into_iter()
        .flatten()
        .collect();

        for reader in readers {
            if reader.join().is_err() {
                tracing::error!("output reader thread panicked");
            }
        }

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => return self.fail(format!("failed waiting for process: {}", e)),
        };
        tracing::info!(
            "{} finished in {:.1}s with {}",
            command.program.to_string_lossy(),
            start_time.elapsed().as_secs_f32(),
            status
        );

        match status.code() {
            Some(0) => {
                self.status.set(STATUS_DONE);
                self.log.enqueue(finish_label);
                PipelineResult::Success
            }
            Some(code) => {
                self.status.set(STATUS_ERROR);
                self.log
                    .enqueue(format!("Error: command returned exit code {}", code));
                PipelineResult::ExitCode(code)
            }
            None => self.fail("command terminated by a signal".to_string()),
        }
    }
}

/// Read `pipe` until EOF, sending each line without its line ending
fn forward_lines<R>(pipe: R, log: LogChannel) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    if buf.ends_with(b"\n") {
                        buf.pop();
                        if buf.ends_with(b"\r") {
                            buf.pop();
                        }
                    }
                    log.enqueue(String::from_utf8_lossy(&buf).into_owned());
                }
                Err(e) => {
                    tracing::warn!("stopped reading process output: {}", e);
                    break;
                }
            }
        }
    })
}
