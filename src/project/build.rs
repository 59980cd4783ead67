//! Build and run commands for registered projects.
//!
//! Build commands execute to completion with a timeout and captured
//! output. Run commands are long-running and hand their child off to the
//! process registry, which owns termination.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use wait_timeout::ChildExt;

use crate::models::Project;
use crate::process::ProcessRegistry;

/// Default ceiling for a build command.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no such project '{0}'")]
    UnknownProject(String),
    #[error("project '{0}' has no {1} command configured")]
    MissingCommand(String, &'static str),
    #[error("program '{0}' not found on PATH")]
    ProgramNotFound(String),
    #[error("build failed with status {status}:\n{stderr}")]
    Failed { status: i32, stderr: String },
    #[error("build timed out after {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Captured output of a completed build command.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Executes project build/run commands.
#[derive(Debug)]
pub struct BuildManager {
    timeout: Duration,
}

impl Default for BuildManager {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_BUILD_TIMEOUT,
        }
    }
}

impl BuildManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a project's build command to completion in its directory.
    ///
    /// The command's stderr is carried verbatim in `BuildError::Failed` so
    /// callers can surface compiler diagnostics untouched.
    pub fn build(&self, name: &str, project: &Project) -> Result<BuildOutput, BuildError> {
        let command = project
            .build_command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| BuildError::MissingCommand(name.to_string(), "build"))?;
        resolve_program(command)?;

        info!(project = name, command, "building");
        let mut child = shell_command(command, Path::new(&project.path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let Some(status) = child.wait_timeout(self.timeout)? else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(BuildError::TimedOut(self.timeout));
        };

        // The child has exited; the pipes hold whatever it wrote.
        let stdout = read_pipe(child.stdout.take());
        let stderr = read_pipe(child.stderr.take());
        let code = status.code().unwrap_or(-1);
        if !status.success() {
            return Err(BuildError::Failed {
                status: code,
                stderr,
            });
        }
        Ok(BuildOutput {
            status: code,
            stdout,
            stderr,
        })
    }

    /// Launch a project's run command and register it under the project
    /// name. Returns the child PID.
    pub fn run(
        &self,
        name: &str,
        project: &Project,
        registry: &mut ProcessRegistry,
    ) -> Result<u32, BuildError> {
        let command = project
            .run_command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| BuildError::MissingCommand(name.to_string(), "run"))?;
        resolve_program(command)?;

        info!(project = name, command, "launching");
        let mut shell = shell_command(command, Path::new(&project.path));
        shell.stdin(Stdio::null());
        registry
            .spawn_with_callback(name, &mut shell, None)
            .map_err(|err| BuildError::Io(std::io::Error::other(err)))
    }
}

fn read_pipe(pipe: Option<impl std::io::Read>) -> String {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = std::io::Read::read_to_end(&mut pipe, &mut buffer);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

fn shell_command(command: &str, working_dir: &Path) -> Command {
    let mut shell = Command::new("sh");
    shell.arg("-c").arg(command);
    shell.current_dir(working_dir);
    shell
}

/// Check the command's program resolves on PATH before spawning, so the
/// caller gets a precise error instead of a shell 127.
fn resolve_program(command: &str) -> Result<(), BuildError> {
    let Some(program) = command.split_whitespace().next() else {
        return Ok(());
    };
    // Shell builtins and paths with slashes are left to the shell.
    if program.contains('/') {
        return Ok(());
    }
    which::which(program)
        .map(|_| ())
        .map_err(|_| BuildError::ProgramNotFound(program.to_string()))
}
