//! Child-process tracking for launched project runs.
//!
//! Every process the core spawns (build commands, run commands, language
//! servers) registers here so shutdown can terminate them gracefully:
//! SIGTERM first, then SIGKILL after a grace period.

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::process::{Child, Command};
use std::time::Duration;
use tracing::{info, warn};
use wait_timeout::ChildExt;

/// Grace period between SIGTERM and SIGKILL during shutdown.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Check whether a PID refers to a live process.
///
/// Sends the null signal (signal 0), which checks existence without
/// delivering anything. `EPERM` means the process exists but belongs to
/// someone else, so it still counts as alive.
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(pid_i32) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(pid_i32), None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// A tracked child process.
pub struct ProcessHandle {
    pub pid: u32,
    pub command: String,
    child: Child,
    on_exit: Option<Box<dyn FnOnce() + Send>>,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// Registry of named child processes. One name, one process; spawning
/// under a taken name terminates the previous holder first.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: HashMap<String, ProcessHandle>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `command` and track it under `name`.
    pub fn spawn(&mut self, name: &str, mut command: Command) -> Result<u32> {
        self.spawn_with_callback(name, &mut command, None)
    }

    /// Spawn with a callback invoked once the process is reaped or
    /// terminated.
    pub fn spawn_with_callback(
        &mut self,
        name: &str,
        command: &mut Command,
        on_exit: Option<Box<dyn FnOnce() + Send>>,
    ) -> Result<u32> {
        if self.entries.contains_key(name) {
            self.terminate(name, TERMINATE_GRACE)?;
        }
        let display = format!("{command:?}");
        let child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {display}"))?;
        let pid = child.id();
        info!(process = name, pid, "spawned");
        self.entries.insert(
            name.to_string(),
            ProcessHandle {
                pid,
                command: display,
                child,
                on_exit,
            },
        );
        Ok(pid)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn pid_of(&self, name: &str) -> Option<u32> {
        self.entries.get(name).map(|handle| handle.pid)
    }

    /// Names of tracked processes, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove entries whose process has already exited, running their
    /// exit callbacks. Returns the names reaped.
    pub fn reap(&mut self) -> Vec<String> {
        let mut finished = Vec::new();
        for (name, handle) in &mut self.entries {
            match handle.child.try_wait() {
                Ok(Some(status)) => {
                    info!(process = %name, pid = handle.pid, %status, "exited");
                    finished.push(name.clone());
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(process = %name, error = %err, "could not poll process");
                }
            }
        }
        for name in &finished {
            if let Some(handle) = self.entries.remove(name) {
                if let Some(callback) = handle.on_exit {
                    callback();
                }
            }
        }
        finished
    }

    /// Terminate a tracked process: SIGTERM, wait up to `grace`, then
    /// SIGKILL. Returns false for unknown names.
    pub fn terminate(&mut self, name: &str, grace: Duration) -> Result<bool> {
        let Some(mut handle) = self.entries.remove(name) else {
            info!(process = name, "no such process");
            return Ok(false);
        };

        match i32::try_from(handle.pid) {
            Ok(pid) => match kill(Pid::from_raw(pid), Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(err) => {
                    warn!(process = name, pid = handle.pid, error = %err, "SIGTERM failed");
                }
            },
            // Out-of-range PID; the bounded wait plus kill below still applies.
            Err(_) => {
                warn!(process = name, pid = handle.pid, "PID out of signal range");
            }
        }

        let waited = handle
            .child
            .wait_timeout(grace)
            .with_context(|| format!("Failed to wait for {name}"))?;
        if waited.is_none() {
            warn!(process = name, pid = handle.pid, "did not exit in time, killing");
            let _ = handle.child.kill();
            let _ = handle.child.wait();
        }

        if let Some(callback) = handle.on_exit {
            callback();
        }
        info!(process = name, pid = handle.pid, "terminated");
        Ok(true)
    }

    /// Terminate every tracked process with the default grace period.
    pub fn shutdown_all(&mut self) {
        for name in self.names() {
            if let Err(err) = self.terminate(&name, TERMINATE_GRACE) {
                warn!(process = %name, error = %err, "failed to terminate");
            }
        }
    }
}

impl Drop for ProcessRegistry {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}
