//! Process spawning and lifecycle management.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::config::EngineConfig;
use crate::{Error, Result};

/// A running engine subprocess.
///
/// The engine's stdin and stdout are piped; stderr is discarded. Dropping an
/// `EngineProcess` kills the subprocess if it's still running.
#[derive(Debug)]
pub struct EngineProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
}

impl EngineProcess {
    /// Spawn the engine described by `config`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: &EngineConfig) -> Result<Self> {
        let mut cmd = build_command(config);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::EngineNotFound {
                    searched: config.path().display().to_string(),
                }
            } else {
                Error::ProcessSpawn(e)
            }
        })?;

        tracing::debug!(
            path = %config.path().display(),
            pid = ?child.id(),
            "spawned engine process"
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();

        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }

    /// Take the engine's stdin. Can only be taken once.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Take the engine's stdout. Can only be taken once.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Get the process ID of the running engine.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Check if the process is still running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Ask the engine to exit with an interrupt signal.
    ///
    /// Falls back to killing the process where interrupts are unavailable
    /// or delivery fails.
    pub fn interrupt(&mut self) -> Result<()> {
        match send_interrupt(&self.child) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "could not interrupt engine, killing it instead");
                self.start_kill()
            }
        }
    }

    /// Interrupt the engine, escalating to a kill if it has not exited after
    /// `grace`. Returns the exit status.
    pub async fn terminate(&mut self, grace: Duration) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait().map_err(Error::io)? {
            return Ok(status);
        }

        self.interrupt()?;

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => {
                let status = status.map_err(Error::io)?;
                tracing::debug!(%status, "engine exited");
                Ok(status)
            }
            Err(_) => {
                tracing::warn!(?grace, "engine ignored interrupt, killing it");
                self.kill().await?;
                self.wait().await
            }
        }
    }

    /// Wait for the process to exit and return its exit status.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child.wait().await.map_err(Error::io)
    }

    /// Kill the process immediately.
    pub async fn kill(&mut self) -> Result<()> {
        self.child.kill().await.map_err(Error::io)
    }

    /// Try to kill the process without waiting.
    pub fn start_kill(&mut self) -> Result<()> {
        self.child.start_kill().map_err(Error::io)
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        // Try to kill the process if it's still running
        let _ = self.start_kill();
    }
}

/// Build a tokio Command from the config.
fn build_command(config: &EngineConfig) -> Command {
    let mut cmd = Command::new(config.path());
    cmd.args(config.args());

    if let Some(dir) = config.working_directory() {
        cmd.current_dir(dir);
    }

    for (key, value) in config.env_vars() {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);
    cmd
}

#[cfg(unix)]
fn send_interrupt(child: &Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = child
        .id()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "process already reaped"))?;
    let pid = i32::try_from(pid)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;
    kill(Pid::from_raw(pid), Signal::SIGINT).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn send_interrupt(_child: &Child) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "interrupt signals are not supported on this platform",
    ))
}
