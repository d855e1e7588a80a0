use std::{process::Stdio, time::Duration};

use tokio::{
    io::AsyncReadExt,
    process::{Child, ChildStdout, Command},
    time,
};
use tracing::debug;

use super::{
    is_text_file_busy, kill_process_group, CapturedOutput, CommandMode, MAX_SPAWN_BACKOFF, SHELL,
    SPAWN_ATTEMPTS,
};
use crate::IngestError;

#[derive(Debug)]
pub enum AsyncCommandOutput {
    Streaming(AsyncRunningCommand),
    Captured(CapturedOutput),
}

/// Async counterpart of [`run`](super::run), driven by `tokio::process`.
pub async fn run_async(
    command: &str,
    mode: CommandMode,
) -> Result<AsyncCommandOutput, IngestError> {
    let mut cmd = shell_command(command);
    let child = spawn_with_retry(&mut cmd, command).await?;
    debug!(command, pid = ?child.id(), ?mode, "spawned command");
    match mode {
        CommandMode::Streaming => {
            AsyncRunningCommand::new(command, child).map(AsyncCommandOutput::Streaming)
        }
        CommandMode::Bounded(timeout) => run_bounded(command, child, timeout)
            .await
            .map(AsyncCommandOutput::Captured),
    }
}

fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

async fn spawn_with_retry(cmd: &mut Command, command: &str) -> Result<Child, IngestError> {
    let mut backoff = Duration::from_millis(2);
    let mut attempt = 1;
    loop {
        match cmd.spawn() {
            Ok(child) => return Ok(child),
            Err(source) if is_text_file_busy(&source) && attempt < SPAWN_ATTEMPTS => {
                time::sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, MAX_SPAWN_BACKOFF);
                attempt += 1;
            }
            Err(source) => {
                return Err(IngestError::Spawn {
                    command: command.to_string(),
                    source,
                })
            }
        }
    }
}

async fn run_bounded(
    command: &str,
    mut child: Child,
    timeout: Duration,
) -> Result<CapturedOutput, IngestError> {
    let Some(mut pipe) = child.stdout.take() else {
        abandon(&mut child);
        return Err(IngestError::StdoutUnavailable {
            command: command.to_string(),
        });
    };

    let collected = time::timeout(timeout, async {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer)
            .await
            .map_err(|source| IngestError::Io {
                provenance: command.to_string(),
                source,
            })?;
        let status = child.wait().await.map_err(|source| IngestError::Wait {
            command: command.to_string(),
            source,
        })?;
        Ok::<_, IngestError>((buffer, status))
    })
    .await;

    let (stdout, status) = match collected {
        Ok(Ok(done)) => done,
        Ok(Err(err)) => {
            abandon(&mut child);
            return Err(err);
        }
        Err(_) => {
            debug!(command, ?timeout, "command timed out; killing its process group");
            abandon(&mut child);
            let _ = child.wait().await;
            return Err(IngestError::CommandTimeout {
                command: command.to_string(),
                timeout,
            });
        }
    };

    debug!(command, %status, bytes = stdout.len(), "bounded command finished");
    if !status.success() {
        return Err(IngestError::CommandFailed {
            command: command.to_string(),
            status,
        });
    }
    Ok(CapturedOutput {
        command: command.to_string(),
        status,
        stdout,
    })
}

/// Kills the process group without waiting; tokio reaps the leader in the
/// background once the handle is dropped.
fn abandon(child: &mut Child) {
    if let Some(pid) = child.id() {
        kill_process_group(pid);
    }
    let _ = child.start_kill();
}

/// Async counterpart of [`RunningCommand`](super::RunningCommand).
#[derive(Debug)]
pub struct AsyncRunningCommand {
    command: String,
    child: Child,
    stdout: Option<ChildStdout>,
    settled: bool,
}

impl AsyncRunningCommand {
    fn new(command: &str, mut child: Child) -> Result<Self, IngestError> {
        let stdout = child.stdout.take();
        let running = Self {
            command: command.to_string(),
            child,
            stdout,
            settled: false,
        };
        if running.stdout.is_none() {
            return Err(IngestError::StdoutUnavailable {
                command: running.command.clone(),
            });
        }
        Ok(running)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Same contract as [`RunningCommand::reconcile`](super::RunningCommand::reconcile).
    pub async fn reconcile(mut self, reached_eof: bool) -> Result<(), IngestError> {
        if !reached_eof {
            return self.reconcile_early();
        }
        self.settled = true;
        let status = self.child.wait().await.map_err(|source| IngestError::Wait {
            command: self.command.clone(),
            source,
        })?;
        debug!(command = %self.command, %status, "command reconciled");
        if status.success() {
            Ok(())
        } else {
            Err(IngestError::CommandFailed {
                command: self.command.clone(),
                status,
            })
        }
    }

    /// Non-blocking settlement used when reading stopped before end of stream.
    pub fn reconcile_early(mut self) -> Result<(), IngestError> {
        self.settled = true;
        match self.child.try_wait() {
            Ok(Some(status)) if !status.success() => Err(IngestError::CommandFailed {
                command: self.command.clone(),
                status,
            }),
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                debug!(command = %self.command, "command still running after early stop");
                abandon(&mut self.child);
                Ok(())
            }
            Err(source) => {
                abandon(&mut self.child);
                Err(IngestError::Wait {
                    command: self.command.clone(),
                    source,
                })
            }
        }
    }
}

impl Drop for AsyncRunningCommand {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Ok(None) = self.child.try_wait() {
            abandon(&mut self.child);
        }
    }
}
