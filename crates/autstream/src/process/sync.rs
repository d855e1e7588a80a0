use std::{
    io::{self, Read},
    process::{Child, ChildStdout, Command, ExitStatus, Stdio},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use tracing::debug;
use wait_timeout::ChildExt;

use super::{
    is_text_file_busy, kill_process_group, CommandMode, MAX_SPAWN_BACKOFF, SHELL, SPAWN_ATTEMPTS,
};
use crate::IngestError;

/// What [`run`] hands back, depending on the [`CommandMode`].
#[derive(Debug)]
pub enum CommandOutput {
    Streaming(RunningCommand),
    Captured(CapturedOutput),
}

/// Output of a command that finished successfully within its deadline.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub command: String,
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
}

/// Runs `command` through the shell in its own process group.
///
/// - [`CommandMode::Streaming`] returns as soon as the process is spawned.
/// - [`CommandMode::Bounded`] blocks until the command exits and its stdout is
///   closed. A non-zero exit is [`IngestError::CommandFailed`]; missing the
///   deadline kills the whole process group and yields
///   [`IngestError::CommandTimeout`].
pub fn run(command: &str, mode: CommandMode) -> Result<CommandOutput, IngestError> {
    let mut cmd = shell_command(command);
    let child = spawn_with_retry(&mut cmd, command)?;
    debug!(command, pid = child.id(), ?mode, "spawned command");
    match mode {
        CommandMode::Streaming => RunningCommand::new(command, child).map(CommandOutput::Streaming),
        CommandMode::Bounded(timeout) => {
            run_bounded(command, child, timeout).map(CommandOutput::Captured)
        }
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
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd
}

fn spawn_with_retry(cmd: &mut Command, command: &str) -> Result<Child, IngestError> {
    let mut backoff = Duration::from_millis(2);
    let mut attempt = 1;
    loop {
        match cmd.spawn() {
            Ok(child) => return Ok(child),
            Err(source) if is_text_file_busy(&source) && attempt < SPAWN_ATTEMPTS => {
                thread::sleep(backoff);
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

fn run_bounded(
    command: &str,
    mut child: Child,
    timeout: Duration,
) -> Result<CapturedOutput, IngestError> {
    let started = Instant::now();
    let Some(mut pipe) = child.stdout.take() else {
        terminate(&mut child);
        return Err(IngestError::StdoutUnavailable {
            command: command.to_string(),
        });
    };

    // The pipe is drained on a helper thread so a chatty command cannot block
    // on a full pipe while we wait for it.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let result = pipe.read_to_end(&mut buffer).map(|_| buffer);
        let _ = tx.send(result);
    });

    let stdout = match rx.recv_timeout(timeout) {
        Ok(Ok(buffer)) => buffer,
        Ok(Err(source)) => {
            terminate(&mut child);
            return Err(IngestError::Io {
                provenance: command.to_string(),
                source,
            });
        }
        Err(RecvTimeoutError::Timeout) => return Err(timed_out(&mut child, command, timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            terminate(&mut child);
            return Err(IngestError::Io {
                provenance: command.to_string(),
                source: io::Error::other("output capture thread exited early"),
            });
        }
    };

    let remaining = timeout.saturating_sub(started.elapsed());
    let status = match child.wait_timeout(remaining) {
        Ok(Some(status)) => status,
        Ok(None) => return Err(timed_out(&mut child, command, timeout)),
        Err(source) => {
            terminate(&mut child);
            return Err(IngestError::Wait {
                command: command.to_string(),
                source,
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

fn timed_out(child: &mut Child, command: &str, timeout: Duration) -> IngestError {
    debug!(command, ?timeout, "command timed out; killing its process group");
    terminate(child);
    IngestError::CommandTimeout {
        command: command.to_string(),
        timeout,
    }
}

/// Kills the whole process group, then reaps the leader. SIGKILL makes the
/// reap immediate.
fn terminate(child: &mut Child) {
    kill_process_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

/// A command whose stdout is being consumed while it runs.
///
/// Call [`RunningCommand::reconcile`] once reading stops. A value dropped
/// without reconciliation kills the process group if the command is still
/// running.
#[derive(Debug)]
pub struct RunningCommand {
    command: String,
    child: Child,
    stdout: Option<ChildStdout>,
    settled: bool,
}

impl RunningCommand {
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

    /// Pid of the shell, which is also the process-group id.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Settles the command's exit status.
    ///
    /// After the reader saw end of stream (`reached_eof`) this blocks until
    /// the command exits. Otherwise the status is only polled: a finished
    /// command still reports its status, a running one has its process group
    /// killed and is reaped, and no error is raised for it.
    pub fn reconcile(mut self, reached_eof: bool) -> Result<(), IngestError> {
        self.settled = true;
        let status = if reached_eof {
            self.child.wait().map_err(|source| IngestError::Wait {
                command: self.command.clone(),
                source,
            })?
        } else {
            match self.child.try_wait() {
                Ok(Some(status)) => status,
                Ok(None) => {
                    debug!(command = %self.command, "command still running after early stop");
                    terminate(&mut self.child);
                    return Ok(());
                }
                Err(source) => {
                    terminate(&mut self.child);
                    return Err(IngestError::Wait {
                        command: self.command.clone(),
                        source,
                    });
                }
            }
        };

        debug!(command = %self.command, %status, reached_eof, "command reconciled");
        if status.success() {
            Ok(())
        } else {
            Err(IngestError::CommandFailed {
                command: self.command.clone(),
                status,
            })
        }
    }
}

impl Drop for RunningCommand {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Ok(None) = self.child.try_wait() {
            terminate(&mut self.child);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn captured(command: &str, timeout: Duration) -> Result<CapturedOutput, IngestError> {
        match run(command, CommandMode::Bounded(timeout))? {
            CommandOutput::Captured(output) => Ok(output),
            CommandOutput::Streaming(_) => panic!("bounded mode must capture"),
        }
    }

    #[test]
    fn bounded_mode_captures_all_output() {
        let out = captured("echo one; echo two", Duration::from_secs(10)).unwrap();
        assert_eq!(out.stdout, b"one\ntwo\n");
        assert!(out.status.success());
    }

    #[test]
    fn bounded_mode_reports_non_zero_exit() {
        let err = captured("echo partial; exit 3", Duration::from_secs(10)).unwrap_err();
        match err {
            IngestError::CommandFailed { status, command } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(command, "echo partial; exit 3");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn bounded_mode_kills_slow_commands() {
        let started = Instant::now();
        let err = captured("sleep 10; echo late", Duration::from_millis(200)).unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn bounded_timeout_reaches_background_children() {
        // The backgrounded sleep inherits the pipe; only a group kill closes it.
        let started = Instant::now();
        let err = captured("sleep 10 & echo early", Duration::from_millis(300)).unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn streaming_reconcile_after_eof_waits_for_status() {
        let CommandOutput::Streaming(mut running) =
            run("echo hi; exit 2", CommandMode::Streaming).unwrap()
        else {
            panic!("streaming mode must not capture");
        };
        let mut out = String::new();
        running
            .take_stdout()
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "hi\n");
        let err = running.reconcile(true).unwrap_err();
        assert_eq!(err.exit_status().and_then(|s| s.code()), Some(2));
    }

    #[test]
    fn early_reconcile_kills_running_command() {
        let CommandOutput::Streaming(running) = run("sleep 30", CommandMode::Streaming).unwrap()
        else {
            panic!("streaming mode must not capture");
        };
        let pid = running.id();
        let started = Instant::now();
        running.reconcile(false).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        let alive = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None);
        assert!(alive.is_err(), "process {pid} should be gone");
    }

    #[test]
    fn missing_program_surfaces_as_exit_127() {
        let err = captured("definitely-not-a-real-binary-xyz", Duration::from_secs(10))
            .unwrap_err();
        assert_eq!(err.exit_status().and_then(|s| s.code()), Some(127));
    }
}
