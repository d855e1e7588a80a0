//! Shell command execution for command-kind sources.
//!
//! Every command runs through `sh -c` as the leader of a fresh process group,
//! so a timeout or an abandoned stream can take down everything the command
//! spawned, not just the shell.

use std::time::Duration;

mod sync;

#[cfg(feature = "tokio")]
mod tokio;

pub use sync::{run, CapturedOutput, CommandOutput, RunningCommand};

#[cfg(feature = "tokio")]
pub use self::tokio::{run_async, AsyncCommandOutput, AsyncRunningCommand};

/// How a command's output is delivered.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CommandMode {
    /// Hand back the live pipe; no deadline.
    Streaming,
    /// Wait for the command to finish within the deadline and buffer its output.
    Bounded(Duration),
}

impl CommandMode {
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(deadline) => CommandMode::Bounded(deadline),
            None => CommandMode::Streaming,
        }
    }
}

const SHELL: &str = "sh";
const SPAWN_ATTEMPTS: u32 = 5;
const MAX_SPAWN_BACKOFF: Duration = Duration::from_millis(50);

/// `ETXTBSY`: the executable is still open for writing (typically a script
/// that was just generated).
#[cfg(unix)]
fn is_text_file_busy(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(nix::errno::Errno::ETXTBSY as i32)
}

#[cfg(not(unix))]
fn is_text_file_busy(_err: &std::io::Error) -> bool {
    false
}

/// Sends SIGKILL to every process in the group led by `pid`.
#[cfg(unix)]
pub(crate) fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => tracing::debug!(pgid = pid, "killed process group"),
        // ESRCH: the whole group already exited.
        Err(nix::errno::Errno::ESRCH) => {}
        Err(err) => tracing::warn!(pgid = pid, error = %err, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
pub(crate) fn kill_process_group(_pid: u32) {}
