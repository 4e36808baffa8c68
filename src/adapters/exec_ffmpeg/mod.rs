//! ffmpeg process adapter
//!
//! Spawns the transcoder with its diagnostic stream captured and delivers
//! termination requests to it. On unix the child leads its own process
//! group so a cancel reaches any helpers it started.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{SubtrimError, SubtrimResult};

/// Spawn `program` with `args`, stderr piped, stdin and stdout detached
pub fn spawn_transcoder(program: &Path, args: &[OsString]) -> SubtrimResult<Child> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    #[cfg(windows)]
    {
        // CREATE_NO_WINDOW
        cmd.creation_flags(0x08000000);
    }

    debug!(program = %program.display(), ?args, "Spawning transcoder");

    cmd.spawn().map_err(|source| SubtrimError::Spawn {
        program: program.display().to_string(),
        source,
    })
}

/// Ask the process to stop: SIGTERM to its group on unix, a kill elsewhere
pub fn request_termination(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            match killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => debug!(pid, "Sent SIGTERM to process group"),
                Err(nix::errno::Errno::ESRCH) => debug!(pid, "Process group already gone"),
                Err(e) => warn!(pid, error = %e, "Failed to signal process group"),
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = child.start_kill() {
            warn!(error = %e, "Failed to kill process");
        }
    }
}

/// Kill the process (and its group on unix) without waiting for it
pub fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
    }

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "start_kill failed, process likely exited");
    }
}
