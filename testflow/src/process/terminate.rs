//! Process termination primitives.

use std::io;

/// Asks a process to stop (SIGTERM on Unix).
///
/// Returns `Ok(false)` on platforms without a graceful signal, in which case
/// the caller should go straight to [`force_kill`].
///
/// # Errors
///
/// Fails if the pid is out of range or the signal cannot be delivered.
pub fn terminate_gracefully(pid: u32) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("pid {pid} out of range")))?;
        kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(io::Error::from)?;
        Ok(true)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Ok(false)
    }
}

/// Kills a child immediately (SIGKILL on Unix, TerminateProcess on Windows).
///
/// # Errors
///
/// Fails if the kill or the following wait fails.
pub async fn force_kill(child: &mut tokio::process::Child) -> io::Result<()> {
    child.kill().await
}
