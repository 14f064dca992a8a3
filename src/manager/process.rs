use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

/// Exit code recorded for a process that died to a signal rather than
/// exiting: the shell convention of 128 + signal number, or -1 when
/// the signal is unknown.
pub(crate) fn exit_code_of(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => status.signal().map_or(-1, |sig| 128 + sig),
    }
}

/// Owns one spawned child process. The child is started in a fresh
/// session, so a signal sent to its (negated) group id reaches the
/// whole process tree it forks.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    group: ProcessGroup,
}

impl ProcessHandle {
    pub fn spawn(command: &str, args: &[String]) -> io::Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        unsafe {
            cmd.pre_exec(|| {
                // New session: the child becomes its own process group
                // leader, with pgid == pid.
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("child exited before its pid could be read"))?;

        Ok(Self {
            child,
            group: ProcessGroup(pid as i32),
        })
    }

    /// Signal-delivery handle for this process's group, usable after
    /// the `ProcessHandle` itself has been handed to a reaper.
    pub fn group(&self) -> ProcessGroup {
        self.group
    }

    /// Waits for the child to exit and reclaims its OS resources.
    /// Consuming `self` guarantees at most one wait per process.
    pub async fn wait(mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }
}

/// Copyable handle to a process group for signal delivery.
#[derive(Debug, Clone, Copy)]
pub struct ProcessGroup(i32);

impl ProcessGroup {
    pub fn signal(self, sig: libc::c_int) -> io::Result<()> {
        if unsafe { libc::kill(-self.0, sig) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Graceful termination request (SIGTERM).
    pub fn terminate(self) -> io::Result<()> {
        self.signal(libc::SIGTERM)
    }

    /// Unconditional termination (SIGKILL).
    pub fn kill(self) -> io::Result<()> {
        self.signal(libc::SIGKILL)
    }
}
