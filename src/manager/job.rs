use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    /// The process exited, either on its own or in response to
    /// SIGTERM. Carries the recorded exit code.
    Stopped(i32),
    /// The process outlived the grace period and was SIGKILLed.
    Killed,
    /// The process could not be launched, or waiting on it failed.
    Errored,
    /// SIGKILL itself failed. The job is abandoned in this state.
    FailedToKill,
}

impl JobStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Stopped(code) => write!(f, "Stopped (ec: {code})"),
            JobStatus::Killed => write!(f, "Killed"),
            JobStatus::Errored => write!(f, "Errored"),
            JobStatus::FailedToKill => write!(f, "Failed to kill"),
        }
    }
}

// The wire format for a status is its display string.
impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One submitted command and its execution record. Plain data; all
/// mutation happens inside the manager, callers only ever see clones.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: u64,
    pub command: String,
    pub args: Vec<String>,
    pub status: JobStatus,
}
