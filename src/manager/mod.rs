//! The job registry and process-lifecycle manager.
//!
//! Every submitted job lives in an append-only, insertion-ordered
//! registry guarded by a single mutex; ids start at 1 and double as
//! indices into it. Potentially many request handlers call into the
//! manager at once, so all registry access goes through that lock,
//! which is never held across a wait on a child process.

pub mod job;
pub mod process;

pub use job::{Job, JobStatus};
pub use process::{ProcessGroup, ProcessHandle};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::timeout;

use crate::config::DEFAULT_GRACE_PERIOD;
use crate::error::{JobError, Result};
use crate::manager::process::exit_code_of;

/// One registry slot. The watch channel mirrors `job.status`, so a
/// stop call can await "reached a terminal state" without holding the
/// registry lock across the wait.
#[derive(Debug)]
struct JobEntry {
    job: Job,
    /// Present for every job whose process launched; `None` only for
    /// jobs that errored at launch.
    group: Option<ProcessGroup>,
    status_tx: watch::Sender<JobStatus>,
    /// Set while a termination protocol is in flight, so concurrent
    /// stops of the same job never double-signal.
    stopping: bool,
}

impl JobEntry {
    fn set_status(&mut self, status: JobStatus) {
        self.job.status = status;
        let _ = self.status_tx.send(status);
    }
}

#[derive(Debug, Clone)]
pub struct JobManager {
    jobs: Arc<Mutex<Vec<JobEntry>>>,
    grace_period: Duration,
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

impl JobManager {
    pub fn new() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD)
    }

    /// A manager with a non-default grace period. Used by tests that
    /// cannot afford to wait out the full five seconds.
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(Vec::new())),
            grace_period,
        }
    }

    /// Appends a new job to the registry and launches its process.
    ///
    /// Ids are assigned under the registry lock, so concurrent submits
    /// receive distinct, contiguous ids in true submission order. The
    /// call returns as soon as the process is launched; it does not
    /// wait for it to exit. A failed launch still records the job (as
    /// `Errored`), and the returned error carries its id.
    pub async fn submit(&self, command: String, args: Vec<String>) -> Result<u64> {
        let mut jobs = self.jobs.lock().await;
        let id = jobs.len() as u64 + 1;

        match ProcessHandle::spawn(&command, &args) {
            Ok(handle) => {
                let (status_tx, _) = watch::channel(JobStatus::Running);
                jobs.push(JobEntry {
                    job: Job {
                        id,
                        command,
                        args,
                        status: JobStatus::Running,
                    },
                    group: Some(handle.group()),
                    status_tx,
                    stopping: false,
                });
                self.spawn_reaper(id, handle);
                tracing::info!(id, "job running");
                Ok(id)
            }
            Err(source) => {
                let (status_tx, _) = watch::channel(JobStatus::Errored);
                jobs.push(JobEntry {
                    job: Job {
                        id,
                        command,
                        args,
                        status: JobStatus::Errored,
                    },
                    group: None,
                    status_tx,
                    stopping: false,
                });
                tracing::error!(id, error = %source, "failed to launch job");
                Err(JobError::Launch { id, source })
            }
        }
    }

    /// A consistent snapshot of one job's record.
    pub async fn status(&self, id: u64) -> Result<Job> {
        let jobs = self.jobs.lock().await;
        let idx = index_of(&jobs, id)?;
        Ok(jobs[idx].job.clone())
    }

    /// Snapshots of every job ever submitted, in insertion order.
    pub async fn all_jobs(&self) -> Vec<Job> {
        let jobs = self.jobs.lock().await;
        jobs.iter().map(|entry| entry.job.clone()).collect()
    }

    /// Stops a job: SIGTERM to its process group, then SIGKILL if it
    /// outlives the grace period. Blocks until the job has reached a
    /// terminal state and its process has been reaped. Stopping an
    /// already-terminal job is a no-op.
    pub async fn stop(&self, id: u64) -> Result<()> {
        let (idx, group, mut status_rx) = {
            let mut jobs = self.jobs.lock().await;
            let idx = index_of(&jobs, id)?;
            let entry = &mut jobs[idx];

            if entry.job.status.is_terminal() {
                tracing::info!(id, "job already stopped");
                return Ok(());
            }

            let mut status_rx = entry.status_tx.subscribe();
            if entry.stopping {
                // Another stop is already driving this job down;
                // observe its outcome instead of signaling again.
                drop(jobs);
                let _ = status_rx.wait_for(|s| s.is_terminal()).await;
                return Ok(());
            }
            entry.stopping = true;

            let Some(group) = entry.group else {
                // Unreachable in practice: only launch-errored entries
                // lack a group, and those are terminal.
                return Ok(());
            };
            (idx, group, status_rx)
        };

        // Phase one, outside the lock. A failed SIGTERM is not fatal:
        // the SIGKILL after the timeout is the safety net.
        if let Err(error) = group.terminate() {
            tracing::warn!(id, %error, "failed to send SIGTERM");
        }

        let exited = timeout(self.grace_period, status_rx.wait_for(|s| s.is_terminal()))
            .await
            .is_ok();
        if exited {
            tracing::info!(id, "job terminated within grace period");
            return Ok(());
        }

        // Phase two: the timeout won the race.
        tracing::info!(id, "grace period elapsed, sending SIGKILL");
        if let Err(source) = group.kill() {
            tracing::error!(id, error = %source, "failed to kill job");
            // The index stays valid: the registry is append-only.
            self.jobs.lock().await[idx].set_status(JobStatus::FailedToKill);
            return Err(JobError::Kill { id, source });
        }

        // Wait for the reaper to reclaim the process before committing
        // the final status; an unreaped child is a leak.
        let _ = status_rx.wait_for(|s| s.is_terminal()).await;
        self.jobs.lock().await[idx].set_status(JobStatus::Killed);
        tracing::info!(id, "job killed forcefully");
        Ok(())
    }

    /// Waits on the child from a detached task and commits its exit to
    /// the registry. Exactly one reaper runs per launched process, so
    /// OS resources are reclaimed exactly once, and jobs that exit on
    /// their own are picked up without anyone calling `stop`.
    fn spawn_reaper(&self, id: u64, handle: ProcessHandle) {
        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            let result = handle.wait().await;
            let mut jobs = jobs.lock().await;
            let entry = &mut jobs[(id - 1) as usize];
            match result {
                Ok(status) => {
                    let code = exit_code_of(status);
                    // The stop path owns the final status once it has
                    // escalated; only a still-running job is upgraded
                    // here. The watch send still wakes any stop call
                    // waiting for reclamation.
                    if entry.job.status == JobStatus::Running {
                        entry.set_status(JobStatus::Stopped(code));
                        tracing::debug!(id, code, "job exited");
                    }
                }
                Err(error) => {
                    tracing::error!(id, %error, "wait on job failed");
                    if entry.job.status == JobStatus::Running {
                        entry.set_status(JobStatus::Errored);
                    }
                }
            }
        });
    }
}

/// Maps an id to its registry index. Ids start at 1 and jobs are never
/// removed, so `id - 1` indexes the registry directly.
fn index_of(jobs: &[JobEntry], id: u64) -> Result<usize> {
    let idx = id.checked_sub(1).ok_or(JobError::JobNotFound(id))? as usize;
    if idx >= jobs.len() {
        return Err(JobError::JobNotFound(id));
    }
    Ok(idx)
}
