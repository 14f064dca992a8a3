use std::time::Duration;

use jobd::error::JobError;
use jobd::manager::{JobManager, JobStatus};

/// Manager with a short grace period so SIGKILL escalation tests
/// finish quickly.
fn test_manager() -> JobManager {
    JobManager::with_grace_period(Duration::from_millis(300))
}

/// A command that ignores SIGTERM. `trap '' TERM` sets the signal to
/// ignored, which the exec'd sleep inherits, so the whole process
/// group survives the graceful phase.
fn term_proof_sleep() -> (String, Vec<String>) {
    (
        "sh".to_string(),
        vec!["-c".to_string(), "trap '' TERM; sleep 30".to_string()],
    )
}

#[tokio::test]
async fn submit_assigns_contiguous_ids() {
    let manager = test_manager();

    let a = manager.submit("sleep".into(), vec!["30".into()]).await.unwrap();
    let b = manager.submit("sleep".into(), vec!["30".into()]).await.unwrap();
    let c = manager.submit("sleep".into(), vec!["30".into()]).await.unwrap();

    assert_eq!((a, b, c), (1, 2, 3));

    for id in [a, b, c] {
        manager.stop(id).await.unwrap();
    }
}

#[tokio::test]
async fn concurrent_submits_get_distinct_ids() {
    let manager = test_manager();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.submit("true".into(), vec![]).await.unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort_unstable();

    assert_eq!(ids, (1..=8).collect::<Vec<u64>>());
}

#[tokio::test]
async fn status_of_unknown_id_is_not_found() {
    let manager = test_manager();

    assert!(matches!(
        manager.status(1).await.unwrap_err(),
        JobError::JobNotFound(1)
    ));

    manager.submit("true".into(), vec![]).await.unwrap();

    assert!(matches!(
        manager.status(0).await.unwrap_err(),
        JobError::JobNotFound(0)
    ));
    assert!(matches!(
        manager.status(2).await.unwrap_err(),
        JobError::JobNotFound(2)
    ));
}

#[tokio::test]
async fn stop_of_unknown_id_is_not_found() {
    let manager = test_manager();

    assert!(matches!(
        manager.stop(7).await.unwrap_err(),
        JobError::JobNotFound(7)
    ));
}

#[tokio::test]
async fn submitted_job_is_running() {
    let manager = test_manager();

    let id = manager.submit("sleep".into(), vec!["30".into()]).await.unwrap();
    let job = manager.status(id).await.unwrap();

    assert_eq!(job.id, id);
    assert_eq!(job.command, "sleep");
    assert_eq!(job.args, vec!["30".to_string()]);
    assert_eq!(job.status, JobStatus::Running);

    manager.stop(id).await.unwrap();
}

#[tokio::test]
async fn stop_within_grace_period_records_stopped() {
    // Generous grace period: sleep dies to the SIGTERM long before it.
    let manager = JobManager::with_grace_period(Duration::from_secs(10));

    let id = manager.submit("sleep".into(), vec!["30".into()]).await.unwrap();
    manager.stop(id).await.unwrap();

    let job = manager.status(id).await.unwrap();
    // 143 = 128 + SIGTERM
    assert_eq!(job.status, JobStatus::Stopped(143));
}

#[tokio::test]
async fn stop_escalates_to_sigkill_when_term_is_ignored() {
    let manager = test_manager();

    let (cmd, args) = term_proof_sleep();
    let id = manager.submit(cmd, args).await.unwrap();
    // Give the shell a moment to install the trap.
    tokio::time::sleep(Duration::from_millis(100)).await;

    manager.stop(id).await.unwrap();

    assert_eq!(manager.status(id).await.unwrap().status, JobStatus::Killed);
}

#[tokio::test]
async fn stop_on_terminal_job_is_a_noop() {
    let manager = test_manager();

    let id = manager.submit("sleep".into(), vec!["30".into()]).await.unwrap();
    manager.stop(id).await.unwrap();
    let status = manager.status(id).await.unwrap().status;
    assert!(status.is_terminal());

    // Second stop: success, status unchanged.
    manager.stop(id).await.unwrap();
    assert_eq!(manager.status(id).await.unwrap().status, status);
}

#[tokio::test]
async fn concurrent_stops_of_one_job_agree() {
    let manager = test_manager();

    let (cmd, args) = term_proof_sleep();
    let id = manager.submit(cmd, args).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.stop(id).await })
    };
    let second = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.stop(id).await })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(manager.status(id).await.unwrap().status, JobStatus::Killed);
}

#[tokio::test]
async fn natural_exit_is_reaped_without_a_stop() {
    let manager = test_manager();

    let id = manager.submit("true".into(), vec![]).await.unwrap();

    // Poll until the reaper has committed the exit.
    let mut status = manager.status(id).await.unwrap().status;
    for _ in 0..50 {
        if status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        status = manager.status(id).await.unwrap().status;
    }

    assert_eq!(status, JobStatus::Stopped(0));
}

#[tokio::test]
async fn failed_launch_is_recorded_as_errored() {
    let manager = test_manager();

    let err = manager
        .submit("/nonexistent-binary-for-test".into(), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Launch { id: 1, .. }));

    // The job is still a recorded, queryable entity.
    let job = manager.status(1).await.unwrap();
    assert_eq!(job.status, JobStatus::Errored);
    assert_eq!(job.command, "/nonexistent-binary-for-test");

    // Errored is terminal: stopping it is a no-op.
    manager.stop(1).await.unwrap();
    assert_eq!(manager.status(1).await.unwrap().status, JobStatus::Errored);
}

#[tokio::test]
async fn failed_launch_does_not_burn_the_id_sequence() {
    let manager = test_manager();

    let err = manager
        .submit("/nonexistent-binary-for-test".into(), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Launch { id: 1, .. }));

    let id = manager.submit("true".into(), vec![]).await.unwrap();
    assert_eq!(id, 2);
}

#[tokio::test]
async fn all_jobs_snapshots_in_insertion_order() {
    let manager = test_manager();

    manager.submit("true".into(), vec![]).await.unwrap();
    manager.submit("sleep".into(), vec!["30".into()]).await.unwrap();
    let _ = manager.submit("/nonexistent-binary-for-test".into(), vec![]).await;

    let jobs = manager.all_jobs().await;
    assert_eq!(jobs.len(), 3);
    assert_eq!(jobs[0].id, 1);
    assert_eq!(jobs[1].id, 2);
    assert_eq!(jobs[2].id, 3);
    assert_eq!(jobs[2].status, JobStatus::Errored);

    manager.stop(2).await.unwrap();
}
