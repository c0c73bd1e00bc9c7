//! Cancellation is cooperative: it stops the run at the next check point
//! and never lets the job complete.

use std::sync::Arc;
use std::time::Duration;

use craftops::audit::MemoryAuditStore;
use craftops::command::Command;
use craftops::job::{Job, JobHandle};
use craftops::runner::{run_job, RunOutcome, RunnerDeps};
use craftops::types::{JobStatus, RunMode};

use craftops_test_utils::builders::{set_block, test_config, EngineBuilder};
use craftops_test_utils::fake_executor::RecordingExecutor;
use craftops_test_utils::{init_tracing, wait_until};

#[tokio::test]
async fn cancel_before_run_starts_applies_nothing() {
    init_tracing();

    let cfg = test_config();
    let commands = vec![
        Command::from_payload(0, &set_block(0, 64, 0, "minecraft:stone")).unwrap(),
    ];
    let job = Job::new(
        "world-1",
        "alice",
        RunMode::Apply,
        None,
        commands,
        cfg.policy.job_policy(),
        cfg.policy.batch_size_start,
        cfg.policy.delay_ms_start,
    );
    let handle = Arc::new(JobHandle::new(job));

    // Cancel lands before the runner ever picks the job up.
    assert!(handle.cancel());

    let executor = Arc::new(RecordingExecutor::new());
    let audit = Arc::new(MemoryAuditStore::default());
    let deps = RunnerDeps {
        executor: Arc::clone(&executor) as Arc<dyn craftops::exec::BlockExecutor>,
        metrics: None,
        audit: Arc::clone(&audit) as Arc<dyn craftops::audit::AuditSink>,
    };

    let outcome = run_job(Arc::clone(&handle), deps, Duration::from_millis(10)).await;

    assert_eq!(outcome, RunOutcome::Canceled);
    assert_eq!(handle.status(), JobStatus::Canceled);
    assert_eq!(executor.call_count(), 0);
    assert_eq!(audit.len(), 0);
}

#[tokio::test]
async fn cancel_mid_run_stops_after_the_in_flight_command() {
    init_tracing();
    let (engine, executor, audit) = EngineBuilder::new()
        .with_executor(RecordingExecutor::gated())
        .build();

    let job = engine
        .submit(
            "world-1",
            "alice",
            vec![
                set_block(0, 64, 0, "minecraft:stone"),
                set_block(1, 64, 0, "minecraft:stone"),
                set_block(2, 64, 0, "minecraft:stone"),
            ],
        )
        .await
        .unwrap();

    executor.allow(1);
    wait_until("first command applies", || executor.call_count() == 1).await;

    engine.cancel(job.id).unwrap();
    // Release everything; only the in-flight command may still finish.
    executor.allow(10);

    wait_until("job terminates", || {
        engine.get(job.id).unwrap().status.is_terminal()
    })
    .await;

    let done = engine.get(job.id).unwrap();
    assert_eq!(done.status, JobStatus::Canceled);
    assert!(executor.call_count() <= 2, "ran {} commands", executor.call_count());
    // Whatever executed is attributable, and progress matches it.
    assert_eq!(audit.len(), executor.call_count());
    assert_eq!(done.stats.done_blocks as usize, executor.call_count());
}

#[tokio::test]
async fn canceled_job_never_transitions_again() {
    init_tracing();
    let (engine, executor, _audit) = EngineBuilder::new()
        .with_executor(RecordingExecutor::gated())
        .build();

    let job = engine
        .submit("world-1", "alice", vec![set_block(0, 64, 0, "minecraft:stone")])
        .await
        .unwrap();

    engine.cancel(job.id).unwrap();
    executor.allow(10);

    wait_until("job terminates", || {
        engine.get(job.id).unwrap().status.is_terminal()
    })
    .await;
    assert_eq!(engine.get(job.id).unwrap().status, JobStatus::Canceled);

    // Pause/resume/cancel on a terminal job are no-ops, not errors.
    assert_eq!(engine.pause(job.id).unwrap().status, JobStatus::Canceled);
    assert_eq!(engine.resume(job.id).unwrap().status, JobStatus::Canceled);
    assert_eq!(engine.cancel(job.id).unwrap().status, JobStatus::Canceled);
}
