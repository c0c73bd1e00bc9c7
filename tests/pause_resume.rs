//! Pause/resume semantics: pause holds the runner at its batch gate,
//! resume lets it continue, and both are no-ops outside their legal states.

use craftops::types::JobStatus;

use craftops_test_utils::builders::{set_block, test_config, EngineBuilder};
use craftops_test_utils::fake_executor::RecordingExecutor;
use craftops_test_utils::{init_tracing, wait_until};

fn single_command_batches() -> craftops::config::EngineConfig {
    let mut cfg = test_config();
    // One command per batch, so the pause gate runs between commands.
    cfg.policy.batch_size_min = 1;
    cfg.policy.batch_size_start = 1;
    cfg
}

#[tokio::test]
async fn pause_blocks_progress_until_resume() {
    init_tracing();
    let (engine, executor, _audit) = EngineBuilder::new()
        .with_config(single_command_batches())
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
                set_block(3, 64, 0, "minecraft:stone"),
            ],
        )
        .await
        .unwrap();

    executor.allow(2);
    wait_until("two commands apply", || executor.call_count() == 2).await;

    let paused = engine.pause(job.id).unwrap();
    assert_eq!(paused.status, JobStatus::Paused);

    // Plenty of permits available; only a paused runner would hold back.
    executor.allow(10);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let settled = executor.call_count();
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert_eq!(
        executor.call_count(),
        settled,
        "paused job kept applying commands"
    );
    // At most the batch that was in flight when pause landed completed.
    assert!(settled <= 3, "applied {settled} commands while paused");
    assert_eq!(engine.get(job.id).unwrap().status, JobStatus::Paused);

    let resumed = engine.resume(job.id).unwrap();
    assert_eq!(resumed.status, JobStatus::Running);

    wait_until("job completes", || {
        engine.get(job.id).unwrap().status == JobStatus::Completed
    })
    .await;
    assert_eq!(executor.call_count(), 4);
}

#[tokio::test]
async fn resume_without_pause_is_a_noop() {
    init_tracing();
    let (engine, executor, _audit) = EngineBuilder::new()
        .with_executor(RecordingExecutor::gated())
        .build();

    let job = engine
        .submit("world-1", "alice", vec![set_block(0, 64, 0, "minecraft:stone")])
        .await
        .unwrap();

    wait_until("job starts running", || {
        engine.get(job.id).unwrap().status == JobStatus::Running
    })
    .await;

    // Resuming a running job changes nothing.
    assert_eq!(engine.resume(job.id).unwrap().status, JobStatus::Running);

    executor.allow(1);
    wait_until("job completes", || {
        engine.get(job.id).unwrap().status == JobStatus::Completed
    })
    .await;
}

#[tokio::test]
async fn pause_of_a_finished_job_is_harmless() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new().build();

    let job = engine
        .submit("world-1", "alice", vec![set_block(0, 64, 0, "minecraft:stone")])
        .await
        .unwrap();

    wait_until("job completes", || {
        engine.get(job.id).unwrap().status == JobStatus::Completed
    })
    .await;

    let after_pause = engine.pause(job.id).unwrap();
    assert_eq!(after_pause.status, JobStatus::Completed);
    let after_resume = engine.resume(job.id).unwrap();
    assert_eq!(after_resume.status, JobStatus::Completed);
}

#[tokio::test]
async fn updated_at_refreshes_on_status_changes() {
    init_tracing();
    let (engine, executor, _audit) = EngineBuilder::new()
        .with_executor(RecordingExecutor::gated())
        .build();

    let job = engine
        .submit("world-1", "alice", vec![set_block(0, 64, 0, "minecraft:stone")])
        .await
        .unwrap();

    wait_until("job starts running", || {
        engine.get(job.id).unwrap().status == JobStatus::Running
    })
    .await;
    let running_at = engine.get(job.id).unwrap().updated_at;
    assert!(running_at >= job.updated_at);

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let paused = engine.pause(job.id).unwrap();
    assert!(paused.updated_at > running_at);

    engine.resume(job.id).unwrap();
    executor.allow(1);
    wait_until("job completes", || {
        engine.get(job.id).unwrap().status == JobStatus::Completed
    })
    .await;
}
