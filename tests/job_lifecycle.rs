//! Happy-path lifecycle: submit, run to completion, audit attribution.

use craftops::audit::AuditQuery;
use craftops::types::JobStatus;

use craftops_test_utils::builders::{fill, set_block, EngineBuilder};
use craftops_test_utils::{init_tracing, wait_until};

#[tokio::test]
async fn three_set_blocks_run_to_completion_with_audit_records() {
    init_tracing();
    let (engine, executor, audit) = EngineBuilder::new().build();

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
        .expect("admission should succeed");

    // The snapshot returned by submit is pre-run.
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.stats.estimated_blocks, 3);
    assert_eq!(job.stats.done_blocks, 0);

    wait_until("job completes", || {
        engine.get(job.id).unwrap().status == JobStatus::Completed
    })
    .await;

    let done = engine.get(job.id).unwrap();
    assert_eq!(done.stats.done_blocks, 3);
    assert!(done.error.is_none());
    assert_eq!(executor.call_count(), 3);

    // One audit record per executed command, attributable to the submission.
    assert_eq!(audit.len(), 3);
    let page = engine.audit_log(AuditQuery::default()).await.unwrap();
    assert_eq!(page.entries.len(), 3);
    for entry in &page.entries {
        assert_eq!(entry.job_id, job.id);
        assert_eq!(entry.user_id, "alice");
        assert_eq!(entry.world_id, "world-1");
        assert_eq!(entry.command_type, "setBlock");
        assert_eq!(entry.estimated_blocks, 1);
    }
}

#[tokio::test]
async fn fill_contributes_its_box_volume() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new().build();

    let job = engine
        .submit(
            "world-1",
            "alice",
            vec![fill([0, 0, 0], [9, 9, 9], "minecraft:glass")],
        )
        .await
        .unwrap();

    assert_eq!(job.stats.estimated_blocks, 1000);

    wait_until("job completes", || {
        engine.get(job.id).unwrap().status == JobStatus::Completed
    })
    .await;

    assert_eq!(engine.get(job.id).unwrap().stats.done_blocks, 1000);
}

#[tokio::test]
async fn failed_command_marks_job_failed_and_keeps_prior_progress() {
    init_tracing();
    let (engine, executor, audit) = EngineBuilder::new()
        .with_executor(craftops_test_utils::fake_executor::RecordingExecutor::failing_at(2))
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

    wait_until("job fails", || {
        engine.get(job.id).unwrap().status == JobStatus::Failed
    })
    .await;

    let failed = engine.get(job.id).unwrap();
    // Two commands applied before the third blew up; they stay applied.
    assert_eq!(failed.stats.done_blocks, 2);
    let error = failed.error.expect("failed job retains its error");
    assert!(error.contains("command 2"), "unexpected error: {error}");

    assert_eq!(executor.call_count(), 2);
    // The executed prefix is still attributable.
    assert_eq!(audit.len(), 2);
}

#[tokio::test]
async fn list_returns_all_jobs() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new().build();

    let first = engine
        .submit("world-1", "alice", vec![set_block(0, 64, 0, "minecraft:stone")])
        .await
        .unwrap();
    let second = engine
        .submit("world-2", "bob", vec![set_block(0, 64, 0, "minecraft:dirt")])
        .await
        .unwrap();

    let listed = engine.list();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|j| j.id == first.id));
    assert!(listed.iter().any(|j| j.id == second.id));
}
