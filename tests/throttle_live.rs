//! Throttle behaviour against live jobs: manual metrics pushes and the
//! per-batch feed through the runner.

use std::sync::Arc;

use craftops::metrics::MetricsSample;
use craftops::types::JobStatus;

use craftops_test_utils::builders::{set_block, test_config, EngineBuilder};
use craftops_test_utils::fake_executor::RecordingExecutor;
use craftops_test_utils::fake_metrics::ScriptedMetrics;
use craftops_test_utils::{init_tracing, wait_until};

#[tokio::test]
async fn pushed_low_tps_pauses_and_recovery_resumes() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new()
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

    let paused = engine
        .push_metrics(job.id, MetricsSample::new(None, 10.0))
        .unwrap();
    assert_eq!(paused.status, JobStatus::Paused);
    assert_eq!(paused.stats.last_tps, Some(10.0));

    let resumed = engine
        .push_metrics(job.id, MetricsSample::new(None, 20.0))
        .unwrap();
    assert_eq!(resumed.status, JobStatus::Running);
    assert_eq!(resumed.stats.last_tps, Some(20.0));
}

#[tokio::test]
async fn recovery_does_not_override_a_manual_pause() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new()
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

    engine.pause(job.id).unwrap();
    let after = engine
        .push_metrics(job.id, MetricsSample::new(None, 20.0))
        .unwrap();
    assert_eq!(after.status, JobStatus::Paused);
}

#[tokio::test]
async fn repeated_overload_drives_tuning_to_the_clamps() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new()
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

    let policy = &job.policy;
    let mut previous = engine.get(job.id).unwrap().stats;
    for _ in 0..50 {
        let snapshot = engine
            .push_metrics(job.id, MetricsSample::new(60.0, 20.0))
            .unwrap();
        assert!(snapshot.stats.batch_size <= previous.batch_size);
        assert!(snapshot.stats.delay_ms >= previous.delay_ms);
        assert!(snapshot.stats.batch_size >= policy.batch_size_min);
        assert!(snapshot.stats.delay_ms <= policy.delay_ms_max);
        previous = snapshot.stats;
    }

    assert_eq!(previous.batch_size, policy.batch_size_min);
    assert_eq!(previous.delay_ms, policy.delay_ms_max);
    assert_eq!(previous.last_mspt, Some(60.0));
}

#[tokio::test]
async fn runner_pulls_one_sample_per_batch() {
    init_tracing();

    let mut cfg = test_config();
    cfg.policy.batch_size_min = 1;
    cfg.policy.batch_size_start = 2;
    let metrics = Arc::new(ScriptedMetrics::new(Some(MetricsSample::new(30.0, 19.5))));

    let (engine, _executor, _audit) = EngineBuilder::new()
        .with_config(cfg)
        .with_metrics(Arc::clone(&metrics) as Arc<dyn craftops::metrics::MetricsSource>)
        .build();

    let commands = (0..6)
        .map(|i| set_block(i, 64, 0, "minecraft:stone"))
        .collect();
    let job = engine.submit("world-1", "alice", commands).await.unwrap();

    wait_until("job completes", || {
        engine.get(job.id).unwrap().status == JobStatus::Completed
    })
    .await;

    // Three batches of two commands; a sample is pulled between batches.
    assert!(metrics.samples_taken() >= 2);
    let done = engine.get(job.id).unwrap();
    assert_eq!(done.stats.last_mspt, Some(30.0));
    assert_eq!(done.stats.last_tps, Some(19.5));
}

#[tokio::test]
async fn metrics_outage_is_transient_and_keeps_tuning() {
    init_tracing();

    let mut cfg = test_config();
    cfg.policy.batch_size_min = 1;
    cfg.policy.batch_size_start = 1;
    // Feed fails on every pull.
    let metrics = Arc::new(ScriptedMetrics::new(None));

    let (engine, _executor, _audit) = EngineBuilder::new()
        .with_config(cfg)
        .with_metrics(Arc::clone(&metrics) as Arc<dyn craftops::metrics::MetricsSource>)
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

    wait_until("job completes", || {
        engine.get(job.id).unwrap().status == JobStatus::Completed
    })
    .await;

    let done = engine.get(job.id).unwrap();
    // The outage skipped every adjustment; the seed tuning is untouched.
    assert_eq!(done.stats.batch_size, 1);
    assert_eq!(done.stats.last_mspt, None);
    assert_eq!(done.stats.last_tps, None);
    assert!(metrics.samples_taken() >= 1);
}
