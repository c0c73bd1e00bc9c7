//! Pure controller semantics: the availability gate, the adaptive band,
//! and the dead zone, with no Tokio or live job involved.

use craftops::job::{JobPolicy, JobStats};
use craftops::metrics::MetricsSample;
use craftops::throttle::{evaluate, AutoTransition, BATCH_SIZE_STEP, DELAY_MS_STEP};
use craftops::types::JobStatus;

fn policy() -> JobPolicy {
    JobPolicy {
        adaptive_throttle: true,
        tps_pause_threshold: 15.0,
        mspt_lower_bound: 25.0,
        mspt_upper_bound: 45.0,
        batch_size_min: 16,
        batch_size_max: 512,
        delay_ms_min: 0,
        delay_ms_max: 1000,
    }
}

fn stats(batch_size: usize, delay_ms: u64) -> JobStats {
    JobStats {
        estimated_blocks: 1000,
        done_blocks: 0,
        last_mspt: None,
        last_tps: None,
        batch_size,
        delay_ms,
    }
}

#[test]
fn low_tps_forces_pause_even_with_adaptive_disabled() {
    let mut policy = policy();
    policy.adaptive_throttle = false;

    let decision = evaluate(
        &policy,
        &stats(64, 100),
        JobStatus::Running,
        false,
        &MetricsSample::new(None, 10.0),
    );

    assert_eq!(decision.transition, Some(AutoTransition::Pause));
    assert_eq!(decision.batch_size, 64);
    assert_eq!(decision.delay_ms, 100);
}

#[test]
fn tps_recovery_resumes_only_gate_paused_jobs() {
    let recovered = MetricsSample::new(None, 20.0);

    let gate_paused = evaluate(&policy(), &stats(64, 100), JobStatus::Paused, true, &recovered);
    assert_eq!(gate_paused.transition, Some(AutoTransition::Resume));

    // An operator pause is never auto-resumed by the gate.
    let manually_paused =
        evaluate(&policy(), &stats(64, 100), JobStatus::Paused, false, &recovered);
    assert_eq!(manually_paused.transition, None);
}

#[test]
fn mspt_inside_the_band_changes_nothing() {
    let decision = evaluate(
        &policy(),
        &stats(64, 100),
        JobStatus::Running,
        false,
        &MetricsSample::new(35.0, 20.0),
    );

    assert_eq!(decision.transition, None);
    assert_eq!(decision.batch_size, 64);
    assert_eq!(decision.delay_ms, 100);
}

#[test]
fn slack_grows_batch_and_shrinks_delay() {
    let decision = evaluate(
        &policy(),
        &stats(64, 100),
        JobStatus::Running,
        false,
        &MetricsSample::new(10.0, 20.0),
    );

    assert_eq!(decision.batch_size, 64 + BATCH_SIZE_STEP);
    assert_eq!(decision.delay_ms, 100 - DELAY_MS_STEP);
    assert_eq!(decision.transition, None);
}

#[test]
fn load_shrinks_batch_and_grows_delay() {
    let decision = evaluate(
        &policy(),
        &stats(64, 100),
        JobStatus::Running,
        false,
        &MetricsSample::new(60.0, 20.0),
    );

    assert_eq!(decision.batch_size, 64 - BATCH_SIZE_STEP);
    assert_eq!(decision.delay_ms, 100 + DELAY_MS_STEP);
}

#[test]
fn repeated_extremes_clamp_at_the_bounds() {
    let policy = policy();
    let mut current = stats(64, 100);

    for _ in 0..100 {
        let decision = evaluate(
            &policy,
            &current,
            JobStatus::Running,
            false,
            &MetricsSample::new(60.0, 20.0),
        );
        assert!(decision.batch_size >= policy.batch_size_min);
        assert!(decision.delay_ms <= policy.delay_ms_max);
        // Monotone until the clamp.
        assert!(decision.batch_size <= current.batch_size);
        assert!(decision.delay_ms >= current.delay_ms);
        current.batch_size = decision.batch_size;
        current.delay_ms = decision.delay_ms;
    }

    assert_eq!(current.batch_size, policy.batch_size_min);
    assert_eq!(current.delay_ms, policy.delay_ms_max);
}

#[test]
fn missing_sample_fields_keep_previous_tuning() {
    let decision = evaluate(
        &policy(),
        &stats(64, 100),
        JobStatus::Running,
        false,
        &MetricsSample::default(),
    );

    assert_eq!(decision.transition, None);
    assert_eq!(decision.batch_size, 64);
    assert_eq!(decision.delay_ms, 100);
}

#[test]
fn adaptive_disabled_never_tunes() {
    let mut policy = policy();
    policy.adaptive_throttle = false;

    let decision = evaluate(
        &policy,
        &stats(64, 100),
        JobStatus::Running,
        false,
        &MetricsSample::new(5.0, 20.0),
    );

    assert_eq!(decision.batch_size, 64);
    assert_eq!(decision.delay_ms, 100);
}

#[test]
fn gate_overrides_tuning_in_the_same_round() {
    // TPS collapse and MSPT slack in one sample: the gate wins, no tuning.
    let decision = evaluate(
        &policy(),
        &stats(64, 100),
        JobStatus::Running,
        false,
        &MetricsSample::new(5.0, 10.0),
    );

    assert_eq!(decision.transition, Some(AutoTransition::Pause));
    assert_eq!(decision.batch_size, 64);
    assert_eq!(decision.delay_ms, 100);
}
