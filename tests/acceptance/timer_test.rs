//! Stop-timer bounds: a timed phase must end no earlier than the requested
//! duration and within a small overrun.

use std::time::{Duration, Instant};
use vdso_harness::{start_timer, ContextOptions, TestContext};

fn ctx(duration: Duration) -> TestContext {
    TestContext::new(ContextOptions::new("clock-monotonic", "bench").duration(duration)).unwrap()
}

#[test]
fn timed_phase_honors_requested_duration() {
    for millis in [20u64, 100] {
        let duration = Duration::from_millis(millis);
        let mut ctx = ctx(duration);

        let started = Instant::now();
        let _timer = start_timer(&mut ctx).unwrap();
        while !ctx.should_stop() {
            assert!(
                started.elapsed() < Duration::from_secs(10),
                "stop timer never fired for {duration:?}"
            );
            std::hint::spin_loop();
        }
        let elapsed = started.elapsed();

        assert!(
            elapsed >= duration,
            "phase ended early: {elapsed:?} < {duration:?}"
        );
        assert!(
            elapsed < duration + Duration::from_secs(2),
            "overrun too large: {elapsed:?} for {duration:?}"
        );
    }
}

#[test]
fn zero_duration_phase_stops_promptly() {
    let mut ctx = ctx(Duration::ZERO);

    let started = Instant::now();
    let _timer = start_timer(&mut ctx).unwrap();
    while !ctx.should_stop() {
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "stop timer never fired"
        );
        std::hint::spin_loop();
    }
}

#[test]
fn latched_threshold_outlives_timer_rearming() {
    let mut ctx = TestContext::new(
        ContextOptions::new("clock-monotonic", "bench")
            .duration(Duration::from_secs(5))
            .max_fails(1),
    )
    .unwrap();

    ctx.record_failure("mismatch");
    assert!(ctx.should_stop());

    // Re-arming for a second phase must not clear the latch.
    let _timer = start_timer(&mut ctx).unwrap();
    assert!(ctx.should_stop());
}
