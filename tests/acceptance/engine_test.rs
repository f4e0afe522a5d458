//! Dispatch scenarios driven through fake suites.

use std::time::Duration;
use vdso_harness::{
    summary_line, ContextOptions, Harness, HarnessError, ModeRegistry, SuiteRegistry, TestContext,
    TestOutcome, TestSuite,
};

fn ctx(api: &str, test_type: &str, max_fails: u64) -> TestContext {
    TestContext::new(
        ContextOptions::new(api, test_type)
            .duration(Duration::from_millis(50))
            .max_fails(max_fails),
    )
    .unwrap()
}

fn harness_with(suite: TestSuite) -> Harness {
    let mut suites = SuiteRegistry::new();
    suites.register(suite);
    Harness::new(suites, ModeRegistry::standard())
}

#[test]
fn verify_with_zero_failures_exits_clean() {
    let harness = harness_with(TestSuite::new("clock-monotonic").with_verify(|_| {}));
    let mut ctx = ctx("clock-monotonic", "verify", 10);

    let outcome = harness.dispatch(&mut ctx).unwrap();

    assert_eq!(outcome, TestOutcome::Ok);
    assert_eq!(ctx.fails(), 0);
    assert_eq!(
        summary_line("clock-monotonic", "verify", outcome, ctx.fails()),
        None
    );
}

#[test]
fn verify_with_three_mismatches_fails_with_count() {
    let harness = harness_with(TestSuite::new("clock-monotonic").with_verify(|ctx| {
        for _ in 0..3 {
            ctx.record_failure("vdso value does not match syscall value");
        }
    }));
    let mut ctx = ctx("clock-monotonic", "verify", 10);

    let outcome = harness.dispatch(&mut ctx).unwrap();

    assert_eq!(outcome, TestOutcome::Fail);
    assert_eq!(ctx.fails(), 3);
    assert!(!ctx.should_stop(), "threshold of 10 must not latch at 3");
    assert_eq!(
        summary_line("clock-monotonic", "verify", outcome, ctx.fails()).as_deref(),
        Some("clock-monotonic/verify: 3 failures/inconsistencies encountered")
    );
}

#[test]
fn missing_bench_slot_is_noimpl_without_side_effects() {
    let harness = harness_with(TestSuite::new("clock-monotonic").with_verify(|_| {}));
    let mut ctx = ctx("clock-monotonic", "bench", 10);

    let outcome = harness.dispatch(&mut ctx).unwrap();

    assert_eq!(outcome, TestOutcome::NoImpl);
    assert_eq!(ctx.fails(), 0);
    assert!(!ctx.should_stop());
    assert_eq!(ctx.duration(), Duration::from_millis(50));
    assert_eq!(
        summary_line("clock-monotonic", "bench", outcome, ctx.fails()).as_deref(),
        Some("clock-monotonic/bench: unimplemented")
    );
}

#[test]
fn bench_phases_share_the_requested_budget() {
    let harness = harness_with(TestSuite::new("clock-monotonic").with_bench(|ctx, results| {
        // Each phase is bounded by half the requested duration.
        assert_eq!(ctx.duration(), Duration::from_secs(5));
        results.sys.record(1_000, ctx.duration());
        results.vdso.record(30_000, ctx.duration());
        Ok(())
    }));
    let mut ctx = TestContext::new(
        ContextOptions::new("clock-monotonic", "bench").duration(Duration::from_secs(10)),
    )
    .unwrap();

    assert_eq!(harness.dispatch(&mut ctx).unwrap(), TestOutcome::Ok);
}

#[test]
fn fails_accumulate_across_bench_phases() {
    let harness = harness_with(TestSuite::new("clock-monotonic").with_bench(|ctx, _| {
        // One inconsistency per phase; the counter never resets in between.
        ctx.record_failure("syscall phase mismatch");
        ctx.record_failure("vdso phase mismatch");
        Ok(())
    }));
    let mut ctx = ctx("clock-monotonic", "bench", 10);

    let outcome = harness.dispatch(&mut ctx).unwrap();

    assert_eq!(outcome, TestOutcome::Fail);
    assert_eq!(ctx.fails(), 2);
}

#[test]
fn threshold_crossing_latches_the_stop_flag() {
    let harness = harness_with(TestSuite::new("clock-monotonic").with_verify(|ctx| {
        for _ in 0..5 {
            ctx.record_failure("mismatch");
            if ctx.should_stop() {
                break;
            }
        }
    }));
    let mut ctx = ctx("clock-monotonic", "verify", 3);

    let outcome = harness.dispatch(&mut ctx).unwrap();

    assert_eq!(outcome, TestOutcome::Fail);
    assert_eq!(ctx.fails(), 3, "loop must observe the latch and stop");
    assert!(ctx.should_stop());
}

#[test]
fn bench_timer_errors_abort_the_run() {
    let harness = harness_with(TestSuite::new("clock-monotonic").with_bench(|_, _| {
        Err(HarnessError::Timer(String::from(
            "timer_create: Resource temporarily unavailable",
        )))
    }));
    let mut ctx = ctx("clock-monotonic", "bench", 10);

    let err = harness.dispatch(&mut ctx).unwrap_err();

    assert!(matches!(err, HarnessError::Timer(_)), "got {err:?}");
    assert_eq!(ctx.fails(), 0, "a fatal error is not a counted failure");
}

#[test]
fn unknown_names_are_fatal_errors() {
    let mut suites = SuiteRegistry::new();
    vdso_suites::register_all(&mut suites);
    let harness = Harness::new(suites, ModeRegistry::standard());

    let mut bogus_api = ctx("bogus-clock", "verify", 10);
    let err = harness.dispatch(&mut bogus_api).unwrap_err();
    assert!(err.to_string().contains("bogus-clock"));

    let mut bogus_mode = ctx("clock-monotonic", "soak", 10);
    let err = harness.dispatch(&mut bogus_mode).unwrap_err();
    assert!(err.to_string().contains("soak"));
}

#[test]
fn real_gettimeofday_suite_has_no_abi_mode() {
    let mut suites = SuiteRegistry::new();
    vdso_suites::register_all(&mut suites);
    let harness = Harness::new(suites, ModeRegistry::standard());

    let mut ctx = ctx("gettimeofday", "abi", 10);
    assert_eq!(harness.dispatch(&mut ctx).unwrap(), TestOutcome::NoImpl);
}
