//! Per-API test suites: each probes one time/CPU primitive through its
//! vDSO fast path and its raw syscall fallback.

pub mod clock_gettime;
pub mod getcpu;
pub mod gettimeofday;

use std::time::{Duration, Instant};
use vdso_harness::{start_timer, HarnessResult, SuiteRegistry, TestContext};

/// Register every suite shipped with this binary.
///
/// This is the single startup routine the binary drives; nothing registers
/// itself at load time.
pub fn register_all(registry: &mut SuiteRegistry) {
    registry.register(clock_gettime::suite("clock-monotonic", libc::CLOCK_MONOTONIC));
    registry.register(clock_gettime::suite(
        "clock-monotonic-coarse",
        libc::CLOCK_MONOTONIC_COARSE,
    ));
    registry.register(clock_gettime::suite("clock-realtime", libc::CLOCK_REALTIME));
    registry.register(clock_gettime::suite(
        "clock-realtime-coarse",
        libc::CLOCK_REALTIME_COARSE,
    ));
    registry.register(gettimeofday::suite());
    registry.register(getcpu::suite());
}

/// Run one timed bench phase: arm the stop timer, then issue `probe` in a
/// tight loop until the stop flag is observed, counting successful calls.
///
/// Returns the call count and measured elapsed time. A timer setup error
/// is fatal for the whole run and propagates untouched; it is never
/// downgraded to a counted failure.
pub(crate) fn timed_phase(
    ctx: &mut TestContext,
    mut probe: impl FnMut() -> bool,
) -> HarnessResult<(u64, Duration)> {
    let timer = start_timer(ctx)?;

    let started = Instant::now();
    let mut calls: u64 = 0;
    while !ctx.should_stop() {
        if !probe() {
            ctx.record_failure("probe call failed during bench phase");
            break;
        }
        calls += 1;
    }
    let elapsed = started.elapsed();
    drop(timer);

    Ok((calls, elapsed))
}

/// Lexicographic ordering on (tv_sec, tv_nsec).
pub(crate) fn timespec_lte(a: &libc::timespec, b: &libc::timespec) -> bool {
    (a.tv_sec, a.tv_nsec) <= (b.tv_sec, b.tv_nsec)
}

/// A well-formed timespec carries a nanosecond field in [0, 1e9).
pub(crate) fn timespec_nsec_valid(ts: &libc::timespec) -> bool {
    (0..1_000_000_000).contains(&ts.tv_nsec)
}

pub(crate) fn timespec_to_usecs(ts: &libc::timespec) -> i64 {
    ts.tv_sec as i64 * 1_000_000 + ts.tv_nsec as i64 / 1_000
}

pub(crate) fn timeval_to_usecs(tv: &libc::timeval) -> i64 {
    tv.tv_sec as i64 * 1_000_000 + tv.tv_usec as i64
}
