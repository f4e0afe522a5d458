//! Suite for the `clock_gettime` family, parameterized by clock id.
//!
//! One implementation serves clock-monotonic, clock-monotonic-coarse,
//! clock-realtime, and clock-realtime-coarse.

use std::io;
use tracing::debug;
use vdso_harness::{BenchResults, HarnessResult, TestContext, TestSuite};

use crate::{timed_phase, timespec_lte, timespec_nsec_valid};

/// Sandwich reads performed by one verify invocation.
const VERIFY_BATCH: usize = 1024;

/// A clock id no kernel assigns; both entry paths must reject it.
const INVALID_CLOCK: libc::clockid_t = libc::clockid_t::MAX;

/// Build the suite for one clock.
pub(crate) fn suite(name: &'static str, clock: libc::clockid_t) -> TestSuite {
    TestSuite::new(name)
        .with_verify(move |ctx| verify(ctx, clock))
        .with_abi(move |ctx| abi(ctx, clock))
        .with_bench(move |ctx, results| bench(ctx, results, clock))
}

/// Read the clock through the libc fast path (vDSO when available).
fn clock_gettime_vdso(clock: libc::clockid_t) -> io::Result<libc::timespec> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: ts is a valid out-pointer for the duration of the call.
    let rc = unsafe { libc::clock_gettime(clock, &mut ts) };
    if rc == 0 {
        Ok(ts)
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Read the clock through the raw syscall, bypassing the vDSO.
fn clock_gettime_syscall(clock: libc::clockid_t) -> io::Result<libc::timespec> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: ts is a valid out-pointer for the duration of the call.
    let rc = unsafe { libc::syscall(libc::SYS_clock_gettime, clock, &mut ts) };
    if rc == 0 {
        Ok(ts)
    } else {
        Err(io::Error::last_os_error())
    }
}

fn clock_getres_vdso(clock: libc::clockid_t) -> io::Result<libc::timespec> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: ts is a valid out-pointer for the duration of the call.
    let rc = unsafe { libc::clock_getres(clock, &mut ts) };
    if rc == 0 {
        Ok(ts)
    } else {
        Err(io::Error::last_os_error())
    }
}

fn clock_getres_syscall(clock: libc::clockid_t) -> io::Result<libc::timespec> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: ts is a valid out-pointer for the duration of the call.
    let rc = unsafe { libc::syscall(libc::SYS_clock_getres, clock, &mut ts) };
    if rc == 0 {
        Ok(ts)
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Bounded batch of syscall/vdso/syscall sandwich reads.
///
/// Each vDSO value must land between the two syscall values and carry a
/// well-formed nanosecond field; every violation is one recorded failure.
fn verify(ctx: &mut TestContext, clock: libc::clockid_t) {
    for _ in 0..VERIFY_BATCH {
        let before = match clock_gettime_syscall(clock) {
            Ok(ts) => ts,
            Err(e) => {
                ctx.record_failure(&format!("clock_gettime syscall failed: {e}"));
                return;
            }
        };
        let fast = match clock_gettime_vdso(clock) {
            Ok(ts) => ts,
            Err(e) => {
                ctx.record_failure(&format!("vdso clock_gettime failed: {e}"));
                return;
            }
        };
        let after = match clock_gettime_syscall(clock) {
            Ok(ts) => ts,
            Err(e) => {
                ctx.record_failure(&format!("clock_gettime syscall failed: {e}"));
                return;
            }
        };

        if !timespec_nsec_valid(&fast) {
            ctx.record_failure(&format!(
                "vdso clock_gettime returned invalid tv_nsec {}",
                fast.tv_nsec
            ));
        }

        if !(timespec_lte(&before, &fast) && timespec_lte(&fast, &after)) {
            ctx.record_failure(&format!(
                "clock value out of order: {}.{:09} / {}.{:09} / {}.{:09}",
                before.tv_sec,
                before.tv_nsec,
                fast.tv_sec,
                fast.tv_nsec,
                after.tv_sec,
                after.tv_nsec
            ));
        }

        if ctx.should_stop() {
            break;
        }
    }
}

/// Structural conformance: invalid clock ids must fail identically on both
/// entry paths, and the reported resolution must agree between them.
fn abi(ctx: &mut TestContext, clock: libc::clockid_t) {
    match clock_gettime_vdso(INVALID_CLOCK) {
        Ok(_) => ctx.record_failure("vdso clock_gettime accepted an invalid clock id"),
        Err(e) if e.raw_os_error() != Some(libc::EINVAL) => {
            ctx.record_failure(&format!("vdso clock_gettime: expected EINVAL, got {e}"));
        }
        Err(_) => {}
    }

    match clock_gettime_syscall(INVALID_CLOCK) {
        Ok(_) => ctx.record_failure("clock_gettime syscall accepted an invalid clock id"),
        Err(e) if e.raw_os_error() != Some(libc::EINVAL) => {
            ctx.record_failure(&format!("clock_gettime syscall: expected EINVAL, got {e}"));
        }
        Err(_) => {}
    }

    match (clock_getres_vdso(clock), clock_getres_syscall(clock)) {
        (Ok(fast), Ok(slow)) => {
            debug!(
                res_sec = fast.tv_sec,
                res_nsec = fast.tv_nsec,
                "clock resolution"
            );
            if fast.tv_sec != slow.tv_sec || fast.tv_nsec != slow.tv_nsec {
                ctx.record_failure(&format!(
                    "clock_getres disagrees between paths: {}.{:09} vs {}.{:09}",
                    fast.tv_sec, fast.tv_nsec, slow.tv_sec, slow.tv_nsec
                ));
            }
        }
        (Err(e), _) => ctx.record_failure(&format!("vdso clock_getres failed: {e}")),
        (_, Err(e)) => ctx.record_failure(&format!("clock_getres syscall failed: {e}")),
    }
}

/// Two timed phases: syscall path first, vDSO path second.
fn bench(
    ctx: &mut TestContext,
    results: &mut BenchResults,
    clock: libc::clockid_t,
) -> HarnessResult<()> {
    let (calls, elapsed) = timed_phase(ctx, || clock_gettime_syscall(clock).is_ok())?;
    results.sys.record(calls, elapsed);

    let (calls, elapsed) = timed_phase(ctx, || clock_gettime_vdso(clock).is_ok())?;
    results.vdso.record(calls, elapsed);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdso_harness::ContextOptions;

    fn ctx() -> TestContext {
        TestContext::new(ContextOptions::new("clock-monotonic", "verify")).unwrap()
    }

    #[test]
    fn test_both_paths_read_monotonic() {
        let slow = clock_gettime_syscall(libc::CLOCK_MONOTONIC).unwrap();
        let fast = clock_gettime_vdso(libc::CLOCK_MONOTONIC).unwrap();
        assert!(timespec_nsec_valid(&slow));
        assert!(timespec_nsec_valid(&fast));
        assert!(timespec_lte(&slow, &fast));
    }

    #[test]
    fn test_invalid_clock_rejected_on_both_paths() {
        let e = clock_gettime_vdso(INVALID_CLOCK).unwrap_err();
        assert_eq!(e.raw_os_error(), Some(libc::EINVAL));
        let e = clock_gettime_syscall(INVALID_CLOCK).unwrap_err();
        assert_eq!(e.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn test_verify_records_no_failures_on_healthy_system() {
        let mut ctx = ctx();
        verify(&mut ctx, libc::CLOCK_MONOTONIC);
        assert_eq!(ctx.fails(), 0);
    }

    #[test]
    fn test_abi_records_no_failures_on_healthy_system() {
        let mut ctx = ctx();
        abi(&mut ctx, libc::CLOCK_MONOTONIC);
        assert_eq!(ctx.fails(), 0);
    }

    #[test]
    fn test_suite_implements_all_three_modes() {
        let suite = suite("clock-monotonic", libc::CLOCK_MONOTONIC);
        assert!(suite.verify().is_some());
        assert!(suite.bench().is_some());
        assert!(suite.abi().is_some());
    }
}
