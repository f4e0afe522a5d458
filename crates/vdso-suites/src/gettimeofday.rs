//! Suite for `gettimeofday`.
//!
//! The vDSO value is sandwiched between two raw `CLOCK_REALTIME` syscall
//! reads, with everything truncated to microseconds since that is all the
//! interface reports. The abi slot is left unset.

use std::io;
use vdso_harness::{BenchResults, HarnessResult, TestContext, TestSuite};

use crate::{timed_phase, timespec_to_usecs, timeval_to_usecs};

const VERIFY_BATCH: usize = 1024;

const USEC_PER_SEC: i64 = 1_000_000;

pub(crate) fn suite() -> TestSuite {
    TestSuite::new("gettimeofday")
        .with_verify(verify)
        .with_bench(bench)
}

/// Read wall-clock time through the libc fast path.
fn gettimeofday_vdso() -> io::Result<libc::timeval> {
    let mut tv = libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    // SAFETY: tv is a valid out-pointer; a null timezone is permitted.
    let rc = unsafe { libc::gettimeofday(&mut tv, std::ptr::null_mut()) };
    if rc == 0 {
        Ok(tv)
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Read wall-clock time through the raw syscall.
fn gettimeofday_syscall() -> io::Result<libc::timeval> {
    let mut tv = libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    // SAFETY: tv is a valid out-pointer; a null timezone is permitted.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_gettimeofday,
            &mut tv,
            std::ptr::null_mut::<libc::c_void>(),
        )
    };
    if rc == 0 {
        Ok(tv)
    } else {
        Err(io::Error::last_os_error())
    }
}

fn realtime_syscall_usecs() -> io::Result<i64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: ts is a valid out-pointer for the duration of the call.
    let rc = unsafe { libc::syscall(libc::SYS_clock_gettime, libc::CLOCK_REALTIME, &mut ts) };
    if rc == 0 {
        Ok(timespec_to_usecs(&ts))
    } else {
        Err(io::Error::last_os_error())
    }
}

fn verify(ctx: &mut TestContext) {
    for _ in 0..VERIFY_BATCH {
        let before = match realtime_syscall_usecs() {
            Ok(us) => us,
            Err(e) => {
                ctx.record_failure(&format!("clock_gettime syscall failed: {e}"));
                return;
            }
        };
        let fast = match gettimeofday_vdso() {
            Ok(tv) => tv,
            Err(e) => {
                ctx.record_failure(&format!("vdso gettimeofday failed: {e}"));
                return;
            }
        };
        let after = match realtime_syscall_usecs() {
            Ok(us) => us,
            Err(e) => {
                ctx.record_failure(&format!("clock_gettime syscall failed: {e}"));
                return;
            }
        };

        if !(0..USEC_PER_SEC).contains(&(fast.tv_usec as i64)) {
            ctx.record_failure(&format!(
                "vdso gettimeofday returned invalid tv_usec {}",
                fast.tv_usec
            ));
        }

        let fast_us = timeval_to_usecs(&fast);
        if !(before <= fast_us && fast_us <= after) {
            ctx.record_failure(&format!(
                "wall clock out of order: {before}us / {fast_us}us / {after}us"
            ));
        }

        if ctx.should_stop() {
            break;
        }
    }
}

fn bench(ctx: &mut TestContext, results: &mut BenchResults) -> HarnessResult<()> {
    let (calls, elapsed) = timed_phase(ctx, || gettimeofday_syscall().is_ok())?;
    results.sys.record(calls, elapsed);

    let (calls, elapsed) = timed_phase(ctx, || gettimeofday_vdso().is_ok())?;
    results.vdso.record(calls, elapsed);

    Ok(())
}
