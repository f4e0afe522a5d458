//! Suite for `getcpu`.
//!
//! The scheduler may migrate the process between any two reads, so the two
//! paths are not compared against each other; each value is instead checked
//! for membership in the context's allowed-CPU set. The abi slot is left
//! unset.

use std::io;
use vdso_harness::{BenchResults, HarnessResult, TestContext, TestSuite};

use crate::timed_phase;

const VERIFY_BATCH: usize = 1024;

pub(crate) fn suite() -> TestSuite {
    TestSuite::new("getcpu").with_verify(verify).with_bench(bench)
}

/// Current CPU through the libc fast path.
fn getcpu_vdso() -> io::Result<usize> {
    // SAFETY: sched_getcpu takes no pointers.
    let rc = unsafe { libc::sched_getcpu() };
    if rc >= 0 {
        Ok(rc as usize)
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Current CPU through the raw syscall.
fn getcpu_syscall() -> io::Result<usize> {
    let mut cpu: libc::c_uint = 0;
    // SAFETY: cpu is a valid out-pointer; node and the unused cache
    // argument may be null.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_getcpu,
            &mut cpu,
            std::ptr::null_mut::<libc::c_uint>(),
            std::ptr::null_mut::<libc::c_void>(),
        )
    };
    if rc == 0 {
        Ok(cpu as usize)
    } else {
        Err(io::Error::last_os_error())
    }
}

fn verify(ctx: &mut TestContext) {
    for _ in 0..VERIFY_BATCH {
        let fast = match getcpu_vdso() {
            Ok(cpu) => cpu,
            Err(e) => {
                ctx.record_failure(&format!("vdso getcpu failed: {e}"));
                return;
            }
        };
        let slow = match getcpu_syscall() {
            Ok(cpu) => cpu,
            Err(e) => {
                ctx.record_failure(&format!("getcpu syscall failed: {e}"));
                return;
            }
        };

        if !ctx.cpus_allowed().contains(&fast) {
            ctx.record_failure(&format!("vdso getcpu returned disallowed cpu {fast}"));
        }
        if !ctx.cpus_allowed().contains(&slow) {
            ctx.record_failure(&format!("getcpu syscall returned disallowed cpu {slow}"));
        }

        if ctx.should_stop() {
            break;
        }
    }
}

fn bench(ctx: &mut TestContext, results: &mut BenchResults) -> HarnessResult<()> {
    let (calls, elapsed) = timed_phase(ctx, || getcpu_syscall().is_ok())?;
    results.sys.record(calls, elapsed);

    let (calls, elapsed) = timed_phase(ctx, || getcpu_vdso().is_ok())?;
    results.vdso.record(calls, elapsed);

    Ok(())
}
