//! Stop timer: a one-shot countdown against the monotonic clock.
//!
//! Arming the timer installs an `SA_SIGINFO` handler for `SIGRTMAX` and
//! creates a POSIX timer whose signal carries a pointer to the context's
//! stop flag. The handler performs exactly one atomic store and returns;
//! delivery is asynchronous, so loops must poll [`TestContext::should_stop`]
//! rather than assume synchronous cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use vdso_common::{HarnessError, HarnessResult};

use crate::ctx::TestContext;

/// Guard for an armed kernel timer.
///
/// Holds the stop flag alive for as long as the kernel-side sigevent points
/// at it, and deletes the timer on drop.
#[derive(Debug)]
pub struct StopTimer {
    timer_id: libc::timer_t,
    _stop_flag: Arc<AtomicBool>,
}

impl Drop for StopTimer {
    fn drop(&mut self) {
        // SAFETY: timer_id came from timer_create and is deleted exactly once.
        unsafe {
            libc::timer_delete(self.timer_id);
        }
    }
}

/// Arm a one-shot stop timer with the context's current duration.
///
/// Clears the stop flag first, unless the failure threshold has latched it:
/// the threshold latch is one-way for the whole invocation even though bench
/// re-arms the timer for its second phase.
///
/// # Errors
///
/// Handler installation, timer creation, and arming failures are all
/// surfaced as [`HarnessError::Timer`]; callers treat them as fatal.
pub fn start_timer(ctx: &mut TestContext) -> HarnessResult<StopTimer> {
    let stop_flag = ctx.stop_flag();
    if !ctx.fail_threshold_reached() {
        stop_flag.store(false, Ordering::Release);
    }

    install_expiration_handler()?;

    // SAFETY: sigevent is zero-initialized and then fully filled in; the
    // sival_ptr stays valid because StopTimer keeps the Arc alive until the
    // timer is deleted.
    let mut sev: libc::sigevent = unsafe { std::mem::zeroed() };
    sev.sigev_notify = libc::SIGEV_SIGNAL;
    sev.sigev_signo = libc::SIGRTMAX();
    sev.sigev_value = libc::sigval {
        sival_ptr: Arc::as_ptr(&stop_flag) as *mut libc::c_void,
    };

    let mut timer_id: libc::timer_t = std::ptr::null_mut();
    // SAFETY: sev and timer_id are valid for the duration of the call.
    let rc = unsafe { libc::timer_create(libc::CLOCK_MONOTONIC, &mut sev, &mut timer_id) };
    if rc != 0 {
        return Err(HarnessError::Timer(format!(
            "timer_create: {}",
            std::io::Error::last_os_error()
        )));
    }

    let timer = StopTimer {
        timer_id,
        _stop_flag: stop_flag,
    };

    let spec = one_shot_spec(ctx.duration());
    // SAFETY: timer_id refers to the live timer created above.
    let rc = unsafe { libc::timer_settime(timer.timer_id, 0, &spec, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(HarnessError::Timer(format!(
            "timer_settime: {}",
            std::io::Error::last_os_error()
        )));
    }

    debug!(duration = ?ctx.duration(), "Armed one-shot stop timer");
    Ok(timer)
}

/// Install the `SIGRTMAX` expiration handler.
fn install_expiration_handler() -> HarnessResult<()> {
    // SAFETY: the handler only performs an atomic store, which is
    // async-signal-safe.
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_flags = libc::SA_SIGINFO;
        sa.sa_sigaction = expiration_handler as libc::sighandler_t;
        libc::sigemptyset(&mut sa.sa_mask);

        if libc::sigaction(libc::SIGRTMAX(), &sa, std::ptr::null_mut()) != 0 {
            return Err(HarnessError::Timer(format!(
                "sigaction: {}",
                std::io::Error::last_os_error()
            )));
        }
    }
    Ok(())
}

/// Signal handler: set the stop flag carried in the signal value, nothing
/// else. Runs at an arbitrary instruction boundary of the main thread.
extern "C" fn expiration_handler(
    _sig: libc::c_int,
    info: *mut libc::siginfo_t,
    _ucontext: *mut libc::c_void,
) {
    if info.is_null() {
        return;
    }
    // SAFETY: the sigevent that queued this signal carries a pointer to an
    // AtomicBool kept alive by the StopTimer that armed the timer.
    unsafe {
        let flag = (*info).si_value().sival_ptr as *const AtomicBool;
        if !flag.is_null() {
            (*flag).store(true, Ordering::Release);
        }
    }
}

/// One-shot itimerspec for the given countdown.
fn one_shot_spec(duration: Duration) -> libc::itimerspec {
    let mut it_value = libc::timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };
    // An all-zero it_value disarms the timer instead of expiring it, so a
    // zero-length phase is armed with the smallest representable countdown.
    if it_value.tv_sec == 0 && it_value.tv_nsec == 0 {
        it_value.tv_nsec = 1;
    }

    libc::itimerspec {
        it_interval: libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        },
        it_value,
    }
}
