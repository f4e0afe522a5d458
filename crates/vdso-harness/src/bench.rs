//! Bench results: transient per-invocation measurements of the syscall and
//! vDSO phases.

use std::time::Duration;

/// One measured phase: how many calls completed and the derived rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BenchInterval {
    calls: u64,
    calls_per_sec: u64,
}

impl BenchInterval {
    /// Record a completed phase and derive its calls-per-second rate.
    ///
    /// A zero elapsed time yields a zero rate rather than a division error.
    pub fn record(&mut self, calls: u64, elapsed: Duration) {
        self.calls = calls;
        let secs = elapsed.as_secs_f64();
        self.calls_per_sec = if secs > 0.0 {
            (calls as f64 / secs) as u64
        } else {
            0
        };
    }

    /// Number of calls completed during the phase.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Derived calls-per-second rate.
    pub fn calls_per_sec(&self) -> u64 {
        self.calls_per_sec
    }
}

/// The two measured phases of one bench invocation.
///
/// Created fresh for each bench run, owned by the bench execution mode, and
/// discarded after printing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BenchResults {
    /// Syscall-path phase.
    pub sys: BenchInterval,
    /// vDSO-path phase.
    pub vdso: BenchInterval,
}

impl BenchResults {
    /// Speedup of the vDSO path over the syscall path.
    ///
    /// Plain floating-point division: a zero syscall rate yields infinity
    /// (or NaN when both rates are zero), never a panic.
    pub fn speedup(&self) -> f64 {
        self.vdso.calls_per_sec() as f64 / self.sys.calls_per_sec() as f64
    }
}
