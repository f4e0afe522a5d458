//! Run context: the single configuration-plus-state object threaded through
//! every test invocation.
//!
//! The context is owned by one thread. The only field shared with anything
//! asynchronous is the stop flag, which the timer expiration handler sets
//! and which suite loops poll.

use nix::sched::{sched_getaffinity, CpuSet};
use nix::unistd::Pid;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use vdso_common::{HarnessError, HarnessResult, DEFAULT_DURATION, DEFAULT_MAX_FAILS};

/// Options for constructing a [`TestContext`].
#[derive(Debug, Clone)]
pub struct ContextOptions {
    api: String,
    test_type: String,
    duration: Duration,
    max_fails: u64,
    verbose: bool,
    debug: bool,
}

impl ContextOptions {
    /// Start from defaults (1 second run, threshold of 10 failures).
    pub fn new(api: &str, test_type: &str) -> Self {
        Self {
            api: api.to_string(),
            test_type: test_type.to_string(),
            duration: DEFAULT_DURATION,
            max_fails: DEFAULT_MAX_FAILS,
            verbose: false,
            debug: false,
        }
    }

    /// Set the duration of a timed test phase.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the failure threshold.
    #[must_use]
    pub fn max_fails(mut self, max_fails: u64) -> Self {
        self.max_fails = max_fails;
        self
    }

    /// Enable verbose output.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable debug output; implies verbose.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Mutable configuration and live failure state for one test invocation.
#[derive(Debug)]
pub struct TestContext {
    api: String,
    test_type: String,
    cpus_allowed: Vec<usize>,
    duration: Duration,
    max_fails: u64,
    fails: u64,
    should_stop: Arc<AtomicBool>,
    verbose: bool,
    debug: bool,
}

impl TestContext {
    /// Construct a context from options and the live process affinity mask.
    ///
    /// # Errors
    ///
    /// Fails if the affinity query fails or yields an empty set. No testing
    /// is meaningful without at least one allowed CPU, so callers treat this
    /// as fatal.
    pub fn new(opts: ContextOptions) -> HarnessResult<Self> {
        let cpus_allowed = query_cpus_allowed()?;
        debug!(?cpus_allowed, "Run context initialized");

        Ok(Self {
            api: opts.api,
            test_type: opts.test_type,
            cpus_allowed,
            duration: opts.duration,
            max_fails: opts.max_fails,
            fails: 0,
            should_stop: Arc::new(AtomicBool::new(false)),
            verbose: opts.verbose || opts.debug,
            debug: opts.debug,
        })
    }

    /// Selected API name.
    pub fn api(&self) -> &str {
        &self.api
    }

    /// Selected test-type name.
    pub fn test_type(&self) -> &str {
        &self.test_type
    }

    /// CPU indices the process is allowed to run on. Never empty.
    pub fn cpus_allowed(&self) -> &[usize] {
        &self.cpus_allowed
    }

    /// Duration of a timed test phase.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Bench runs are really two tests: one timed phase for the syscall
    /// path and one for the vDSO path. Halving the duration keeps overall
    /// execution time at what the user asked for.
    pub fn halve_duration(&mut self) {
        self.duration /= 2;
    }

    /// Number of failures recorded so far in this invocation.
    pub fn fails(&self) -> u64 {
        self.fails
    }

    /// Whether the failure threshold has been reached.
    pub fn fail_threshold_reached(&self) -> bool {
        self.fails >= self.max_fails
    }

    /// Whether the current timed phase should stop.
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.should_stop.load(Ordering::Acquire)
    }

    /// Handle on the stop flag, shared with the timer expiration handler.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.should_stop)
    }

    /// Record one fast-path/slow-path inconsistency.
    ///
    /// The diagnostic is emitted immediately so failures stay visible even
    /// if the process is killed later. Crossing the threshold latches the
    /// stop flag for the remainder of the invocation.
    pub fn record_failure(&mut self, message: &str) {
        error!("{message}");
        self.fails += 1;
        if self.fails == self.max_fails {
            warn!(
                "Failure threshold ({}) reached; stopping test",
                self.max_fails
            );
        }
        if self.fails >= self.max_fails {
            self.should_stop.store(true, Ordering::Release);
        }
    }

    /// Print a trace line to standard output when verbose output is
    /// enabled.
    ///
    /// Trace lines are results-adjacent and share stdout with the bench
    /// figures and summary line; failure diagnostics stay on stderr.
    pub fn log_verbose(&self, message: &str) {
        if self.verbose {
            println!("{message}");
        }
    }

    /// Print a trace line to standard output when debug output is enabled.
    pub fn log_debug(&self, message: &str) {
        if self.debug {
            println!("{message}");
        }
    }
}

/// Query the live affinity mask of the calling process.
fn query_cpus_allowed() -> HarnessResult<Vec<usize>> {
    let set = sched_getaffinity(Pid::from_raw(0))
        .map_err(|e| HarnessError::Affinity(format!("sched_getaffinity: {e}")))?;

    let cpus: Vec<usize> = (0..CpuSet::count())
        .filter(|&cpu| set.is_set(cpu).unwrap_or(false))
        .collect();

    if cpus.is_empty() {
        return Err(HarnessError::Affinity(String::from(
            "process affinity mask is empty",
        )));
    }

    Ok(cpus)
}
