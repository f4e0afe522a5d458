//! Dispatcher: resolves the requested API and test-type against the two
//! registries and runs the matching execution mode.
//!
//! Three execution modes share one shape: check the callback slot, invoke
//! it once, and derive the outcome from the context's failure counter. Only
//! bench adds work around the invocation (duration halving and result
//! printing).

use std::collections::BTreeMap;
use vdso_common::{HarnessError, HarnessResult};

use crate::bench::BenchResults;
use crate::ctx::TestContext;
use crate::registry::{SuiteRegistry, TestSuite};

/// Terminal outcome of one test invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    /// Test completed without failure.
    Ok,
    /// One or more failures/inconsistencies encountered.
    Fail,
    /// The selected suite does not implement the requested mode.
    NoImpl,
}

/// An execution-mode routine.
pub type TestFn = fn(&mut TestContext, &TestSuite) -> HarnessResult<TestOutcome>;

/// Run the suite's verify callback once; no timer involved.
///
/// # Errors
///
/// Verify callbacks are infallible today; the signature matches the other
/// modes so all three share one registry slot type.
pub fn run_verify(ctx: &mut TestContext, suite: &TestSuite) -> HarnessResult<TestOutcome> {
    let Some(verify) = suite.verify() else {
        return Ok(TestOutcome::NoImpl);
    };

    verify(ctx);

    Ok(if ctx.fails() > 0 {
        TestOutcome::Fail
    } else {
        TestOutcome::Ok
    })
}

/// Run the suite's abi callback once; same shape as verify.
///
/// # Errors
///
/// Abi callbacks are infallible today; see [`run_verify`].
pub fn run_abi(ctx: &mut TestContext, suite: &TestSuite) -> HarnessResult<TestOutcome> {
    let Some(abi) = suite.abi() else {
        return Ok(TestOutcome::NoImpl);
    };

    abi(ctx);

    Ok(if ctx.fails() > 0 {
        TestOutcome::Fail
    } else {
        TestOutcome::Ok
    })
}

/// Run the suite's bench callback and print the measured rates.
///
/// The configured duration is halved first so the two phases (syscall path,
/// then vDSO path) together consume the requested wall-clock budget.
///
/// # Errors
///
/// A timer setup error inside the callback aborts the whole run; it is
/// never downgraded to a counted failure.
pub fn run_bench(ctx: &mut TestContext, suite: &TestSuite) -> HarnessResult<TestOutcome> {
    let Some(bench) = suite.bench() else {
        return Ok(TestOutcome::NoImpl);
    };

    ctx.halve_duration();

    let mut results = BenchResults::default();
    bench(ctx, &mut results)?;

    if ctx.fails() > 0 {
        return Ok(TestOutcome::Fail);
    }

    ctx.log_verbose(&format!(
        "{}: syscalls = {}, vdso calls = {}",
        suite.name(),
        results.sys.calls(),
        results.vdso.calls()
    ));

    println!(
        "{} system calls per second: {}",
        suite.name(),
        results.sys.calls_per_sec()
    );
    println!(
        "{} vdso calls per second:   {} ({:.2}x speedup)",
        suite.name(),
        results.vdso.calls_per_sec(),
        results.speedup()
    );

    Ok(TestOutcome::Ok)
}

/// Fixed name-to-mode mapping: verify, bench, abi.
#[derive(Debug)]
pub struct ModeRegistry {
    modes: BTreeMap<&'static str, TestFn>,
}

impl ModeRegistry {
    /// The standard three execution modes.
    pub fn standard() -> Self {
        let mut modes: BTreeMap<&'static str, TestFn> = BTreeMap::new();
        modes.insert("verify", run_verify);
        modes.insert("bench", run_bench);
        modes.insert("abi", run_abi);
        Self { modes }
    }

    /// Look up an execution mode by test-type name.
    pub fn lookup(&self, name: &str) -> Option<TestFn> {
        self.modes.get(name).copied()
    }

    /// Registered test-type names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modes.keys().copied()
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// The dispatcher: both registries plus the resolution logic.
#[derive(Debug)]
pub struct Harness {
    suites: SuiteRegistry,
    modes: ModeRegistry,
}

impl Harness {
    /// Build a dispatcher from populated registries.
    pub fn new(suites: SuiteRegistry, modes: ModeRegistry) -> Self {
        Self { suites, modes }
    }

    /// Resolve the context's API and test-type and run the matching mode.
    ///
    /// # Errors
    ///
    /// Unresolvable names and timer setup errors are fatal top-level
    /// errors, not per-call failures.
    pub fn dispatch(&self, ctx: &mut TestContext) -> HarnessResult<TestOutcome> {
        let suite = self
            .suites
            .lookup(ctx.api())
            .ok_or_else(|| HarnessError::UnknownApi(ctx.api().to_string()))?;

        let mode = self
            .modes
            .lookup(ctx.test_type())
            .ok_or_else(|| HarnessError::UnknownTestType(ctx.test_type().to_string()))?;

        mode(ctx, suite)
    }

    /// The suite registry.
    pub fn suites(&self) -> &SuiteRegistry {
        &self.suites
    }

    /// The mode registry.
    pub fn modes(&self) -> &ModeRegistry {
        &self.modes
    }
}

/// Final summary line for stdout, if the outcome warrants one.
pub fn summary_line(
    api: &str,
    test_type: &str,
    outcome: TestOutcome,
    fails: u64,
) -> Option<String> {
    match outcome {
        TestOutcome::NoImpl => Some(format!("{api}/{test_type}: unimplemented")),
        TestOutcome::Fail => Some(format!(
            "{api}/{test_type}: {fails} failures/inconsistencies encountered"
        )),
        TestOutcome::Ok => None,
    }
}
