//! Test-suite registry: the name-to-implementation mapping populated by
//! suite plugins during startup.
//!
//! Registration is driven explicitly from one startup routine before any
//! dispatch happens; the registry is effectively immutable afterwards.

use std::collections::BTreeMap;
use tracing::debug;
use vdso_common::HarnessResult;

use crate::bench::BenchResults;
use crate::ctx::TestContext;

/// Callback slot for the verify and abi modes.
pub type CheckFn = Box<dyn Fn(&mut TestContext)>;

/// Callback slot for the bench mode. Bench arms the stop timer, and timer
/// setup failures are fatal, so the slot is fallible.
pub type BenchFn = Box<dyn Fn(&mut TestContext, &mut BenchResults) -> HarnessResult<()>>;

/// One API's test suite: a name plus up to three optional callbacks.
///
/// A missing slot means the suite does not implement that mode; the
/// dispatcher reports it as unimplemented rather than failing.
pub struct TestSuite {
    name: &'static str,
    verify: Option<CheckFn>,
    bench: Option<BenchFn>,
    abi: Option<CheckFn>,
}

impl TestSuite {
    /// Create an empty suite for the given API name.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            verify: None,
            bench: None,
            abi: None,
        }
    }

    /// Attach the verify callback.
    #[must_use]
    pub fn with_verify(mut self, f: impl Fn(&mut TestContext) + 'static) -> Self {
        self.verify = Some(Box::new(f));
        self
    }

    /// Attach the bench callback.
    #[must_use]
    pub fn with_bench(
        mut self,
        f: impl Fn(&mut TestContext, &mut BenchResults) -> HarnessResult<()> + 'static,
    ) -> Self {
        self.bench = Some(Box::new(f));
        self
    }

    /// Attach the abi callback.
    #[must_use]
    pub fn with_abi(mut self, f: impl Fn(&mut TestContext) + 'static) -> Self {
        self.abi = Some(Box::new(f));
        self
    }

    /// API name this suite is registered under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Verify callback, if implemented.
    pub fn verify(&self) -> Option<&(dyn Fn(&mut TestContext) + 'static)> {
        self.verify.as_deref()
    }

    /// Bench callback, if implemented.
    pub fn bench(
        &self,
    ) -> Option<&(dyn Fn(&mut TestContext, &mut BenchResults) -> HarnessResult<()> + 'static)>
    {
        self.bench.as_deref()
    }

    /// Abi callback, if implemented.
    pub fn abi(&self) -> Option<&(dyn Fn(&mut TestContext) + 'static)> {
        self.abi.as_deref()
    }
}

impl std::fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("verify", &self.verify.is_some())
            .field("bench", &self.bench.is_some())
            .field("abi", &self.abi.is_some())
            .finish()
    }
}

/// Name-to-suite mapping. Last write wins on name collisions; in normal use
/// every suite owns a disjoint name.
#[derive(Debug, Default)]
pub struct SuiteRegistry {
    suites: BTreeMap<&'static str, TestSuite>,
}

impl SuiteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a suite under its name.
    pub fn register(&mut self, suite: TestSuite) {
        debug!(name = suite.name(), "Registered test suite");
        self.suites.insert(suite.name(), suite);
    }

    /// Look up a suite by API name.
    pub fn lookup(&self, name: &str) -> Option<&TestSuite> {
        self.suites.get(name)
    }

    /// Registered API names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.suites.keys().copied()
    }

    /// Number of registered suites.
    pub fn len(&self) -> usize {
        self.suites.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}
