//! Acceptance tests for the vdsotest engine.
//!
//! These exercise the execution engine end to end through fake suites:
//! dispatch outcomes, the failure threshold latch, and the duration-bounded
//! stop timer. The real suites are covered by the vdso-cli binary tests.

mod acceptance;
