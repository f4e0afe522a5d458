//! Engine acceptance scenarios.

mod engine_test;
mod timer_test;
