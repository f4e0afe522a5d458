//! Test-execution engine for vdsotest: the run context, stop timer,
//! registries, and dispatcher that every suite runs under.

pub mod bench;
pub mod ctx;
pub mod dispatch;
pub mod registry;
pub mod timer;

pub use vdso_common::{HarnessError, HarnessResult};

pub use bench::*;
pub use ctx::*;
pub use dispatch::*;
pub use registry::*;
pub use timer::*;
