//! Common types shared across the vdsotest workspace.

pub mod config;
pub mod error;

pub use config::*;
pub use error::*;
