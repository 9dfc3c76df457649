//! CLI command implementations.

pub mod credentials;
pub mod market;
pub mod size;
pub mod task;
pub mod validate;
