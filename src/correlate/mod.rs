//! Cross-source correlation: executions, their artifacts and their commits
//! folded into one record per task.

pub mod artifacts;
pub mod assembler;
pub mod backends;
pub mod commits;
pub mod links;
pub mod matrix;
pub mod report;
pub mod summary;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::{Backends, DatasetAssembler, LinkHosts};
