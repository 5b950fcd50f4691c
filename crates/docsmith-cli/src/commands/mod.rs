//! Command implementations.

pub mod extract;
pub mod generate;
pub mod sources;
