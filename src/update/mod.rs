//! # Sparse Updates
//!
//! Write-path compilation of change-sets into partial-update statements.

mod compiler;
mod statement;

pub use compiler::compile;
pub use statement::{ReturnValues, UpdateStatement};
