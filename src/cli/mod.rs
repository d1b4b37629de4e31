//! CLI module for aerodata
//!
//! Developer tooling over the library:
//! - compile-update: change-set → update statement
//! - cursor: native key ↔ opaque cursor
//! - project: record → projection
//! - reconstruct: records → aggregate

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, CursorAction};
pub use commands::{compile_update, cursor, project, reconstruct, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
