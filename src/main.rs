//! aerodata CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`, which reads the
//! request from stdin and writes the response to stdout. Errors are also
//! printed to stderr and the process exits non-zero.

use aerodata::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
