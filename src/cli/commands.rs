//! CLI command implementations
//!
//! Each command is a pure function of its request document (plus any
//! definition file) so it can be exercised without a terminal; [`run`]
//! handles stdin/stdout and the exit status.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::config::{Config, LogConfig};
use crate::mapper::{
    AggregateReconstructor, AggregateSpec, FieldPolicy, MapContext, PolicySpec, ProjectionMapper,
};
use crate::pagination::{decode_cursor, encode_cursor};
use crate::record::{from_value, ChangeSet, Record};
use crate::update::compile;

use super::args::{Cli, Command, CursorAction};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// Parse arguments, run the command and write its response
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    configure_logging(cli.config.as_deref())?;

    let result = read_request().and_then(|input| run_command(cli.command, input));
    match result {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run one command against its request document
pub fn run_command(cmd: Command, input: Value) -> CliResult<Value> {
    match cmd {
        Command::CompileUpdate => compile_update(input),
        Command::Cursor { action } => cursor(action, input),
        Command::Project { policy } => {
            let policy: FieldPolicy = match policy {
                Some(path) => load_definition::<PolicySpec>(&path)?.into(),
                None => FieldPolicy::new(),
            };
            block_on(project(input, policy))
        }
        Command::Reconstruct { aggregate } => {
            let spec: AggregateSpec = load_definition(&aggregate)?;
            block_on(reconstruct(input, spec.into()))
        }
    }
}

fn configure_logging(config: Option<&Path>) -> CliResult<()> {
    let log = match config {
        Some(path) => Config::load(path)?.log,
        None => LogConfig::default(),
    };
    log.apply()?;
    Ok(())
}

fn load_definition<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::config_error(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::config_error(format!("Invalid definition {}: {}", path.display(), e)))
}

fn block_on<F: std::future::Future<Output = CliResult<Value>>>(future: F) -> CliResult<Value> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

fn expect_record(input: Value, what: &str) -> CliResult<Record> {
    from_value(input).ok_or_else(|| CliError::invalid_input(format!("expected {} object", what)))
}

/// Change-set object → update statement and its full expression
pub fn compile_update(input: Value) -> CliResult<Value> {
    let changes = ChangeSet::from(expect_record(input, "a change-set")?);
    let statement = compile(&changes);

    Ok(json!({
        "expression": statement.expression(),
        "statement": statement,
    }))
}

/// Native key → cursor string, or cursor string → native key
pub fn cursor(action: CursorAction, input: Value) -> CliResult<Value> {
    match action {
        CursorAction::Encode => Ok(Value::String(encode_cursor(&input)?)),
        CursorAction::Decode => {
            let cursor = input
                .as_str()
                .ok_or_else(|| CliError::invalid_input("expected a cursor string"))?;
            Ok(decode_cursor::<Value>(cursor)?)
        }
    }
}

/// Record → projection
pub async fn project(input: Value, policy: FieldPolicy) -> CliResult<Value> {
    let record = expect_record(input, "a record")?;
    let mapped = ProjectionMapper::new(policy)
        .project(record, &MapContext::new())
        .await?;
    Ok(Value::Object(mapped))
}

/// Record list → aggregate
pub async fn reconstruct(input: Value, reconstructor: AggregateReconstructor) -> CliResult<Value> {
    let records = match input {
        Value::Array(items) => items
            .into_iter()
            .map(|item| expect_record(item, "a record"))
            .collect::<CliResult<Vec<_>>>()?,
        _ => return Err(CliError::invalid_input("expected an array of records")),
    };

    let aggregate = reconstructor.reconstruct(records, &MapContext::new()).await?;
    Ok(Value::Object(aggregate))
}
