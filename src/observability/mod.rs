//! Observability for aerodata
//!
//! Structured JSON logging of backend round-trips, write outcomes and
//! mapping anomalies. The backend request/response trail is emitted at
//! TRACE, anomalies at WARN and failures at ERROR.
//!
//! # Usage
//!
//! ```ignore
//! use aerodata::observability::{log_event, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Some(Severity::Trace));
//! log_event(Event::QueryComplete, &[("items", "42")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event with fields.
///
/// Failure events are logged at ERROR, anomalies at WARN, everything else
/// at TRACE.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Error
    } else if event.is_anomaly() {
        Severity::Warn
    } else {
        Severity::Trace
    };
    Logger::log(severity, event.as_str(), fields);
}
