//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events in aerodata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Reads
    /// One backend page was fetched
    QueryPageFetched,
    /// A bounded or draining query finished
    QueryComplete,
    /// A query was aborted by a backend failure
    QueryFailed,

    // Writes
    /// Update statement sent to the backend
    UpdateSent,
    /// Backend returned the updated record
    UpdateApplied,
    /// Backend rejected an update
    UpdateFailed,
    /// All updates of a batch settled
    BatchUpdateComplete,

    // Object store
    /// Object listing returned
    ObjectsListed,
    /// Presigned URL issued
    UrlSigned,

    // Mapping
    /// Aggregate folded from its records
    AggregateReconstructed,
    /// Singular role received several records
    CardinalityOverwrite,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::QueryPageFetched => "QUERY_PAGE_FETCHED",
            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryFailed => "QUERY_FAILED",

            Event::UpdateSent => "UPDATE_SENT",
            Event::UpdateApplied => "UPDATE_APPLIED",
            Event::UpdateFailed => "UPDATE_FAILED",
            Event::BatchUpdateComplete => "BATCH_UPDATE_COMPLETE",

            Event::ObjectsListed => "OBJECTS_LISTED",
            Event::UrlSigned => "URL_SIGNED",

            Event::AggregateReconstructed => "AGGREGATE_RECONSTRUCTED",
            Event::CardinalityOverwrite => "CARDINALITY_OVERWRITE",
        }
    }

    /// Returns true if this event reports a failed operation
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::QueryFailed | Event::UpdateFailed)
    }

    /// Returns true if this event reports data that does not match its declared shape
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Event::CardinalityOverwrite)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
