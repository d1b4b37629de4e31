//! # Object Store Connector
//!
//! Listing, metadata, deletion and presigned URLs against one bucket
//! through an injected [`ObjectClient`].

mod client;
mod connector;

pub use client::{
    DeleteOutput, ListObjectsInput, ListObjectsOutput, ListVersionsInput, ListVersionsOutput,
    ObjectClient, ObjectHead, ObjectRef, ObjectSummary, ObjectVersion, PresignInput,
    SignedOperation,
};
pub use connector::{
    ListRequest, Listing, ObjectLocator, ObjectStoreConnector, SignOptions, VersionMarker,
};
