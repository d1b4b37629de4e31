//! Opaque cursor codec
//!
//! A cursor is the standard-alphabet base64 of the compact JSON
//! serialization of one backend-native pagination key. Clients never look
//! inside; they hand it back on the next call of the same query.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DataError, DataResult};

/// Encode a native pagination key as an opaque cursor
pub fn encode_cursor<C: Serialize + ?Sized>(native: &C) -> DataResult<String> {
    let json = serde_json::to_vec(native).map_err(|e| DataError::CursorEncode(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

/// Decode an opaque cursor back into the native pagination key
pub fn decode_cursor<C: DeserializeOwned>(cursor: &str) -> DataResult<C> {
    let bytes = STANDARD
        .decode(cursor)
        .map_err(|e| DataError::cursor_decode(format!("not base64: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| DataError::cursor_decode(format!("not a pagination key: {}", e)))
}

/// Decode an optional cursor; `None` starts a fresh query
pub fn decode_optional<C: DeserializeOwned>(cursor: Option<&str>) -> DataResult<Option<C>> {
    cursor.map(decode_cursor).transpose()
}
