//! # Field-Level Encryption
//!
//! The envelope-encryption algorithm itself is injected through
//! [`FieldCipher`]. [`Encryption`] stores the cipher's metadata next to
//! the encrypted fields on write and strips it again on read. Mappers only
//! see the narrower [`Decrypt`] capability.

mod envelope;

pub use envelope::{Encrypted, Encryption, FieldCipher};

use futures_util::future::BoxFuture;

use crate::error::DataResult;
use crate::record::Record;

/// Read-side decrypt capability consumed by the projection mapper.
///
/// Records that carry no encryption metadata are returned unchanged.
pub trait Decrypt: Send + Sync {
    fn decrypt(&self, record: Record) -> BoxFuture<'_, DataResult<Record>>;
}
