//! Envelope encryption wrapper

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::config::EncryptionConfig;
use crate::error::{DataError, DataResult};
use crate::record::Record;

use super::Decrypt;

/// Output of [`FieldCipher::encrypt`]
#[derive(Debug, Clone, PartialEq)]
pub struct Encrypted {
    /// The record with its sensitive fields replaced by ciphertext
    pub encrypted: Record,
    /// Everything needed to decrypt it again (wrapped keys, field list)
    pub metadata: Value,
}

/// Injected envelope-encryption algorithm
pub trait FieldCipher: Send + Sync {
    /// Encrypt `record`. `options` carries the key alias, regions and the
    /// caller's per-call overrides such as the field list.
    fn encrypt(&self, record: Record, options: Record) -> BoxFuture<'_, DataResult<Encrypted>>;

    /// Decrypt `record` using the stored metadata merged into `options`
    fn decrypt(&self, record: Record, options: Record) -> BoxFuture<'_, DataResult<Record>>;
}

/// Stores cipher metadata alongside the data under the configured field
#[derive(Clone)]
pub struct Encryption {
    cipher: Arc<dyn FieldCipher>,
    config: EncryptionConfig,
}

impl fmt::Debug for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encryption")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Encryption {
    /// Wrap a cipher
    pub fn new(cipher: Arc<dyn FieldCipher>, config: EncryptionConfig) -> Self {
        Self { cipher, config }
    }

    /// Field holding the encryption metadata
    pub fn eem_field(&self) -> &str {
        &self.config.eem_field
    }

    /// Encrypt `data`, storing the metadata under the metadata field.
    ///
    /// `eem` holds per-call cipher options (e.g. the fields to encrypt) and
    /// may override the configured key alias and regions.
    pub async fn encrypt(&self, eem: &Record, data: Record) -> DataResult<Record> {
        let mut options = Record::new();
        if let Some(alias) = &self.config.master_key_alias {
            options.insert("master_key_alias".to_string(), Value::String(alias.clone()));
        }
        if !self.config.regions.is_empty() {
            let regions = self.config.regions.iter().cloned().map(Value::String).collect();
            options.insert("regions".to_string(), Value::Array(regions));
        }
        for (k, v) in eem {
            options.insert(k.clone(), v.clone());
        }
        options.insert("aes".to_string(), Value::Bool(self.config.aes));

        let result = self.cipher.encrypt(data, options).await?;

        let mut record = result.encrypted;
        record.insert(self.config.eem_field.clone(), result.metadata);
        Ok(record)
    }

    /// Decrypt `data`. Empty records and records without metadata pass
    /// through unchanged.
    pub async fn decrypt_record(&self, data: Record) -> DataResult<Record> {
        if data.is_empty() {
            return Ok(data);
        }
        let metadata = match data.get(&self.config.eem_field) {
            Some(Value::Object(metadata)) => metadata.clone(),
            Some(Value::Null) | None => return Ok(data),
            Some(other) => {
                return Err(DataError::crypto(format!(
                    "metadata field '{}' is not an object: {}",
                    self.config.eem_field, other
                )))
            }
        };

        let ciphertext: Record = data
            .into_iter()
            .filter(|(k, _)| *k != self.config.eem_field)
            .collect();

        let mut options = metadata;
        options.insert("aes".to_string(), Value::Bool(self.config.aes));

        self.cipher.decrypt(ciphertext, options).await
    }
}

impl Decrypt for Encryption {
    fn decrypt(&self, record: Record) -> BoxFuture<'_, DataResult<Record>> {
        Box::pin(self.decrypt_record(record))
    }
}
