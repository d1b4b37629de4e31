//! Projection mapper
//!
//! Shapes one raw record into its client-facing form:
//!
//! 1. decrypt (when the context can)
//! 2. run transforms on defined fields, in registration order
//! 3. copy renamed fields, reading transformed values first
//! 4. drop omitted fields and lay the result over the defaults
//!
//! Transformed values replace the raw value of their field in the output,
//! so a transform on a field that is neither renamed nor omitted is
//! visible to the caller.

use crate::error::DataResult;
use crate::record::{is_defined, Record};

use super::context::MapContext;
use super::policy::FieldPolicy;

/// Applies a [`FieldPolicy`] to records
#[derive(Debug, Clone, Default)]
pub struct ProjectionMapper {
    policy: FieldPolicy,
}

impl ProjectionMapper {
    /// Create a mapper for the policy
    pub fn new(policy: FieldPolicy) -> Self {
        Self { policy }
    }

    /// The mapper's policy
    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }

    /// Project one record
    pub async fn project(&self, record: Record, ctx: &MapContext) -> DataResult<Record> {
        let decrypted = ctx.decrypt(record).await?;

        let mut transformed = Record::new();
        for (field, transform) in &self.policy.transforms {
            if !is_defined(&decrypted, field) {
                continue;
            }
            let current = decrypted[field.as_str()].clone();
            let value = transform.apply(current, &decrypted, ctx).await?;
            transformed.insert(field.clone(), value);
        }

        let mut renamed = Record::new();
        for (from, to) in &self.policy.rename {
            let value = transformed
                .get(from)
                .or_else(|| decrypted.get(from))
                .filter(|v| !v.is_null());
            if let Some(value) = value {
                renamed.insert(to.clone(), value.clone());
            }
        }

        Ok(self.compose(decrypted, &transformed, renamed))
    }

    fn compose(&self, decrypted: Record, transformed: &Record, renamed: Record) -> Record {
        let mut out = self.policy.defaults.clone();
        let visible = decrypted
            .into_iter()
            .chain(renamed)
            .filter(|(field, _)| !self.policy.omits(field));

        for (field, value) in visible {
            let value = transformed.get(&field).cloned().unwrap_or(value);
            out.insert(field, value);
        }
        out
    }
}
