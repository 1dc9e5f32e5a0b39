//! Field binding.
//!
//! A [`Bindable`] type describes its request-bound fields as static
//! [`FieldSpec`] tables and knows how to coerce a raw string into each of
//! them. [`Binder`] walks those tables against a set of named sources
//! (query, path, header, ...). [`Payload`] applies a structured value to the
//! same type field by field for in-process dispatch.

mod binder;
mod param;
mod payload;

pub use binder::{Binder, Lookup};
pub use param::{FromParam, ParamError};
pub use payload::Payload;

use serde_json::Value;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("failed to bind field {field}: invalid value {value:?}: {reason}")]
    Invalid {
        field: String,
        value: String,
        reason: String,
    },

    #[error("failed to bind field {0}: not a bindable field")]
    UnknownField(String),

    #[error("failed to decode body: {0}")]
    Body(String),

    #[error("expected an object payload, got {0}")]
    NotAnObject(String),
}

impl BindError {
    pub fn invalid(field: &str, value: &str, reason: impl Display) -> Self {
        BindError::Invalid {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Name of the field that failed, when the error concerns one field.
    pub fn field(&self) -> Option<&str> {
        match self {
            BindError::Invalid { field, .. } | BindError::UnknownField(field) => Some(field),
            _ => None,
        }
    }
}

/// One source a field can be read from: the source tag and the key looked up
/// in it (`query:"times"` is `Source { tag: "query", key: "times" }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub tag: &'static str,
    pub key: &'static str,
}

/// Static description of a request-bound field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub sources: &'static [Source],
    pub default: Option<&'static str>,
}

impl FieldSpec {
    /// Key this field declares for `tag`, if it declares that source at all.
    pub fn key_for(&self, tag: &str) -> Option<&'static str> {
        self.sources
            .iter()
            .find(|source| source.tag == tag)
            .map(|source| source.key)
    }
}

/// A field settable from an action payload, matched by name
/// (case-insensitively) or by its `json` alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadField {
    pub name: &'static str,
    pub alias: Option<&'static str>,
}

impl PayloadField {
    pub fn matches(&self, key: &str) -> bool {
        self.name.eq_ignore_ascii_case(key) || self.alias == Some(key)
    }
}

/// Field-level binding for a handler type.
///
/// Usually generated by `#[derive(Endpoint)]`. Every method has a default
/// describing a type with nothing to bind, so `impl Bindable for T {}` is a
/// valid hand-written implementation.
pub trait Bindable {
    /// Request-bound scalar fields.
    fn fields() -> &'static [FieldSpec] {
        &[]
    }

    /// Coerce `raw` into the named field.
    fn set_field(&mut self, field: &str, raw: &str) -> Result<(), BindError> {
        let _ = raw;
        Err(BindError::UnknownField(field.to_string()))
    }

    /// Name of the field receiving a decoded JSON body.
    fn body_field() -> Option<&'static str> {
        None
    }

    /// Decode `data` into the body field. No body field means no-op.
    fn bind_body(&mut self, data: &[u8]) -> Result<(), BindError> {
        let _ = data;
        Ok(())
    }

    /// Fields an action payload may set.
    fn payload_fields() -> &'static [PayloadField] {
        &[]
    }

    /// Deserialize `value` into the named field.
    fn set_value(&mut self, field: &str, value: Value) -> Result<(), serde_json::Error> {
        let _ = (field, value);
        Ok(())
    }
}
