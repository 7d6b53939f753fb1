//! Record envelopes exchanged with clients
//!
//! A [`Message`] is a payload plus a `$meta` block. On the wire the payload
//! fields sit beside `$meta` in one JSON object:
//!
//! ```text
//! { "$meta": { "type": "note", "id": "…", "version": 2 }, "title": "hello" }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Fail;
use crate::types::{Document, StoredRecord};

/// Metadata block of a record envelope
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Meta {
    /// Collection the record belongs to
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Externally stable identifier (empty when absent)
    #[serde(default)]
    pub id: String,
    /// Revision counter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Failure token, present only on failed results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Fail>,
    /// Set on a successful delete
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,
}

impl Meta {
    /// Metadata naming a record of the given type
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    /// Result skeleton carrying a failure token
    pub fn failed(kind: impl Into<String>, id: impl Into<String>, error: Fail) -> Self {
        Self {
            error: Some(error),
            ..Self::new(kind, id)
        }
    }

    /// Fresh metadata generated from a stored record
    pub fn for_record(kind: impl Into<String>, record: &StoredRecord, removed: bool) -> Self {
        Self {
            kind: kind.into(),
            id: record.id.to_string(),
            version: Some(record.version),
            error: None,
            removed,
        }
    }
}

/// Record envelope: payload fields plus an optional `$meta` block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Metadata block
    #[serde(rename = "$meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    /// Domain fields
    #[serde(flatten)]
    pub payload: Document,
}

impl Message {
    /// Envelope naming an existing record, with no payload
    pub fn reference(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            meta: Some(Meta::new(kind, id)),
            payload: Document::new(),
        }
    }

    /// Envelope for a new record, with payload and no metadata
    pub fn draft(payload: Document) -> Self {
        Self {
            meta: None,
            payload,
        }
    }

    /// Envelope carrying only metadata
    pub fn from_meta(meta: Meta) -> Self {
        Self {
            meta: Some(meta),
            payload: Document::new(),
        }
    }

    /// Envelope built from a redacted payload and fresh metadata
    pub fn with_meta(payload: Document, meta: Meta) -> Self {
        Self {
            meta: Some(meta),
            payload,
        }
    }

    /// Set a payload field (builder pattern)
    pub fn field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// A message is valid for a handler iff its metadata type matches the
    /// handler's type and its id is a non-empty string.
    pub fn is_valid_for(&self, kind: &str) -> bool {
        self.meta
            .as_ref()
            .map(|meta| meta.kind == kind && !meta.id.is_empty())
            .unwrap_or(false)
    }

    /// The metadata id, if any
    pub fn id(&self) -> Option<&str> {
        self.meta.as_ref().map(|meta| meta.id.as_str())
    }

    /// The failure token, if any
    pub fn error(&self) -> Option<Fail> {
        self.meta.as_ref().and_then(|meta| meta.error)
    }

    /// The revision counter, if any
    pub fn version(&self) -> Option<u64> {
        self.meta.as_ref().and_then(|meta| meta.version)
    }

    /// Whether this envelope reports a successful delete
    pub fn is_removed(&self) -> bool {
        self.meta.as_ref().map(|meta| meta.removed).unwrap_or(false)
    }
}
