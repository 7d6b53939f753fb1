//! Batch protocol: bundles in, freshness packs out
//!
//! A [`Bundle`] groups operation requests ([`Crufl`]s) that may span several
//! record types. Each request yields one [`FreshnessResult`]; the results are
//! collected into a [`FreshnessPack`] correlated to the bundle's id.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Fail;
use crate::message::Message;
use crate::query::QuerySpec;

/// Operation name of a request
///
/// Names that are not one of the five canonical verbs deserialize as
/// [`CruflOp::Unknown`], keeping the name so the `CheckFail` result echoes
/// what the caller sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CruflOp {
    /// Insert new records
    Create,
    /// Delete records
    Remove,
    /// Update records
    Update,
    /// Read records by id
    Lookup,
    /// Query record metadata
    Find,
    /// Any other operation name
    Unknown(String),
}

impl CruflOp {
    /// Whether this operation carries messages (as opposed to a query)
    pub fn takes_messages(&self) -> bool {
        matches!(
            self,
            CruflOp::Create | CruflOp::Remove | CruflOp::Update | CruflOp::Lookup
        )
    }

    /// Wire name of the operation
    pub fn as_str(&self) -> &str {
        match self {
            CruflOp::Create => "create",
            CruflOp::Remove => "remove",
            CruflOp::Update => "update",
            CruflOp::Lookup => "lookup",
            CruflOp::Find => "find",
            CruflOp::Unknown(name) => name,
        }
    }
}

impl From<String> for CruflOp {
    fn from(name: String) -> Self {
        match name.as_str() {
            "create" => CruflOp::Create,
            "remove" => CruflOp::Remove,
            "update" => CruflOp::Update,
            "lookup" => CruflOp::Lookup,
            "find" => CruflOp::Find,
            _ => CruflOp::Unknown(name),
        }
    }
}

impl From<CruflOp> for String {
    fn from(op: CruflOp) -> Self {
        match op {
            CruflOp::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CruflOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crufl {
    /// Operation name
    pub op: CruflOp,
    /// Record type the operation targets
    #[serde(rename = "type")]
    pub kind: String,
    /// Correlation id
    pub uuid: String,
    /// Messages for create/remove/update/lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgs: Option<Vec<Message>>,
    /// Query for find
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<QuerySpec>,
}

impl Crufl {
    /// Request carrying messages
    pub fn with_msgs(
        op: CruflOp,
        kind: impl Into<String>,
        uuid: impl Into<String>,
        msgs: Vec<Message>,
    ) -> Self {
        Self {
            op,
            kind: kind.into(),
            uuid: uuid.into(),
            msgs: Some(msgs),
            spec: None,
        }
    }

    /// `find` request
    pub fn find(kind: impl Into<String>, uuid: impl Into<String>, spec: QuerySpec) -> Self {
        Self {
            op: CruflOp::Find,
            kind: kind.into(),
            uuid: uuid.into(),
            msgs: None,
            spec: Some(spec),
        }
    }
}

/// Response to one operation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshnessResult {
    /// Echoed operation name
    pub op: CruflOp,
    /// Echoed record type
    #[serde(rename = "type")]
    pub kind: String,
    /// Echoed correlation id
    pub uuid: String,
    /// Result envelopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgs: Option<Vec<Message>>,
    /// Whole-request failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Fail>,
    /// Completion flag
    pub complete: bool,
}

impl FreshnessResult {
    /// Empty result echoing a request
    pub fn for_request(crufl: &Crufl) -> Self {
        Self {
            op: crufl.op.clone(),
            kind: crufl.kind.clone(),
            uuid: crufl.uuid.clone(),
            msgs: None,
            error: None,
            complete: true,
        }
    }

    /// Record the outcome of an operation
    pub fn settle(mut self, outcome: crate::Result<Vec<Message>>) -> Self {
        match outcome {
            Ok(msgs) => self.msgs = Some(msgs),
            Err(fail) => self.error = Some(fail),
        }
        self
    }

    /// Whether the request failed as a whole
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Result envelopes, empty if none
    pub fn messages(&self) -> &[Message] {
        self.msgs.as_deref().unwrap_or(&[])
    }
}

/// A batch of operation requests
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bundle {
    /// Correlation id
    pub uuid: String,
    /// Operation requests
    #[serde(default)]
    pub crufls: Vec<Crufl>,
}

impl Bundle {
    /// Create a bundle
    pub fn new(uuid: impl Into<String>, crufls: Vec<Crufl>) -> Self {
        Self {
            uuid: uuid.into(),
            crufls,
        }
    }
}

/// Bundle-level response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshnessPack {
    /// Correlation id of the bundle
    pub uuid: String,
    /// One result per recognized request
    pub freshness: Vec<FreshnessResult>,
    /// Completion flag
    pub complete: bool,
}

impl FreshnessPack {
    /// Find the result for a request correlation id
    pub fn result(&self, uuid: &str) -> Option<&FreshnessResult> {
        self.freshness.iter().find(|r| r.uuid == uuid)
    }
}
