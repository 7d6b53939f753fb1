//! Failure taxonomy for Warden
//!
//! Every failure a client can observe is one of the [`Fail`] tokens. Tokens
//! are attached to a result envelope's `$meta.error` (per-item failures) or to
//! a freshness result's `error` (whole-request failures). They never escape a
//! policy handler as a Rust error past the request boundary.
//!
//! The rendered form is a short machine-matchable token, optionally followed
//! by `: <detail>`:
//!
//! | Variant | Token |
//! |---------|-------|
//! | `Id` | `IdFail` |
//! | `Permission` | `PermissionFail` |
//! | `Schema` | `SchemaFail` |
//! | `Bouncer` | `BouncerFail` |
//! | `Check` | `CheckFail` |
//! | `NoMessages` | `CheckFail: no messages` |
//! | `Query` | `QueryFail` |
//! | `MalformedId` | `MessageFail: malformed id` |
//! | `MalformedMessage` | `MessageFail: malformed message` |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Result type alias for handler operations
pub type Result<T> = std::result::Result<T, Fail>;

/// Client-visible failure token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Fail {
    /// Id present but no matching (visible) stored record, or the message
    /// failed validation.
    #[error("IdFail")]
    Id,

    /// A policy hook denied the operation for this item.
    #[error("PermissionFail")]
    Permission,

    /// The store rejected a create batch.
    #[error("SchemaFail")]
    Schema,

    /// An otherwise-permitted store operation failed (conflict, store error).
    #[error("BouncerFail")]
    Bouncer,

    /// The operation request itself is malformed (unknown operation).
    #[error("CheckFail")]
    Check,

    /// The operation request carried no messages.
    #[error("CheckFail: no messages")]
    NoMessages,

    /// Query compilation or execution failed.
    #[error("QueryFail")]
    Query,

    /// A message id could not be parsed into a native record id.
    #[error("MessageFail: malformed id")]
    MalformedId,

    /// A message failed validation on a path that tolerates no invalid input.
    #[error("MessageFail: malformed message")]
    MalformedMessage,
}

impl Fail {
    /// All tokens, in taxonomy order.
    pub const ALL: [Fail; 9] = [
        Fail::Id,
        Fail::Permission,
        Fail::Schema,
        Fail::Bouncer,
        Fail::Check,
        Fail::NoMessages,
        Fail::Query,
        Fail::MalformedId,
        Fail::MalformedMessage,
    ];

    /// The leading token without any detail, e.g. `CheckFail` for both
    /// [`Fail::Check`] and [`Fail::NoMessages`].
    pub fn token(&self) -> &'static str {
        match self {
            Fail::Id => "IdFail",
            Fail::Permission => "PermissionFail",
            Fail::Schema => "SchemaFail",
            Fail::Bouncer => "BouncerFail",
            Fail::Check | Fail::NoMessages => "CheckFail",
            Fail::Query => "QueryFail",
            Fail::MalformedId | Fail::MalformedMessage => "MessageFail",
        }
    }

    /// Whether the failure can fail a whole operation request rather than a
    /// single item.
    pub fn is_request_level(&self) -> bool {
        !matches!(self, Fail::Id | Fail::Permission)
    }
}

/// Error returned when a string is not a known failure token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown failure token: {0}")]
pub struct UnknownFail(pub String);

impl FromStr for Fail {
    type Err = UnknownFail;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Fail::ALL
            .iter()
            .copied()
            .find(|fail| fail.to_string() == s)
            .ok_or_else(|| UnknownFail(s.to_string()))
    }
}

impl Serialize for Fail {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fail {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FailVisitor;

        impl serde::de::Visitor<'_> for FailVisitor {
            type Value = Fail;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a failure token string")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<Fail, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(FailVisitor)
    }
}
