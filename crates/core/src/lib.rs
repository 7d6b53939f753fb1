//! Core types for Warden
//!
//! This crate defines the protocol and data-model types shared by every
//! layer:
//! - RecordId: Native identity of a stored record
//! - Actor / ActorRef: Principals and `{type, id}` references
//! - Permissions: Per-(actor, type) capability set
//! - StoredRecord: A record as the document store holds it
//! - Message / Meta: Record envelopes exchanged with clients
//! - Crufl / Bundle / FreshnessResult / FreshnessPack: Batch protocol
//! - FieldPath: Paths into record payloads
//! - QuerySpec / MatchExpr / SortSpec: Declarative query model
//! - Fail: Client-visible failure tokens

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod message;
pub mod path;
pub mod protocol;
pub mod query;
pub mod types;

pub use error::{Fail, Result, UnknownFail};
pub use message::{Message, Meta};
pub use path::{FieldPath, PathParseError, IDENTITY_SEGMENTS};
pub use protocol::{Bundle, Crufl, CruflOp, FreshnessPack, FreshnessResult};
pub use query::{MatchExpr, QuerySpec, SortSpec};
pub use types::{Actor, ActorRef, Document, Permissions, RecordId, StoredRecord};
