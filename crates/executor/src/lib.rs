//! # Warden Executor
//!
//! The public API for Warden - an authorization layer in front of document
//! stores.
//!
//! This crate provides:
//! - [`Warden`] - the facade: register record types, then `ask` with bundles
//! - [`Bouncer`] - the dispatcher fanning a bundle out to per-type handlers
//! - [`WardenConfig`] - settings loaded from `warden.toml`
//!
//! ## Quick Start
//!
//! ```text
//! use warden_executor::{Warden, WardenConfig, Bundle, Crufl, QuerySpec};
//!
//! let mut warden = Warden::open("warden.toml")?;
//! warden.add_collection("note", Collection::new(store));
//!
//! let bundle = Bundle::new("b1", vec![Crufl::find("note", "r1", QuerySpec::new())]);
//! let pack = warden.ask(actor, &bundle, json!({})).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bouncer;
mod config;
mod error;
mod warden;

// =============================================================================
// Public API
// =============================================================================

pub use bouncer::{AdminBouncer, Bouncer, DenyBouncer, OwnerBouncer};
pub use config::{WardenConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use warden::Warden;

// Wire types
pub use warden_core::{
    Actor, ActorRef, Bundle, Crufl, CruflOp, Document, Fail, FieldPath, FreshnessPack,
    FreshnessResult, MatchExpr, Message, Meta, Permissions, QuerySpec, RecordId, SortSpec,
    StoredRecord,
};

// Registration
pub use warden_policy::{Collection, Context, PermissionResolver, RelationshipFields};
