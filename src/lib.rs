//! Warden - authorization-mediated access to document stores
//!
//! Clients send bundles of create/remove/update/lookup/find requests on
//! behalf of an actor. Warden checks each request against the record type's
//! policy, applies the permitted parts to the backing store, and answers with
//! a freshness pack carrying per-item results.
//!
//! # Quick Start
//!
//! ```ignore
//! use wardendb::{Actor, Bundle, Collection, Crufl, QuerySpec, Warden, WardenConfig};
//!
//! let mut warden = Warden::new(WardenConfig::default())?;
//! warden.add_collection("note", Collection::new(store));
//!
//! let bundle = Bundle::new("b1", vec![Crufl::find("note", "r1", QuerySpec::new())]);
//! let pack = warden.ask(Actor::new("user", "u1"), &bundle, json!({})).await?;
//! ```
//!
//! # Architecture
//!
//! Requests go through [`Warden`], which picks a [`Bouncer`] per caller.
//! Policies and stores live in their own crates and are re-exported here
//! for callers implementing custom stores or resolvers.

// Re-export the public API from warden-executor
pub use warden_executor::*;

/// Policy strategies, handlers and ACL access
pub use warden_policy as policy;
/// Document store interface and the in-memory store
pub use warden_storage as storage;
