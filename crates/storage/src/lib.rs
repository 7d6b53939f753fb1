//! Storage layer for Warden
//!
//! This crate implements the document-store side of the engine:
//! - DocumentStore: async contract policy handlers store records through
//! - MemoryStore: BTreeMap-based store with RwLock and optimistic saves
//! - StoreFilter: store-native filter tree
//! - compile_query: QuerySpec to StoreFilter compiler

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compile;
pub mod error;
pub mod filter;
pub mod memory;
pub mod store;

pub use compile::{compile_expr, compile_query, CompiledQuery};
pub use error::{StoreError, StoreResult};
pub use filter::{compare_values, FindOptions, Projection, StoreFilter};
pub use memory::{MemoryStore, Validator};
pub use store::{expected_revision, DocumentStore};
