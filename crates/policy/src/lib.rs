//! Policy layer for Warden
//!
//! This crate decides who may do what to which record:
//! - Policy: capability interface consulted at every decision point
//! - PolicyHandler: runs CRUFL verbs for one record type under a policy
//! - DenyAllPolicy / AdminPolicy / OwnerPolicy: the three strategies
//! - AclRecord / AclRepository: access-control lists
//! - Collection / Collections: registered record types and their resolvers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod acl;
pub mod admin;
pub mod collection;
pub mod deny;
pub mod handler;
pub mod owner;
pub mod policy;
pub mod relationship;

pub use acl::{Action, AclGrant, AclRecord, AclRepository, EmptyAclRepository, StoreAclRepository};
pub use admin::AdminPolicy;
pub use collection::{
    Collection, Collections, Context, PermissionResolver, RelationshipFields, Role,
};
pub use deny::DenyAllPolicy;
pub use handler::{Freshen, PolicyHandler};
pub use owner::{OwnerPolicy, OwnershipRules};
pub use policy::{strip_storage_fields, without_fields, Policy, PolicyScope, STORAGE_FIELDS};
pub use relationship::{is_member, is_owner, is_related, reference_from_value};
