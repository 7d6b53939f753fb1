//! Dispatcher
//!
//! A [`Bouncer`] unwraps a bundle, picks a handler for each request's record
//! type and runs the handlers concurrently. Requests for types the bouncer
//! does not recognize are dropped from the pack without an error.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;
use warden_core::{Actor, Bundle, FreshnessPack};
use warden_policy::{
    AclRepository, AdminPolicy, Collections, Context, DenyAllPolicy, Freshen, OwnerPolicy,
    OwnershipRules, PolicyHandler, PolicyScope,
};

/// Routes the requests of a bundle to per-type handlers
#[async_trait]
pub trait Bouncer: Send + Sync {
    /// Whether requests for this type are handled
    fn is_on_list_for(&self, kind: &str) -> bool;

    /// Handler for a recognized type
    async fn handler_for(&self, kind: &str) -> Option<Box<dyn Freshen>>;

    /// Run every recognized request concurrently and collect the results
    async fn freshen(&self, bundle: &Bundle) -> FreshnessPack {
        let pending = bundle
            .crufls
            .iter()
            .filter(|crufl| {
                let listed = self.is_on_list_for(&crufl.kind);
                if !listed {
                    debug!(kind = %crufl.kind, uuid = %crufl.uuid, "not on list for type");
                }
                listed
            })
            .map(|crufl| async move {
                let handler = self.handler_for(&crufl.kind).await?;
                Some(handler.freshen(crufl).await)
            });

        FreshnessPack {
            uuid: bundle.uuid.clone(),
            freshness: join_all(pending).await.into_iter().flatten().collect(),
            complete: true,
        }
    }
}

// =============================================================================
// OwnerBouncer
// =============================================================================

/// Dispatches an actor's requests under the ownership/ACL policy
pub struct OwnerBouncer {
    actor: Actor,
    collections: Arc<Collections>,
    acl: Arc<dyn AclRepository>,
    rules: Arc<OwnershipRules>,
    context: Context,
}

impl fmt::Debug for OwnerBouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerBouncer")
            .field("actor", &self.actor)
            .field("types", &self.collections.types().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl OwnerBouncer {
    /// Bouncer for one actor's request
    pub fn new(
        actor: Actor,
        collections: Arc<Collections>,
        acl: Arc<dyn AclRepository>,
        rules: Arc<OwnershipRules>,
        context: Context,
    ) -> Self {
        Self {
            actor,
            collections,
            acl,
            rules,
            context,
        }
    }
}

#[async_trait]
impl Bouncer for OwnerBouncer {
    fn is_on_list_for(&self, kind: &str) -> bool {
        self.collections.contains(kind)
    }

    async fn handler_for(&self, kind: &str) -> Option<Box<dyn Freshen>> {
        let collection = self.collections.get(kind)?;
        let permissions = collection
            .resolve_permissions(&self.context, self.rules.default_permissions)
            .await;
        let policy = OwnerPolicy::new(
            permissions,
            Arc::clone(&self.collections),
            Arc::clone(&self.acl),
            Arc::clone(&self.rules),
        )
        .with_fields(collection.fields.clone());
        let scope = PolicyScope::new(self.actor.clone(), kind, self.context.clone());
        Some(Box::new(PolicyHandler::new(policy, scope, collection)))
    }
}

// =============================================================================
// AdminBouncer
// =============================================================================

/// Dispatches privileged requests under the administrative policy
#[derive(Debug)]
pub struct AdminBouncer {
    collections: Arc<Collections>,
    context: Context,
}

impl AdminBouncer {
    /// Bouncer for a privileged request
    pub fn new(collections: Arc<Collections>, context: Context) -> Self {
        Self {
            collections,
            context,
        }
    }
}

#[async_trait]
impl Bouncer for AdminBouncer {
    fn is_on_list_for(&self, kind: &str) -> bool {
        self.collections.contains(kind)
    }

    async fn handler_for(&self, kind: &str) -> Option<Box<dyn Freshen>> {
        let collection = self.collections.get(kind)?;
        let scope = PolicyScope::anonymous(kind, self.context.clone());
        Some(Box::new(PolicyHandler::new(AdminPolicy, scope, collection)))
    }
}

// =============================================================================
// DenyBouncer
// =============================================================================

/// Dispatches requests from an unidentified actor; every check is refused
#[derive(Debug)]
pub struct DenyBouncer {
    actor: Actor,
    collections: Arc<Collections>,
    context: Context,
}

impl DenyBouncer {
    /// Bouncer refusing everything
    pub fn new(actor: Actor, collections: Arc<Collections>, context: Context) -> Self {
        Self {
            actor,
            collections,
            context,
        }
    }
}

#[async_trait]
impl Bouncer for DenyBouncer {
    fn is_on_list_for(&self, kind: &str) -> bool {
        self.collections.contains(kind)
    }

    async fn handler_for(&self, kind: &str) -> Option<Box<dyn Freshen>> {
        let collection = self.collections.get(kind)?;
        let policy = DenyAllPolicy::new(collection.fields.clone());
        let scope = PolicyScope::new(self.actor.clone(), kind, self.context.clone());
        Some(Box::new(PolicyHandler::new(policy, scope, collection)))
    }
}
