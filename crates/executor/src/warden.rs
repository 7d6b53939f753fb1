//! Public facade.
//!
//! [`Warden`] owns the registered record types and the configuration, and
//! picks a bouncer for each incoming bundle:
//!
//! | Caller | Bouncer | Policy |
//! |--------|---------|--------|
//! | actor with an id | [`OwnerBouncer`] | ownership / ACL |
//! | actor without an id | [`DenyBouncer`] | deny-all |
//! | privileged service | [`AdminBouncer`] | admin |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden_executor::{Warden, WardenConfig};
//! use warden_policy::Collection;
//! use warden_storage::MemoryStore;
//!
//! let mut warden = Warden::new(WardenConfig::default())?;
//! warden.add_collection("note", Collection::new(Arc::new(MemoryStore::new("note"))));
//! let pack = warden.ask(actor, &bundle, serde_json::json!({})).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use warden_core::{Actor, Bundle, FreshnessPack};
use warden_policy::{
    AclRepository, Collection, Collections, Context, EmptyAclRepository, OwnershipRules,
    StoreAclRepository,
};

use crate::bouncer::{AdminBouncer, Bouncer, DenyBouncer, OwnerBouncer};
use crate::config::WardenConfig;
use crate::error::{Error, Result};

/// Entry point for authorized data access.
pub struct Warden {
    config: WardenConfig,
    rules: Arc<OwnershipRules>,
    collections: Arc<Collections>,
    acl: Option<Arc<dyn AclRepository>>,
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden")
            .field("config", &self.config)
            .field("types", &self.types())
            .field("custom_acl", &self.acl.is_some())
            .finish()
    }
}

impl Warden {
    /// Create a facade with no registered types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the config does not validate.
    pub fn new(config: WardenConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rules: Arc::new(config.ownership_rules()),
            config,
            collections: Arc::new(Collections::new()),
            acl: None,
        })
    }

    /// Load config from `path`, writing the default file first if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        WardenConfig::write_default_if_missing(path)?;
        Self::new(WardenConfig::from_file(path)?)
    }

    /// Use a specific ACL repository instead of the ACL type's store (builder pattern).
    pub fn with_acl_repository(mut self, acl: Arc<dyn AclRepository>) -> Self {
        self.acl = Some(acl);
        self
    }

    /// Register a record type, replacing any previous registration.
    pub fn add_collection(&mut self, kind: impl Into<String>, collection: Collection) {
        let kind = kind.into();
        if Arc::make_mut(&mut self.collections)
            .insert(kind.clone(), collection)
            .is_some()
        {
            debug!(kind = %kind, "replaced collection");
        }
    }

    /// Register a record type (builder pattern).
    pub fn collection_for(mut self, kind: impl Into<String>, collection: Collection) -> Self {
        self.add_collection(kind, collection);
        self
    }

    /// Registered record types, sorted.
    pub fn types(&self) -> Vec<&str> {
        self.collections.types().collect()
    }

    /// Registration for a record type.
    pub fn collection(&self, kind: &str) -> Option<&Collection> {
        self.collections.get(kind)
    }

    /// Active configuration.
    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// ACL repository used by ownership checks.
    ///
    /// Falls back to the store registered under the configured ACL type; with
    /// neither, no ACL grants anything.
    pub fn acl_repository(&self) -> Arc<dyn AclRepository> {
        if let Some(acl) = &self.acl {
            return Arc::clone(acl);
        }
        match self.collections.get(&self.config.acl_type) {
            Some(collection) => Arc::new(StoreAclRepository::new(Arc::clone(&collection.store))),
            None => Arc::new(EmptyAclRepository),
        }
    }

    /// Answer a bundle on behalf of `actor`.
    ///
    /// Actors without an id get the deny-all policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the bundle exceeds `request_timeout_ms`.
    /// Every other failure is reported inside the pack.
    pub async fn ask(&self, actor: Actor, bundle: &Bundle, context: Context) -> Result<FreshnessPack> {
        if actor.id.is_empty() {
            debug!(uuid = %bundle.uuid, kind = %actor.kind, "unidentified actor");
            let bouncer = DenyBouncer::new(actor, Arc::clone(&self.collections), context);
            return self.dispatch(&bouncer, bundle).await;
        }
        let bouncer = OwnerBouncer::new(
            actor,
            Arc::clone(&self.collections),
            self.acl_repository(),
            Arc::clone(&self.rules),
            context,
        );
        self.dispatch(&bouncer, bundle).await
    }

    /// Answer a bundle with administrative privileges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the bundle exceeds `request_timeout_ms`.
    pub async fn admin_ask(&self, bundle: &Bundle, context: Context) -> Result<FreshnessPack> {
        let bouncer = AdminBouncer::new(Arc::clone(&self.collections), context);
        self.dispatch(&bouncer, bundle).await
    }

    async fn dispatch(&self, bouncer: &dyn Bouncer, bundle: &Bundle) -> Result<FreshnessPack> {
        debug!(uuid = %bundle.uuid, requests = bundle.crufls.len(), "dispatching bundle");
        match self.config.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, bouncer.freshen(bundle))
                .await
                .map_err(|_| Error::Timeout {
                    uuid: bundle.uuid.clone(),
                    timeout_ms: limit.as_millis() as u64,
                }),
            None => Ok(bouncer.freshen(bundle).await),
        }
    }
}
