//! Configuration via `warden.toml`
//!
//! A single config file holds the policy settings shared by every request.
//! [`WardenConfig::write_default_if_missing`] creates a commented default;
//! edit it and reopen to change settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use warden_core::Permissions;
use warden_policy::OwnershipRules;

use crate::error::{Error, Result};

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "warden.toml";

/// Configuration loaded from `warden.toml`.
///
/// # Example
///
/// ```toml
/// acl_type = "acl"
/// implicit_owner_types = ["user", "identity", "device"]
/// # request_timeout_ms = 5000
///
/// [default_permissions]
/// read = true
/// new = true
/// change = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Record type of ACL resources.
    #[serde(default = "default_acl_type")]
    pub acl_type: String,
    /// Subordinate actor types always matched against the owner field.
    #[serde(default = "default_implicit_owner_types")]
    pub implicit_owner_types: Vec<String>,
    /// Timeout for a whole bundle, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    /// Capability set for types registered without a resolver.
    #[serde(default = "Permissions::all")]
    pub default_permissions: Permissions,
}

fn default_acl_type() -> String {
    "acl".to_string()
}

fn default_implicit_owner_types() -> Vec<String> {
    OwnershipRules::default().implicit_owner_types
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            acl_type: default_acl_type(),
            implicit_owner_types: default_implicit_owner_types(),
            request_timeout_ms: None,
            default_permissions: Permissions::all(),
        }
    }
}

impl WardenConfig {
    /// Check the config values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `acl_type` is empty or the
    /// timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.acl_type.trim().is_empty() {
            return Err(Error::InvalidConfig {
                reason: "acl_type must not be empty".to_string(),
            });
        }
        if self.request_timeout_ms == Some(0) {
            return Err(Error::InvalidConfig {
                reason: "request_timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Timeout for a whole bundle, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Settings handed to ownership handlers.
    pub fn ownership_rules(&self) -> OwnershipRules {
        OwnershipRules {
            acl_type: self.acl_type.clone(),
            implicit_owner_types: self.implicit_owner_types.clone(),
            default_permissions: self.default_permissions,
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Warden configuration
#
# Record type holding access-control lists.
acl_type = "acl"

# Subordinate actor types whose records they always own, even without the
# "owner" marker on the actor.
implicit_owner_types = ["user", "identity", "device"]

# Abort a whole bundle after this many milliseconds (default: no timeout).
# request_timeout_ms = 5000

# Capability set for record types registered without a resolver.
[default_permissions]
read = true
new = true
change = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: WardenConfig = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| Error::ConfigWrite {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::ConfigWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| Error::ConfigWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
