//! Error types for the Warden facade.
//!
//! Per-item and per-request failures travel inside the
//! [`FreshnessPack`](warden_core::FreshnessPack) as [`Fail`](warden_core::Fail)
//! tokens. [`Error`] covers what sits outside a pack:
//!
//! | Category | Variants | Description |
//! |----------|----------|-------------|
//! | Config | `ConfigRead`, `ConfigParse`, `ConfigWrite`, `InvalidConfig` | `warden.toml` problems |
//! | Dispatch | `Timeout` | Whole bundle exceeded the configured timeout |

use serde::{Deserialize, Serialize};

/// Facade errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Config Errors ====================
    /// Config file could not be read
    #[error("failed to read config file '{path}': {reason}")]
    ConfigRead { path: String, reason: String },

    /// Config file is not valid TOML for [`WardenConfig`](crate::WardenConfig)
    #[error("failed to parse config file '{path}': {reason}")]
    ConfigParse { path: String, reason: String },

    /// Config file could not be written
    #[error("failed to write config file '{path}': {reason}")]
    ConfigWrite { path: String, reason: String },

    /// Config values are inconsistent
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    // ==================== Dispatch Errors ====================
    /// Bundle did not complete in time
    #[error("bundle '{uuid}' timed out after {timeout_ms}ms")]
    Timeout { uuid: String, timeout_ms: u64 },
}

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, Error>;
