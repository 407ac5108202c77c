//! Error taxonomy for the provisioner.
//!
//! Only a small set of failures abort the run: missing privileges, an
//! unsupported OS family, and total fetch failure (clone and archive both
//! failed). Everything else is representable here but gets downgraded to a
//! warning by the phase that tolerates it.

use thiserror::Error;

/// Provisioning error type
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Not running with administrative privileges
    #[error("privilege error: {0}")]
    Privilege(String),

    /// Host OS family is not Debian-like or RHEL-like
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Code acquisition failed (both clone and archive fallback)
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Package or dependency installation failed
    #[error("install error: {0}")]
    Install(String),

    /// Service registration or startup failed
    #[error("service error: {0}")]
    ServiceStart(String),

    /// IO errors (file operations, process spawning)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP errors (archive download, liveness probe, IP lookup)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create a privilege error
    pub fn privilege(msg: impl Into<String>) -> Self {
        Self::Privilege(msg.into())
    }

    /// Create an unsupported-platform error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(msg.into())
    }

    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create an install error
    pub fn install(msg: impl Into<String>) -> Self {
        Self::Install(msg.into())
    }

    /// Create a service error
    pub fn service(msg: impl Into<String>) -> Self {
        Self::ServiceStart(msg.into())
    }

    /// Whether this error must abort the run with exit code 1.
    ///
    /// The propagation policy from the installer contract: privilege and
    /// platform failures abort before any mutation, fetch failure aborts
    /// after the backup rename. Install and service failures are recorded
    /// as warnings by the phases that encounter them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Privilege(_) | Self::UnsupportedPlatform(_) | Self::Fetch(_)
        )
    }
}
