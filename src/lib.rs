//! Host provisioner for the Nginx Deploy API service.
//!
//! Classifies the host OS, installs the deploy stack, fetches the application
//! source with a clone-then-archive strategy, sets up its Python environment,
//! registers a systemd unit, verifies the result and prints a consolidated
//! summary. Designed around one invariant: re-running must never corrupt an
//! existing installation.

pub mod cli;
pub mod command;
pub mod config;
pub mod download;
pub mod error;
pub mod fetch;
pub mod phases;
pub mod platform;
pub mod provision;
pub mod report;
pub mod systemd;

pub use cli::Cli;
pub use command::{CommandRunner, SystemRunner};
pub use config::ProvisionConfig;
pub use error::{ProvisionError, Result};
pub use fetch::{ArchiveSource, HttpArchiveSource};
pub use platform::{OsFamily, PlatformProfile};
pub use provision::Provisioner;

/// Run a full provisioning pass with the system runner and HTTP archive
/// source. This is what the binary calls.
pub async fn run(cli: &Cli) -> Result<report::Reporter> {
    let cfg = ProvisionConfig::from_cli(cli);
    let runner = SystemRunner;
    let archive = HttpArchiveSource;
    Provisioner::new(cfg, &runner, &archive).run().await
}
