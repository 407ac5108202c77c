//! CLI argument parsing for ndeploy-install

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for ndeploy-install
#[derive(Parser, Clone, Debug, Default)]
#[command(name = "ndeploy-install")]
#[command(version, about = "Provision this host to run the Nginx Deploy API service")]
pub struct Cli {
    /// Install the application tree here instead of the default location
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Clone this branch instead of the default
    #[arg(long)]
    pub branch: Option<String>,

    /// Listen port for the API service unit
    #[arg(long)]
    pub port: Option<u16>,

    /// Don't start the service after registration
    #[arg(long)]
    pub no_start: bool,

    /// Show the resolved plan without touching the system
    #[arg(long)]
    pub dry_run: bool,

    /// Also deploy the secondary Java service from its artifact manifest
    #[arg(long)]
    pub with_java: bool,

    /// Path to the secondary artifact manifest (implies nothing without --with-java)
    #[arg(long)]
    pub artifact_manifest: Option<PathBuf>,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
