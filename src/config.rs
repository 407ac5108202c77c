//! Provisioning configuration.
//!
//! Every constant the installer needs is collected here and threaded
//! explicitly through the phases; nothing is read back out of the process
//! environment mid-run. A handful of values can be overridden from the CLI,
//! the rest mirror the fixed deployment layout of the Nginx Deploy API.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{ProvisionError, Result};

/// Upstream repository of the Nginx Deploy API application.
pub const DEFAULT_REPO_URL: &str = "https://github.com/ndeploy/nginx-deploy-api.git";
/// Branch cloned by default.
pub const DEFAULT_BRANCH: &str = "main";
/// Tarball fallback when the clone fails.
pub const DEFAULT_ARCHIVE_URL: &str =
    "https://github.com/ndeploy/nginx-deploy-api/archive/refs/heads/main.tar.gz";
/// Where the application tree is installed.
pub const DEFAULT_INSTALL_DIR: &str = "/opt/nginx-deploy-api";
/// Systemd unit name for the API service.
pub const SERVICE_NAME: &str = "nginx-deploy-api";
/// TCP port the API listens on.
pub const DEFAULT_PORT: u16 = 8000;
/// Endpoint used to resolve the host's public address for the summary.
pub const PUBLIC_IP_URL: &str = "https://api.ipify.org";

/// Auxiliary pip packages installed system-wide at pinned versions.
pub const PINNED_PIP_PACKAGES: &[(&str, &str)] =
    &[("uvicorn", "0.23.2"), ("aiofiles", "23.2.1")];

/// Directories provisioned for certificates, logs and web content,
/// owned by the platform's nginx user with mode 755.
pub const MANAGED_DIRS: &[&str] = &[
    "/etc/letsencrypt",
    "/var/log/letsencrypt",
    "/var/www",
];

/// Resolved configuration for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub repo_url: String,
    pub branch: String,
    pub archive_url: String,
    pub install_dir: PathBuf,
    pub service_name: String,
    pub service_port: u16,
    /// Where unit files are written (a tempdir in tests)
    pub unit_dir: PathBuf,
    /// os-release location (a fixture in tests)
    pub os_release_path: PathBuf,
    /// Wait between service start and the liveness probe
    pub settle_delay: Duration,
    /// Per-request timeout for the probe and the IP lookup
    pub probe_timeout: Duration,
    pub public_ip_url: String,
    /// Manifest describing the secondary (Java) service artifact
    pub artifact_manifest: Option<PathBuf>,
    pub auto_start: bool,
    pub dry_run: bool,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            repo_url: DEFAULT_REPO_URL.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            service_name: SERVICE_NAME.to_string(),
            service_port: DEFAULT_PORT,
            unit_dir: PathBuf::from("/etc/systemd/system"),
            os_release_path: PathBuf::from(crate::platform::OS_RELEASE_PATH),
            settle_delay: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(10),
            public_ip_url: PUBLIC_IP_URL.to_string(),
            artifact_manifest: None,
            auto_start: true,
            dry_run: false,
        }
    }
}

impl ProvisionConfig {
    /// Build the run configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        let mut cfg = Self::default();
        if let Some(dir) = &cli.install_dir {
            cfg.install_dir = dir.clone();
        }
        if let Some(branch) = &cli.branch {
            cfg.branch = branch.clone();
        }
        if let Some(port) = cli.port {
            cfg.service_port = port;
        }
        if cli.with_java {
            cfg.artifact_manifest = Some(
                cli.artifact_manifest
                    .clone()
                    .unwrap_or_else(|| cfg.install_dir.join("deploy/java-service.toml")),
            );
        }
        cfg.auto_start = !cli.no_start;
        cfg.dry_run = cli.dry_run;
        cfg
    }

    /// Venv directory inside the install tree, reused across runs.
    pub fn venv_dir(&self) -> PathBuf {
        self.install_dir.join("venv")
    }

    /// Local URL probed after service start.
    pub fn liveness_url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.service_port)
    }
}

/// Declared secondary-deployment artifact: resolved, digest-verified and only
/// then executed. Replaces the original fetch-and-pipe-to-shell step.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactManifest {
    pub artifact: ArtifactSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactSpec {
    pub name: String,
    pub version: String,
    pub url: String,
    /// Hex-encoded SHA-256 of the artifact
    pub sha256: String,
    /// Arguments passed when the verified artifact is executed
    #[serde(default)]
    pub run_args: Vec<String>,
}

impl ArtifactManifest {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ProvisionError::install(format!("invalid artifact manifest: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deploy_layout() {
        let cfg = ProvisionConfig::default();
        assert_eq!(cfg.install_dir, PathBuf::from("/opt/nginx-deploy-api"));
        assert_eq!(cfg.venv_dir(), PathBuf::from("/opt/nginx-deploy-api/venv"));
        assert_eq!(cfg.liveness_url(), "http://127.0.0.1:8000/");
        assert!(cfg.auto_start);
        assert!(cfg.artifact_manifest.is_none());
    }

    #[test]
    fn test_manifest_parsing() {
        let manifest: ArtifactManifest = toml::from_str(
            r#"
            [artifact]
            name = "java-deploy"
            version = "1.4.2"
            url = "https://example.com/java-deploy-1.4.2.run"
            sha256 = "aa11bb22cc33dd44ee55ff66aa77bb88cc99dd00ee11ff22aa33bb44cc55dd66"
            run_args = ["--install"]
            "#,
        )
        .unwrap();
        assert_eq!(manifest.artifact.name, "java-deploy");
        assert_eq!(manifest.artifact.run_args, vec!["--install"]);
    }

    #[test]
    fn test_manifest_requires_digest() {
        let result: std::result::Result<ArtifactManifest, _> = toml::from_str(
            r#"
            [artifact]
            name = "java-deploy"
            version = "1.4.2"
            url = "https://example.com/java-deploy.run"
            "#,
        );
        assert!(result.is_err());
    }
}
