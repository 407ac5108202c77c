//! Provisioning pipeline: a strictly ordered chain of phases with no retries
//! and no rollback beyond the install-directory backup.
//!
//! The first fatal error stops the run and leaves partial state in place for
//! inspection. Tolerated failures accumulate as warnings and surface in the
//! summary; they never change the exit code.

use std::time::Duration;

use nix::unistd::Uid;

use crate::command::CommandRunner;
use crate::config::ProvisionConfig;
use crate::error::Result;
use crate::fetch::{self, ArchiveSource};
use crate::phases::{self, PhaseOutcome};
use crate::platform::{self, PlatformProfile};
use crate::report::{Reporter, ServiceState};

/// Runs the provisioning sequence against one host.
pub struct Provisioner<'a> {
    cfg: ProvisionConfig,
    runner: &'a dyn CommandRunner,
    archive: &'a dyn ArchiveSource,
    euid: Uid,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        cfg: ProvisionConfig,
        runner: &'a dyn CommandRunner,
        archive: &'a dyn ArchiveSource,
    ) -> Self {
        Self::with_euid(cfg, runner, archive, Uid::effective())
    }

    /// Construct with an explicit effective UID. Lets tests exercise the
    /// pipeline without running as root.
    pub fn with_euid(
        cfg: ProvisionConfig,
        runner: &'a dyn CommandRunner,
        archive: &'a dyn ArchiveSource,
        euid: Uid,
    ) -> Self {
        Self {
            cfg,
            runner,
            archive,
            euid,
        }
    }

    /// Execute every phase in order. Returns the reporter with accumulated
    /// warnings on success; the first fatal error otherwise.
    pub async fn run(self) -> Result<Reporter> {
        let mut report = Reporter::new();

        if self.cfg.dry_run {
            self.print_plan(&mut report);
            return Ok(report);
        }

        let outcome = phases::privilege::run(self.euid, &mut report)?;
        report.phase_done("privilege check", outcome);

        let family = platform::detect(&self.cfg.os_release_path)?;
        let profile = PlatformProfile::resolve(family);
        report.success(&format!("detected {family} host"));
        report.phase_done("platform resolution", PhaseOutcome::Completed);

        let outcome = phases::base_deps::run(self.runner, &profile, &mut report);
        report.phase_done("base dependencies", outcome);

        let before = report.warnings().len();
        fetch::acquire_source(self.runner, self.archive, &self.cfg, &mut report).await?;
        report.phase_done(
            "code acquisition",
            PhaseOutcome::from_warning_count(before, report.warnings().len()),
        );

        let outcome = phases::system_deps::run(self.runner, &profile, &mut report);
        report.phase_done("system dependencies", outcome);

        let outcome = phases::python_env::run(self.runner, &self.cfg, &mut report);
        report.phase_done("python environment", outcome);

        let outcome = phases::service::run(self.runner, &self.cfg, &mut report);
        report.phase_done("service registration", outcome);

        let outcome = phases::verify::run(self.runner, &self.cfg, &mut report).await;
        report.phase_done("verification", outcome);

        let outcome = phases::secondary::run(self.runner, &self.cfg, &mut report).await;
        report.phase_done("secondary deployment", outcome);

        self.print_summary(&mut report).await;
        Ok(report)
    }

    /// Resolve and print what a real run would do, without touching the host.
    fn print_plan(&self, report: &mut Reporter) {
        report.info("dry run: no changes will be made");

        match platform::detect(&self.cfg.os_release_path) {
            Ok(family) => {
                let profile = PlatformProfile::resolve(family);
                report.info(&format!(
                    "would install via {}: {}",
                    profile.package_manager,
                    profile.system_packages.join(" ")
                ));
                report.info(&format!(
                    "would provision directories owned by {}:{}",
                    profile.web_user, profile.web_group
                ));
            }
            Err(e) => report.warn(format!("platform resolution failed: {e}")),
        }

        report.info(&format!(
            "would clone {} (branch {}) into {}",
            self.cfg.repo_url,
            self.cfg.branch,
            self.cfg.install_dir.display()
        ));
        report.info(&format!(
            "would register unit {} in {} on port {}",
            self.cfg.service_name,
            self.cfg.unit_dir.display(),
            self.cfg.service_port
        ));
    }

    async fn print_summary(&self, report: &mut Reporter) {
        let states: Vec<ServiceState> = ["nginx", self.cfg.service_name.as_str()]
            .iter()
            .map(|name| ServiceState {
                name: name.to_string(),
                active: crate::systemd::control::is_active(self.runner, name),
            })
            .collect();

        let public_ip = lookup_public_ip(&self.cfg.public_ip_url, self.cfg.probe_timeout)
            .await
            .unwrap_or_else(|| {
                report.warn("public IP lookup failed, summary shows a placeholder");
                "<server-ip>".to_string()
            });

        report.print_summary(&public_ip, self.cfg.service_port, &states);
    }
}

/// Resolve the host's public address for the summary URLs. Best effort.
async fn lookup_public_ip(url: &str, request_timeout: Duration) -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .build()
        .ok()?;
    let ip = client.get(url).send().await.ok()?.text().await.ok()?;
    let ip = ip.trim().to_string();
    if ip.is_empty() { None } else { Some(ip) }
}
