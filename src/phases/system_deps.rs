//! System dependency install: the full deploy stack (nginx, Python, certbot,
//! build toolchain), pinned auxiliary pip packages, and the fixed directory
//! layout for certificates, logs and web content.
//!
//! Package-manager exit codes are checked but tolerated: each non-zero exit
//! becomes a recorded warning instead of aborting the run.

use crate::command::{CommandRunner, run_lenient};
use crate::config::{MANAGED_DIRS, PINNED_PIP_PACKAGES};
use crate::phases::PhaseOutcome;
use crate::platform::PlatformProfile;
use crate::report::Reporter;

pub fn run(
    runner: &dyn CommandRunner,
    profile: &PlatformProfile,
    report: &mut Reporter,
) -> PhaseOutcome {
    let before = report.warnings().len();

    install_packages(runner, profile, report);
    install_pinned_pip(runner, report);
    provision_directories(runner, profile, report);

    PhaseOutcome::from_warning_count(before, report.warnings().len())
}

fn install_packages(
    runner: &dyn CommandRunner,
    profile: &PlatformProfile,
    report: &mut Reporter,
) {
    report.info(&format!(
        "installing system packages via {}",
        profile.package_manager
    ));

    if let Some(refresh) = profile.refresh_args
        && let Err(msg) = run_lenient(runner, profile.package_manager, refresh)
    {
        report.warn(format!("package index refresh failed: {msg}"));
    }

    let mut args: Vec<&str> = profile.install_args.to_vec();
    args.extend(profile.system_packages);
    match run_lenient(runner, profile.package_manager, &args) {
        Ok(_) => report.success("system packages installed"),
        Err(msg) => report.warn(format!("system package install failed: {msg}")),
    }
}

fn install_pinned_pip(runner: &dyn CommandRunner, report: &mut Reporter) {
    for (name, version) in PINNED_PIP_PACKAGES {
        let spec = format!("{name}=={version}");
        match run_lenient(runner, "python3", &["-m", "pip", "install", &spec]) {
            Ok(_) => report.info(&format!("installed {spec}")),
            Err(msg) => report.warn(format!("pip install {spec} failed: {msg}")),
        }
    }
}

/// Create the certificate, log, site-config and web-content directories with
/// the nginx user as owner and mode 755, the layout the API service expects.
fn provision_directories(
    runner: &dyn CommandRunner,
    profile: &PlatformProfile,
    report: &mut Reporter,
) {
    let owner = format!("{}:{}", profile.web_user, profile.web_group);

    let mut dirs: Vec<&str> = MANAGED_DIRS.to_vec();
    dirs.push(profile.site_config_dir);

    for dir in dirs {
        if let Err(msg) = run_lenient(runner, "mkdir", &["-p", dir]) {
            report.warn(format!("mkdir {dir} failed: {msg}"));
            continue;
        }
        if let Err(msg) = run_lenient(runner, "chown", &["-R", &owner, dir]) {
            report.warn(format!("chown {dir} failed: {msg}"));
        }
        if let Err(msg) = run_lenient(runner, "chmod", &["-R", "755", dir]) {
            report.warn(format!("chmod {dir} failed: {msg}"));
        }
    }
    report.info(&format!("directory layout provisioned (owner {owner})"));
}
