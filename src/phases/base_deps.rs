//! Base dependency install: the minimal toolset (git, curl, wget, tar) the
//! code-acquisition phase needs.
//!
//! Failures here are warnings: if git really is unusable, the fetch phase
//! raises the fatal error once the archive fallback has also been tried.

use crate::command::{CommandRunner, run_lenient};
use crate::phases::PhaseOutcome;
use crate::platform::PlatformProfile;
use crate::report::Reporter;

pub fn run(
    runner: &dyn CommandRunner,
    profile: &PlatformProfile,
    report: &mut Reporter,
) -> PhaseOutcome {
    let missing: Vec<&str> = profile
        .base_packages
        .iter()
        .copied()
        .filter(|tool| which::which(tool).is_err())
        .collect();

    if missing.is_empty() {
        report.success("base tools already present");
        return PhaseOutcome::Completed;
    }

    report.info(&format!("installing base tools: {}", missing.join(", ")));
    let before = report.warnings().len();

    if let Some(refresh) = profile.refresh_args
        && let Err(msg) = run_lenient(runner, profile.package_manager, refresh)
    {
        report.warn(format!("package index refresh failed: {msg}"));
    }

    let mut args: Vec<&str> = profile.install_args.to_vec();
    args.extend(&missing);
    match run_lenient(runner, profile.package_manager, &args) {
        Ok(_) => report.success("base tools installed"),
        Err(msg) => report.warn(format!("base tool install failed: {msg}")),
    }

    PhaseOutcome::from_warning_count(before, report.warnings().len())
}
