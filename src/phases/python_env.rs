//! Python environment setup: create (or reuse) the virtual environment,
//! upgrade its pip, install the project's dependency manifest.
//!
//! An existing venv is always reused; it is never recreated on a re-run.

use crate::command::{CommandRunner, run_lenient};
use crate::config::ProvisionConfig;
use crate::phases::PhaseOutcome;
use crate::report::Reporter;

pub fn run(
    runner: &dyn CommandRunner,
    cfg: &ProvisionConfig,
    report: &mut Reporter,
) -> PhaseOutcome {
    let before = report.warnings().len();
    let venv = cfg.venv_dir();
    let venv_str = venv.display().to_string();

    if venv.exists() {
        report.info(&format!("reusing virtual environment at {venv_str}"));
    } else {
        match run_lenient(runner, "python3", &["-m", "venv", &venv_str]) {
            Ok(_) => report.success(&format!("virtual environment created at {venv_str}")),
            Err(msg) => {
                report.warn(format!("venv creation failed: {msg}"));
                // Nothing to install into
                return PhaseOutcome::CompletedWithWarnings;
            }
        }
    }

    let pip = venv.join("bin/pip").display().to_string();

    if let Err(msg) = run_lenient(runner, &pip, &["install", "--upgrade", "pip"]) {
        report.warn(format!("pip self-upgrade failed: {msg}"));
    }

    let requirements = cfg.install_dir.join("requirements.txt");
    if requirements.exists() {
        let req_str = requirements.display().to_string();
        match run_lenient(runner, &pip, &["install", "-r", &req_str]) {
            Ok(_) => report.success("project dependencies installed"),
            Err(msg) => report.warn(format!("requirements install failed: {msg}")),
        }
    } else {
        report.warn(format!(
            "no requirements.txt at {}",
            requirements.display()
        ));
    }

    PhaseOutcome::from_warning_count(before, report.warnings().len())
}
