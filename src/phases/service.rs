//! Service registration: synthesize the systemd unit for the API, reload the
//! unit cache, enable boot-time start and start it now.
//!
//! Registration problems are recorded as warnings; the original installer
//! contract treats service startup as non-fatal and verification reports the
//! resulting state.

use crate::command::CommandRunner;
use crate::config::ProvisionConfig;
use crate::phases::PhaseOutcome;
use crate::report::Reporter;
use crate::systemd::{self, UnitConfig};

pub fn run(
    runner: &dyn CommandRunner,
    cfg: &ProvisionConfig,
    report: &mut Reporter,
) -> PhaseOutcome {
    let before = report.warnings().len();

    let exec_start = format!(
        "{}/bin/uvicorn app.main:app --host 0.0.0.0 --port {}",
        cfg.venv_dir().display(),
        cfg.service_port
    );
    let unit = UnitConfig {
        service_name: &cfg.service_name,
        description: "Nginx Deploy API",
        working_dir: &cfg.install_dir,
        exec_start,
        user: "root",
        restart_always: true,
    };

    match systemd::write_unit_file(&unit, &cfg.unit_dir) {
        Ok(path) => report.success(&format!("unit written to {}", path.display())),
        Err(e) => {
            report.warn(format!("unit file installation failed: {e}"));
            return PhaseOutcome::CompletedWithWarnings;
        }
    }

    if let Err(e) = systemd::control::daemon_reload(runner) {
        report.warn(format!("daemon-reload failed: {e}"));
    }
    if let Err(e) = systemd::control::enable(runner, &cfg.service_name) {
        report.warn(format!("enable failed: {e}"));
    }

    if cfg.auto_start {
        match systemd::control::start(runner, &cfg.service_name) {
            Ok(()) => report.success(&format!("{} started", cfg.service_name)),
            Err(e) => report.warn(format!("service start failed: {e}")),
        }
    } else {
        report.info("service start skipped (--no-start)");
    }

    PhaseOutcome::from_warning_count(before, report.warnings().len())
}
