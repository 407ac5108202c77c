//! Colored status output and the final summary block.
//!
//! Mirrors the tagged INFO/WARN/ERROR lines the deploy tooling has always
//! printed, and accumulates warnings so the summary can show what was
//! tolerated along the way without changing the exit code.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::phases::PhaseOutcome;

/// Queried state of one installed service, shown in the summary.
#[derive(Debug, Clone)]
pub struct ServiceState {
    pub name: String,
    pub active: bool,
}

/// Collects warnings and per-phase outcomes, writes tagged colored status
/// lines.
#[derive(Debug)]
pub struct Reporter {
    warnings: Vec<String>,
    phases: Vec<(String, PhaseOutcome)>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            phases: Vec::new(),
        }
    }

    /// Record how a phase finished.
    pub fn phase_done(&mut self, name: &str, outcome: PhaseOutcome) {
        match outcome {
            PhaseOutcome::Completed => log::debug!("phase complete: {name}"),
            PhaseOutcome::CompletedWithWarnings => {
                log::warn!("phase completed with warnings: {name}");
            }
        }
        self.phases.push((name.to_string(), outcome));
    }

    pub fn phase_outcomes(&self) -> &[(String, PhaseOutcome)] {
        &self.phases
    }

    pub fn info(&mut self, msg: &str) {
        log::info!("{msg}");
        let mut stdout = StandardStream::stdout(ColorChoice::Auto);
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
        let _ = write!(stdout, "[INFO] ");
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{msg}");
    }

    pub fn success(&mut self, msg: &str) {
        log::info!("{msg}");
        let mut stdout = StandardStream::stdout(ColorChoice::Auto);
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = write!(stdout, "[ OK ] ");
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{msg}");
    }

    /// Record and print a tolerated failure. Never changes the exit code.
    pub fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        log::warn!("{msg}");
        let mut stdout = StandardStream::stdout(ColorChoice::Auto);
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = write!(stdout, "[WARN] ");
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{msg}");
        self.warnings.push(msg);
    }

    pub fn error(&mut self, msg: &str) {
        log::error!("{msg}");
        let mut stderr = StandardStream::stderr(ColorChoice::Auto);
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
        let _ = write!(stderr, "[ERROR] ");
        let _ = stderr.reset();
        let _ = writeln!(stderr, "{msg}");
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Print the consolidated summary: service states, access URLs, warnings.
    pub fn print_summary(&mut self, public_ip: &str, api_port: u16, services: &[ServiceState]) {
        let mut stdout = StandardStream::stdout(ColorChoice::Auto);

        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(stdout, "\n==================== Deployment Summary ====================");
        let _ = stdout.reset();

        for service in services {
            let (color, state) = if service.active {
                (Color::Green, "active")
            } else {
                (Color::Yellow, "inactive")
            };
            let _ = write!(stdout, "  {:<24}", service.name);
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)));
            let _ = writeln!(stdout, "{state}");
            let _ = stdout.reset();
        }

        let _ = writeln!(stdout);
        let _ = writeln!(stdout, "  API:   http://{public_ip}:{api_port}");
        let _ = writeln!(stdout, "  Nginx: http://{public_ip}");

        if !self.warnings.is_empty() {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
            let _ = writeln!(stdout, "\n  {} warning(s) during provisioning:", self.warnings.len());
            let _ = stdout.reset();
            for warning in &self.warnings {
                let _ = writeln!(stdout, "   - {warning}");
            }
        }

        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(stdout, "============================================================");
        let _ = stdout.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_accumulate() {
        let mut report = Reporter::new();
        assert!(!report.has_warnings());
        report.warn("pip upgrade failed");
        report.warn("liveness probe timed out");
        assert_eq!(report.warnings().len(), 2);
        assert!(report.warnings()[1].contains("probe"));
    }

    #[test]
    fn test_phase_outcomes_recorded() {
        let mut report = Reporter::new();
        report.phase_done("verification", PhaseOutcome::CompletedWithWarnings);
        report.phase_done("secondary deployment", PhaseOutcome::Completed);

        let outcomes = report.phase_outcomes();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[0],
            ("verification".to_string(), PhaseOutcome::CompletedWithWarnings)
        );
    }

    #[test]
    fn test_reporter_is_debug_printable() {
        let mut report = Reporter::new();
        report.warn("unit write failed");
        assert!(format!("{report:?}").contains("unit write failed"));
    }
}
