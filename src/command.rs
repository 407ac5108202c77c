//! Shell-out seam for everything the provisioner runs on the host.
//!
//! Phases never spawn processes directly; they go through [`CommandRunner`]
//! so the fetch fallback ordering, warning downgrades and the no-mutation
//! guarantee of the platform check can be exercised in tests with a scripted
//! runner instead of a root shell.

use std::process::Command;

use log::debug;

use crate::error::{ProvisionError, Result};

/// Captured result of one command invocation.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    /// Combined output, stdout first. Some tools (nginx -v) report on stderr.
    pub fn combined(&self) -> String {
        if self.stdout.trim().is_empty() {
            self.stderr.trim().to_string()
        } else {
            self.stdout.trim().to_string()
        }
    }
}

/// Executes host commands. Implemented by [`SystemRunner`] in production and
/// by scripted runners in tests.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CmdOutput>;
}

/// Real runner backed by `std::process::Command`.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CmdOutput> {
        debug!("exec: {} {}", program, args.join(" "));
        let output = Command::new(program).args(args).output()?;
        Ok(CmdOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Run a command whose failure is an [`ProvisionError::Install`].
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<CmdOutput> {
    let output = runner
        .run(program, args)
        .map_err(|e| ProvisionError::install(format!("failed to execute {program}: {e}")))?;

    if !output.success {
        return Err(ProvisionError::install(format!(
            "{} {} failed: {}",
            program,
            args.join(" "),
            output.stderr.trim()
        )));
    }

    Ok(output)
}

/// Run a command whose failure is tolerated; returns the error message for
/// the caller to record as a warning.
pub fn run_lenient(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> std::result::Result<CmdOutput, String> {
    match runner.run(program, args) {
        Ok(output) if output.success => Ok(output),
        Ok(output) => Err(format!(
            "{} {} exited non-zero: {}",
            program,
            args.join(" "),
            output.stderr.trim()
        )),
        Err(e) => Err(format!("failed to execute {program}: {e}")),
    }
}
