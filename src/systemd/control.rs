//! Service control operations over systemctl.

use crate::command::{CommandRunner, run_checked};
use crate::error::Result;

/// Reload the unit cache after writing or changing unit files.
pub fn daemon_reload(runner: &dyn CommandRunner) -> Result<()> {
    run_checked(runner, "systemctl", &["daemon-reload"])?;
    Ok(())
}

/// Enable a service for boot-time start.
pub fn enable(runner: &dyn CommandRunner, service: &str) -> Result<()> {
    run_checked(runner, "systemctl", &["enable", &format!("{service}.service")])?;
    Ok(())
}

/// Start a service immediately.
pub fn start(runner: &dyn CommandRunner, service: &str) -> Result<()> {
    run_checked(runner, "systemctl", &["start", &format!("{service}.service")])?;
    Ok(())
}

/// Restart a service.
pub fn restart(runner: &dyn CommandRunner, service: &str) -> Result<()> {
    run_checked(
        runner,
        "systemctl",
        &["restart", &format!("{service}.service")],
    )?;
    Ok(())
}

/// Best-effort check whether a service is active. `systemctl is-active`
/// exits non-zero for anything but `active`, so failures map to `false`.
pub fn is_active(runner: &dyn CommandRunner, service: &str) -> bool {
    match runner.run("systemctl", &["is-active", &format!("{service}.service")]) {
        Ok(output) => output.success && output.stdout.trim() == "active",
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CmdOutput;

    struct FixedRunner {
        stdout: &'static str,
        success: bool,
    }

    impl CommandRunner for FixedRunner {
        fn run(&self, _program: &str, _args: &[&str]) -> std::io::Result<CmdOutput> {
            Ok(CmdOutput {
                success: self.success,
                stdout: self.stdout.to_string(),
                stderr: String::new(),
            })
        }
    }

    #[test]
    fn test_is_active_requires_active_output() {
        let runner = FixedRunner {
            stdout: "active\n",
            success: true,
        };
        assert!(is_active(&runner, "nginx"));

        let runner = FixedRunner {
            stdout: "inactive\n",
            success: false,
        };
        assert!(!is_active(&runner, "nginx"));

        // activating is not active
        let runner = FixedRunner {
            stdout: "activating\n",
            success: true,
        };
        assert!(!is_active(&runner, "nginx"));
    }
}
