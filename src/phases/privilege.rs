//! Privilege gate: the provisioner mutates package state, system directories
//! and the service manager, so anything but root aborts before phase one.

use nix::unistd::Uid;

use crate::error::{ProvisionError, Result};
use crate::phases::PhaseOutcome;
use crate::report::Reporter;

/// Fail fatally unless running with an effective UID of 0.
pub fn run(euid: Uid, report: &mut Reporter) -> Result<PhaseOutcome> {
    ensure_root(euid)?;
    report.success("running with administrative privileges");
    Ok(PhaseOutcome::Completed)
}

pub fn ensure_root(euid: Uid) -> Result<()> {
    if euid.is_root() {
        Ok(())
    } else {
        Err(ProvisionError::privilege(format!(
            "must run as root (effective uid {euid})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_passes() {
        assert!(ensure_root(Uid::from_raw(0)).is_ok());
    }

    #[test]
    fn test_non_root_is_fatal() {
        let err = ensure_root(Uid::from_raw(1000)).unwrap_err();
        assert!(matches!(err, ProvisionError::Privilege(_)));
        assert!(err.is_fatal());
    }
}
