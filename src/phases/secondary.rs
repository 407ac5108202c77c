//! Secondary deployment: the independently hosted Java service.
//!
//! The original installer piped a remote script straight into a shell. Here
//! the artifact is declared in a versioned manifest with a required SHA-256;
//! it is downloaded, digest-verified, and only then executed. A mismatch
//! discards the download. Like verification, this phase is best-effort.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::command::{CommandRunner, run_lenient};
use crate::config::{ArtifactManifest, ProvisionConfig};
use crate::download;
use crate::phases::PhaseOutcome;
use crate::report::Reporter;

pub async fn run(
    runner: &dyn CommandRunner,
    cfg: &ProvisionConfig,
    report: &mut Reporter,
) -> PhaseOutcome {
    let Some(manifest_path) = &cfg.artifact_manifest else {
        return PhaseOutcome::Completed;
    };

    let before = report.warnings().len();

    let manifest = match ArtifactManifest::load(manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            report.warn(format!(
                "cannot load artifact manifest {}: {e}",
                manifest_path.display()
            ));
            return PhaseOutcome::CompletedWithWarnings;
        }
    };

    let artifact = &manifest.artifact;
    report.info(&format!(
        "deploying {} {} from {}",
        artifact.name, artifact.version, artifact.url
    ));

    let staging = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            report.warn(format!("cannot create staging directory: {e}"));
            return PhaseOutcome::CompletedWithWarnings;
        }
    };
    let artifact_path = staging.path().join(&artifact.name);

    if let Err(e) = download::download_file(&artifact.url, &artifact_path).await {
        report.warn(format!("artifact download failed: {e}"));
        return PhaseOutcome::CompletedWithWarnings;
    }

    match digest_matches(&artifact_path, &artifact.sha256) {
        Ok(true) => report.success("artifact digest verified"),
        Ok(false) => {
            // Unverified code never runs; the tempdir drops the download
            report.warn(format!(
                "artifact digest mismatch for {}, discarding download",
                artifact.name
            ));
            return PhaseOutcome::CompletedWithWarnings;
        }
        Err(e) => {
            report.warn(format!("cannot hash artifact: {e}"));
            return PhaseOutcome::CompletedWithWarnings;
        }
    }

    let path_str = artifact_path.display().to_string();
    if let Err(msg) = run_lenient(runner, "chmod", &["+x", &path_str]) {
        report.warn(format!("cannot mark artifact executable: {msg}"));
        return PhaseOutcome::CompletedWithWarnings;
    }

    let run_args: Vec<&str> = artifact.run_args.iter().map(String::as_str).collect();
    match run_lenient(runner, &path_str, &run_args) {
        Ok(_) => report.success(&format!("{} {} deployed", artifact.name, artifact.version)),
        Err(msg) => report.warn(format!("secondary deploy failed: {msg}")),
    }

    PhaseOutcome::from_warning_count(before, report.warnings().len())
}

/// Compare the file's SHA-256 against the manifest digest (hex, case-insensitive).
pub fn digest_matches(path: &Path, expected_hex: &str) -> std::io::Result<bool> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest).eq_ignore_ascii_case(expected_hex.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_matches() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("artifact.run");
        std::fs::write(&file, b"hello world").unwrap();

        // sha256("hello world")
        let expected = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
        assert!(digest_matches(&file, expected).unwrap());
        assert!(digest_matches(&file, &expected.to_uppercase()).unwrap());
        assert!(!digest_matches(&file, &"0".repeat(64)).unwrap());
    }
}
