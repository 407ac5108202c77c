//! Two-tier code acquisition: git clone, then archive fallback.
//!
//! A pre-existing install directory is never overwritten in place; it is
//! renamed to a uniquely timestamped backup first, so a re-run cannot corrupt
//! a previous installation. Only when both the clone and the archive download
//! fail does the run abort.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use crate::command::{CommandRunner, run_lenient};
use crate::config::ProvisionConfig;
use crate::download;
use crate::error::{ProvisionError, Result};
use crate::report::Reporter;

/// Rename a pre-existing install directory to a timestamped backup.
///
/// Returns the backup path, or `None` if there was nothing to back up. If a
/// backup from the same second already exists, a numeric suffix keeps the
/// path unique; prior contents are never deleted.
pub fn backup_existing(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let base = format!("{}.bak.{stamp}", dir.display());
    let mut backup = PathBuf::from(&base);
    let mut counter = 1;
    while backup.exists() {
        backup = PathBuf::from(format!("{base}-{counter}"));
        counter += 1;
    }

    std::fs::rename(dir, &backup)?;
    Ok(Some(backup))
}

/// Fallback source of the application tree when the clone fails.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Place the application tree at `target`.
    async fn fetch_into(&self, url: &str, target: &Path) -> anyhow::Result<()>;
}

/// Downloads the fixed tarball URL, unpacks it and moves its single
/// top-level directory into place.
pub struct HttpArchiveSource;

#[async_trait]
impl ArchiveSource for HttpArchiveSource {
    async fn fetch_into(&self, url: &str, target: &Path) -> anyhow::Result<()> {
        let staging = tempfile::tempdir()?;
        let tarball = staging.path().join("source.tar.gz");
        download::download_file(url, &tarball).await?;

        let unpack_dir = staging.path().join("unpacked");
        download::unpack_tarball(&tarball, &unpack_dir).await?;
        download::relocate_single_root(&unpack_dir, target)?;
        Ok(())
    }
}

/// Acquire the application source into the configured install directory.
pub async fn acquire_source(
    runner: &dyn CommandRunner,
    archive: &dyn ArchiveSource,
    cfg: &ProvisionConfig,
    report: &mut Reporter,
) -> Result<()> {
    if let Some(parent) = cfg.install_dir.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match backup_existing(&cfg.install_dir)? {
        Some(backup) => report.info(&format!(
            "existing installation moved to {}",
            backup.display()
        )),
        None => report.info("no previous installation found"),
    }

    let install_dir = cfg.install_dir.display().to_string();
    report.info(&format!("cloning {} (branch {})", cfg.repo_url, cfg.branch));

    let clone_error = match run_lenient(
        runner,
        "git",
        &[
            "clone",
            "--depth",
            "1",
            "--branch",
            &cfg.branch,
            &cfg.repo_url,
            &install_dir,
        ],
    ) {
        Ok(_) => {
            report.success("source cloned");
            return Ok(());
        }
        Err(msg) => msg,
    };

    report.warn(format!(
        "clone failed, falling back to archive download: {clone_error}"
    ));

    // A half-written clone target would break the rename out of the archive
    if cfg.install_dir.exists() {
        let _ = std::fs::remove_dir_all(&cfg.install_dir);
    }

    match archive.fetch_into(&cfg.archive_url, &cfg.install_dir).await {
        Ok(()) => {
            report.success("source unpacked from archive");
            Ok(())
        }
        Err(archive_error) => Err(ProvisionError::fetch(format!(
            "clone failed ({clone_error}); archive fallback failed ({archive_error})"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_preserves_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path().join("nginx-deploy-api");
        std::fs::create_dir_all(install.join("app")).unwrap();
        std::fs::write(install.join("app/main.py"), "v1").unwrap();

        let backup = backup_existing(&install).unwrap().unwrap();
        assert!(!install.exists());
        assert!(backup.exists());
        assert_eq!(
            std::fs::read_to_string(backup.join("app/main.py")).unwrap(),
            "v1"
        );
        let name = backup.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("nginx-deploy-api.bak."));
    }

    #[test]
    fn test_backup_paths_stay_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path().join("api");

        // Two backups within the same second must not collide
        std::fs::create_dir(&install).unwrap();
        std::fs::write(install.join("marker"), "first").unwrap();
        let first = backup_existing(&install).unwrap().unwrap();

        std::fs::create_dir(&install).unwrap();
        std::fs::write(install.join("marker"), "second").unwrap();
        let second = backup_existing(&install).unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(first.join("marker")).unwrap(), "first");
        assert_eq!(
            std::fs::read_to_string(second.join("marker")).unwrap(),
            "second"
        );
    }

    #[test]
    fn test_backup_noop_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(backup_existing(&tmp.path().join("absent")).unwrap().is_none());
    }
}
