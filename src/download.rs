//! Archive download and extraction for the source-fetch fallback.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use flate2::read::GzDecoder;
use tar::Archive;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

/// Initial connection timeout
const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Abort if no data arrives for this long mid-transfer
const DOWNLOAD_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Download a URL to a local file, streaming chunks to disk.
pub async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let client = reqwest::Client::builder()
        .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
        .user_agent("ndeploy-install/0.1")
        .build()?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("download rejected: {url}"))?;

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("cannot create {}", dest.display()))?;
    let mut downloaded: u64 = 0;

    use futures::StreamExt;
    let mut stream = response.bytes_stream();

    loop {
        let chunk = match timeout(DOWNLOAD_INACTIVITY_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) => break,
            Err(_) => {
                return Err(anyhow!(
                    "download stalled: no data for {}s from {} ({} bytes received)",
                    DOWNLOAD_INACTIVITY_TIMEOUT.as_secs(),
                    url,
                    downloaded
                ));
            }
        };
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    log::debug!("downloaded {downloaded} bytes from {url}");
    Ok(())
}

/// Unpack a gzip tarball into `dest`. The decompression is CPU-bound, so it
/// runs on the blocking pool.
pub async fn unpack_tarball(tarball: &Path, dest: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dest).await?;

    let tarball = tarball.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&tarball)
            .with_context(|| format!("cannot open {}", tarball.display()))?;
        let tar = GzDecoder::new(file);
        let mut archive = Archive::new(tar);
        archive
            .unpack(&dest)
            .with_context(|| format!("cannot unpack into {}", dest.display()))?;
        Ok::<_, anyhow::Error>(())
    })
    .await
    .context("task join failed")??;

    Ok(())
}

/// Move the archive's single top-level directory to `target`.
///
/// GitHub tarballs wrap the tree in `<repo>-<branch>/`; the install dir must
/// contain the tree itself. Errors if the unpack produced zero or multiple
/// top-level entries, which would mean the archive layout changed.
pub fn relocate_single_root(unpack_dir: &Path, target: &Path) -> Result<PathBuf> {
    let mut roots: Vec<PathBuf> = std::fs::read_dir(unpack_dir)
        .with_context(|| format!("cannot read {}", unpack_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();

    match roots.len() {
        1 => {
            let root = roots.remove(0);
            if !root.is_dir() {
                return Err(anyhow!(
                    "archive root {} is not a directory",
                    root.display()
                ));
            }
            move_tree(&root, target).with_context(|| {
                format!("cannot move {} to {}", root.display(), target.display())
            })?;
            Ok(target.to_path_buf())
        }
        0 => Err(anyhow!("archive was empty")),
        n => Err(anyhow!("archive has {n} top-level entries, expected one")),
    }
}

/// Move a directory into place. Rename cannot cross filesystems, and the
/// staging tempdir is often on tmpfs while the install dir is not, so EXDEV
/// falls back to copying the tree and removing the source.
fn move_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    match std::fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            copy_tree(src, dest)?;
            std::fs::remove_dir_all(src)
        }
        Err(e) => Err(e),
    }
}

fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let to = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &to)?;
        } else {
            std::fs::copy(entry.path(), &to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocate_single_root() {
        let tmp = tempfile::tempdir().unwrap();
        let unpack = tmp.path().join("unpack");
        let root = unpack.join("nginx-deploy-api-main");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("requirements.txt"), "fastapi\n").unwrap();

        let target = tmp.path().join("install");
        relocate_single_root(&unpack, &target).unwrap();

        assert!(target.join("requirements.txt").exists());
        assert!(!root.exists());
    }

    #[test]
    fn test_relocate_across_filesystems() {
        // /dev/shm is a separate tmpfs mount on most Linux hosts, so the
        // rename out of /tmp staging hits EXDEV there. Skip where absent.
        let shm = Path::new("/dev/shm");
        if !shm.is_dir() {
            return;
        }

        let staging = tempfile::tempdir().unwrap();
        let unpack = staging.path().join("unpack");
        let root = unpack.join("nginx-deploy-api-main");
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::write(root.join("app/main.py"), "print('ok')\n").unwrap();

        let target_root = tempfile::tempdir_in(shm).unwrap();
        let target = target_root.path().join("nginx-deploy-api");
        relocate_single_root(&unpack, &target).unwrap();

        assert!(target.join("app/main.py").exists());
        assert!(!root.exists());
    }

    #[test]
    fn test_copy_tree_preserves_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("a/b/deep.txt"), "deep").unwrap();
        std::fs::write(src.join("top.txt"), "top").unwrap();

        let dest = tmp.path().join("dest");
        copy_tree(&src, &dest).unwrap();

        assert_eq!(std::fs::read_to_string(dest.join("top.txt")).unwrap(), "top");
        assert_eq!(
            std::fs::read_to_string(dest.join("a/b/deep.txt")).unwrap(),
            "deep"
        );
    }

    #[test]
    fn test_relocate_rejects_multiple_roots() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("a")).unwrap();
        std::fs::create_dir(tmp.path().join("b")).unwrap();

        let err = relocate_single_root(tmp.path(), &tmp.path().join("out")).unwrap_err();
        assert!(err.to_string().contains("top-level entries"));
    }

    #[test]
    fn test_relocate_rejects_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(relocate_single_root(&empty, &tmp.path().join("out")).is_err());
    }

    #[tokio::test]
    async fn test_unpack_tarball_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();

        // Build a small gzip tarball with one directory inside
        let tarball = tmp.path().join("src.tar.gz");
        {
            let file = std::fs::File::create(&tarball).unwrap();
            let enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(enc);
            let tree = tmp.path().join("tree");
            std::fs::create_dir_all(tree.join("app")).unwrap();
            std::fs::write(tree.join("app/main.py"), "print('ok')\n").unwrap();
            builder.append_dir_all("nginx-deploy-api-main", &tree).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = tmp.path().join("out");
        unpack_tarball(&tarball, &dest).await.unwrap();
        assert!(dest.join("nginx-deploy-api-main/app/main.py").exists());
    }
}
