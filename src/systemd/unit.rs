//! Systemd unit file generation and installation.
//!
//! The unit is synthesized from the resolved install directory and written
//! atomically so a crashed run never leaves a truncated service file behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};

/// Service unit parameters, fully resolved before generation.
#[derive(Debug, Clone)]
pub struct UnitConfig<'a> {
    pub service_name: &'a str,
    pub description: &'a str,
    /// Install directory; becomes both WorkingDirectory and PYTHONPATH
    pub working_dir: &'a Path,
    pub exec_start: String,
    pub user: &'a str,
    pub restart_always: bool,
}

/// Generate the unit file text.
pub fn generate_unit_content(config: &UnitConfig) -> String {
    let mut content = String::with_capacity(512);
    let working_dir = config.working_dir.display();

    content.push_str("[Unit]\n");
    content.push_str(&format!("Description={}\n", config.description));
    content.push_str("After=network.target\n");
    content.push('\n');

    content.push_str("[Service]\n");
    content.push_str("Type=simple\n");
    content.push_str(&format!("User={}\n", config.user));
    content.push_str(&format!("WorkingDirectory={working_dir}\n"));
    content.push_str(&format!("Environment=\"PYTHONPATH={working_dir}\"\n"));
    content.push_str(&format!("ExecStart={}\n", config.exec_start));
    if config.restart_always {
        content.push_str("Restart=always\n");
        content.push_str("RestartSec=5\n");
    } else {
        content.push_str("Restart=no\n");
    }
    content.push_str("StandardOutput=journal\n");
    content.push_str("StandardError=journal\n");
    content.push_str(&format!("SyslogIdentifier={}\n", config.service_name));
    content.push('\n');

    content.push_str("[Install]\n");
    content.push_str("WantedBy=multi-user.target\n");

    content
}

/// Write the unit file into `unit_dir` with mode 644. Returns the unit path.
pub fn write_unit_file(config: &UnitConfig, unit_dir: &Path) -> Result<PathBuf> {
    let content = generate_unit_content(config);
    let unit_path = unit_dir.join(format!("{}.service", config.service_name));

    if let Some(parent) = unit_path.parent() {
        fs::create_dir_all(parent)?;
    }

    write_file_atomic(&unit_path, &content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&unit_path)?.permissions();
        perms.set_mode(0o644);
        fs::set_permissions(&unit_path, perms)?;
    }

    Ok(unit_path)
}

/// Write file atomically to prevent a torn unit definition.
fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        ProvisionError::service(format!(
            "failed to install unit file {}: {e}",
            path.display()
        ))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config(working_dir: &Path) -> UnitConfig<'_> {
        UnitConfig {
            service_name: "nginx-deploy-api",
            description: "Nginx Deploy API",
            working_dir,
            exec_start: format!(
                "{}/venv/bin/uvicorn app.main:app --host 0.0.0.0 --port 8000",
                working_dir.display()
            ),
            user: "root",
            restart_always: true,
        }
    }

    #[test]
    fn test_working_dir_and_pythonpath_match_install_dir() {
        let install_dir = Path::new("/opt/nginx-deploy-api");
        let content = generate_unit_content(&sample_config(install_dir));

        assert!(content.contains("WorkingDirectory=/opt/nginx-deploy-api\n"));
        assert!(content.contains("Environment=\"PYTHONPATH=/opt/nginx-deploy-api\"\n"));
        assert!(content.contains("User=root\n"));
        assert!(content.contains("Restart=always\n"));
        assert!(content.contains("WantedBy=multi-user.target\n"));
    }

    #[test]
    fn test_unit_follows_custom_install_dir() {
        // Same invariant must hold for any resolved directory
        let install_dir = Path::new("/srv/deploy-api");
        let content = generate_unit_content(&sample_config(install_dir));
        assert!(content.contains("WorkingDirectory=/srv/deploy-api\n"));
        assert!(content.contains("PYTHONPATH=/srv/deploy-api\""));
    }

    #[test]
    fn test_write_unit_file_mode_and_name() {
        let tmp = tempfile::tempdir().unwrap();
        let config = sample_config(Path::new("/opt/nginx-deploy-api"));
        let path = write_unit_file(&config, tmp.path()).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "nginx-deploy-api.service"
        );
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("ExecStart=/opt/nginx-deploy-api/venv/bin/uvicorn"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644);
        }
        // No stray tmp file left behind
        assert!(!path.with_extension("tmp").exists());
    }
}
