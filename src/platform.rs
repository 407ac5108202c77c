//! OS family detection and capability resolution.
//!
//! The host is classified once, up front, from `/etc/os-release` into a closed
//! set of families. Everything family-specific that later phases need (package
//! manager invocation, nginx user, site-config layout) is resolved here into a
//! single [`PlatformProfile`] instead of being re-derived phase by phase.

use std::path::Path;

use crate::error::{ProvisionError, Result};

/// Default location of the os-release metadata on modern distributions.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Supported OS family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// Debian, Ubuntu and derivatives (apt, www-data)
    Debian,
    /// RHEL, CentOS, Fedora and derivatives (yum/dnf, nginx user)
    Rhel,
}

impl OsFamily {
    fn from_id(id: &str) -> Option<Self> {
        match id {
            "debian" | "ubuntu" | "linuxmint" | "raspbian" | "pop" => Some(Self::Debian),
            "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "amzn" | "ol" => {
                Some(Self::Rhel)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debian => write!(f, "debian-like"),
            Self::Rhel => write!(f, "rhel-like"),
        }
    }
}

/// Classify an os-release document into an [`OsFamily`].
///
/// `ID` is authoritative; if it names no known distribution the `ID_LIKE`
/// tokens are consulted in order. Any other content is an unsupported
/// platform and the provisioner must abort before touching the system.
pub fn classify_os_release(content: &str) -> Result<OsFamily> {
    let mut id = None;
    let mut id_like = None;

    for line in content.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("ID=") {
            id = Some(unquote(value).to_ascii_lowercase());
        } else if let Some(value) = line.strip_prefix("ID_LIKE=") {
            id_like = Some(unquote(value).to_ascii_lowercase());
        }
    }

    if let Some(id) = &id
        && let Some(family) = OsFamily::from_id(id)
    {
        return Ok(family);
    }

    if let Some(like) = &id_like {
        for token in like.split_whitespace() {
            if let Some(family) = OsFamily::from_id(token) {
                return Ok(family);
            }
        }
    }

    Err(ProvisionError::unsupported(format!(
        "cannot classify distribution (ID={}, ID_LIKE={})",
        id.as_deref().unwrap_or("?"),
        id_like.as_deref().unwrap_or("?"),
    )))
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"').trim_matches('\'')
}

/// Detect the OS family of the running host.
pub fn detect(os_release_path: &Path) -> Result<OsFamily> {
    let content = std::fs::read_to_string(os_release_path).map_err(|e| {
        ProvisionError::unsupported(format!(
            "cannot read {}: {}",
            os_release_path.display(),
            e
        ))
    })?;
    classify_os_release(&content)
}

/// Resolved, family-specific capabilities consumed by every later phase.
#[derive(Debug, Clone, Copy)]
pub struct PlatformProfile {
    pub family: OsFamily,
    /// Package manager executable
    pub package_manager: &'static str,
    /// Arguments for a non-interactive package install, package names appended
    pub install_args: &'static [&'static str],
    /// Optional index refresh run once before the first install
    pub refresh_args: Option<&'static [&'static str]>,
    /// Account nginx workers run as
    pub web_user: &'static str,
    pub web_group: &'static str,
    /// Where per-site nginx configuration lives on this family
    pub site_config_dir: &'static str,
    /// Shell for system accounts that must not log in
    pub nologin_shell: &'static str,
    /// Full system package set for the deploy stack
    pub system_packages: &'static [&'static str],
    /// Minimal toolset needed before code acquisition
    pub base_packages: &'static [&'static str],
}

impl PlatformProfile {
    /// Resolve the capability profile for a classified family.
    pub fn resolve(family: OsFamily) -> Self {
        match family {
            OsFamily::Debian => Self {
                family,
                package_manager: "apt-get",
                install_args: &["install", "-y"],
                refresh_args: Some(&["update"]),
                web_user: "www-data",
                web_group: "www-data",
                site_config_dir: "/etc/nginx/sites-available",
                nologin_shell: "/usr/sbin/nologin",
                system_packages: &[
                    "nginx",
                    "python3",
                    "python3-venv",
                    "python3-pip",
                    "certbot",
                    "python3-certbot-nginx",
                    "build-essential",
                    "libssl-dev",
                    "libffi-dev",
                ],
                base_packages: &["git", "curl", "wget", "tar"],
            },
            OsFamily::Rhel => Self {
                family,
                package_manager: "yum",
                install_args: &["install", "-y"],
                refresh_args: None,
                web_user: "nginx",
                web_group: "nginx",
                site_config_dir: "/etc/nginx/conf.d",
                nologin_shell: "/sbin/nologin",
                system_packages: &[
                    "nginx",
                    "python3",
                    "python3-pip",
                    "certbot",
                    "python3-certbot-nginx",
                    "gcc",
                    "openssl-devel",
                    "libffi-devel",
                ],
                base_packages: &["git", "curl", "wget", "tar"],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_id() {
        let ubuntu = "NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\n";
        assert_eq!(classify_os_release(ubuntu).unwrap(), OsFamily::Debian);

        let centos = "NAME=\"CentOS Linux\"\nID=\"centos\"\nID_LIKE=\"rhel fedora\"\n";
        assert_eq!(classify_os_release(centos).unwrap(), OsFamily::Rhel);

        let debian = "ID=debian\n";
        assert_eq!(classify_os_release(debian).unwrap(), OsFamily::Debian);

        let amazon = "ID=\"amzn\"\nID_LIKE=\"centos rhel fedora\"\n";
        assert_eq!(classify_os_release(amazon).unwrap(), OsFamily::Rhel);
    }

    #[test]
    fn test_classify_by_id_like_fallback() {
        // Unknown derivative that declares its lineage
        let derivative = "ID=neon\nID_LIKE=\"ubuntu debian\"\n";
        assert_eq!(classify_os_release(derivative).unwrap(), OsFamily::Debian);

        let rocky_like = "ID=someos\nID_LIKE=\"rhel centos fedora\"\n";
        assert_eq!(classify_os_release(rocky_like).unwrap(), OsFamily::Rhel);
    }

    #[test]
    fn test_classify_rejects_unknown() {
        for content in [
            "ID=arch\n",
            "ID=gentoo\nID_LIKE=\n",
            "ID=alpine\nID_LIKE=musl\n",
            "",
            "NAME=Mystery\n",
        ] {
            let err = classify_os_release(content).unwrap_err();
            assert!(matches!(err, ProvisionError::UnsupportedPlatform(_)));
            assert!(err.is_fatal());
        }
    }

    #[test]
    fn test_profile_capabilities() {
        let deb = PlatformProfile::resolve(OsFamily::Debian);
        assert_eq!(deb.package_manager, "apt-get");
        assert_eq!(deb.web_user, "www-data");
        assert_eq!(deb.site_config_dir, "/etc/nginx/sites-available");
        assert!(deb.refresh_args.is_some());
        assert!(deb.system_packages.contains(&"python3-venv"));

        let rhel = PlatformProfile::resolve(OsFamily::Rhel);
        assert_eq!(rhel.package_manager, "yum");
        assert_eq!(rhel.web_user, "nginx");
        assert_eq!(rhel.site_config_dir, "/etc/nginx/conf.d");
        assert!(rhel.refresh_args.is_none());
        assert!(rhel.system_packages.contains(&"certbot"));
    }
}
