use std::path::{Path, PathBuf};

use crate::error::SettingsError;
use crate::namespace;

/// Identity and file-system roots for the settings backends.
///
/// Every path is an explicit constructor input — there are no process-wide
/// defaults. The organization and application names appear in file names, so
/// both must pass the same allowed-character policy as namespaces.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Author organization, e.g. `com.example`.
    pub organization: String,

    /// Host application name, e.g. `gridworks`.
    pub application: String,

    /// Root directory for machine-wide settings files.
    pub system_dir: PathBuf,

    /// Root directory for per-user settings files.
    pub user_dir: PathBuf,
}

impl HostConfig {
    /// Build a config with explicit roots. Fails if the organization or
    /// application name violates the allowed-character policy.
    pub fn new(
        organization: &str,
        application: &str,
        system_dir: impl Into<PathBuf>,
        user_dir: impl Into<PathBuf>,
    ) -> Result<Self, SettingsError> {
        Ok(Self {
            organization: namespace::checked(organization)?,
            application: namespace::checked(application)?,
            system_dir: system_dir.into(),
            user_dir: user_dir.into(),
        })
    }

    /// Build a config using conventional roots: the platform user config
    /// directory for the user scope and `/etc/xdg` for the system scope.
    /// Hosts on platforms without a conventional system root should pass
    /// explicit paths via [`HostConfig::new`].
    pub fn with_default_dirs(
        organization: &str,
        application: &str,
    ) -> Result<Self, SettingsError> {
        let user_dir = dirs::config_dir()
            .ok_or_else(|| SettingsError::Storage("no user config directory".to_string()))?;
        Self::new(organization, application, "/etc/xdg", user_dir)
    }

    /// Settings file for the system scope:
    /// `<system_dir>/<organization>/<application>.ini`
    pub fn system_file(&self) -> PathBuf {
        self.system_dir
            .join(&self.organization)
            .join(format!("{}.ini", self.application))
    }

    /// Settings file for the user scope:
    /// `<user_dir>/<organization>/<application>.ini`
    pub fn user_file(&self) -> PathBuf {
        self.user_dir
            .join(&self.organization)
            .join(format!("{}.ini", self.application))
    }

    /// Settings file for the directory scope, inside the working directory
    /// of the open document: `<dir>/.<application>-settings.ini`
    pub fn directory_file(&self, dir: &Path) -> PathBuf {
        dir.join(format!(".{}-settings.ini", self.application))
    }
}
