use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::core::config::InstallerConfig;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::paths::SystemDirs;

/// User choices and derived paths for one installer session.
///
/// Owned by the front end and lent to one manager at a time; nothing else
/// holds a reference to it.
#[derive(Debug, Clone)]
pub struct InstallationState {
    pub install_path: PathBuf,
    pub start_menu_path: PathBuf,
    pub create_desktop_shortcut: bool,
    pub create_start_menu_shortcut: bool,
    /// `Content-Length` from the pre-flight size request. Advisory only.
    pub required_space_bytes: u64,
    /// Desktop shortcut written by the platform setup.
    pub shortcut_path: Option<PathBuf>,
    /// Start-menu shortcut written by the platform setup.
    pub start_menu_shortcut_path: Option<PathBuf>,
    pub application_to_launch: Option<PathBuf>,
    pub uninstall_mode_active: bool,
    pub license_accepted: bool,
    pub debug_mode: bool,
    pub language: String,
}

/// What is persisted after a successful install so a later session can
/// reverse it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallRecord {
    pub install_dir: PathBuf,
    pub start_menu_dir: PathBuf,
    #[serde(default)]
    pub desktop_shortcut: Option<PathBuf>,
    #[serde(default)]
    pub start_menu_shortcut: Option<PathBuf>,
    #[serde(default)]
    pub installed_at: Option<DateTime<Utc>>,
}

impl InstallationState {
    pub fn new(install_path: impl Into<PathBuf>, start_menu_path: impl Into<PathBuf>) -> Self {
        Self {
            install_path: install_path.into(),
            start_menu_path: start_menu_path.into(),
            create_desktop_shortcut: true,
            create_start_menu_shortcut: true,
            required_space_bytes: 0,
            shortcut_path: None,
            start_menu_shortcut_path: None,
            application_to_launch: None,
            uninstall_mode_active: false,
            license_accepted: false,
            debug_mode: false,
            language: "eng".to_string(),
        }
    }

    /// Initial state with the per-OS default paths.
    pub fn with_defaults(dirs: &SystemDirs, config: &InstallerConfig) -> Self {
        let mut state = Self::new(&dirs.default_install, &dirs.default_start_menu);
        state.debug_mode = config.debug;
        state.language = config.lang.clone();
        state
    }

    /// `"<n> MB"`, rounded down.
    pub fn required_space_display(&self) -> String {
        format!("{} MB", self.required_space_bytes / (1024 * 1024))
    }

    /// Creates the install directory if needed and checks it is a directory.
    pub fn ensure_install_dir(&self) -> InstallerResult<()> {
        std::fs::create_dir_all(&self.install_path)
            .map_err(|e| InstallerError::io(&self.install_path, e))?;

        let metadata = std::fs::metadata(&self.install_path)
            .map_err(|e| InstallerError::io(&self.install_path, e))?;
        if !metadata.is_dir() {
            return Err(InstallerError::Other(format!(
                "Install path {:?} is not a directory",
                self.install_path
            )));
        }
        Ok(())
    }

    pub fn uninstall_record(&self) -> UninstallRecord {
        UninstallRecord {
            install_dir: self.install_path.clone(),
            start_menu_dir: self.start_menu_path.clone(),
            desktop_shortcut: self.shortcut_path.clone(),
            start_menu_shortcut: self.start_menu_shortcut_path.clone(),
            installed_at: Some(Utc::now()),
        }
    }

    pub fn apply_uninstall_record(&mut self, record: UninstallRecord) {
        self.install_path = record.install_dir;
        self.start_menu_path = record.start_menu_dir;
        self.shortcut_path = record.desktop_shortcut;
        self.start_menu_shortcut_path = record.start_menu_shortcut;
    }

    /// Writes the uninstall record as YAML, creating parent directories.
    pub fn save_uninstall_record(&self, path: &Path) -> InstallerResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| InstallerError::io(parent, e))?;
        }
        let yaml = serde_yaml::to_string(&self.uninstall_record())?;
        std::fs::write(path, yaml).map_err(|e| InstallerError::io(path, e))?;
        debug!("Wrote uninstall record to {:?}", path);
        Ok(())
    }

    pub fn load_uninstall_record(path: &Path) -> InstallerResult<UninstallRecord> {
        let raw = std::fs::read_to_string(path).map_err(|e| InstallerError::io(path, e))?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Switches to uninstall mode when a record exists at `path`.
    ///
    /// A record that cannot be read leaves the state in install mode.
    pub fn detect_uninstall_mode(&mut self, path: &Path) -> bool {
        self.uninstall_mode_active = false;
        if !path.exists() {
            return false;
        }

        match Self::load_uninstall_record(path) {
            Ok(record) => {
                self.apply_uninstall_record(record);
                self.uninstall_mode_active = true;
                debug!("Uninstaller mode is active");
            }
            Err(e) => {
                error!("Failed to read uninstaller configuration file: {}", e);
            }
        }
        self.uninstall_mode_active
    }
}
