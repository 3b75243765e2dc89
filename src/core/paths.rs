use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::config::InstallerConfig;
use crate::core::platform::Platform;

/// Overrides the directory bundled resources are read from.
pub const RESOURCES_ENV: &str = "INSTALLER_RESOURCES";

/// Well-known directories for one platform and one application.
#[derive(Debug, Clone)]
pub struct SystemDirs {
    /// User desktop. Localized through the XDG user dirs on Linux.
    pub desktop: PathBuf,
    /// OS-global start-menu root. Uninstall never deletes this directory.
    pub start_menu_root: PathBuf,
    pub default_install: PathBuf,
    pub default_start_menu: PathBuf,
    /// Persisted uninstall record.
    pub uninstall_config: PathBuf,
    pub resources: PathBuf,
    pub temp: PathBuf,
}

impl SystemDirs {
    pub fn detect(platform: &Platform, config: &InstallerConfig) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let app_dir = &config.install.default_dirs.appdata;
        let start_menu_folder = &config.install.default_dirs.start_menu;
        let config_name = format!("{}_config.yaml", config.app_id());

        let (desktop, start_menu_root, default_install, default_start_menu, uninstall_config) =
            match platform {
                Platform::Windows => {
                    let appdata = roaming_app_data(&home);
                    let root = appdata
                        .join("Microsoft")
                        .join("Windows")
                        .join("Start Menu")
                        .join("Programs");
                    (
                        dirs::desktop_dir().unwrap_or_else(|| home.join("Desktop")),
                        root.clone(),
                        appdata.join(app_dir),
                        root.join(start_menu_folder),
                        appdata.join(config_name),
                    )
                }
                Platform::Linux => {
                    let data = dirs::data_dir()
                        .unwrap_or_else(|| home.join(".local").join("share"));
                    let applications = data.join("applications");
                    (
                        dirs::desktop_dir().unwrap_or_else(|| home.join("Desktop")),
                        applications.clone(),
                        data.join(app_dir),
                        applications,
                        home.join(".config").join(format!(".{config_name}")),
                    )
                }
                Platform::MacOs => {
                    let support = home.join("Library").join("Application Support");
                    let applications = PathBuf::from("/Applications");
                    (
                        home.join("Desktop"),
                        applications.clone(),
                        support.join(app_dir),
                        applications,
                        support.join(format!(".{config_name}")),
                    )
                }
                Platform::Unsupported(os) => {
                    warn!("Unrecognized OS {}, falling back to the home directory", os);
                    (
                        home.clone(),
                        home.clone(),
                        home.join(app_dir),
                        home.join(start_menu_folder),
                        home.join(config_name),
                    )
                }
            };

        Self {
            desktop,
            start_menu_root,
            default_install,
            default_start_menu,
            uninstall_config,
            resources: resource_dir(),
            temp: std::env::temp_dir(),
        }
    }

    /// Path of a bundled resource.
    pub fn resource(&self, relative: &str) -> PathBuf {
        self.resources.join(relative)
    }
}

#[cfg(test)]
impl SystemDirs {
    /// Layout below a scratch directory, with desktop, temp and resource
    /// folders already created.
    pub(crate) fn rooted(root: &Path) -> Self {
        let dirs = Self {
            desktop: root.join("Desktop"),
            start_menu_root: root.join("Programs"),
            default_install: root.join("App"),
            default_start_menu: root.join("Programs").join("App"),
            uninstall_config: root.join(".app_config.yaml"),
            resources: root.join("resources"),
            temp: root.join("tmp"),
        };
        for dir in [&dirs.desktop, &dirs.temp, &dirs.resources.join("assets")] {
            std::fs::create_dir_all(dir).unwrap();
        }
        dirs
    }
}

fn roaming_app_data(home: &Path) -> PathBuf {
    match std::env::var_os("APPDATA") {
        Some(appdata) if !appdata.is_empty() => PathBuf::from(appdata),
        _ => dirs::data_dir().unwrap_or_else(|| {
            warn!("APPDATA not set, falling back to the home directory");
            home.to_path_buf()
        }),
    }
}

/// Resolves the resource directory: the override variable, then
/// `resources/` next to the executable, then the crate's own `resources/`.
pub fn resource_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(RESOURCES_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(beside_exe) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("resources")))
        .filter(|p| p.is_dir())
    {
        return beside_exe;
    }

    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources")
}
