//! OS-specific setup after the payload is on disk.
//!
//! Each strategy writes launchers, shortcuts and the uninstall script for one
//! OS family. Steps are independent: a failing step is reported and the
//! next one still runs.

pub mod detect;
pub mod linux;
pub mod macos;
pub mod windows;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::core::config::InstallerConfig;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::events::{Notice, Reporter};
use crate::core::files;
use crate::core::paths::SystemDirs;
use crate::core::state::InstallationState;

pub use detect::Platform;
pub use linux::LinuxSetup;
pub use macos::MacOsSetup;
pub use windows::WindowsSetup;

/// Everything a strategy reads or fills in.
pub struct SetupContext<'a> {
    /// Downloaded payload inside the install directory.
    pub artifact: &'a Path,
    pub state: &'a mut InstallationState,
    pub config: &'a InstallerConfig,
    pub dirs: &'a SystemDirs,
    pub reporter: &'a Reporter,
}

impl SetupContext<'_> {
    pub fn install_dir(&self) -> PathBuf {
        self.state.install_path.clone()
    }

    pub fn start_menu_dir(&self) -> PathBuf {
        self.state.start_menu_path.clone()
    }

    pub fn desktop_dir(&self) -> &Path {
        &self.dirs.desktop
    }

    /// Records the shortcut targets uninstall will look for.
    ///
    /// Targets are recorded even when the user opted out of a shortcut, so a
    /// later uninstall also removes one created by a previous run.
    fn record_shortcuts(&mut self, file_name: &str) -> (PathBuf, PathBuf) {
        let desktop = self.desktop_dir().join(file_name);
        let start_menu = self.start_menu_dir().join(file_name);
        self.state.shortcut_path = Some(desktop.clone());
        self.state.start_menu_shortcut_path = Some(start_menu.clone());
        (desktop, start_menu)
    }
}

#[async_trait]
pub trait PlatformSetup: Send + Sync {
    fn platform(&self) -> Platform;

    async fn setup(&self, ctx: SetupContext<'_>) -> InstallerResult<()>;
}

/// Strategy for the running OS, chosen once per process.
pub enum Setup {
    Windows(WindowsSetup),
    Linux(LinuxSetup),
    MacOs(MacOsSetup),
}

impl Setup {
    pub fn for_platform(platform: &Platform) -> InstallerResult<Self> {
        match platform {
            Platform::Windows => Ok(Self::Windows(WindowsSetup)),
            Platform::Linux => Ok(Self::Linux(LinuxSetup)),
            Platform::MacOs => Ok(Self::MacOs(MacOsSetup)),
            Platform::Unsupported(os) => Err(InstallerError::UnsupportedPlatform(os.clone())),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Setup::Windows(s) => s.platform(),
            Setup::Linux(s) => s.platform(),
            Setup::MacOs(s) => s.platform(),
        }
    }

    pub async fn setup(&self, ctx: SetupContext<'_>) -> InstallerResult<()> {
        match self {
            Setup::Windows(s) => s.setup(ctx).await,
            Setup::Linux(s) => s.setup(ctx).await,
            Setup::MacOs(s) => s.setup(ctx).await,
        }
    }
}

// ── Shared steps ────────────────────────────────────────

/// Writes a rendered script, optionally followed by `chmod +x`.
pub(crate) async fn write_script(
    reporter: &Reporter,
    dir: &Path,
    file_name: &str,
    content: &str,
    executable: bool,
) -> Option<PathBuf> {
    let path = match files::write_file(dir, file_name, content) {
        Ok(path) => path,
        Err(e) => {
            error!("Failed to write scripts: {}", e);
            reporter.notice(Notice::FileCreateError {
                path: dir.join(file_name),
                error: e.to_string(),
            });
            return None;
        }
    };
    reporter.notice(Notice::FileCreated { path: path.clone() });

    if executable {
        if let Err(e) = files::make_executable(&path).await {
            reporter.notice(Notice::ProcessError {
                program: "chmod".to_string(),
                error: e.to_string(),
            });
        }
    }
    Some(path)
}

/// Copies a bundled resource into `target_dir`.
pub(crate) fn install_resource(
    reporter: &Reporter,
    dirs: &SystemDirs,
    relative: &str,
    target_dir: &Path,
    file_name: &str,
) -> Option<PathBuf> {
    let source = dirs.resource(relative);
    match files::copy_resource(&source, target_dir, file_name) {
        Ok(target) => {
            reporter.notice(Notice::FileCopied {
                source,
                destination: target.clone(),
            });
            Some(target)
        }
        Err(e) => {
            reporter.notice(Notice::FileCopyError {
                source,
                destination: target_dir.join(file_name),
                error: e.to_string(),
            });
            None
        }
    }
}

/// Copies a launcher file to a shortcut location, replacing what is there.
pub(crate) fn place_shortcut(reporter: &Reporter, source: &Path, destination: &Path) -> bool {
    debug!("Creating shortcut: {:?}", destination);
    match std::fs::copy(source, destination) {
        Ok(_) => {
            reporter.notice(Notice::FileCopied {
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
            });
            true
        }
        Err(e) => {
            error!("Failed to copy shortcut {:?} -> {:?}: {}", source, destination, e);
            reporter.notice(Notice::FileCopyError {
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
                error: e.to_string(),
            });
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Scratch layout with an installer config, resources and empty install
    /// and start-menu directories.
    pub(crate) struct Fixture {
        pub _root: tempfile::TempDir,
        pub dirs: SystemDirs,
        pub config: InstallerConfig,
        pub state: InstallationState,
        pub artifact: PathBuf,
    }

    pub(crate) const CONFIG: &str = r##"
project:
  name: MesterMC
install:
  bash:
    file_name: install.bash
    content: "#!/bin/sh\ncd \"%dirPath%\" && java -jar \"%jarPath%\"\n"
  batch:
    file_name: install.batch
    content: "cd /d %dirPath%\r\njava -jar %jarPath%\r\n"
  linux_desktop:
    file_name: MesterMC.desktop
    content: "[Desktop Entry]\nExec=java -jar %jarPath%\nPath=%dirPath%\n"
  exe:
    file_name: MesterMC.exe
    resource_path: assets/MesterMC.exe
    shortcut_name: MesterMC.lnk
    powershell: "$s = '%shortcutPath%'; $t = '%exePath%'; $i = '%iconPath%'"
  macos_app:
    file_name: MesterMC.app
    info_list: "<plist><string>%iconPath%</string></plist>"
    script: "#!/bin/zsh\ncd \"%dirPath%\" && java -jar \"%jarPath%\"\n"
uninstall:
  batch:
    file_name: uninstall.batch
    content: "rmdir /s /q \"%installDir%\"\r\ndel \"%desktopShortcut%\"\r\ndel \"%startmenuShortcut%\"\r\n"
  bash:
    file_name: uninstall.bash
    content: "#!/bin/sh\nrm -rf \"%installDir%\" \"%desktopShortcut%\" \"%startmenuShortcut%\"\n"
  zsh:
    file_name: Uninstall.app
    content: "#!/bin/zsh\nrm -rf \"%installDir%\" \"%desktopShortcut%\" \"%startmenuShortcut%\"\n"
"##;

    impl Fixture {
        pub(crate) fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let dirs = SystemDirs::rooted(root.path());
            let assets = dirs.resources.join("assets");
            std::fs::write(assets.join("favicon.ico"), b"ico").unwrap();
            std::fs::write(assets.join("icon.png"), b"png").unwrap();
            std::fs::write(assets.join("icon.icns"), b"icns").unwrap();
            std::fs::write(assets.join("MesterMC.exe"), b"MZ").unwrap();
            std::fs::write(dirs.resources.join("info.txt"), b"info").unwrap();

            let config = InstallerConfig::from_yaml_str(CONFIG).unwrap();
            let state = InstallationState::new(&dirs.default_install, &dirs.default_start_menu);
            std::fs::create_dir_all(&state.install_path).unwrap();
            std::fs::create_dir_all(&state.start_menu_path).unwrap();
            let artifact = state.install_path.join("client.jar");
            std::fs::write(&artifact, b"jar").unwrap();

            Self {
                _root: root,
                dirs,
                config,
                state,
                artifact,
            }
        }

        pub(crate) fn context<'a>(&'a mut self, reporter: &'a Reporter) -> SetupContext<'a> {
            SetupContext {
                artifact: &self.artifact,
                state: &mut self.state,
                config: &self.config,
                dirs: &self.dirs,
                reporter,
            }
        }
    }
}
