use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::events::{Notice, Reporter};
use crate::core::files;
use crate::core::paths::SystemDirs;
use crate::core::template::{escaped_path_value, render, Token};

use super::{install_resource, place_shortcut, write_script, Platform, PlatformSetup, SetupContext};

const SHORTCUT_SCRIPT: &str = "create_shortcut.ps1";
const ICON_RESOURCE: &str = "assets/favicon.ico";
const ICON_FILE: &str = "icon.ico";

/// Batch launcher, launcher executable, `.lnk` shortcuts through PowerShell
/// and an uninstall batch file.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsSetup;

#[async_trait]
impl PlatformSetup for WindowsSetup {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    async fn setup(&self, mut ctx: SetupContext<'_>) -> InstallerResult<()> {
        let (config, dirs, reporter) = (ctx.config, ctx.dirs, ctx.reporter);
        let install = &config.install;
        let install_dir = ctx.install_dir();

        let icon = install_resource(reporter, dirs, ICON_RESOURCE, &install_dir, ICON_FILE);

        let launcher = render(
            &install.batch.content,
            &[
                (Token::DirPath, escaped_path_value(&install_dir)),
                (Token::JarPath, escaped_path_value(ctx.artifact)),
            ],
        );
        write_script(reporter, &install_dir, &install.batch.file_name, &launcher, false).await;

        let exe_source = dirs.resource(&install.exe.resource_path);
        let exe = match files::copy_resource(&exe_source, &install_dir, &install.exe.file_name) {
            Ok(exe) => exe,
            Err(e) => {
                error!("Executable file not found: {}", install.exe.file_name);
                reporter.notice(Notice::FileCopyError {
                    source: exe_source,
                    destination: install_dir.join(&install.exe.file_name),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };
        ctx.state.application_to_launch = Some(exe.clone());

        let shortcut_name = install.exe.shortcut_name.clone();
        let shortcut_file = install_dir.join(&shortcut_name);
        let (desktop_shortcut, start_menu_shortcut) = ctx.record_shortcuts(&shortcut_name);

        let icon_value = icon
            .as_deref()
            .map(escaped_path_value)
            .unwrap_or_default();
        let shortcut_value = escaped_path_value(&shortcut_file);
        let powershell = render(
            &install.exe.powershell,
            &[
                (Token::ShortcutPath, shortcut_value.clone()),
                (Token::ShortcutFile, shortcut_value),
                (Token::ExePath, escaped_path_value(&exe)),
                (Token::IconPath, icon_value),
            ],
        );
        create_shortcut(dirs, reporter, &powershell, &shortcut_file).await;

        if shortcut_file.exists() {
            if ctx.state.create_desktop_shortcut {
                place_shortcut(reporter, &shortcut_file, &desktop_shortcut);
            }
            if ctx.state.create_start_menu_shortcut {
                place_shortcut(reporter, &shortcut_file, &start_menu_shortcut);
            }
            // Only the copies are kept.
            if let Err(e) = std::fs::remove_file(&shortcut_file) {
                warn!("Failed to delete original shortcut file {:?}: {}", shortcut_file, e);
            }
        } else {
            reporter.notice(Notice::FileNotFound {
                path: shortcut_file.clone(),
            });
        }

        let uninstaller = render(
            &config.uninstall.batch.content,
            &[
                (Token::InstallDir, escaped_path_value(&install_dir)),
                (Token::DesktopShortcut, escaped_path_value(&desktop_shortcut)),
                (Token::StartMenuShortcut, escaped_path_value(&start_menu_shortcut)),
            ],
        );
        write_script(
            reporter,
            &install_dir,
            &config.uninstall.batch.file_name,
            &uninstaller,
            false,
        )
        .await;

        info!("Windows setup finished in {:?}", install_dir);
        Ok(())
    }
}

/// Runs the rendered PowerShell from a temporary `.ps1`, then removes it.
async fn create_shortcut(dirs: &SystemDirs, reporter: &Reporter, script: &str, shortcut_file: &Path) {
    let ps1 = dirs.temp.join(SHORTCUT_SCRIPT);

    if let Err(e) = std::fs::write(&ps1, script) {
        error!("Failed to write PowerShell script {:?}: {}", ps1, e);
        reporter.notice(Notice::FileCreateError {
            path: shortcut_file.to_path_buf(),
            error: e.to_string(),
        });
        return;
    }

    match run_powershell(&ps1).await {
        Ok(exit_code) => {
            debug!("PowerShell script executed with exit code: {}", exit_code);
            reporter.notice(Notice::ProcessFinished {
                program: "PowerShell".to_string(),
                exit_code,
            });
        }
        Err(e) => {
            error!("Failed to create Windows shortcut: {}", e);
            reporter.notice(Notice::ProcessError {
                program: "PowerShell".to_string(),
                error: e.to_string(),
            });
        }
    }

    if let Err(e) = std::fs::remove_file(&ps1) {
        warn!("Failed to delete temporary PowerShell script {:?}: {}", ps1, e);
        reporter.notice(Notice::FileDeleteError {
            path: ps1,
            error: e.to_string(),
        });
    }
}

/// Waits for PowerShell without a time limit.
async fn run_powershell(ps1: &Path) -> InstallerResult<i32> {
    let output = Command::new("powershell.exe")
        .arg("-ExecutionPolicy")
        .arg("Bypass")
        .arg("-File")
        .arg(ps1)
        .output()
        .await
        .map_err(|e| InstallerError::ProcessFailed {
            program: "powershell.exe".to_string(),
            code: -1,
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        warn!(
            "PowerShell stderr: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.status.code().unwrap_or(-1))
}
