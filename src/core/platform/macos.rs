use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::events::{Notice, Reporter};
use crate::core::files;
use crate::core::template::{path_value, render, Token};

use super::{install_resource, Platform, PlatformSetup, SetupContext};

const ICON_RESOURCE: &str = "assets/icon.icns";
const ICON_FILE: &str = "icon.icns";
const LAUNCHER_SCRIPT: &str = "execute.sh";

/// Application bundle, bundle copies as shortcuts and an uninstaller bundle.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacOsSetup;

/// Inputs for one `<name>.app` directory.
struct BundleSpec<'a> {
    name: &'a str,
    info_plist: &'a str,
    icon: Option<&'a Path>,
    script: &'a str,
}

#[async_trait]
impl PlatformSetup for MacOsSetup {
    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    async fn setup(&self, mut ctx: SetupContext<'_>) -> InstallerResult<()> {
        let (config, dirs, reporter) = (ctx.config, ctx.dirs, ctx.reporter);
        let mac_app = &config.install.mac_app;
        let install_dir = ctx.install_dir();

        let (desktop_shortcut, start_menu_shortcut) = ctx.record_shortcuts(&mac_app.file_name);

        let icon = install_resource(reporter, dirs, ICON_RESOURCE, &install_dir, ICON_FILE);

        let launcher = render(
            &mac_app.script,
            &[
                (Token::DirPath, path_value(&install_dir)),
                (Token::JarPath, path_value(ctx.artifact)),
            ],
        );
        let app = BundleSpec {
            name: &mac_app.file_name,
            info_plist: &mac_app.info_plist,
            icon: icon.as_deref(),
            script: &launcher,
        };
        match create_app_bundle(&install_dir, &app) {
            Ok(bundle) => {
                debug!("Created macOS app bundle at: {:?}", bundle);
                reporter.notice(Notice::FileCreated {
                    path: bundle.clone(),
                });
                if ctx.state.create_desktop_shortcut {
                    copy_bundle(reporter, &bundle, &desktop_shortcut);
                }
                if ctx.state.create_start_menu_shortcut {
                    copy_bundle(reporter, &bundle, &start_menu_shortcut);
                }
                ctx.state.application_to_launch = Some(bundle);
            }
            Err(e) => {
                error!("Failed to create macOS app bundle: {}", e);
                reporter.notice(Notice::FileCreateError {
                    path: install_dir.join(&mac_app.file_name),
                    error: e.to_string(),
                });
            }
        }

        let uninstall_script = render(
            &config.uninstall.zsh.content,
            &[
                (Token::InstallDir, path_value(&install_dir)),
                (Token::DesktopShortcut, path_value(&desktop_shortcut)),
                (Token::StartMenuShortcut, path_value(&start_menu_shortcut)),
            ],
        );
        let uninstaller = BundleSpec {
            name: &config.uninstall.zsh.file_name,
            info_plist: &mac_app.info_plist,
            icon: icon.as_deref(),
            script: &uninstall_script,
        };
        match create_app_bundle(&install_dir, &uninstaller) {
            Ok(bundle) => {
                debug!("Created macOS uninstaller app bundle at: {:?}", bundle);
                reporter.notice(Notice::FileCreated { path: bundle });
            }
            Err(e) => {
                error!("Failed to create macOS uninstaller app bundle: {}", e);
                reporter.notice(Notice::FileCreateError {
                    path: install_dir.join(&config.uninstall.zsh.file_name),
                    error: e.to_string(),
                });
            }
        }

        info!("macOS setup finished in {:?}", install_dir);
        Ok(())
    }
}

/// Builds `<install_dir>/<name>` from scratch:
///
/// ```text
/// <name>/Contents/Info.plist
/// <name>/Contents/MacOS/execute.sh   (0755)
/// <name>/Contents/Resources/icon.icns
/// ```
fn create_app_bundle(install_dir: &Path, spec: &BundleSpec<'_>) -> InstallerResult<PathBuf> {
    let bundle = install_dir.join(spec.name);
    if bundle.is_dir() {
        files::delete_dir_recursive(&bundle)?;
    } else if bundle.exists() {
        std::fs::remove_file(&bundle).map_err(|e| InstallerError::io(&bundle, e))?;
    }

    let contents = bundle.join("Contents");
    let macos_dir = contents.join("MacOS");
    let resources_dir = contents.join("Resources");
    for dir in [&macos_dir, &resources_dir] {
        std::fs::create_dir_all(dir).map_err(|e| InstallerError::io(dir, e))?;
    }

    let info_plist = match spec.icon {
        Some(_) => render(spec.info_plist, &[(Token::IconPath, ICON_FILE.to_string())]),
        None => {
            warn!("No icon file found for macOS app bundle.");
            spec.info_plist.to_string()
        }
    };
    files::write_file(&contents, "Info.plist", &info_plist)?;

    let launcher = files::write_file(&macos_dir, LAUNCHER_SCRIPT, spec.script)?;
    files::set_executable_mode(&launcher)?;

    if let Some(icon) = spec.icon.filter(|icon| icon.is_file()) {
        let target = resources_dir.join(ICON_FILE);
        std::fs::copy(icon, &target).map_err(|e| InstallerError::io(&target, e))?;
    }

    Ok(bundle)
}

/// Copies a bundle to a shortcut location, replacing an older copy.
fn copy_bundle(reporter: &Reporter, bundle: &Path, destination: &Path) {
    debug!("Creating shortcut: {:?}", destination);
    let copied = match std::fs::symlink_metadata(destination) {
        Ok(_) => files::remove_shortcut(destination),
        Err(_) => Ok(()),
    }
    .and_then(|()| files::copy_dir_recursive(bundle, destination));

    match copied {
        Ok(()) => reporter.notice(Notice::FileCopied {
            source: bundle.to_path_buf(),
            destination: destination.to_path_buf(),
        }),
        Err(e) => {
            error!("Failed to copy bundle to {:?}: {}", destination, e);
            reporter.notice(Notice::FileCopyError {
                source: bundle.to_path_buf(),
                destination: destination.to_path_buf(),
                error: e.to_string(),
            });
        }
    }
}
