use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::error::InstallerResult;
use crate::core::template::{path_value, render, Token};

use super::{install_resource, place_shortcut, write_script, Platform, PlatformSetup, SetupContext};

const ICON_RESOURCE: &str = "assets/icon.png";
const ICON_FILE: &str = "icon.png";

/// Shell launcher, `.desktop` entries and an uninstall shell script.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxSetup;

#[async_trait]
impl PlatformSetup for LinuxSetup {
    fn platform(&self) -> Platform {
        Platform::Linux
    }

    async fn setup(&self, mut ctx: SetupContext<'_>) -> InstallerResult<()> {
        let (config, dirs, reporter) = (ctx.config, ctx.dirs, ctx.reporter);
        let install = &config.install;
        let install_dir = ctx.install_dir();
        let payload = [
            (Token::DirPath, path_value(&install_dir)),
            (Token::JarPath, path_value(ctx.artifact)),
        ];

        install_resource(reporter, dirs, ICON_RESOURCE, &install_dir, ICON_FILE);

        let launcher = render(&install.bash.content, &payload);
        if let Some(script) =
            write_script(reporter, &install_dir, &install.bash.file_name, &launcher, true).await
        {
            ctx.state.application_to_launch = Some(script);
        }

        let entry_name = install.linux_desktop.file_name.as_str();
        let (desktop_shortcut, start_menu_shortcut) = ctx.record_shortcuts(entry_name);

        debug!("Creating .desktop file in {:?}", install_dir);
        let entry = render(&install.linux_desktop.content, &payload);
        if let Some(entry_file) = write_script(reporter, &install_dir, entry_name, &entry, false).await
        {
            if ctx.state.create_desktop_shortcut {
                place_shortcut(reporter, &entry_file, &desktop_shortcut);
            }
            if ctx.state.create_start_menu_shortcut {
                place_shortcut(reporter, &entry_file, &start_menu_shortcut);
            }
        }

        let uninstaller = render(
            &config.uninstall.bash.content,
            &[
                (Token::InstallDir, path_value(&install_dir)),
                (Token::DesktopShortcut, path_value(&desktop_shortcut)),
                (Token::StartMenuShortcut, path_value(&start_menu_shortcut)),
            ],
        );
        write_script(
            reporter,
            &install_dir,
            &config.uninstall.bash.file_name,
            &uninstaller,
            true,
        )
        .await;

        info!("Linux setup finished in {:?}", install_dir);
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use super::*;
    use crate::core::events::Reporter;
    use crate::core::platform::testing::Fixture;

    fn is_executable(path: &Path) -> bool {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o111 != 0
    }

    #[tokio::test]
    async fn writes_launcher_entries_and_uninstaller() {
        let mut fixture = Fixture::new();
        let reporter = Reporter::silent();

        LinuxSetup.setup(fixture.context(&reporter)).await.unwrap();

        let install_dir = fixture.state.install_path.clone();
        let launcher = install_dir.join("install.bash");
        assert!(is_executable(&launcher));
        assert_eq!(fixture.state.application_to_launch, Some(launcher.clone()));
        assert!(std::fs::read_to_string(&launcher)
            .unwrap()
            .contains(&path_value(&fixture.artifact)));
        assert!(install_dir.join("icon.png").is_file());

        let desktop_entry = fixture.dirs.desktop.join("MesterMC.desktop");
        let menu_entry = fixture.state.start_menu_path.join("MesterMC.desktop");
        assert!(desktop_entry.is_file());
        assert!(menu_entry.is_file());
        assert_eq!(fixture.state.shortcut_path, Some(desktop_entry.clone()));
        assert_eq!(fixture.state.start_menu_shortcut_path, Some(menu_entry));
        assert!(std::fs::read_to_string(&desktop_entry)
            .unwrap()
            .contains(&format!("Path={}", install_dir.display())));

        let uninstaller = install_dir.join("uninstall.bash");
        assert!(is_executable(&uninstaller));
        let body = std::fs::read_to_string(&uninstaller).unwrap();
        assert!(body.contains(&path_value(&desktop_entry)));
        assert!(!body.contains('%'));
    }

    #[tokio::test]
    async fn opted_out_shortcuts_are_not_created_but_still_recorded() {
        let mut fixture = Fixture::new();
        fixture.state.create_desktop_shortcut = false;
        fixture.state.create_start_menu_shortcut = false;
        let reporter = Reporter::silent();

        LinuxSetup.setup(fixture.context(&reporter)).await.unwrap();

        let desktop_entry = fixture.dirs.desktop.join("MesterMC.desktop");
        assert!(!desktop_entry.exists());
        assert!(!fixture.state.start_menu_path.join("MesterMC.desktop").exists());
        assert_eq!(fixture.state.shortcut_path, Some(desktop_entry));
    }

    #[tokio::test]
    async fn missing_install_dir_is_a_step_failure_not_a_panic() {
        let mut fixture = Fixture::new();
        std::fs::remove_dir_all(&fixture.state.install_path).unwrap();
        let reporter = Reporter::silent();

        LinuxSetup.setup(fixture.context(&reporter)).await.unwrap();
        assert!(fixture.state.application_to_launch.is_none());
    }
}
