//! Operations a front end drives: load a session, install, uninstall,
//! launch the installed application.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::config::{InstallerConfig, DEFAULT_CONFIG_FILE};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::events::{Outcome, Reporter};
use crate::core::paths::SystemDirs;
use crate::core::platform::Platform;
use crate::core::setup::{IntegrityPrompt, SetupManager};
use crate::core::state::InstallationState;
use crate::core::uninstall::UninstallManager;

/// Configuration, directories and state for one installer process.
#[derive(Debug, Clone)]
pub struct Session {
    pub platform: Platform,
    pub config: Arc<InstallerConfig>,
    pub dirs: SystemDirs,
    pub state: InstallationState,
    pub config_path: PathBuf,
}

impl Session {
    /// Loads the config, resolves the per-OS directories and switches to
    /// uninstall mode when a record from an earlier install exists.
    pub fn load(config_override: Option<&Path>) -> InstallerResult<Self> {
        let platform = Platform::current().clone();
        let config_path = locate_config(config_override);
        let config = InstallerConfig::load(&config_path)?;
        let dirs = SystemDirs::detect(&platform, &config);
        Ok(Self::with_parts(platform, config, dirs, config_path))
    }

    pub fn with_parts(
        platform: Platform,
        config: InstallerConfig,
        dirs: SystemDirs,
        config_path: PathBuf,
    ) -> Self {
        let mut state = InstallationState::with_defaults(&dirs, &config);
        if state.detect_uninstall_mode(&dirs.uninstall_config) {
            info!("Found uninstall record at {:?}", dirs.uninstall_config);
        }

        Self {
            platform,
            config: Arc::new(config),
            dirs,
            state,
            config_path,
        }
    }

    /// Pre-flight, pipeline and terminal outcome of an install.
    pub async fn install(
        &mut self,
        reporter: Reporter,
        cancel: CancellationToken,
        prompt: &dyn IntegrityPrompt,
    ) -> InstallerResult<Outcome> {
        self.config.validate_for_install()?;
        if !self.state.license_accepted {
            return Err(InstallerError::Other(
                "The license has not been accepted".to_string(),
            ));
        }

        let mut manager = SetupManager::new(
            &self.platform,
            Arc::clone(&self.config),
            self.dirs.clone(),
            reporter,
            cancel,
        )?;
        let required = manager.fetch_required_space(&mut self.state).await;
        debug!("Required space: {} ({} bytes)", self.state.required_space_display(), required);

        Ok(manager.run(&mut self.state, prompt).await)
    }

    /// Uninstall only ever works from paths read back from the record.
    pub fn require_uninstall_record(&self) -> InstallerResult<()> {
        if self.state.uninstall_mode_active {
            Ok(())
        } else {
            Err(InstallerError::Config(format!(
                "no uninstall record found at {:?}",
                self.dirs.uninstall_config
            )))
        }
    }

    pub async fn uninstall(&mut self, reporter: Reporter) -> InstallerResult<Outcome> {
        self.require_uninstall_record()?;
        let outcome = UninstallManager::new(self.dirs.clone(), reporter)
            .run(&self.state)
            .await;
        self.state.uninstall_mode_active = false;
        Ok(outcome)
    }

    /// Opens what the platform setup recorded as the application.
    pub fn launch(&self) -> InstallerResult<()> {
        match &self.state.application_to_launch {
            Some(path) => launch_application(&self.platform, path),
            None => Err(InstallerError::Other(
                "No application was recorded to launch".to_string(),
            )),
        }
    }
}

/// `--config` when given, else `config.yaml` in the resource directory.
pub fn locate_config(config_override: Option<&Path>) -> PathBuf {
    match config_override {
        Some(path) => path.to_path_buf(),
        None => crate::core::paths::resource_dir().join(DEFAULT_CONFIG_FILE),
    }
}

/// Starts the installed application without waiting for it.
pub fn launch_application(platform: &Platform, path: &Path) -> InstallerResult<()> {
    if !path.exists() {
        return Err(InstallerError::MissingResource(path.to_path_buf()));
    }

    let mut command = match platform {
        Platform::Windows => {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", ""]).arg(path);
            cmd
        }
        Platform::MacOs => {
            let mut cmd = Command::new("open");
            cmd.arg(path);
            cmd
        }
        Platform::Linux => Command::new(path),
        Platform::Unsupported(os) => return Err(InstallerError::UnsupportedPlatform(os.clone())),
    };

    if let Some(dir) = path.parent() {
        command.current_dir(dir);
    }

    info!("Launching {:?}", path);
    command
        .spawn()
        .map_err(|source| InstallerError::io(path, source))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(root: &Path) -> Session {
        let dirs = SystemDirs::rooted(root);
        let config = InstallerConfig::from_yaml_str("project:\n  name: Demo\n").unwrap();
        Session::with_parts(Platform::Linux, config, dirs, root.join("config.yaml"))
    }

    #[test]
    fn explicit_config_path_wins() {
        let path = PathBuf::from("/etc/demo/config.yaml");
        assert_eq!(locate_config(Some(&path)), path);
        assert!(locate_config(None).ends_with(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn fresh_session_starts_in_install_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session(tmp.path());
        assert!(!session.state.uninstall_mode_active);
        assert_eq!(session.state.install_path, session.dirs.default_install);
    }

    #[test]
    fn record_switches_session_to_uninstall_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = SystemDirs::rooted(tmp.path());
        let mut earlier = InstallationState::new(tmp.path().join("custom"), tmp.path().join("menu"));
        earlier.shortcut_path = Some(dirs.desktop.join("Demo.desktop"));
        earlier.save_uninstall_record(&dirs.uninstall_config).unwrap();

        let session = session(tmp.path());
        assert!(session.state.uninstall_mode_active);
        assert_eq!(session.state.install_path, tmp.path().join("custom"));
        assert_eq!(session.state.shortcut_path, earlier.shortcut_path);
    }

    #[tokio::test]
    async fn install_requires_a_download_link() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session(tmp.path());
        let err = session
            .install(
                Reporter::silent(),
                CancellationToken::new(),
                &crate::core::setup::FixedAnswer(true),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::Config(_)));
        assert!(!session.state.install_path.exists());
    }

    #[tokio::test]
    async fn install_requires_accepted_license() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = SystemDirs::rooted(tmp.path());
        let config = InstallerConfig::from_yaml_str(
            "project:\n  name: Demo\ndownload:\n  link: http://127.0.0.1:9/client.jar\n",
        )
        .unwrap();
        let mut session = Session::with_parts(Platform::Linux, config, dirs, tmp.path().join("c.yaml"));

        let err = session
            .install(
                Reporter::silent(),
                CancellationToken::new(),
                &crate::core::setup::FixedAnswer(true),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::Other(_)));
        assert!(!session.state.install_path.exists());
    }

    #[tokio::test]
    async fn uninstall_without_record_deletes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session(tmp.path());
        std::fs::create_dir_all(&session.dirs.default_install).unwrap();
        let user_file = session.dirs.default_install.join("user_save.dat");
        std::fs::write(&user_file, b"keep me").unwrap();

        let err = session.uninstall(Reporter::silent()).await.unwrap_err();
        assert!(matches!(err, InstallerError::Config(_)));
        assert!(user_file.is_file());
    }

    #[tokio::test]
    async fn uninstall_with_record_removes_recorded_install() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = SystemDirs::rooted(tmp.path());
        let installed = tmp.path().join("custom");
        std::fs::create_dir_all(&installed).unwrap();
        std::fs::write(installed.join("client.jar"), b"jar").unwrap();
        InstallationState::new(&installed, tmp.path().join("menu"))
            .save_uninstall_record(&dirs.uninstall_config)
            .unwrap();

        let mut session = session(tmp.path());
        let outcome = session.uninstall(Reporter::silent()).await.unwrap();
        assert_eq!(outcome, Outcome::Completed);
        assert!(!installed.exists());
        assert!(!session.dirs.uninstall_config.exists());
        assert!(!session.state.uninstall_mode_active);
    }

    #[test]
    fn launching_nothing_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session(tmp.path());
        assert!(session.launch().is_err());
        assert!(matches!(
            launch_application(&Platform::Linux, &tmp.path().join("missing.sh")),
            Err(InstallerError::MissingResource(_))
        ));
    }
}
