//! Install pipeline: download, verify, platform setup, uninstall record.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::config::InstallerConfig;
use crate::core::downloader::{verify, DownloadOutcome, DownloadRequest, Downloader, Verification};
use crate::core::error::InstallerResult;
use crate::core::events::{Notice, Outcome, Reporter};
use crate::core::files;
use crate::core::http;
use crate::core::paths::SystemDirs;
use crate::core::platform::{install_resource, Platform, Setup, SetupContext};
use crate::core::state::InstallationState;

const INFO_RESOURCE: &str = "info.txt";

/// Where an install run is. `Failed`, `Cancelled`, `Aborted` and
/// `Complete` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupPhase {
    Idle,
    CheckingExisting,
    Downloading,
    Verifying,
    PlatformSetup,
    Complete,
    Failed,
    Cancelled,
    Aborted,
}

impl SetupPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SetupPhase::Complete | SetupPhase::Failed | SetupPhase::Cancelled | SetupPhase::Aborted
        )
    }
}

/// Asks the user whether to keep going after a failed checksum.
#[async_trait]
pub trait IntegrityPrompt: Send + Sync {
    async fn confirm_continue(&self, verification: &Verification) -> bool;
}

/// Answers every checksum prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

#[async_trait]
impl IntegrityPrompt for FixedAnswer {
    async fn confirm_continue(&self, _verification: &Verification) -> bool {
        self.0
    }
}

/// Runs one install from download to uninstall record.
pub struct SetupManager {
    config: Arc<InstallerConfig>,
    dirs: SystemDirs,
    strategy: Setup,
    downloader: Downloader,
    reporter: Reporter,
    cancel: CancellationToken,
    phase: SetupPhase,
}

impl SetupManager {
    /// Resolves the platform strategy up front, so an unsupported OS fails
    /// before anything touches the disk.
    pub fn new(
        platform: &Platform,
        config: Arc<InstallerConfig>,
        dirs: SystemDirs,
        reporter: Reporter,
        cancel: CancellationToken,
    ) -> InstallerResult<Self> {
        let strategy = match Setup::for_platform(platform) {
            Ok(strategy) => strategy,
            Err(e) => {
                reporter.notice(Notice::UnsupportedOs {
                    os: platform.to_string(),
                });
                return Err(e);
            }
        };

        Ok(Self {
            config,
            dirs,
            strategy,
            downloader: Downloader::new()?,
            reporter,
            cancel,
            phase: SetupPhase::Idle,
        })
    }

    pub fn phase(&self) -> SetupPhase {
        self.phase
    }

    /// `HEAD`s the payload and stores its size in `state`.
    pub async fn fetch_required_space(&self, state: &mut InstallationState) -> u64 {
        let bytes =
            http::fetch_required_space(self.downloader.client(), &self.config.download.link).await;
        state.required_space_bytes = bytes;
        bytes
    }

    /// Runs the whole pipeline and emits the terminal outcome.
    ///
    /// A download failure is final; there is no retry.
    pub async fn run(
        &mut self,
        state: &mut InstallationState,
        prompt: &dyn IntegrityPrompt,
    ) -> Outcome {
        let outcome = self.run_phases(state, prompt).await;
        let terminal = match &outcome {
            Outcome::Completed => SetupPhase::Complete,
            Outcome::Failed { .. } => SetupPhase::Failed,
            Outcome::Cancelled => SetupPhase::Cancelled,
            Outcome::Aborted => SetupPhase::Aborted,
        };
        self.enter(terminal);
        self.reporter.finished(&outcome);
        outcome
    }

    async fn run_phases(
        &mut self,
        state: &mut InstallationState,
        prompt: &dyn IntegrityPrompt,
    ) -> Outcome {
        self.enter(SetupPhase::CheckingExisting);
        self.reporter.notice(Notice::DetectedOs {
            os: self.strategy.platform().to_string(),
        });

        if let Err(e) = state.ensure_install_dir() {
            error!("Cannot prepare install directory: {}", e);
            self.reporter.notice(Notice::DirectoryCreateError {
                path: state.install_path.clone(),
                error: e.to_string(),
            });
            return Outcome::Failed {
                reason: e.to_string(),
            };
        }
        self.check_free_space(state);

        self.enter(SetupPhase::Downloading);
        let artifact = state.install_path.join(&self.config.download.file_name);
        let request = DownloadRequest {
            url: self.config.download.link.clone(),
            dest: artifact.clone(),
            expected_size: state.required_space_bytes,
        };
        match self
            .downloader
            .download(&request, &self.reporter, &self.cancel)
            .await
        {
            DownloadOutcome::Succeeded { bytes } => debug!("Payload ready ({} bytes)", bytes),
            DownloadOutcome::Failed(reason) => return Outcome::Failed { reason },
            DownloadOutcome::Cancelled => return Outcome::Cancelled,
        }

        self.enter(SetupPhase::Verifying);
        let verification = verify(&artifact, &self.config.download.hash).await;
        if !verification.passed() {
            self.report_verification(&verification);
            if !prompt.confirm_continue(&verification).await {
                warn!("Checksum rejected, removing {:?}", artifact);
                if let Err(e) = std::fs::remove_file(&artifact) {
                    error!("Failed to delete {:?}: {}", artifact, e);
                }
                return Outcome::Aborted;
            }
            self.reporter.notice(Notice::ChecksumOverridden);
        }

        // No cancellation past this point.
        self.enter(SetupPhase::PlatformSetup);
        self.reporter.notice(Notice::ScriptsCreating);
        self.prepare_shortcut_dirs(state);
        install_resource(
            &self.reporter,
            &self.dirs,
            INFO_RESOURCE,
            &state.install_path,
            INFO_RESOURCE,
        );

        let ctx = SetupContext {
            artifact: &artifact,
            state: &mut *state,
            config: &self.config,
            dirs: &self.dirs,
            reporter: &self.reporter,
        };
        if let Err(e) = self.strategy.setup(ctx).await {
            error!("Setup failed: {}", e);
            self.reporter.notice(Notice::SetupFailed {
                error: e.to_string(),
            });
        }

        let record = &self.dirs.uninstall_config;
        match state.save_uninstall_record(record) {
            Ok(()) => self.reporter.notice(Notice::UninstallConfigWritten {
                path: record.clone(),
            }),
            Err(e) => {
                error!("Failed to write uninstaller configuration file: {}", e);
                self.reporter.notice(Notice::UninstallConfigError {
                    path: record.clone(),
                    error: e.to_string(),
                });
            }
        }

        info!("Installation finished in {:?}", state.install_path);
        Outcome::Completed
    }

    fn enter(&mut self, phase: SetupPhase) {
        debug!("Setup phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.reporter.phase(phase);
    }

    /// Warns when the reported size exceeds the free space. Never blocks.
    fn check_free_space(&self, state: &InstallationState) {
        let required = state.required_space_bytes;
        if required == 0 {
            return;
        }
        match files::available_space(&state.install_path) {
            Some(available) if available < required => {
                warn!(
                    "Not enough free space in {:?}: {} required, {} available",
                    state.install_path, required, available
                );
                self.reporter
                    .notice(Notice::InsufficientSpace { required, available });
            }
            Some(_) => {}
            None => debug!("No disk found for {:?}", state.install_path),
        }
    }

    fn report_verification(&self, verification: &Verification) {
        match verification {
            Verification::Mismatch { actual } => self.reporter.notice(Notice::ChecksumMismatch {
                expected: self.config.download.hash.clone(),
                actual: actual.clone(),
            }),
            Verification::ComputeError(reason) => self.reporter.notice(Notice::ChecksumError {
                reason: reason.clone(),
            }),
            Verification::NotConfigured | Verification::Match => {}
        }
    }

    /// Best effort: a missing shortcut directory only fails the copy into it.
    fn prepare_shortcut_dirs(&self, state: &InstallationState) {
        let mut wanted = Vec::new();
        if state.create_start_menu_shortcut {
            wanted.push(state.start_menu_path.clone());
        }
        if state.create_desktop_shortcut {
            wanted.push(self.dirs.desktop.clone());
        }

        for dir in wanted {
            if dir.is_dir() {
                continue;
            }
            if let Err(e) = std::fs::create_dir_all(&dir) {
                error!("Failed to create directory {:?}: {}", dir, e);
                self.reporter.notice(Notice::DirectoryCreateError {
                    path: dir,
                    error: e.to_string(),
                });
            }
        }
    }
}
