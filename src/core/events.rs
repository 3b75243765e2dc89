use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::core::setup::SetupPhase;

/// Human-readable status line shown in the front end's log panel.
///
/// Variants carry their arguments so a front end can localize them; the
/// `Display` impl is the English rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum Notice {
    DownloadStarted { file: PathBuf },
    DownloadCompleted { file: PathBuf },
    DownloadSkipped { file: PathBuf },
    DownloadFailed { reason: String },
    DownloadCancelled,
    InsufficientSpace { required: u64, available: u64 },
    ChecksumMismatch { expected: String, actual: String },
    ChecksumError { reason: String },
    ChecksumOverridden,
    ScriptsCreating,
    DetectedOs { os: String },
    UnsupportedOs { os: String },
    SetupFailed { error: String },
    UninstallConfigWritten { path: PathBuf },
    UninstallConfigError { path: PathBuf, error: String },
    UninstallStarted,
    FileCreated { path: PathBuf },
    FileCreateError { path: PathBuf, error: String },
    FileCopied { source: PathBuf, destination: PathBuf },
    FileCopyError { source: PathBuf, destination: PathBuf, error: String },
    FileDeleted { path: PathBuf },
    FileDeleteError { path: PathBuf, error: String },
    FileNotFound { path: PathBuf },
    DirectoryCreateError { path: PathBuf, error: String },
    DirectoryDeleted { path: PathBuf },
    DirectoryDeleteError { path: PathBuf, error: String },
    DirectoryNotFound { path: PathBuf },
    DirectoryNotWritable { path: PathBuf },
    /// The uninstall record holds no path for this item.
    NothingRecorded { item: String },
    ProcessFinished { program: String, exit_code: i32 },
    ProcessError { program: String, error: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DownloadStarted { file } => write!(f, "Downloading {}...", file.display()),
            Notice::DownloadCompleted { file } => write!(f, "Download completed: {}", file.display()),
            Notice::DownloadSkipped { file } => {
                write!(f, "{} is already downloaded, skipping", file.display())
            }
            Notice::DownloadFailed { reason } => write!(f, "Download failed: {reason}"),
            Notice::DownloadCancelled => write!(f, "Download cancelled"),
            Notice::InsufficientSpace { required, available } => write!(
                f,
                "Not enough free space: {} MB required, {} MB available",
                required / (1024 * 1024),
                available / (1024 * 1024)
            ),
            Notice::ChecksumMismatch { expected, actual } => {
                write!(f, "Checksum mismatch: expected {expected}, got {actual}")
            }
            Notice::ChecksumError { reason } => write!(f, "Could not compute checksum: {reason}"),
            Notice::ChecksumOverridden => write!(f, "Continuing despite checksum failure"),
            Notice::ScriptsCreating => write!(f, "Creating launch scripts and shortcuts..."),
            Notice::DetectedOs { os } => write!(f, "Detected operating system: {os}"),
            Notice::UnsupportedOs { os } => write!(f, "Unsupported operating system: {os}"),
            Notice::SetupFailed { error } => write!(f, "Setup failed: {error}"),
            Notice::UninstallConfigWritten { path } => {
                write!(f, "Uninstaller configuration written: {}", path.display())
            }
            Notice::UninstallConfigError { path, error } => write!(
                f,
                "Failed to write uninstaller configuration {}: {error}",
                path.display()
            ),
            Notice::UninstallStarted => write!(f, "Deleting installed files..."),
            Notice::FileCreated { path } => write!(f, "Created {}", path.display()),
            Notice::FileCreateError { path, error } => {
                write!(f, "Failed to create {}: {error}", path.display())
            }
            Notice::FileCopied {
                source,
                destination,
            } => write!(f, "Copied {} to {}", source.display(), destination.display()),
            Notice::FileCopyError {
                source,
                destination,
                error,
            } => write!(
                f,
                "Failed to copy {} to {}: {error}",
                source.display(),
                destination.display()
            ),
            Notice::FileDeleted { path } => write!(f, "Deleted {}", path.display()),
            Notice::FileDeleteError { path, error } => {
                write!(f, "Failed to delete {}: {error}", path.display())
            }
            Notice::FileNotFound { path } => write!(f, "File not found: {}", path.display()),
            Notice::DirectoryCreateError { path, error } => {
                write!(f, "Failed to create directory {}: {error}", path.display())
            }
            Notice::DirectoryDeleted { path } => {
                write!(f, "Deleted directory {}", path.display())
            }
            Notice::DirectoryDeleteError { path, error } => {
                write!(f, "Failed to delete directory {}: {error}", path.display())
            }
            Notice::DirectoryNotFound { path } => {
                write!(f, "Directory not found: {}", path.display())
            }
            Notice::DirectoryNotWritable { path } => {
                write!(f, "Directory is not writable: {}", path.display())
            }
            Notice::NothingRecorded { item } => write!(f, "No {item} was recorded, skipping"),
            Notice::ProcessFinished { program, exit_code } => {
                write!(f, "{program} finished with exit code {exit_code}")
            }
            Notice::ProcessError { program, error } => write!(f, "{program} failed: {error}"),
        }
    }
}

/// Progress of the running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum Progress {
    /// Download progress. `total` is `None` when the server sent no length.
    Bytes { done: u64, total: Option<u64> },
    /// Uninstall progress in fixed steps.
    Steps { completed: u32, total: u32 },
}

/// Terminal result of an install or uninstall run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Failed { reason: String },
    Cancelled,
    /// The user rejected a checksum failure. The front end must exit.
    Aborted,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

/// Everything the engine reports to the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InstallEvent {
    Notice(Notice),
    Progress(Progress),
    Phase(SetupPhase),
    Finished(Outcome),
}

/// Sending half of the event stream handed to every component.
///
/// Events are delivered in order on an unbounded channel, so reporting never
/// blocks the worker. A reporter without a receiver drops everything.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    tx: Option<UnboundedSender<InstallEvent>>,
}

impl Reporter {
    pub fn channel() -> (Self, UnboundedReceiver<InstallEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn notice(&self, notice: Notice) {
        self.send(InstallEvent::Notice(notice));
    }

    pub fn progress(&self, progress: Progress) {
        self.send(InstallEvent::Progress(progress));
    }

    pub fn phase(&self, phase: SetupPhase) {
        self.send(InstallEvent::Phase(phase));
    }

    pub fn finished(&self, outcome: &Outcome) {
        self.send(InstallEvent::Finished(outcome.clone()));
    }

    fn send(&self, event: InstallEvent) {
        if let Some(tx) = &self.tx {
            // The front end may already be gone during shutdown.
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
pub(crate) fn drain(rx: &mut UnboundedReceiver<InstallEvent>) -> Vec<InstallEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
