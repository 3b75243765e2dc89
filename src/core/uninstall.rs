//! Reverses an install from the persisted uninstall record.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::core::events::{Notice, Outcome, Progress, Reporter};
use crate::core::files;
use crate::core::paths::SystemDirs;
use crate::core::state::InstallationState;

pub const UNINSTALL_STEPS: u32 = 5;

/// Pause between the last step and the completion event, so the final
/// progress is visible.
pub const COMPLETION_DELAY: Duration = Duration::from_millis(500);

/// Removes shortcuts, directories and the uninstall record.
///
/// The five steps are independent. A failing step is reported and the
/// remaining ones still run.
pub struct UninstallManager {
    dirs: SystemDirs,
    reporter: Reporter,
    completion_delay: Duration,
}

impl UninstallManager {
    pub fn new(dirs: SystemDirs, reporter: Reporter) -> Self {
        Self {
            dirs,
            reporter,
            completion_delay: COMPLETION_DELAY,
        }
    }

    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    pub async fn run(&self, state: &InstallationState) -> Outcome {
        info!("Uninstalling from {:?}", state.install_path);
        self.reporter.notice(Notice::UninstallStarted);

        self.remove_shortcut("desktop shortcut", state.shortcut_path.as_deref());
        self.step_done(1);

        self.remove_shortcut(
            "start menu shortcut",
            state.start_menu_shortcut_path.as_deref(),
        );
        self.step_done(2);

        self.remove_start_menu_dir(&state.start_menu_path);
        self.step_done(3);

        self.remove_install_dir(&state.install_path);
        self.step_done(4);

        self.remove_record();
        self.step_done(5);

        tokio::time::sleep(self.completion_delay).await;
        let outcome = Outcome::Completed;
        self.reporter.finished(&outcome);
        outcome
    }

    fn step_done(&self, completed: u32) {
        self.reporter.progress(Progress::Steps {
            completed,
            total: UNINSTALL_STEPS,
        });
    }

    fn remove_shortcut(&self, item: &str, path: Option<&Path>) {
        let Some(path) = path else {
            debug!("No {} recorded", item);
            self.reporter.notice(Notice::NothingRecorded {
                item: item.to_string(),
            });
            return;
        };

        if std::fs::symlink_metadata(path).is_err() {
            self.reporter.notice(Notice::FileNotFound {
                path: path.to_path_buf(),
            });
            return;
        }

        match files::remove_shortcut(path) {
            Ok(()) => self.reporter.notice(Notice::FileDeleted {
                path: path.to_path_buf(),
            }),
            Err(e) => {
                error!("Failed to delete {} {:?}: {}", item, path, e);
                self.reporter.notice(Notice::FileDeleteError {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Removes the start-menu folder only when it is empty and is not the
    /// OS-wide start-menu root.
    fn remove_start_menu_dir(&self, dir: &Path) {
        if !dir.exists() {
            self.reporter.notice(Notice::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
            return;
        }

        if same_path(dir, &self.dirs.start_menu_root) {
            self.reporter.notice(Notice::DirectoryNotWritable {
                path: dir.to_path_buf(),
            });
            return;
        }

        match std::fs::remove_dir(dir) {
            Ok(()) => self.reporter.notice(Notice::DirectoryDeleted {
                path: dir.to_path_buf(),
            }),
            Err(e) => {
                error!("Failed to delete start menu directory {:?}: {}", dir, e);
                self.reporter.notice(Notice::DirectoryDeleteError {
                    path: dir.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn remove_install_dir(&self, dir: &Path) {
        if !dir.exists() {
            self.reporter.notice(Notice::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
            return;
        }

        match files::delete_dir_recursive(dir) {
            Ok(()) => self.reporter.notice(Notice::DirectoryDeleted {
                path: dir.to_path_buf(),
            }),
            Err(e) => {
                error!("Failed to delete installation directory: {}", e);
                self.reporter.notice(Notice::DirectoryDeleteError {
                    path: dir.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn remove_record(&self) {
        let record = &self.dirs.uninstall_config;
        if !record.exists() {
            self.reporter.notice(Notice::FileNotFound {
                path: record.clone(),
            });
            return;
        }

        match std::fs::remove_file(record) {
            Ok(()) => self.reporter.notice(Notice::FileDeleted {
                path: record.clone(),
            }),
            Err(e) => {
                error!("Failed to delete uninstaller configuration {:?}: {}", record, e);
                self.reporter.notice(Notice::FileDeleteError {
                    path: record.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
