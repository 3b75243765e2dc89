use std::io::Write;

use async_trait::async_trait;
use console::{style, Term};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

use installer_lib::core::downloader::Verification;
use installer_lib::core::events::{InstallEvent, Notice, Outcome, Progress};
use installer_lib::core::setup::{IntegrityPrompt, SetupPhase};

// ── Terminal helpers ──────────────────────────────────────────────────────────

fn term_width() -> usize {
    Term::stdout().size().1.max(60) as usize
}

fn rule() -> String {
    style("─".repeat(term_width().min(52))).dim().to_string()
}

// ── Banner ────────────────────────────────────────────────────────────────────

pub fn print_banner(name: &str, version: &str, uninstall: bool) {
    let mode = if uninstall { "Uninstaller" } else { "Installer" };
    println!();
    println!("  {}", style(name).cyan().bold());
    println!("{}", style(format!("  {}  ·  v{}", mode, version)).dim().italic());
    println!("{}", rule());
}

/// Step header for a pipeline phase.
pub fn print_phase(title: &str) {
    println!();
    println!("{}", style(format!("  {}", title)).white().bold());
    println!("{}", rule());
}

// ── Feedback messages ─────────────────────────────────────────────────────────

pub fn print_success(msg: &str) {
    println!("  {}  {}", style("✓").green().bold(), style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("  {}  {}", style("→").blue().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("  {}  {}", style("⚠").yellow().bold(), style(msg).yellow());
}

/// Written to stderr.
pub fn print_error(msg: &str) {
    eprintln!("  {}  {}", style("✗").red().bold(), style(msg).red());
}

// ── Info box ──────────────────────────────────────────────────────────────────

pub fn print_kv_box(title: &str, rows: &[(&str, String)]) {
    const BOX_INNER: usize = 46;

    let dashes = "─".repeat(BOX_INNER.saturating_sub(title.chars().count() + 2));
    println!(
        "  ┌─ {} {}┐",
        style(title).white().bold(),
        style(&dashes).dim()
    );
    for (key, val) in rows {
        println!("  │  {:<18}{}", style(*key).dim(), style(val).white().bold());
    }
    println!("  └{}┘", style("─".repeat(BOX_INNER + 2)).dim());
}

// ── Questions ─────────────────────────────────────────────────────────────────

pub fn confirm(question: &str, default: bool) -> Result<bool, dialoguer::Error> {
    Confirm::new()
        .with_prompt(question)
        .default(default)
        .interact()
}

/// Checksum prompt on the terminal. `--yes` accepts without asking.
pub struct TerminalPrompt {
    pub assume_yes: bool,
}

#[async_trait]
impl IntegrityPrompt for TerminalPrompt {
    async fn confirm_continue(&self, verification: &Verification) -> bool {
        if self.assume_yes {
            return true;
        }

        let question = match verification {
            Verification::Mismatch { .. } => {
                "The downloaded file does not match its checksum. Continue anyway?"
            }
            _ => "The downloaded file could not be verified. Continue anyway?",
        };

        // dialoguer blocks on stdin.
        let answer = tokio::task::spawn_blocking(move || confirm(question, false)).await;
        match answer {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(e)) => {
                print_error(&format!("Prompt error: {}", e));
                false
            }
            Err(_) => false,
        }
    }
}

// ── Event rendering ───────────────────────────────────────────────────────────

enum Tone {
    Success,
    Info,
    Warning,
    Error,
}

fn tone(notice: &Notice) -> Tone {
    match notice {
        Notice::DownloadCompleted { .. }
        | Notice::UninstallConfigWritten { .. }
        | Notice::DirectoryDeleted { .. }
        | Notice::ProcessFinished { .. } => Tone::Success,
        Notice::DownloadCancelled
        | Notice::DownloadSkipped { .. }
        | Notice::InsufficientSpace { .. }
        | Notice::ChecksumOverridden
        | Notice::FileNotFound { .. }
        | Notice::DirectoryNotFound { .. }
        | Notice::DirectoryNotWritable { .. }
        | Notice::NothingRecorded { .. } => Tone::Warning,
        Notice::DownloadFailed { .. }
        | Notice::ChecksumMismatch { .. }
        | Notice::ChecksumError { .. }
        | Notice::UnsupportedOs { .. }
        | Notice::SetupFailed { .. }
        | Notice::UninstallConfigError { .. }
        | Notice::FileCreateError { .. }
        | Notice::FileCopyError { .. }
        | Notice::FileDeleteError { .. }
        | Notice::DirectoryCreateError { .. }
        | Notice::DirectoryDeleteError { .. }
        | Notice::ProcessError { .. } => Tone::Error,
        _ => Tone::Info,
    }
}

fn phase_title(phase: SetupPhase) -> Option<&'static str> {
    match phase {
        SetupPhase::CheckingExisting => Some("Preparing"),
        SetupPhase::Downloading => Some("Downloading"),
        SetupPhase::Verifying => Some("Verifying"),
        SetupPhase::PlatformSetup => Some("Creating shortcuts and scripts"),
        _ => None,
    }
}

fn byte_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::with_template(
                    "  {bar:36.cyan/blue} {bytes}/{total_bytes}  {bytes_per_sec}  eta {eta}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏ "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("  {spinner:.cyan.bold}  {bytes}  {bytes_per_sec}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    }
}

fn step_bar(total: u32) -> ProgressBar {
    let pb = ProgressBar::new(u64::from(total));
    pb.set_style(
        ProgressStyle::with_template("  {bar:36.cyan/blue} {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

/// Prints events as they arrive until every sender is gone.
///
/// Notices go above the progress bar; a phase change or the final outcome
/// clears it.
pub async fn render_events(mut rx: UnboundedReceiver<InstallEvent>, json: bool) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        if json {
            print_json(&event);
            continue;
        }

        match event {
            InstallEvent::Notice(notice) => {
                let line = notice.to_string();
                let print = || match tone(&notice) {
                    Tone::Success => print_success(&line),
                    Tone::Info => print_info(&line),
                    Tone::Warning => print_warning(&line),
                    Tone::Error => print_error(&line),
                };
                match &bar {
                    Some(pb) => pb.suspend(print),
                    None => print(),
                }
            }
            InstallEvent::Progress(progress) => {
                let pb = bar.get_or_insert_with(|| match progress {
                    Progress::Bytes { total, .. } => byte_bar(total),
                    Progress::Steps { total, .. } => step_bar(total),
                });
                match progress {
                    Progress::Bytes { done, .. } => pb.set_position(done),
                    Progress::Steps { completed, .. } => pb.set_position(u64::from(completed)),
                }
            }
            InstallEvent::Phase(phase) => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
                // The outcome that follows says how it ended.
                if phase.is_terminal() {
                    continue;
                }
                if let Some(title) = phase_title(phase) {
                    print_phase(title);
                }
            }
            InstallEvent::Finished(outcome) => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
                println!();
                match &outcome {
                    Outcome::Completed => print_success("Done."),
                    Outcome::Failed { reason } => print_error(reason),
                    Outcome::Cancelled => print_warning("Cancelled."),
                    Outcome::Aborted => print_error("Installation aborted."),
                }
            }
        }
    }

    if let Some(pb) = bar.take() {
        pb.finish_and_clear();
    }
}

fn print_json(event: &InstallEvent) {
    let mut stdout = std::io::stdout().lock();
    match serde_json::to_string(event) {
        Ok(line) => {
            let _ = writeln!(stdout, "{}", line);
            let _ = stdout.flush();
        }
        Err(e) => tracing::error!("Failed to serialize event: {}", e),
    }
}
