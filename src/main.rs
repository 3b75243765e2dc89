mod cli;
mod error;
mod ui;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use installer_lib::commands::Session;
use installer_lib::core::error::InstallerError;
use installer_lib::core::events::{Outcome, Reporter};

use cli::Args;
use error::CliError;

// ── Exit codes ────────────────────────────────────────────────────────────────

const EXIT_FAILURE: i32 = 1;
/// The user refused to continue after a checksum failure.
const EXIT_ABORTED: i32 = 2;

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match run(args).await {
        Ok(Outcome::Failed { .. }) => std::process::exit(EXIT_FAILURE),
        Ok(Outcome::Aborted) => std::process::exit(EXIT_ABORTED),
        Ok(_) => {}
        Err(CliError::Declined) => {
            println!();
            ui::print_warning(&CliError::Declined.to_string());
        }
        Err(e) => {
            println!();
            ui::print_error(&e.to_string());
            std::process::exit(EXIT_FAILURE);
        }
    }
}

async fn run(args: Args) -> Result<Outcome, CliError> {
    let mut session = Session::load(args.config.as_deref())?;
    installer_lib::init_logging(args.debug || session.config.debug);
    info!("Using configuration {:?}", session.config_path);

    session.state.debug_mode |= args.debug;
    let uninstall = args.uninstall || session.state.uninstall_mode_active;
    if uninstall {
        // Without a record there is nothing that is known to be ours.
        session.require_uninstall_record()?;
    }

    if !args.json_events {
        ui::print_banner(
            session.config.display_name(),
            &session.config.project.version,
            uninstall,
        );
    }

    if uninstall {
        run_uninstall(&mut session, &args).await
    } else {
        run_install(&mut session, &args).await
    }
}

async fn run_install(session: &mut Session, args: &Args) -> Result<Outcome, CliError> {
    // ── Choices ───────────────────────────────────────────────────────────────
    if let Some(dir) = &args.install_dir {
        session.state.install_path = dir.clone();
    }
    if let Some(dir) = &args.start_menu_dir {
        session.state.start_menu_path = dir.clone();
    }
    session.state.create_desktop_shortcut = !args.no_desktop_shortcut;
    session.state.create_start_menu_shortcut = !args.no_start_menu_shortcut;

    if !args.json_events {
        let yes_no = |b: bool| String::from(if b { "yes" } else { "no" });
        ui::print_kv_box(
            "Installation",
            &[
                ("Platform", session.platform.to_string()),
                ("Install into", session.state.install_path.display().to_string()),
                ("Start menu", session.state.start_menu_path.display().to_string()),
                ("Desktop shortcut", yes_no(session.state.create_desktop_shortcut)),
                ("Menu shortcut", yes_no(session.state.create_start_menu_shortcut)),
            ],
        );
    }

    if !args.yes {
        let proceed = tokio::task::spawn_blocking(|| ui::confirm("Start the installation?", true))
            .await
            .map_err(|e| InstallerError::Other(e.to_string()))??;
        if !proceed {
            return Err(CliError::Declined);
        }
    }
    session.state.license_accepted = true;

    // ── Pipeline ──────────────────────────────────────────────────────────────
    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let (reporter, rx) = Reporter::channel();
    let renderer = tokio::spawn(ui::render_events(rx, args.json_events));
    let prompt = ui::TerminalPrompt {
        assume_yes: args.yes,
    };

    let result = session.install(reporter, cancel, &prompt).await;
    // The reporter moved into the pipeline is dropped by now, so the
    // renderer drains what is left and stops.
    let _ = renderer.await;
    let outcome = result?;

    if outcome.is_success() && args.launch {
        if let Err(e) = session.launch() {
            warn!("Could not launch application: {}", e);
            ui::print_warning(&format!("Could not launch application: {}", e));
        }
    }

    Ok(outcome)
}

async fn run_uninstall(session: &mut Session, args: &Args) -> Result<Outcome, CliError> {
    if !args.json_events {
        ui::print_kv_box(
            "Uninstall",
            &[
                ("Installed in", session.state.install_path.display().to_string()),
                ("Start menu", session.state.start_menu_path.display().to_string()),
            ],
        );
    }

    if !args.yes {
        let proceed = tokio::task::spawn_blocking(|| ui::confirm("Remove the application?", false))
            .await
            .map_err(|e| InstallerError::Other(e.to_string()))??;
        if !proceed {
            return Err(CliError::Declined);
        }
    }

    let (reporter, rx) = Reporter::channel();
    let renderer = tokio::spawn(ui::render_events(rx, args.json_events));
    let result = session.uninstall(reporter).await;
    let _ = renderer.await;
    Ok(result?)
}

/// Ctrl-C cancels the running download; the pipeline reports the rest.
fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
}
