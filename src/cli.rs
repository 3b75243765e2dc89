use std::path::PathBuf;

use clap::Parser;

/// Command-line flags. Everything is optional.
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(name = "installer", version)]
#[command(about = "Installs or removes the configured application", long_about = None)]
pub struct Args {
    /// Installer configuration (default: resources/config.yaml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Installation directory
    #[arg(long, value_name = "PATH")]
    pub install_dir: Option<PathBuf>,

    /// Start-menu directory
    #[arg(long, value_name = "PATH")]
    pub start_menu_dir: Option<PathBuf>,

    /// Do not place a desktop shortcut
    #[arg(long)]
    pub no_desktop_shortcut: bool,

    /// Do not place a start-menu shortcut
    #[arg(long)]
    pub no_start_menu_shortcut: bool,

    /// Remove an earlier installation
    #[arg(long, conflicts_with_all = ["install_dir", "start_menu_dir", "launch"])]
    pub uninstall: bool,

    /// Start the application after installing
    #[arg(long)]
    pub launch: bool,

    /// Answer every question with yes
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Print events as JSON lines instead of text
    #[arg(long)]
    pub json_events: bool,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("installer").chain(args.iter().copied()))
    }

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn no_arguments_means_defaults() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn paths_and_flags() {
        let args = parse(&[
            "--config",
            "/tmp/config.yaml",
            "--install-dir=/opt/app",
            "--no-desktop-shortcut",
            "-y",
            "--json-events",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.yaml")));
        assert_eq!(args.install_dir, Some(PathBuf::from("/opt/app")));
        assert!(args.no_desktop_shortcut);
        assert!(!args.no_start_menu_shortcut);
        assert!(args.yes);
        assert!(args.json_events);
    }

    #[test]
    fn missing_path_is_rejected() {
        assert!(parse(&["--install-dir"]).is_err());
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let err = parse(&["--frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn uninstall_does_not_take_install_choices() {
        let err = parse(&["--uninstall", "--install-dir", "/opt/app"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
