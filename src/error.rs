use installer_lib::core::error::InstallerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Installer(#[from] InstallerError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Installation cancelled by user")]
    Declined,
}
