use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;

/// Operating-system family the installer knows how to set up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Unsupported(String),
}

static CURRENT_PLATFORM: OnceLock<Platform> = OnceLock::new();

impl Platform {
    /// Platform of the running process, resolved once.
    pub fn current() -> &'static Platform {
        CURRENT_PLATFORM.get_or_init(|| Platform::from_os_name(std::env::consts::OS))
    }

    /// Maps an OS name (`std::env::consts::OS` or a JVM-style `os.name`)
    /// onto a family.
    pub fn from_os_name(os: &str) -> Self {
        let os = os.trim().to_ascii_lowercase();
        if os.contains("win") && !os.contains("darwin") {
            Platform::Windows
        } else if os.contains("mac") || os.contains("darwin") {
            Platform::MacOs
        } else if os.contains("linux") {
            Platform::Linux
        } else {
            Platform::Unsupported(os)
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "Windows"),
            Platform::Linux => write!(f, "Linux"),
            Platform::MacOs => write!(f, "MacOS"),
            Platform::Unsupported(os) => write!(f, "{os}"),
        }
    }
}
