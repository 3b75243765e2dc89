// ─── Installer Core ───
// Download, verify and set up one application; reverse it on uninstall.
//
// Architecture:
//   core/
//     config/      config.yaml model + loader with defaults
//     state/       InstallationState + persisted uninstall record
//     downloader/  Chunked streaming download + SHA-256 check
//     platform/    OS detection + Windows, Linux, macOS setup strategies
//     setup        Install pipeline (phases, checksum prompt)
//     uninstall    Five-step removal
//     events       Notices, progress and outcomes sent to the front end
//     files        Recursive copy/delete, scripts, chmod

pub mod config;
pub mod downloader;
pub mod error;
pub mod events;
pub mod files;
pub mod http;
pub mod paths;
pub mod platform;
pub mod setup;
pub mod state;
pub mod template;
pub mod uninstall;
