pub mod installation;

pub use installation::{InstallationState, UninstallRecord};
