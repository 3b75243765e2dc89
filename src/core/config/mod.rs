pub mod model;

use std::path::Path;

use tracing::debug;

use crate::core::error::{InstallerError, InstallerResult};

pub use model::{
    DefaultDirsConfig, DownloadConfig, ExeConfig, InstallConfig, InstallerConfig, MacAppConfig,
    ProjectConfig, ScriptConfig, UninstallConfig,
};

/// File name looked up in the resource directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

impl InstallerConfig {
    /// Parses a YAML document and fills in default file names.
    pub fn from_yaml_str(raw: &str) -> InstallerResult<Self> {
        let mut config: InstallerConfig = serde_yaml::from_str(raw)?;
        config.apply_defaults();
        Ok(config)
    }

    pub fn load(path: &Path) -> InstallerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| InstallerError::io(path, e))?;
        let config = Self::from_yaml_str(&raw)?;
        debug!(
            "Loaded installer config for '{}' from {:?}",
            config.display_name(),
            path
        );
        Ok(config)
    }

    /// Checks the fields an install run cannot do without.
    pub fn validate_for_install(&self) -> InstallerResult<()> {
        if self.download.link.trim().is_empty() {
            return Err(InstallerError::Config("download.link is empty".into()));
        }
        if self.download.file_name.contains(['/', '\\']) {
            return Err(InstallerError::Config(format!(
                "download.file_name must be a plain file name, got {:?}",
                self.download.file_name
            )));
        }
        if !self.download.hash.is_empty()
            && (self.download.hash.len() != 64
                || !self.download.hash.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err(InstallerError::Config(format!(
                "download.sha256 is not a SHA-256 hex digest: {:?}",
                self.download.hash
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
lang: hun
debug: true
project:
  name: MesterMC
  version: 2.1.0
download:
  link: https://example.com/client.jar
  sha256: "ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789"
install:
  default_dirs:
    appdata: mestermc
  bash:
    content: |
      #!/bin/bash
      cd "%dirPath%" && java -jar "%jarPath%"
  macos_app:
    info_list: "<plist>%iconPath%</plist>"
uninstall:
  bash:
    file_name: remove.sh
"#;

    #[test]
    fn parses_nested_sections() {
        let config = InstallerConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.lang, "hun");
        assert!(config.debug);
        assert_eq!(config.project.name, "MesterMC");
        assert_eq!(config.download.link, "https://example.com/client.jar");
        assert!(config.install.bash.content.contains("%jarPath%"));
        assert_eq!(config.install.mac_app.info_plist, "<plist>%iconPath%</plist>");
        assert_eq!(config.uninstall.bash.file_name, "remove.sh");
    }

    #[test]
    fn missing_names_fall_back_to_defaults() {
        let config = InstallerConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.download.file_name, "client.jar");
        assert_eq!(config.install.bash.file_name, "start.sh");
        assert_eq!(config.install.linux_desktop.file_name, "start.desktop");
        assert_eq!(config.install.mac_app.file_name, "start.app");
        assert_eq!(config.uninstall.zsh.file_name, "uninstall.zsh");
        assert_eq!(config.install.exe.shortcut_name, "MesterMC.lnk");
    }

    #[test]
    fn hash_is_normalized_to_lowercase() {
        let config = InstallerConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(
            config.download.hash,
            "abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789"
        );
        assert!(config.validate_for_install().is_ok());
    }

    #[test]
    fn empty_document_is_valid_but_not_installable() {
        let config = InstallerConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.lang, "eng");
        assert_eq!(config.app_id(), "app_data");
        assert!(matches!(
            config.validate_for_install(),
            Err(InstallerError::Config(_))
        ));
    }

    #[test]
    fn app_id_strips_spaces() {
        let config = InstallerConfig::from_yaml_str("project:\n  name: Mester MC\n").unwrap();
        assert_eq!(config.app_id(), "mestermc");
    }
}
