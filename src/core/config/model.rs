use serde::{Deserialize, Serialize};

/// Root of `config.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub lang: String,
    pub debug: bool,
    pub project: ProjectConfig,
    pub download: DownloadConfig,
    pub install: InstallConfig,
    pub uninstall: UninstallConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub version: String,
    pub author: String,
}

/// Where the payload comes from and what it should hash to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub link: String,
    pub file_name: String,
    /// Lower-case SHA-256 hex. Empty disables verification.
    #[serde(rename = "sha256")]
    pub hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub default_dirs: DefaultDirsConfig,
    pub batch: ScriptConfig,
    pub bash: ScriptConfig,
    pub exe: ExeConfig,
    pub linux_desktop: ScriptConfig,
    #[serde(rename = "macos_app")]
    pub mac_app: MacAppConfig,
}

/// Folder names used when building the default install and start-menu paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultDirsConfig {
    pub appdata: String,
    pub start_menu: String,
}

/// A file to write plus its template body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub file_name: String,
    pub content: String,
}

/// Windows launcher executable and the PowerShell that creates its shortcut.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExeConfig {
    pub file_name: String,
    /// Path of the executable inside the resource directory.
    pub resource_path: String,
    pub powershell: String,
    /// Name of the `.lnk` the PowerShell template creates.
    pub shortcut_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MacAppConfig {
    pub file_name: String,
    #[serde(rename = "info_list")]
    pub info_plist: String,
    pub script: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UninstallConfig {
    pub batch: ScriptConfig,
    pub bash: ScriptConfig,
    pub zsh: ScriptConfig,
}

fn fill(value: &mut String, default: &str) {
    if value.trim().is_empty() {
        *value = default.to_string();
    }
}

impl InstallerConfig {
    /// Replaces empty names with the defaults every installer ships with.
    pub(crate) fn apply_defaults(&mut self) {
        fill(&mut self.lang, "eng");
        fill(&mut self.project.version, "1.0.0");
        fill(&mut self.download.file_name, "client.jar");
        fill(&mut self.install.default_dirs.appdata, "app_data");
        fill(&mut self.install.default_dirs.start_menu, "start_menu_data");
        fill(&mut self.install.batch.file_name, "start.bat");
        fill(&mut self.install.bash.file_name, "start.sh");
        fill(&mut self.install.exe.file_name, "start.exe");
        fill(&mut self.install.linux_desktop.file_name, "start.desktop");
        fill(&mut self.install.mac_app.file_name, "start.app");
        fill(&mut self.uninstall.batch.file_name, "uninstall.bat");
        fill(&mut self.uninstall.bash.file_name, "uninstall.sh");
        fill(&mut self.uninstall.zsh.file_name, "uninstall.zsh");

        let exe_resource = format!("assets/{}", self.install.exe.file_name);
        fill(&mut self.install.exe.resource_path, &exe_resource);

        let shortcut = format!("{}.lnk", self.display_name());
        fill(&mut self.install.exe.shortcut_name, &shortcut);

        self.download.hash = self.download.hash.trim().to_ascii_lowercase();
    }

    /// Name shown to the user and used for shortcuts.
    pub fn display_name(&self) -> &str {
        if self.project.name.trim().is_empty() {
            &self.install.default_dirs.appdata
        } else {
            self.project.name.trim()
        }
    }

    /// Lower-case identifier used for the uninstall-config file name.
    pub fn app_id(&self) -> String {
        let id = self
            .display_name()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect::<String>()
            .to_ascii_lowercase();
        if id.is_empty() {
            "installer".to_string()
        } else {
            id
        }
    }
}
