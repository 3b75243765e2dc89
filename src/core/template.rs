//! `%token%` substitution for the externally supplied script templates.
//!
//! Replacement is a literal string replace, applied token by token in the
//! order given. Values are not escaped except for the backslash doubling the
//! Windows scripts need.

use std::path::Path;

/// Placeholders understood in script, desktop-entry and plist templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    DirPath,
    JarPath,
    InstallDir,
    DesktopShortcut,
    StartMenuShortcut,
    ShortcutPath,
    /// Older spelling of [`Token::ShortcutPath`] still found in PowerShell templates.
    ShortcutFile,
    ExePath,
    IconPath,
}

impl Token {
    pub fn as_str(self) -> &'static str {
        match self {
            Token::DirPath => "%dirPath%",
            Token::JarPath => "%jarPath%",
            Token::InstallDir => "%installDir%",
            Token::DesktopShortcut => "%desktopShortcut%",
            Token::StartMenuShortcut => "%startmenuShortcut%",
            Token::ShortcutPath => "%shortcutPath%",
            Token::ShortcutFile => "%shortcutFile%",
            Token::ExePath => "%exePath%",
            Token::IconPath => "%iconPath%",
        }
    }
}

/// Replaces every occurrence of each token with its value.
pub fn render(template: &str, values: &[(Token, String)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (token, value)| {
            acc.replace(token.as_str(), value)
        })
}

/// Path as a template value.
pub fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Path as a template value for PowerShell and batch string literals.
pub fn escaped_path_value(path: &Path) -> String {
    path_value(path).replace('\\', "\\\\")
}
