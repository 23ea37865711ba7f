use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User settings from `<config dir>/ticketpad/config.toml`. Every key is
/// optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Tracker base URL used when none is given on the command line.
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
    /// Prefix of every window name; stripped again when navigating.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Window opened when no window is named at startup.
    #[serde(default = "default_window")]
    pub default_window: String,
    /// Query behind the `my-issues` listing.
    #[serde(default = "default_my_issues_query")]
    pub my_issues_query: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            wrap_width: default_wrap_width(),
            name_prefix: default_name_prefix(),
            default_window: default_window(),
            my_issues_query: default_my_issues_query(),
        }
    }
}

impl Config {
    /// Full window name for a session title.
    #[must_use]
    pub fn window_name(&self, title: &str) -> String {
        format!("{}{title}", self.name_prefix)
    }

    /// Session title for navigation text, with the window prefix removed.
    #[must_use]
    pub fn strip_prefix<'a>(&self, text: &'a str) -> &'a str {
        let text = text.trim();
        if self.name_prefix.is_empty() {
            return text;
        }
        text.strip_prefix(self.name_prefix.as_str()).unwrap_or(text)
    }
}

/// Location of the user config file, if the platform has a config dir.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ticketpad/config.toml"))
}

/// Load the user config, falling back to defaults when there is none.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<Config> {
    let Some(path) = config_path() else {
        return Ok(Config::default());
    };
    load_config_from(&path)
}

/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_wrap_width() -> usize {
    80
}

fn default_name_prefix() -> String {
    "/jira/".to_string()
}

fn default_window() -> String {
    "my-issues".to_string()
}

fn default_my_issues_query() -> String {
    "assignee = currentUser() AND resolution = Unresolved ORDER BY updated DESC".to_string()
}
