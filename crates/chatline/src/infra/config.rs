use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::infra::tab_store::StoreKey;

/// Characters reserved below `maxUserInput` for the attachment fence markup.
pub const MAX_USER_INPUT_THRESHOLD: usize = 96;
/// Directory under the user configuration directory holding `config.json`.
pub const CONFIG_DIR: &str = "chatline";
/// Configuration file name.
pub const CONFIG_FILE: &str = "config.json";

/// Error raised while loading the widget configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config `{path}`: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// User-facing strings of the widget.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetTexts {
    pub command_confirmation: String,
    pub no_matches: String,
    pub pin_context_hint: String,
    pub prompt_placeholder: String,
    pub send: String,
    pub stop_generating: String,
    pub thanks_for_voting: String,
}

impl Default for WidgetTexts {
    fn default() -> Self {
        Self {
            command_confirmation: "Press Tab again to confirm".to_string(),
            no_matches: "No matches".to_string(),
            pin_context_hint: "Pin context with \u{2325} Enter".to_string(),
            prompt_placeholder: "Ask a question or enter \"/\" for quick actions".to_string(),
            send: "Send".to_string(),
            stop_generating: "Stop".to_string(),
            thanks_for_voting: "Thanks for your feedback".to_string(),
        }
    }
}

/// Widget-wide settings shared by every tab.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetConfig {
    pub auto_focus: bool,
    pub max_tabs: usize,
    /// Raw input cap including the reserved attachment markup.
    pub max_user_input: usize,
    /// Store values every new tab starts with.
    pub tab_defaults: BTreeMap<StoreKey, Value>,
    pub texts: WidgetTexts,
    pub user_input_length_warning_threshold: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            auto_focus: true,
            max_tabs: 10,
            max_user_input: 4096,
            tab_defaults: BTreeMap::new(),
            texts: WidgetTexts::default(),
            user_input_length_warning_threshold: 3500,
        }
    }
}

impl WidgetConfig {
    /// Reads a JSON configuration file.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` when given, else the default location when it exists,
    /// else the built-in defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when an existing file cannot be loaded.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Returns the effective typing cap in characters.
    pub fn max_user_input(&self) -> usize {
        self.max_user_input.saturating_sub(MAX_USER_INPUT_THRESHOLD)
    }

    /// Returns the store defaults for new tabs, including the placeholder.
    pub fn store_defaults(&self) -> BTreeMap<StoreKey, Value> {
        let mut defaults = self.tab_defaults.clone();
        defaults
            .entry(StoreKey::PromptInputPlaceholder)
            .or_insert_with(|| Value::String(self.texts.prompt_placeholder.clone()));

        defaults
    }
}

/// Returns `<config dir>/chatline/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}
