use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "worthmeter";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "WORTHMETER_CONFIG_PATH";
pub const DEFAULT_REFRESH_SECONDS: u64 = 1;

/// Terminal colours used when rendering amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    #[serde(alias = "default")]
    Plain,
    #[serde(alias = "dark")]
    Noir,
    Solarized,
}

impl Theme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "plain" | "default" => Some(Self::Plain),
            "noir" | "dark" => Some(Self::Noir),
            "solarized" => Some(Self::Solarized),
            _ => None,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Self::Plain => Palette::default(),
            Self::Noir => Palette {
                positive: "\x1b[38;5;114m",
                negative: "\x1b[38;5;203m",
                muted: "\x1b[38;5;250m",
                reset: "\x1b[0m",
            },
            Self::Solarized => Palette {
                positive: "\x1b[38;5;108m",
                negative: "\x1b[38;5;160m",
                muted: "\x1b[38;5;246m",
                reset: "\x1b[0m",
            },
        }
    }
}

/// ANSI sequences for one theme; empty strings leave text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Palette {
    pub positive: &'static str,
    pub negative: &'static str,
    pub muted: &'static str,
    pub reset: &'static str,
}

impl Palette {
    fn paint(&self, color: &str, text: &str) -> String {
        if color.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", color, text, self.reset)
        }
    }

    /// Colors a rendered amount by the sign of the underlying value.
    pub fn signed(&self, negative: bool, text: &str) -> String {
        if negative {
            self.paint(self.negative, text)
        } else {
            self.paint(self.positive, text)
        }
    }

    pub fn alert(&self, text: &str) -> String {
        self.paint(self.negative, text)
    }

    pub fn mutedize(&self, text: &str) -> String {
        self.paint(self.muted, text)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// Seconds between recomputations in `watch`.
    #[serde(default)]
    pub refresh_seconds: Option<u64>,
}

impl Config {
    pub fn palette(&self) -> Palette {
        self.theme.palette()
    }

    pub fn refresh_seconds(&self) -> u64 {
        self.refresh_seconds
            .filter(|seconds| *seconds > 0)
            .unwrap_or(DEFAULT_REFRESH_SECONDS)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

/// Values given on the command line, layered over the config file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<Theme>,
    pub aliases: HashMap<String, String>,
    pub refresh_seconds: Option<u64>,
}

/// Path of a per-user application file: `env_var` when set, otherwise
/// `worthmeter/<file_name>` under `%APPDATA%` or `~/.config`.
pub(crate) fn user_file(env_var: &str, file_name: &str) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(env_var)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    let base = if cfg!(windows) {
        std::env::var("APPDATA")
            .map(PathBuf::from)
            .map_err(|_| AppError::invalid_data("APPDATA is not set"))?
    } else {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .map_err(|_| AppError::invalid_data("HOME is not set"))?
    };
    Ok(base.join(APP_DIR_NAME).join(file_name))
}

pub fn config_path() -> Result<PathBuf, AppError> {
    user_file(CONFIG_ENV_VAR, CONFIG_FILE_NAME)
}

/// Loads the config file, falling back to defaults and reporting why.
pub fn load_config_with_fallback() -> ConfigLoad {
    let loaded = config_path().and_then(|path| read_config(&path));
    match loaded {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

/// A missing file is the default config.
fn read_config(path: &Path) -> Result<Config, AppError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => return Err(AppError::io(format!("{}: {}", path.display(), err))),
    };

    let config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid config {}: {}", path.display(), err))
    })?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(theme) = overrides.theme {
        merged.theme = theme;
    }
    merged.aliases.extend(
        overrides
            .aliases
            .iter()
            .map(|(alias, value)| (alias.clone(), value.clone())),
    );
    if overrides.refresh_seconds.is_some() {
        merged.refresh_seconds = overrides.refresh_seconds;
    }
    merged
}
