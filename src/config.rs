use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

/// How replayed conversations are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Whether role labels are colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileConfig {
    pub throttle_ms: Option<u64>,
    pub delay_ms: Option<u64>,
    pub output: Option<String>,
    pub show_stats: Option<bool>,
    pub color: Option<String>,
}

impl ProfileConfig {
    pub fn output_mode(&self, name: &str) -> Result<Option<OutputMode>, String> {
        self.output
            .as_deref()
            .map(|value| {
                OutputMode::parse(value).ok_or_else(|| {
                    format!(
                        "Invalid output '{value}' in profile '{name}'. Supported values: text, json."
                    )
                })
            })
            .transpose()
    }

    pub fn color_choice(&self, name: &str) -> Result<Option<ColorChoice>, String> {
        self.color
            .as_deref()
            .map(|value| {
                ColorChoice::parse(value).ok_or_else(|| {
                    format!(
                        "Invalid color '{value}' in profile '{name}'. Supported values: auto, always, never."
                    )
                })
            })
            .transpose()
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        self.output_mode(name)?;
        self.color_choice(name)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

pub fn load_profile(name: &str) -> Result<ProfileConfig, String> {
    let path = config_path()?;
    let config = read_config(&path)?;

    let profiles = config.profiles.ok_or_else(|| {
        format!(
            "Config file '{}' does not contain a [profiles] section.",
            path.display()
        )
    })?;

    let profile = profiles.get(name).cloned().ok_or_else(|| {
        format!(
            "Profile '{}' not found in config file '{}'.",
            name,
            path.display()
        )
    })?;
    profile.validate(name)?;
    Ok(profile)
}

/// Result of a successful config check.
#[derive(Debug, Clone)]
pub struct ConfigReport {
    pub path: PathBuf,
    /// Profile names, sorted.
    pub profiles: Vec<String>,
}

/// Loads the config file and checks every profile.
pub fn validate_config(profile: Option<&str>) -> Result<ConfigReport, String> {
    let path = config_path()?;
    let config = read_config(&path)?;
    let profiles = config.profiles.unwrap_or_default();

    if let Some(name) = profile {
        if !profiles.contains_key(name) {
            return Err(format!(
                "Profile '{}' not found in config file '{}'.",
                name,
                path.display()
            ));
        }
    }

    let mut names = profiles.keys().cloned().collect::<Vec<_>>();
    names.sort();
    for name in &names {
        profiles[name].validate(name)?;
    }
    Ok(ConfigReport {
        path,
        profiles: names,
    })
}

fn read_config(path: &Path) -> Result<ConfigFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read config file '{}': {err}", path.display()))?;

    toml::from_str(&raw)
        .map_err(|err| format!("Failed to parse config file '{}': {err}", path.display()))
}

pub fn config_path() -> Result<PathBuf, String> {
    if let Ok(path) = env::var("MP_CONFIG") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed).join("mpstream").join("config.toml"));
        }
    }

    let home = env::var("HOME").map_err(|_| {
        "Cannot resolve config path: set MP_CONFIG or HOME/XDG_CONFIG_HOME.".to_string()
    })?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("mpstream")
        .join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::{ColorChoice, OutputMode, ProfileConfig};

    #[test]
    fn output_and_color_parse_case_insensitively() {
        assert_eq!(OutputMode::parse(" JSON "), Some(OutputMode::Json));
        assert_eq!(OutputMode::parse("yaml"), None);
        assert_eq!(ColorChoice::parse("Always"), Some(ColorChoice::Always));
        assert_eq!(ColorChoice::parse("rainbow"), None);
    }

    #[test]
    fn profile_values_are_validated() {
        let profile: ProfileConfig =
            toml::from_str("throttle_ms = 10\noutput = \"yaml\"").expect("profile should parse");
        assert_eq!(profile.throttle_ms, Some(10));
        assert_eq!(
            profile.output_mode("fast").expect_err("yaml is not an output mode"),
            "Invalid output 'yaml' in profile 'fast'. Supported values: text, json."
        );
        assert_eq!(profile.color_choice("fast"), Ok(None));
    }
}
