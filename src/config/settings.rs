//! Configuration settings for chatline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default system prompt sent at the head of every request.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant who answers questions and inquiries.";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub chat: ChatSettings,
    pub tools: ToolSettings,
    pub output: OutputSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory holding one history log per conversation.
    pub history_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            history_dir: "~/.config/chatline/history".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Chat endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Model alias or literal model identifier.
    pub model: String,
    /// Short names accepted by `--model`.
    pub model_aliases: BTreeMap<String, String>,
    /// System prompt used when none is given on the command line.
    pub system_prompt: String,
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`).
    pub api_base: String,
    /// Maximum number of tool rounds in one exchange.
    pub max_tool_rounds: usize,
    /// Connect timeout for the chat endpoint, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        let model_aliases = [
            ("3.5", "gpt-3.5-turbo"),
            ("4", "gpt-4"),
            ("4o", "gpt-4o"),
            ("mini", "gpt-4o-mini"),
        ]
        .into_iter()
        .map(|(alias, model)| (alias.to_string(), model.to_string()))
        .collect();

        Self {
            model: "4o".to_string(),
            model_aliases,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            max_tool_rounds: 5,
            connect_timeout_secs: 10,
        }
    }
}

impl ChatSettings {
    /// Resolve an alias (or the configured default) to a model identifier.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        let name = requested.unwrap_or(&self.model);
        self.model_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Weather unit system understood by OpenWeatherMap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum WeatherUnits {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl WeatherUnits {
    /// Suffix appended to temperatures.
    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            WeatherUnits::Metric => "°C",
            WeatherUnits::Imperial => "°F",
            WeatherUnits::Standard => "K",
        }
    }
}

impl std::fmt::Display for WeatherUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherUnits::Metric => write!(f, "metric"),
            WeatherUnits::Imperial => write!(f, "imperial"),
            WeatherUnits::Standard => write!(f, "standard"),
        }
    }
}

/// Tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Tools offered to the model.
    pub enabled: Vec<String>,
    /// Geolocation lookup endpoint returning JSON with a `city` field.
    pub geolocation_url: String,
    /// OpenWeatherMap current-weather endpoint.
    pub weather_url: String,
    /// Unit system for weather reports.
    pub weather_units: WeatherUnits,
    /// OpenWeatherMap API key (prefer OPEN_WEATHER_KEY env var).
    pub weather_api_key: Option<String>,
    /// Image generation model.
    pub image_model: String,
    /// Image size, e.g. "1024x1024".
    pub image_size: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            enabled: vec![
                "get_time".to_string(),
                "get_location_city".to_string(),
                "get_weather".to_string(),
                "generate_image".to_string(),
            ],
            geolocation_url: "https://ipinfo.io/json".to_string(),
            weather_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            weather_units: WeatherUnits::Metric,
            weather_api_key: None,
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
        }
    }
}

impl ToolSettings {
    /// Weather API key from config, falling back to OPEN_WEATHER_KEY.
    pub fn weather_key(&self) -> Option<String> {
        self.weather_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPEN_WEATHER_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// Terminal output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Delay between printed characters of the answer, in milliseconds.
    pub typing_delay_ms: u64,
    /// Maximum width, in terminal columns, of rendered images.
    pub image_max_width: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            typing_delay_ms: 10,
            image_max_width: 80,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env();
        Ok(settings)
    }

    /// Apply environment overrides that are not exposed as CLI flags.
    fn apply_env(&mut self) {
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            if !base.is_empty() {
                self.chat.api_base = base;
            }
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatline")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded history directory path.
    pub fn history_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.history_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.chat.max_tool_rounds, 5);
        assert_eq!(settings.tools.enabled.len(), 4);
        assert_eq!(settings.tools.weather_units, WeatherUnits::Metric);
        assert_eq!(settings.chat.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_resolve_model_aliases() {
        let chat = ChatSettings::default();
        assert_eq!(chat.resolve_model(Some("3.5")), "gpt-3.5-turbo");
        assert_eq!(chat.resolve_model(Some("4")), "gpt-4");
        assert_eq!(chat.resolve_model(Some("o3-mini")), "o3-mini");
        assert_eq!(chat.resolve_model(None), "gpt-4o");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
[chat]
model = "4"
max_tool_rounds = 2

[tools]
weather_units = "imperial"
enabled = ["get_time"]
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.chat.model, "4");
        assert_eq!(settings.chat.max_tool_rounds, 2);
        assert_eq!(settings.chat.api_base, "https://api.openai.com/v1");
        assert_eq!(settings.tools.weather_units, WeatherUnits::Imperial);
        assert_eq!(settings.tools.enabled, vec!["get_time".to_string()]);
        assert_eq!(settings.output.typing_delay_ms, 10);
    }

    #[test]
    fn test_serialized_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.general.history_dir = "/tmp/chatline-history".to_string();
        settings.output.typing_delay_ms = 0;
        std::fs::write(&path, toml::to_string_pretty(&settings).unwrap()).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.general.history_dir, "/tmp/chatline-history");
        assert_eq!(loaded.output.typing_delay_ms, 0);
        assert_eq!(loaded.history_dir(), PathBuf::from("/tmp/chatline-history"));
    }

    #[test]
    fn test_temperature_suffix() {
        assert_eq!(WeatherUnits::Metric.temperature_suffix(), "°C");
        assert_eq!(WeatherUnits::Imperial.temperature_suffix(), "°F");
        assert_eq!(WeatherUnits::Standard.to_string(), "standard");
    }
}
