//! Configuration module for chatline.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ChatSettings, GeneralSettings, OutputSettings, Settings, ToolSettings, WeatherUnits,
    DEFAULT_SYSTEM_PROMPT,
};
