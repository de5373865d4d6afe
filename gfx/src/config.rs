//! Backend configuration
//!
//! Most values come from the environment the way other Wayland clients pick
//! them up (`XCURSOR_THEME`, `XCURSOR_SIZE`); an application may also load a
//! JSON file over the defaults.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cursor::CURSOR_THEME_SIZE;

fn default_cursor_theme() -> String {
    std::env::var("XCURSOR_THEME")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "default".to_string())
}

fn default_cursor_size() -> u32 {
    std::env::var("XCURSOR_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|size| *size > 0)
        .unwrap_or(CURSOR_THEME_SIZE)
}

fn default_double_click_ms() -> u32 {
    200
}

fn default_scroll_divisor() -> f32 {
    10.0
}

/// Tunables read at connect time
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct GfxConfig {
    #[serde(default = "default_cursor_theme")]
    pub cursor_theme: String,
    /// Logical cursor size, multiplied by the window scale
    #[serde(default = "default_cursor_size")]
    pub cursor_size: u32,
    /// Maximum delay between two title bar clicks that toggles maximize
    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: u32,
    /// Axis value per scroll line
    #[serde(default = "default_scroll_divisor")]
    pub scroll_divisor: f32,
}

impl Default for GfxConfig {
    fn default() -> Self {
        Self {
            cursor_theme: default_cursor_theme(),
            cursor_size: default_cursor_size(),
            double_click_ms: default_double_click_ms(),
            scroll_divisor: default_scroll_divisor(),
        }
    }
}

impl GfxConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Parse a JSON config; missing keys keep their defaults.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: GfxConfig = serde_json::from_str(json).context("invalid config")?;
        anyhow::ensure!(config.cursor_size > 0, "cursor_size must be positive");
        anyhow::ensure!(
            config.scroll_divisor.is_finite() && config.scroll_divisor > 0.0,
            "scroll_divisor must be positive"
        );
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// Fixed platform timing information
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct GfxInfo {
    /// Seconds
    pub double_click_time: f32,
    /// Seconds
    pub caret_blink_time: f32,
    /// Hz
    pub default_refresh_rate: f32,
}

impl Default for GfxInfo {
    fn default() -> Self {
        Self {
            double_click_time: 0.5,
            caret_blink_time: 0.5,
            default_refresh_rate: 60.0,
        }
    }
}
