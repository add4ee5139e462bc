//! Daemon configuration.
//!
//! The configuration is loaded from `config.json` in the winven config
//! directory.  It holds the settings that are not part of the catalog file:
//! system hotkeys, game-mode behavior, animation timing, continuous-control
//! tuning and the command port.
//!
//! # Example
//!
//! ```json
//! {
//!   "hotkeys": { "config_panel": "Ctrl+Alt+0", "game_mode": "Ctrl+Alt+J" },
//!   "game_mode": { "aggressive": false },
//!   "animation": { "steps": 12, "frame_ms": 10 },
//!   "control": { "move_step": 15, "resize_step": 15, "repeat_ms": 16, "initial_delay_ms": 150 },
//!   "command_port": "127.0.0.1:47600",
//!   "settings_command": "winven-settings.exe"
//! }
//! ```

use crate::control::ControlConfig;
use crate::placement::animation::Animation;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default loopback address of the command port.
pub const DEFAULT_COMMAND_PORT: &str = "127.0.0.1:47600";

/// Top-level configuration.
///
/// Every field is optional; a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hotkeys: HotkeyConfig,
    pub game_mode: GameModeConfig,
    pub animation: AnimationConfig,
    pub control: ControlConfig,
    /// Address of the JSON command port.  `null` disables it.
    pub command_port: Option<String>,
    /// Program started when the settings panel is requested.
    pub settings_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkeys: HotkeyConfig::default(),
            game_mode: GameModeConfig::default(),
            animation: AnimationConfig::default(),
            control: ControlConfig::default(),
            command_port: Some(DEFAULT_COMMAND_PORT.into()),
            settings_command: None,
        }
    }
}

/// The two configurable system hotkeys.  When both are the same string one
/// binding serves both purposes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    pub config_panel: String,
    pub game_mode: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            config_panel: "Ctrl+Alt+0".into(),
            game_mode: "Ctrl+Alt+J".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameModeConfig {
    /// Close other windows and terminate non-whitelisted processes when
    /// game mode turns on.
    pub aggressive: bool,
}

/// Animation timing.  Whether animation is enabled at all comes from the
/// catalog file's settings record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub steps: u32,
    pub frame_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            steps: 12,
            frame_ms: 10,
        }
    }
}

impl AnimationConfig {
    pub fn to_animation(&self, enabled: bool) -> Animation {
        Animation {
            enabled,
            steps: self.steps.max(1),
            frame: Duration::from_millis(self.frame_ms),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

/// `<config dir>/winven`, or `./winven` when the platform has no config
/// directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("winven")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn catalog_path() -> PathBuf {
    config_dir().join("window_layouts.cfg")
}

pub fn session_path() -> PathBuf {
    config_dir().join("session.cfg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "hotkeys": { "config_panel": "Ctrl+Alt+S", "game_mode": "Ctrl+Alt+G" },
            "game_mode": { "aggressive": true },
            "animation": { "steps": 8, "frame_ms": 5 },
            "control": { "move_step": 20, "repeat_ms": 33 },
            "command_port": "127.0.0.1:50000",
            "settings_command": "notepad.exe"
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.hotkeys.config_panel, "Ctrl+Alt+S");
        assert_eq!(cfg.hotkeys.game_mode, "Ctrl+Alt+G");
        assert!(cfg.game_mode.aggressive);
        assert_eq!(cfg.animation.steps, 8);
        assert_eq!(cfg.control.move_step, 20);
        assert_eq!(cfg.control.repeat_ms, 33);
        assert_eq!(cfg.control.resize_step, ControlConfig::default().resize_step);
        assert_eq!(cfg.command_port.as_deref(), Some("127.0.0.1:50000"));
        assert_eq!(cfg.settings_command.as_deref(), Some("notepad.exe"));
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.hotkeys.config_panel, "Ctrl+Alt+0");
        assert_eq!(cfg.hotkeys.game_mode, "Ctrl+Alt+J");
        assert_eq!(cfg.command_port.as_deref(), Some(DEFAULT_COMMAND_PORT));
    }

    #[test]
    fn null_port_disables_listener() {
        let cfg: Config = serde_json::from_str(r#"{ "command_port": null }"#).unwrap();
        assert_eq!(cfg.command_port, None);
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "hotkeys": {}, "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn animation_timing() {
        let anim = AnimationConfig::default().to_animation(true);
        assert_eq!(anim, Animation::default());
        let off = AnimationConfig { steps: 0, frame_ms: 0 }.to_animation(false);
        assert_eq!((off.enabled, off.steps), (false, 1));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn files_share_one_directory() {
        assert_eq!(catalog_path().parent(), Some(config_dir().as_path()));
        assert_eq!(session_path().parent(), config_path().parent());
    }
}
