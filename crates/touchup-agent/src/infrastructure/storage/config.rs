//! TOML-based configuration persistence for the agent.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\TouchUp\config.toml`
//! - Linux:    `~/.config/touchup/config.toml`
//! - macOS:    `~/Library/Application Support/TouchUp/config.toml`
//!
//! Example:
//!
//! ```toml
//! [identity]
//! touchscreen_name_cue = "Digital"
//! touchscreen_id_cue = 3
//!
//! [gestures]
//! scrolling_with_one_finger = true
//! ```
//!
//! # Serde default values
//!
//! Every section and field has a default, so a missing file, an empty file
//! and a file written by an older version all load.  Fields annotated with
//! `#[serde(default = "some_fn")]` use the return value of `some_fn()` when
//! the field is absent.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touchup_core::{DisplayId, DriverSettings, GestureToggles, IdentityCue};

use crate::application::coordinator::CoordinatorSettings;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub gestures: GestureConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub hotplug: HotPlugConfig,
}

/// General agent behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Schema version string – bump when breaking changes are introduced.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// The remembered touchscreen identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityConfig {
    #[serde(default = "default_name_cue")]
    pub touchscreen_name_cue: String,
    #[serde(default)]
    pub touchscreen_id_cue: u32,
}

/// Touch driver tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverConfig {
    #[serde(default = "default_true")]
    pub post_mouse_events: bool,
    /// Seconds a contact must rest before it counts as a hold.
    #[serde(default = "default_hold_duration")]
    pub hold_duration_secs: f64,
    #[serde(default = "default_double_click_distance")]
    pub double_click_distance_mm: f64,
    #[serde(default = "default_error_resistance")]
    pub error_resistance: u32,
    #[serde(default = "default_true")]
    pub ignore_origin_touches: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GestureConfig {
    #[serde(default)]
    pub scrolling_with_one_finger: bool,
    #[serde(default)]
    pub secondary_click: bool,
    #[serde(default)]
    pub magnification: bool,
    #[serde(default)]
    pub click_window_to_front: bool,
    #[serde(default)]
    pub click_on_lift: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationConfig {
    /// Start calibrating automatically when the touchscreen is uncalibrated.
    #[serde(default = "default_true")]
    pub auto_start: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_completion_grace_ms")]
    pub completion_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotPlugConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_name_cue() -> String {
    touchup_core::domain::identity::DEFAULT_NAME_CUE.to_string()
}
fn default_true() -> bool {
    true
}
fn default_hold_duration() -> f64 {
    0.1
}
fn default_double_click_distance() -> f64 {
    8.0
}
fn default_error_resistance() -> u32 {
    4
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_completion_grace_ms() -> u64 {
    2000
}
fn default_window_secs() -> u64 {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            touchscreen_name_cue: default_name_cue(),
            touchscreen_id_cue: 0,
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            post_mouse_events: default_true(),
            hold_duration_secs: default_hold_duration(),
            double_click_distance_mm: default_double_click_distance(),
            error_resistance: default_error_resistance(),
            ignore_origin_touches: default_true(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            auto_start: default_true(),
            debounce_ms: default_debounce_ms(),
            completion_grace_ms: default_completion_grace_ms(),
        }
    }
}

impl Default for HotPlugConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
        }
    }
}

// ── Conversions into domain types ─────────────────────────────────────────────

impl AppConfig {
    pub fn identity_cue(&self) -> IdentityCue {
        IdentityCue {
            name: self.identity.touchscreen_name_cue.clone(),
            id: DisplayId(self.identity.touchscreen_id_cue),
        }
    }

    pub fn set_identity_cue(&mut self, cue: &IdentityCue) {
        self.identity.touchscreen_name_cue = cue.name.clone();
        self.identity.touchscreen_id_cue = cue.id.0;
    }

    /// Driver settings.  A negative or non-finite hold duration falls back to
    /// the default.
    pub fn driver_settings(&self) -> DriverSettings {
        let defaults = DriverSettings::default();
        let d = &self.driver;
        let g = &self.gestures;
        DriverSettings {
            post_mouse_events: d.post_mouse_events,
            hold_duration: Duration::try_from_secs_f64(d.hold_duration_secs)
                .unwrap_or(defaults.hold_duration),
            double_click_distance_mm: d.double_click_distance_mm,
            error_resistance: d.error_resistance,
            ignore_origin_touches: d.ignore_origin_touches,
            gestures: GestureToggles {
                scrolling_with_one_finger: g.scrolling_with_one_finger,
                secondary_click: g.secondary_click,
                magnification: g.magnification,
                click_window_to_front: g.click_window_to_front,
                click_on_lift: g.click_on_lift,
            },
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            hot_plug_window: Duration::from_secs(self.hotplug.window_secs),
            tap_debounce: Duration::from_millis(self.calibration.debounce_ms),
            completion_grace: Duration::from_millis(self.calibration.completion_grace_ms),
            auto_calibrate: self.calibration.auto_start,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `TouchUp` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("TouchUp"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("touchup"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("TouchUp")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
