//! Gesture settings persisted as TOML.
//!
//! Every field has a default, so a settings file only needs the values it
//! changes:
//!
//! ```
//! use tessera::settings::GestureSettings;
//!
//! let settings = GestureSettings::from_toml_str(
//!     r#"
//!     [long_press]
//!     delay_factor = 2.0
//!     "#,
//! )
//! .unwrap();
//!
//! let recognizer = settings.long_press_controller().unwrap();
//! assert_eq!(recognizer.delay_factor(), 2.0);
//! assert_eq!(recognizer.movement_threshold(), 20.0);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_core::logging::targets;

use crate::controller::{LongPressConfig, LongPressController};
use crate::error::{ConfigError, ConfigResult};

/// Settings for the gesture recognizers in this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    /// Long-press recognition.
    pub long_press: LongPressConfig,
}

impl GestureSettings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize the settings as TOML text.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load and validate settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&text)?;
        tracing::debug!(target: targets::SETTINGS, path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }

    /// Write the settings to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(target: targets::SETTINGS, path = %path.display(), "saved settings");
        Ok(())
    }

    /// Check every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.long_press.validate()
    }

    /// Build a long-press recognizer from these settings.
    pub fn long_press_controller(&self) -> ConfigResult<LongPressController> {
        LongPressController::with_config(self.long_press)
    }
}
