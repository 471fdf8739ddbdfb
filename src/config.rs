//! Sound bank configuration
//!
//! A sound bank is a JSON file listing which resource plays for which event,
//! plus a master volume:
//!
//! ```json
//! {
//!   "volume": 0.8,
//!   "sounds": [
//!     { "event": "move", "path": "move.ogg" },
//!     { "event": "check", "path": "check.ogg" }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the bank file when
//! it is loaded with [`SoundBank::load`].

use crate::{Result, SoundError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_volume() -> f32 {
    1.0
}

/// One event → resource binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundBinding {
    /// Event name the sound is bound to
    pub event: String,
    /// Audio resource path
    pub path: PathBuf,
}

impl SoundBinding {
    /// Path as a string, the form outputs are opened with.
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// A set of sound bindings with a master volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundBank {
    /// Master volume (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Bindings, registered in this order
    #[serde(default)]
    pub sounds: Vec<SoundBinding>,
}

impl Default for SoundBank {
    fn default() -> Self {
        SoundBank {
            volume: default_volume(),
            sounds: Vec::new(),
        }
    }
}

impl SoundBank {
    /// Empty bank at full volume.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding.
    pub fn with_sound(mut self, event: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.sounds.push(SoundBinding {
            event: event.into(),
            path: path.into(),
        });
        self
    }

    /// Set the master volume.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Parse and validate a bank from JSON text. Paths are kept as written.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let bank: SoundBank = serde_json::from_str(json)?;
        bank.validate()?;
        Ok(bank)
    }

    /// Load a bank file, resolving relative paths against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SoundError::Config(format!("Failed to read sound bank {}: {}", path.display(), e))
        })?;
        let mut bank = Self::from_json_str(&content)?;

        if let Some(base) = path.parent() {
            for binding in &mut bank.sounds {
                if binding.path.is_relative() {
                    binding.path = base.join(&binding.path);
                }
            }
        }

        tracing::info!(
            bank = %path.display(),
            sounds = bank.sounds.len(),
            "loaded sound bank"
        );
        Ok(bank)
    }

    /// Write the bank as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::debug!(bank = %path.display(), "saved sound bank");
        Ok(())
    }

    /// Check bindings and volume.
    ///
    /// Duplicate event names are allowed; the last one wins when registered.
    pub fn validate(&self) -> Result<()> {
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(SoundError::Config(format!(
                "volume must be a non-negative number, got {}",
                self.volume
            )));
        }
        for (index, binding) in self.sounds.iter().enumerate() {
            if binding.event.trim().is_empty() {
                return Err(SoundError::Config(format!(
                    "sound #{} has an empty event name",
                    index
                )));
            }
            if binding.path.as_os_str().is_empty() {
                return Err(SoundError::Config(format!(
                    "sound '{}' has an empty path",
                    binding.event
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_defaults_volume() {
        let bank = SoundBank::from_json_str(
            r#"{ "sounds": [ { "event": "move", "path": "move.ogg" } ] }"#,
        )
        .unwrap();
        assert_relative_eq!(bank.volume, 1.0);
        assert_eq!(bank.sounds.len(), 1);
        assert_eq!(bank.sounds[0].path_str(), "move.ogg");
    }

    #[test]
    fn test_rejects_empty_event_name() {
        let err = SoundBank::from_json_str(r#"{ "sounds": [ { "event": " ", "path": "x.ogg" } ] }"#)
            .unwrap_err();
        assert!(matches!(err, SoundError::Config(_)));
    }

    #[test]
    fn test_rejects_negative_volume() {
        let err = SoundBank::from_json_str(r#"{ "volume": -0.5 }"#).unwrap_err();
        assert!(matches!(err, SoundError::Config(_)));
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let err = SoundBank::from_json_str("{ sounds: ").unwrap_err();
        assert!(matches!(err, SoundError::Json(_)));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let bank_path = dir.path().join("bank.json");
        SoundBank::new()
            .with_volume(0.6)
            .with_sound("move", "move.ogg")
            .with_sound("victory", dir.path().join("abs/victory.ogg"))
            .save(&bank_path)
            .unwrap();

        let bank = SoundBank::load(&bank_path).unwrap();
        assert_relative_eq!(bank.volume, 0.6);
        assert_eq!(bank.sounds[0].path, dir.path().join("move.ogg"));
        assert_eq!(bank.sounds[1].path, dir.path().join("abs/victory.ogg"));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SoundBank::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SoundError::Config(_)));
    }
}
