/// User settings for the LUT panel
///
/// Stored as JSON in the user's config directory:
/// - Linux: ~/.config/lut-panel/settings.json
/// - macOS: ~/Library/Application Support/lut-panel/settings.json
/// - Windows: %APPDATA%\lut-panel\settings.json

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LutError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// File extensions (lower-case, no dot) shown in the LUT tree.
    /// Only filters the tree; how a file is decoded is decided by its extension alone.
    pub lut_extensions: Vec<String>,

    /// Show entries whose name starts with '.'
    pub show_hidden: bool,

    /// Log level for this crate ("error", "warn", "info", "debug", "trace")
    pub log_level: String,

    /// Re-scan the folders saved in the catalog on startup
    pub restore_folders: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lut_extensions: ["cube", "3dl", "png", "tif", "tiff"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            show_hidden: false,
            log_level: "info".to_string(),
            restore_folders: true,
        }
    }
}

impl Settings {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether a file with this extension belongs in the tree
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.lut_extensions.iter().any(|accepted| accepted.eq_ignore_ascii_case(&ext))
    }

    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("lut-panel");
        path.push("settings.json");
        Some(path)
    }

    /// Load settings from `path`
    ///
    /// A missing file gives the defaults. A malformed file is reported as
    /// `LutError::Config` so the caller can log it and fall back.
    pub fn load_from(path: &Path) -> Result<Self, LutError> {
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json)
                .map_err(|e| LutError::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(LutError::Config(format!("{}: {}", path.display(), e))),
        }
    }

    /// Load from the default location, never failing
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("⚠️  {}, using default settings", e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), LutError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LutError::Config(e.to_string()))?;
        }
        let json = self.to_json().map_err(|e| LutError::Config(e.to_string()))?;
        fs::write(path, json).map_err(|e| LutError::Config(e.to_string()))?;
        info!("💾 Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_accept_original_lut_formats() {
        let settings = Settings::default();
        for ext in ["cube", "3DL", "png", "TIFF", "tif"] {
            assert!(settings.accepts_extension(ext), "{ext} should be accepted");
        }
        assert!(!settings.accepts_extension("jpg"));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings = Settings::from_json(r#"{ "show_hidden": true }"#).unwrap();
        assert!(settings.show_hidden);
        assert_eq!(settings.lut_extensions, Settings::default().lut_extensions);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(LutError::Config(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.lut_extensions = vec!["cube".into()];
        settings.restore_folders = false;
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }
}
