//! Configuration types for the gallery renamer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default target name pattern, a chrono strftime string
pub const DEFAULT_NAME_FORMAT: &str = "%Y-%m-%d_%H.%M.%S";

/// Configuration for the gallery renamer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory (or single file) to rename
    pub source: Option<PathBuf>,

    /// Dry run mode - report renames without touching the disk
    pub dry_run: bool,

    /// How long a renamed item stays visible before it leaves the list
    pub done_display_delay_ms: u64,

    /// chrono format string used to build new file stems
    pub name_format: String,

    /// Use the file modification time when no capture time is found
    pub mtime_fallback: bool,

    /// Number of threads for metadata reading (0 = auto)
    pub threads: usize,

    /// Verbose output
    pub verbose: bool,

    /// Extensions treated as images, lowercase without the dot
    pub image_extensions: Vec<String>,

    /// Extensions treated as videos, lowercase without the dot
    pub video_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            dry_run: false,
            done_display_delay_ms: 1000,
            name_format: DEFAULT_NAME_FORMAT.to_string(),
            mtime_fallback: false,
            threads: 0, // Auto-detect
            verbose: false,
            image_extensions: [
                "bmp", "cr2", "cr3", "dng", "heic", "jpeg", "jpg", "nef", "png", "raf", "raw",
                "rw2", "svg", "tif", "tiff", "webp",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            video_extensions: ["avi", "m4v", "mov", "mp4", "mpg"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Config {
    /// Check if a file extension is a supported image format
    pub fn is_image(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.image_extensions.iter().any(|e| e == &ext_lower)
    }

    /// Check if a file extension is a supported video format
    pub fn is_video(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.video_extensions.iter().any(|e| e == &ext_lower)
    }

    pub fn done_display_delay(&self) -> Duration {
        Duration::from_millis(self.done_display_delay_ms)
    }

    /// Reject values that would make every rename fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        use chrono::format::{Item, StrftimeItems};

        if self.name_format.trim().is_empty() {
            return Err(ConfigError::InvalidNameFormat {
                format: self.name_format.clone(),
                reason: "empty".to_string(),
            });
        }
        if StrftimeItems::new(&self.name_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidNameFormat {
                format: self.name_format.clone(),
                reason: "unknown format specifier".to_string(),
            });
        }
        if self.name_format.contains(['/', '\\']) {
            return Err(ConfigError::InvalidNameFormat {
                format: self.name_format.clone(),
                reason: "path separators are not allowed".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Gallery Renamer Configuration File
# This file uses TOML format (https://toml.io)

# Directory to rename (can also be given on the command line)
# source = "D:/Photos/2024"

# Dry run mode - show what would be renamed without touching any file
dry_run = false

# How long (milliseconds) a renamed item stays in the list
done_display_delay_ms = 1000

# New file name pattern (chrono strftime syntax, no path separators)
# Default gives 2024-01-15_14.30.00.jpg
name_format = "%Y-%m-%d_%H.%M.%S"

# Use the file modification time when neither EXIF nor the file name
# carries a capture time
mtime_fallback = false

# Number of threads for metadata reading (0 = auto-detect)
threads = 0

# Verbose output
verbose = false

# Supported file extensions (customize as needed)
image_extensions = ["bmp", "cr2", "cr3", "dng", "heic", "jpeg", "jpg", "nef", "png", "raf", "raw", "rw2", "svg", "tif", "tiff", "webp"]
video_extensions = ["avi", "m4v", "mov", "mp4", "mpg"]
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
    /// Name format cannot produce a file stem
    InvalidNameFormat { format: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
            ConfigError::InvalidNameFormat { format, reason } => {
                write!(f, "Invalid name format '{}': {}", format, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
            ConfigError::InvalidNameFormat { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.dry_run);
        assert_eq!(config.done_display_delay(), Duration::from_secs(1));
        assert_eq!(config.name_format, DEFAULT_NAME_FORMAT);
        assert!(config.is_image("JPG"));
        assert!(config.is_image("cr3"));
        assert!(config.is_video("MOV"));
        assert!(!config.is_video("xmp"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_config_parses_to_defaults() {
        let config: Config = toml::from_str(&Config::sample_config()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("renamer.toml");

        let config = Config {
            source: Some(PathBuf::from("/photos")),
            dry_run: true,
            threads: 4,
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("dry_run = true").unwrap();
        assert!(config.dry_run);
        assert_eq!(config.done_display_delay_ms, 1000);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::load_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_formats() {
        for format in ["", "%Y/%m", "%Q"] {
            let config = Config {
                name_format: format.to_string(),
                ..Config::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidNameFormat { .. })),
                "{format:?} should be rejected"
            );
        }
    }
}
