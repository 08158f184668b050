//! Configuration management for cryptpack
//!
//! Configuration can come from a JSON file, from the environment, or both;
//! environment variables always win. The password pair stays here, in the
//! orchestration layer — the cipher receives it once, at construction, and
//! never reads the environment itself.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Secret;
use crate::error::{Error, Result};

/// Default source directory when none is configured
pub const DEFAULT_SOURCE_DIR: &str = "/app/data_to_archive";

/// Default first guess for decryption, tried before the deterministic
/// fallback. Cheap on purpose: a wrong guess at this count costs well under
/// a second of KDF work.
pub const DEFAULT_PREFERRED_ITERATIONS: u32 = 100_000;

/// Daily backup schedule (local time)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Hour of day, 0-23
    #[serde(default)]
    pub hour: u32,

    /// Minute, 0-59
    #[serde(default)]
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig { hour: 0, minute: 0 }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Primary encryption password. Empty means encryption is unavailable.
    #[serde(default)]
    pub password: String,

    /// Secondary password; non-empty switches iteration selection to
    /// deterministic mode
    #[serde(default)]
    pub iterations_password: String,

    /// Directory to archive
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Directory encrypted backups are written into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Label prefixed to backup filenames
    #[serde(default = "default_label")]
    pub label: String,

    /// First iteration-count guess used when decrypting
    #[serde(default = "default_preferred_iterations")]
    pub preferred_iterations: u32,

    /// Daily backup schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE_DIR)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_label() -> String {
    "backup".to_string()
}

fn default_preferred_iterations() -> u32 {
    DEFAULT_PREFERRED_ITERATIONS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            password: String::new(),
            iterations_password: String::new(),
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            label: default_label(),
            preferred_iterations: default_preferred_iterations(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, then apply environment
    /// variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Build configuration purely from the environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// The password pair this configuration carries.
    pub fn secret(&self) -> Secret {
        Secret::new(self.password.clone(), self.iterations_password.clone())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(password) = std::env::var("ENCRYPTION_PASSWORD") {
            self.password = password;
        }
        if let Ok(iterations_password) = std::env::var("ITERATIONS_PASSWORD") {
            self.iterations_password = iterations_password;
        }
        if let Ok(source) = std::env::var("FOLDER_TO_ARCHIVE") {
            self.source_dir = PathBuf::from(source);
        }
        if let Ok(output) = std::env::var("BACKUP_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(output);
        }
        if let Ok(label) = std::env::var("BACKUP_LABEL") {
            self.label = label;
        }
        if let Ok(preferred) = std::env::var("PREFERRED_ITERATIONS") {
            self.preferred_iterations = preferred
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PREFERRED_ITERATIONS: {}", preferred)))?;
        }
        if let Ok(hour) = std::env::var("BACKUP_HOUR") {
            self.schedule.hour = parse_schedule_field("BACKUP_HOUR", &hour, 23)?;
        }
        if let Ok(minute) = std::env::var("BACKUP_MINUTE") {
            self.schedule.minute = parse_schedule_field("BACKUP_MINUTE", &minute, 59)?;
        }
        Ok(())
    }
}

fn parse_schedule_field(name: &str, value: &str, max: u32) -> Result<u32> {
    let parsed: u32 = value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid {}: {}", name, value)))?;
    if parsed > max {
        return Err(Error::Config(format!(
            "Invalid {}: {} (must be <= {})",
            name, parsed, max
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.password.is_empty());
        assert_eq!(config.source_dir, PathBuf::from(DEFAULT_SOURCE_DIR));
        assert_eq!(config.label, "backup");
        assert_eq!(config.preferred_iterations, DEFAULT_PREFERRED_ITERATIONS);
        assert_eq!(config.schedule.hour, 0);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"password": "hunter2", "label": "homelab", "schedule": {"hour": 3}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.label, "homelab");
        assert_eq!(config.schedule.hour, 3);
        assert_eq!(config.schedule.minute, 0);
        // Unspecified fields fall back to defaults
        assert_eq!(config.preferred_iterations, DEFAULT_PREFERRED_ITERATIONS);
    }

    #[test]
    fn test_invalid_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_schedule_field_bounds() {
        assert_eq!(parse_schedule_field("BACKUP_HOUR", "23", 23).unwrap(), 23);
        assert!(parse_schedule_field("BACKUP_HOUR", "24", 23).is_err());
        assert!(parse_schedule_field("BACKUP_MINUTE", "x", 59).is_err());
    }

    #[test]
    fn test_secret_reflects_passwords() {
        let config = Config {
            password: "hunter2".to_string(),
            iterations_password: "second".to_string(),
            ..Config::default()
        };
        let secret = config.secret();
        assert!(secret.is_configured());
        assert!(secret.deterministic());
    }
}
