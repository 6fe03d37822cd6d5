use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{ConfigError, SizeError};

pub const DEFAULT_CONFIG_PATH: &str = "fileforge.toml";
pub const DEFAULT_FILES_PER_DIR: u64 = 10_000;

const KB: i64 = 1024;
const MB: i64 = 1024 * KB;
const GB: i64 = 1024 * MB;

// ordered longest first so "GIGABYTES" wins over "BYTES" and "B"
const UNITS: [(&str, i64); 12] = [
    ("GIGABYTES", GB),
    ("MEGABYTES", MB),
    ("KILOBYTES", KB),
    ("GIGABYTE", GB),
    ("MEGABYTE", MB),
    ("KILOBYTE", KB),
    ("BYTES", 1),
    ("BYTE", 1),
    ("GB", GB),
    ("MB", MB),
    ("KB", KB),
    ("B", 1),
];

/// Defaults read from `fileforge.toml`. Every field is optional and command
/// line flags take precedence.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerationConfig {
    pub files_per_dir: Option<u64>,
    pub workers: Option<usize>,
    pub buffer_size: Option<String>,
    pub progress: Option<bool>,
}

impl Config {
    /// Loads the config at `path`. An explicit path must exist; without one the
    /// default `fileforge.toml` is read only if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        if !required && !path.is_file() {
            return Ok(Config::default());
        }

        let config_str = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&config_str).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_toml(config_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(config_str)
    }

    /// Buffer size override in bytes, if the file sets one.
    pub fn buffer_size(&self) -> Result<Option<i64>, ConfigError> {
        match &self.generation.buffer_size {
            Some(size) => {
                let bytes = parse_size(size)?;
                if bytes <= 0 {
                    return Err(ConfigError::NonPositiveSize(bytes));
                }
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }
}

/// Parses strings like `"1GB"`, `"1 gb"` or `"'512 Kilobytes'"` into bytes.
///
/// Units are binary (`1 KB = 1024 B`). The numeric part is a signed integer, so
/// `"-1 KB"` parses to `-1024`; callers reject non-positive sizes themselves.
///
/// # Examples
///
/// ```
/// # use fileforge::config::parse_size;
/// assert_eq!(parse_size("1 KB").unwrap(), 1024);
/// assert_eq!(parse_size("\"2 megabytes\"").unwrap(), 2 * 1024 * 1024);
/// assert!(parse_size("1024").is_err());
/// ```
pub fn parse_size(size_str: &str) -> Result<i64, SizeError> {
    let normalized = size_str
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .trim()
        .to_uppercase();

    let (value, multiplier) = UNITS
        .iter()
        .find_map(|(unit, multiplier)| {
            normalized
                .strip_suffix(*unit)
                .map(|value| (value.trim(), *multiplier))
        })
        .ok_or_else(|| SizeError::InvalidFormat(size_str.to_string()))?;

    let number: i64 = value.parse().map_err(|_| SizeError::InvalidNumber {
        input: size_str.to_string(),
        value: value.to_string(),
    })?;

    number
        .checked_mul(multiplier)
        .ok_or_else(|| SizeError::Overflow(size_str.to_string()))
}

/// Formats a byte count with binary units, e.g. `16.0 MB`.
pub fn human_readable_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("500MB").unwrap(), 500 * 1024 * 1024);
        assert_eq!(parse_size("1024B").unwrap(), 1024);
        assert_eq!(parse_size("1 KB").unwrap(), 1024);
    }

    #[test]
    fn test_parse_size_case_space_and_quotes() {
        for input in ["3kb", "3 Kb", " 3 KB ", "'3 KB'", "\"3KB\"", "3 kilobytes", "3 KILOBYTE"] {
            assert_eq!(parse_size(input).unwrap(), 3 * 1024, "input {:?}", input);
        }
    }

    #[test]
    fn test_parse_size_every_unit() {
        let cases = [
            ("7 B", 7),
            ("7 BYTE", 7),
            ("7 bytes", 7),
            ("7 megabyte", 7 * MB),
            ("7 Megabytes", 7 * MB),
            ("7 gigabyte", 7 * GB),
            ("7 GIGABYTES", 7 * GB),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_size(input).unwrap(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_parse_size_prefers_longest_suffix() {
        // "BYTES" and "B" both match, only the full unit leaves a number behind
        assert_eq!(parse_size("2GIGABYTES").unwrap(), 2 * GB);
        assert_eq!(parse_size("2 kilobytes").unwrap(), 2 * KB);
    }

    #[test]
    fn test_parse_size_without_unit_is_invalid_format() {
        for input in ["1024", "", "5 GiG", "12 T"] {
            assert!(
                matches!(parse_size(input), Err(SizeError::InvalidFormat(_))),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_size_bad_number() {
        assert!(matches!(
            parse_size("1.5 GB"),
            Err(SizeError::InvalidNumber { .. })
        ));
        assert!(matches!(parse_size("GB"), Err(SizeError::InvalidNumber { .. })));
        assert!(matches!(
            parse_size("ten MB"),
            Err(SizeError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_size_non_positive_passes_through() {
        assert_eq!(parse_size("0 KB").unwrap(), 0);
        assert_eq!(parse_size("-1 KB").unwrap(), -1024);
    }

    #[test]
    fn test_parse_size_overflow() {
        assert!(matches!(
            parse_size("9223372036854775807 GB"),
            Err(SizeError::Overflow(_))
        ));
    }

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(512), "512 B");
        assert_eq!(human_readable_size(1024), "1.0 KB");
        assert_eq!(human_readable_size(1536), "1.5 KB");
        assert_eq!(human_readable_size(16 * 1024 * 1024), "16.0 MB");
        assert_eq!(human_readable_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_config_from_toml() {
        let config = Config::from_toml(
            r#"
            [generation]
            files_per_dir = 500
            workers = 4
            buffer_size = "2 MB"
            progress = false
            "#,
        )
        .unwrap();

        assert_eq!(config.generation.files_per_dir, Some(500));
        assert_eq!(config.generation.workers, Some(4));
        assert_eq!(config.generation.progress, Some(false));
        assert_eq!(config.buffer_size().unwrap(), Some(2 * MB));
    }

    #[test]
    fn test_config_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert!(config.generation.workers.is_none());
        assert!(config.buffer_size().unwrap().is_none());
    }

    #[test]
    fn test_config_rejects_bad_buffer_size() {
        let config = Config::from_toml("[generation]\nbuffer_size = \"0 KB\"").unwrap();
        assert!(matches!(
            config.buffer_size(),
            Err(ConfigError::NonPositiveSize(0))
        ));
    }

    #[test]
    fn test_config_load_explicit_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_config_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fileforge.toml");
        fs::write(&path, "[generation]\nworkers = 3\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.generation.workers, Some(3));
    }

    #[test]
    fn test_config_load_reports_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[generation\nworkers = ").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
