//! Dataset loading for the two parties
//!
//! - Party A: inline `identifiers` plus `identifiers_file`, one per line
//! - Party B: inline `values` plus `values_file`, `identifier,value` per line
//!
//! Blank lines and lines starting with `#` are skipped. In B's file the value
//! follows the last comma, so identifiers may themselves contain commas.

use std::fs;
use std::path::Path;

use super::config::{resolve_relative, PartyAConfig, PartyBConfig};

pub fn load_identifiers(
    config: &PartyAConfig,
    config_path: &Path,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut identifiers = config.identifiers.clone();

    if let Some(file) = &config.identifiers_file {
        let path = resolve_relative(config_path, file);
        let contents = fs::read_to_string(&path).map_err(|e| {
            format!("Failed to read identifiers file '{}': {}", path.display(), e)
        })?;
        identifiers.extend(data_lines(&contents).map(|(_, line)| line.to_string()));
    }

    if identifiers.is_empty() {
        return Err("[party_a] lists no identifiers".into());
    }
    Ok(identifiers)
}

pub fn load_values(
    config: &PartyBConfig,
    config_path: &Path,
) -> Result<Vec<(String, u64)>, Box<dyn std::error::Error>> {
    let mut values: Vec<(String, u64)> = config
        .values
        .iter()
        .map(|(id, value)| (id.clone(), *value))
        .collect();

    if let Some(file) = &config.values_file {
        let path = resolve_relative(config_path, file);
        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read values file '{}': {}", path.display(), e))?;

        for (number, line) in data_lines(&contents) {
            let (id, value) = line.rsplit_once(',').ok_or_else(|| {
                format!("{}:{}: expected 'identifier,value'", path.display(), number)
            })?;
            let value: u64 = value.trim().parse().map_err(|e| {
                format!("{}:{}: invalid value '{}': {}", path.display(), number, value.trim(), e)
            })?;
            values.push((id.trim().to_string(), value));
        }
    }

    if values.is_empty() {
        return Err("[party_b] lists no values".into());
    }
    Ok(values)
}

/// Non-empty, non-comment lines with their 1-based line numbers
fn data_lines(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_inline_identifiers() {
        let config = PartyAConfig {
            identifiers: vec!["apple".to_string(), "banana".to_string()],
            identifiers_file: None,
        };
        let ids = load_identifiers(&config, Path::new("config.toml")).unwrap();
        assert_eq!(ids, vec!["apple", "banana"]);
    }

    #[test]
    fn test_identifiers_file_relative_to_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("a.txt"),
            "# party A\napple\n\n  cherry  \n",
        )
        .unwrap();

        let config = PartyAConfig {
            identifiers: vec!["banana".to_string()],
            identifiers_file: Some(PathBuf::from("a.txt")),
        };
        let ids = load_identifiers(&config, &temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(ids, vec!["banana", "apple", "cherry"]);
    }

    #[test]
    fn test_empty_identifiers_rejected() {
        let result = load_identifiers(&PartyAConfig::default(), Path::new("config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_identifiers_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = PartyAConfig {
            identifiers: vec![],
            identifiers_file: Some(PathBuf::from("absent.txt")),
        };
        let err = load_identifiers(&config, &temp_dir.path().join("config.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.txt"));
    }

    #[test]
    fn test_values_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("b.csv"),
            "apple,100\n# comment\ncherry , 300\nsmith, john,7\n",
        )
        .unwrap();

        let config = PartyBConfig {
            values: Default::default(),
            values_file: Some(PathBuf::from("b.csv")),
        };
        let values = load_values(&config, &temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(
            values,
            vec![
                ("apple".to_string(), 100),
                ("cherry".to_string(), 300),
                ("smith, john".to_string(), 7),
            ]
        );
    }

    #[test]
    fn test_values_file_bad_line_reports_position() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.csv"), "apple,100\ncherry\n").unwrap();

        let config = PartyBConfig {
            values: Default::default(),
            values_file: Some(PathBuf::from("b.csv")),
        };
        let err = load_values(&config, &temp_dir.path().join("config.toml")).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }

    #[test]
    fn test_values_file_rejects_negative() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.csv"), "apple,-5\n").unwrap();

        let config = PartyBConfig {
            values: Default::default(),
            values_file: Some(PathBuf::from("b.csv")),
        };
        assert!(load_values(&config, &temp_dir.path().join("config.toml")).is_err());
    }

    #[test]
    fn test_empty_values_rejected() {
        let result = load_values(&PartyBConfig::default(), Path::new("config.toml"));
        assert!(result.is_err());
    }
}
