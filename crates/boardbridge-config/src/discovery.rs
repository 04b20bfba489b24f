//! Data directory discovery and config file loading.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::types::FileConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "BOARDBRIDGE_HOME";

/// Directory name under the user's home directory.
const APP_DIR: &str = ".boardbridge";

/// Optional config file inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// OAuth token document inside the data directory.
pub const TOKEN_FILE: &str = "oauth-tokens.json";

/// Rate-limit state document inside the data directory.
pub const RATE_LIMIT_FILE: &str = "rate-limit-state.json";

/// Resolve the data directory.
///
/// Resolution order:
/// 1. `BOARDBRIDGE_HOME`
/// 2. `~/.boardbridge`
pub fn data_dir(lookup: &impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = lookup(DATA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(APP_DIR))
        .ok_or(ConfigError::NoDataDir)
}

/// Load the optional TOML config file.
///
/// A missing file is not an error.
pub fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: FileConfig = toml::from_str(&content)?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_data_dir_env_override() {
        let lookup = |key: &str| (key == DATA_DIR_ENV).then(|| "/tmp/bb-home".to_string());
        assert_eq!(data_dir(&lookup).unwrap(), PathBuf::from("/tmp/bb-home"));
    }

    #[test]
    fn test_data_dir_ignores_empty_override() {
        let lookup = |key: &str| (key == DATA_DIR_ENV).then(|| "  ".to_string());
        let dir = data_dir(&lookup);
        if let Ok(dir) = dir {
            assert!(dir.ends_with(APP_DIR));
        }
    }

    #[test]
    fn test_missing_config_file_is_none() {
        let temp = tempdir().unwrap();
        let loaded = load_file_config(&temp.path().join(CONFIG_FILE)).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_config_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
[oauth]
client_id = "from-file"

[rate_limit]
user_requests_per_second = 4
"#,
        )
        .unwrap();

        let loaded = load_file_config(&path).unwrap().unwrap();
        assert_eq!(loaded.oauth.client_id.as_deref(), Some("from-file"));
        assert_eq!(loaded.rate_limit.user_requests_per_second, Some(4));
        assert!(loaded.api.base_url.is_none());
    }

    #[test]
    fn test_malformed_config_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(&path, "[oauth\nclient_id = ").unwrap();
        assert!(matches!(load_file_config(&path), Err(ConfigError::Parse(_))));
    }
}
