//! Initialize the configuration directory: create ~/.wxgem and a default config.json.
//!
//! The template lives in `crates/lib/config/config.json`. Secrets are deliberately absent from it;
//! they come from WECHAT_TOKEN / GEMINI_API_KEY or are added to the file by hand.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

static DEFAULT_CONFIG: &str = include_str!("../config/config.json");

/// Create the config directory and write the default `config.json` if it does not exist.
/// An existing file is left untouched. Returns the config directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, DEFAULT_CONFIG)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!(
            "config already exists at {}, skipping",
            config_path.display()
        );
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config, Config};

    #[test]
    fn template_parses_as_config() {
        let config: Config = serde_json::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = Config::default();
        assert_eq!(config.gateway.port, defaults.gateway.port);
        assert_eq!(config.wechat.path, defaults.wechat.path);
        assert_eq!(config.gemini.model, defaults.gemini.model);
        assert_eq!(config.replies.fallback, defaults.replies.fallback);
        assert!(config.wechat.token.is_none());
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn init_writes_once_and_keeps_existing_file() {
        let dir = std::env::temp_dir().join(format!("wxgem-init-test-{}", std::process::id()));
        let path = dir.join("nested").join("config.json");
        let _ = std::fs::remove_dir_all(&dir);

        let made = init_config_dir(&path).unwrap();
        assert_eq!(made, dir.join("nested"));
        let (config, _) = load_config(Some(path.clone())).unwrap();
        assert_eq!(config.gateway.port, 15152);

        std::fs::write(&path, r#"{"gateway":{"port":9000}}"#).unwrap();
        init_config_dir(&path).unwrap();
        let (config, _) = load_config(Some(path)).unwrap();
        assert_eq!(config.gateway.port, 9000);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
