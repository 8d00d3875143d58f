//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.wxgem/config.json`) and environment.
//! Secrets (WeChat token, Gemini API key) may live in the file but env always wins.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const WECHAT_TOKEN_ENV: &str = "WECHAT_TOKEN";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WeChat official-account settings.
    #[serde(default)]
    pub wechat: WechatConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Canned reply texts.
    #[serde(default)]
    pub replies: RepliesConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 15152).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1"). Use "0.0.0.0" behind a reverse proxy or in a container.
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15152
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// WeChat webhook config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WechatConfig {
    /// Token entered in the official-account console. Overridden by WECHAT_TOKEN env.
    pub token: Option<String>,
    /// Route the webhook is mounted on (default "/wechat").
    #[serde(default = "default_wechat_path")]
    pub path: String,
    /// Also check signature/timestamp/nonce on message POSTs, not only on the GET handshake.
    #[serde(default)]
    pub verify_messages: bool,
}

fn default_wechat_path() -> String {
    "/wechat".to_string()
}

impl Default for WechatConfig {
    fn default() -> Self {
        Self {
            token: None,
            path: default_wechat_path(),
            verify_messages: false,
        }
    }
}

/// Gemini API config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    /// API key from Google AI Studio. Overridden by GEMINI_API_KEY env.
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Whole-request timeout for generateContent calls; 0 means no timeout.
    #[serde(default = "default_gemini_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_timeout_secs() -> u64 {
    30
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout_secs: default_gemini_timeout_secs(),
        }
    }
}

/// Fixed reply texts sent back through WeChat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepliesConfig {
    /// Sent for any message that is not plain text (images, voice, events, ...).
    #[serde(default = "default_unsupported_reply")]
    pub unsupported: String,
    /// Sent when the model answers without any usable text.
    #[serde(default = "default_fallback_reply")]
    pub fallback: String,
}

fn default_unsupported_reply() -> String {
    "Sorry, I can only read text messages for now.".to_string()
}

fn default_fallback_reply() -> String {
    "Sorry, I could not come up with a reply.".to_string()
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            unsupported: default_unsupported_reply(),
            fallback: default_fallback_reply(),
        }
    }
}

/// Secrets the gateway cannot start without.
#[derive(Clone)]
pub struct Secrets {
    pub wechat_token: String,
    pub gemini_api_key: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("wechat_token", &"<redacted>")
            .field("gemini_api_key", &"<redacted>")
            .finish()
    }
}

/// Pick a secret: a non-empty env value overrides a non-empty config value. Both are trimmed.
fn pick_secret(env_value: Option<String>, config_value: Option<&String>) -> Option<String> {
    env_value
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config_value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the WeChat token: env WECHAT_TOKEN overrides config.
pub fn resolve_wechat_token(config: &Config) -> Option<String> {
    pick_secret(
        std::env::var(WECHAT_TOKEN_ENV).ok(),
        config.wechat.token.as_ref(),
    )
}

/// Resolve the Gemini API key: env GEMINI_API_KEY overrides config.
pub fn resolve_gemini_api_key(config: &Config) -> Option<String> {
    pick_secret(
        std::env::var(GEMINI_API_KEY_ENV).ok(),
        config.gemini.api_key.as_ref(),
    )
}

/// Resolve both gateway secrets. Either one missing is fatal.
pub fn resolve_secrets(config: &Config) -> Result<Secrets> {
    let gemini_api_key = resolve_gemini_api_key(config).with_context(|| {
        format!(
            "Gemini API key not configured (set {} or gemini.apiKey)",
            GEMINI_API_KEY_ENV
        )
    })?;
    let wechat_token = resolve_wechat_token(config).with_context(|| {
        format!(
            "WeChat token not configured (set {} or wechat.token)",
            WECHAT_TOKEN_ENV
        )
    })?;
    Ok(Secrets {
        wechat_token,
        gemini_api_key,
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WXGEM_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".wxgem").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or WXGEM_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 15152);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.wechat.path, "/wechat");
        assert!(!config.wechat.verify_messages);
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.timeout_secs, 30);
        assert!(config.replies.unsupported.contains("text"));
    }

    #[test]
    fn camel_case_keys_are_read() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 8080, "bind": "0.0.0.0" },
                "wechat": { "token": "abc", "verifyMessages": true },
                "gemini": { "apiKey": "key", "model": "gemini-pro", "timeoutSecs": 5 },
                "replies": { "fallback": "..." }
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.wechat.token.as_deref(), Some("abc"));
        assert!(config.wechat.verify_messages);
        assert_eq!(config.gemini.api_key.as_deref(), Some("key"));
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(config.gemini.timeout_secs, 5);
        assert_eq!(config.replies.fallback, "...");
        assert_eq!(config.replies.unsupported, default_unsupported_reply());
    }

    #[test]
    fn env_secret_overrides_config() {
        let from_config = "config-token".to_string();
        assert_eq!(
            pick_secret(Some(" env-token ".to_string()), Some(&from_config)).as_deref(),
            Some("env-token")
        );
    }

    #[test]
    fn blank_env_secret_falls_back_to_config() {
        let from_config = " config-token ".to_string();
        assert_eq!(
            pick_secret(Some("   ".to_string()), Some(&from_config)).as_deref(),
            Some("config-token")
        );
    }

    #[test]
    fn blank_everywhere_is_none() {
        let blank = String::new();
        assert_eq!(pick_secret(None, Some(&blank)), None);
        assert_eq!(pick_secret(None, None), None);
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("wxgem-config-test-does-not-exist.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 15152);
    }

    #[test]
    fn secrets_debug_is_redacted() {
        let secrets = Secrets {
            wechat_token: "t0k3n".to_string(),
            gemini_api_key: "k3y".to_string(),
        };
        let shown = format!("{:?}", secrets);
        assert!(!shown.contains("t0k3n"));
        assert!(!shown.contains("k3y"));
    }
}
