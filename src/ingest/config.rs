// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::classify::BucketRule;
use crate::ingest::types::FeedSubscription;

const ENV_PATH: &str = "CURATOR_CONFIG_PATH";

/// User-editable pipeline config: subscribed source URLs plus the keyword
/// bucket rules applied at ingest time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CuratorConfig {
    #[serde(default)]
    pub subscriptions: Vec<FeedSubscription>,
    #[serde(default)]
    pub rules: Vec<BucketRule>,
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<CuratorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading curator config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $CURATOR_CONFIG_PATH
/// 2) config/curator.toml
/// 3) config/curator.json
/// Missing files mean an empty config, not an error.
pub fn load_config_default() -> Result<CuratorConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("CURATOR_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/curator.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/curator.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(CuratorConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<CuratorConfig> {
    // Try TOML first if hinted or content looks like it.
    let try_toml = hint_ext == "toml" || s.contains("[[subscriptions]]");
    if try_toml {
        if let Ok(v) = toml::from_str::<CuratorConfig>(s) {
            return Ok(clean(v));
        }
    }
    if let Ok(v) = serde_json::from_str::<CuratorConfig>(s) {
        return Ok(clean(v));
    }
    if !try_toml {
        if let Ok(v) = toml::from_str::<CuratorConfig>(s) {
            return Ok(clean(v));
        }
    }
    Err(anyhow!("unsupported curator config format"))
}

/// Trim URLs and drop empty subscriptions/rules.
fn clean(mut cfg: CuratorConfig) -> CuratorConfig {
    cfg.subscriptions.retain_mut(|s| {
        s.url = s.url.trim().to_string();
        !s.url.is_empty()
    });
    cfg.rules.retain_mut(|r| {
        r.keywords.retain(|k| !k.trim().is_empty());
        !r.name.trim().is_empty() && !r.keywords.is_empty()
    });
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    const TOML_CFG: &str = r#"
[[subscriptions]]
url = " https://www.theguardian.com/environment "
name = "Guardian env desk"

[[subscriptions]]
url = ""

[[rules]]
name = "Forests"
keywords = ["tree", "", "canopy"]

[[rules]]
name = ""
keywords = ["orphaned"]
"#;

    #[test]
    fn toml_and_json_both_parse_and_clean() {
        let cfg = parse_config(TOML_CFG, "toml").unwrap();
        assert_eq!(cfg.subscriptions.len(), 1);
        assert_eq!(cfg.subscriptions[0].url, "https://www.theguardian.com/environment");
        assert!(cfg.subscriptions[0].active);
        assert_eq!(cfg.rules.len(), 1);
        assert_eq!(cfg.rules[0].keywords, vec!["tree", "canopy"]);

        let json = r#"{
            "subscriptions": [{"url": "https://example.org/rss", "active": false}],
            "rules": []
        }"#;
        let cfg = parse_config(json, "json").unwrap();
        assert_eq!(cfg.subscriptions.len(), 1);
        assert!(!cfg.subscriptions[0].active);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_config("not a config {", "toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD in a temp dir so a real config/ in the repo can't
        // interfere.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);

        // No files in temp CWD -> empty config.
        let cfg = load_config_default().unwrap();
        assert!(cfg.subscriptions.is_empty());

        // Env var takes precedence.
        let p_json = tmp.path().join("curator.json");
        fs::write(
            &p_json,
            r#"{"subscriptions": [{"url": "https://x.test/rss"}]}"#,
        )
        .unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        let cfg = load_config_default().unwrap();
        assert_eq!(cfg.subscriptions[0].url, "https://x.test/rss");
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
