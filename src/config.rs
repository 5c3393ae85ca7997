use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub line: LineConfig,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub beacon: Option<BeaconConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LineConfig {
    #[serde(default)]
    pub channel_secret: String,
    #[serde(default)]
    pub channel_token: String,
    /// The only group whose messages are persisted, and the push target
    /// for voice messages.
    #[serde(default)]
    pub group_id: String,
    #[serde(default = "default_line_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FirebaseConfig {
    #[serde(default)]
    pub base_url: String,
    /// Database secret, sent as the `auth` query parameter. Empty disables it.
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_firebase_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BeaconConfig {
    pub hwid: String,
    #[serde(default = "default_beacon_greeting")]
    pub greeting: String,
}

fn default_line_api_base_url() -> String {
    "https://api.line.me".to_string()
}

fn default_firebase_path() -> String {
    "linebot/receive".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_beacon_greeting() -> String {
    "ただいま帰りました".to_string()
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: String::new(),
            channel_token: String::new(),
            group_id: String::new(),
            api_base_url: default_line_api_base_url(),
        }
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            secret: String::new(),
            path: default_firebase_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Config {
    /// Load the config file (if present), apply environment overrides and
    /// validate the result.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::parse("")?
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML configuration")
    }

    /// Overlay values from `lookup` (the process environment in production).
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("LINE_CHANNEL_SECRET") {
            self.line.channel_secret = v;
        }
        if let Some(v) = get("LINE_CHANNEL_TOKEN") {
            self.line.channel_token = v;
        }
        if let Some(v) = get("LINE_GROUP_ID") {
            self.line.group_id = v;
        }
        if let Some(v) = get("LINE_API_BASE_URL") {
            self.line.api_base_url = v;
        }
        if let Some(v) = get("FIREBASE_BASE_URL") {
            self.firebase.base_url = v;
        }
        if let Some(v) = get("FIREBASE_SECRET") {
            self.firebase.secret = v;
        }
        if let Some(v) = get("FIREBASE_PATH") {
            self.firebase.path = v;
        }
        if let Some(hwid) = get("LINE_BEACON_HWID") {
            match self.beacon.as_mut() {
                Some(beacon) => beacon.hwid = hwid,
                None => {
                    self.beacon = Some(BeaconConfig {
                        hwid,
                        greeting: default_beacon_greeting(),
                    })
                }
            }
        }
        // App Engine style: PORT wins over an explicit bind address.
        if let Some(addr) = get("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(port) = get("PORT") {
            self.server.bind_addr = format!("0.0.0.0:{}", port);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("line.channel_secret", &self.line.channel_secret),
            ("line.channel_token", &self.line.channel_token),
            ("line.group_id", &self.line.group_id),
            ("firebase.base_url", &self.firebase.base_url),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            anyhow::bail!("Missing required configuration: {}", missing.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FULL: &str = r#"
[line]
channel_secret = "secret"
channel_token = "token"
group_id = "C123"

[firebase]
base_url = "https://example.firebaseio.com"
secret = "db-secret"
"#;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_applies_defaults() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.line.api_base_url, "https://api.line.me");
        assert_eq!(config.firebase.path, "linebot/receive");
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert!(config.beacon.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_config_fails_validation() {
        let config = Config::parse("").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("line.channel_secret"));
        assert!(err.contains("line.group_id"));
        assert!(err.contains("firebase.base_url"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::parse(FULL).unwrap();
        let vars = env(&[
            ("LINE_GROUP_ID", "C999"),
            ("FIREBASE_SECRET", ""),
            ("PORT", "9000"),
        ]);
        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.line.group_id, "C999");
        // Empty values do not clobber the file.
        assert_eq!(config.firebase.secret, "db-secret");
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_env_only_configuration() {
        let mut config = Config::parse("").unwrap();
        let vars = env(&[
            ("LINE_CHANNEL_SECRET", "s"),
            ("LINE_CHANNEL_TOKEN", "t"),
            ("LINE_GROUP_ID", "G"),
            ("FIREBASE_BASE_URL", "https://db.example"),
        ]);
        config.apply_overrides(|k| vars.get(k).cloned());
        config.validate().unwrap();
    }

    #[test]
    fn test_beacon_hwid_from_env_uses_default_greeting() {
        let mut config = Config::parse(FULL).unwrap();
        let vars = env(&[("LINE_BEACON_HWID", "abc123")]);
        config.apply_overrides(|k| vars.get(k).cloned());

        let beacon = config.beacon.unwrap();
        assert_eq!(beacon.hwid, "abc123");
        assert_eq!(beacon.greeting, "ただいま帰りました");
    }

    #[test]
    fn test_load_missing_file_falls_back_to_environment() {
        let path = Path::new("/nonexistent/homeline/config.toml");
        // Nothing in the test environment sets the LINE variables, so
        // validation reports them.
        if std::env::var("LINE_CHANNEL_SECRET").is_err() {
            assert!(Config::load(path).is_err());
        }
    }
}
