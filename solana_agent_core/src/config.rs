//! Agent configuration.
//!
//! Recognized keys map to typed fields; anything else lands in `extra` and is
//! still reachable through [`AgentConfig::get`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Keys read by [`AgentConfig::from_env`].
pub const KNOWN_KEYS: &[&str] = &[
    "OPENAI_API_KEY",
    "HELIUS_API_KEY",
    "COINGECKO_PRO_API_KEY",
    "COINGECKO_DEMO_API_KEY",
    "JUPITER_REFERRAL_ACCOUNT",
    "JUPITER_FEE_BPS",
    "FLEXLEND_API_KEY",
    "SIGN_ONLY",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct AgentConfig {
    pub openai_api_key: Option<String>,
    pub helius_api_key: Option<String>,
    pub coingecko_pro_api_key: Option<String>,
    pub coingecko_demo_api_key: Option<String>,
    pub jupiter_referral_account: Option<String>,
    pub jupiter_fee_bps: Option<u16>,
    pub flexlend_api_key: Option<String>,
    /// Return signed transactions instead of submitting them.
    pub sign_only: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl AgentConfig {
    /// Load `.env` (if present) and read the recognized keys from the
    /// process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the recognized keys through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        for key in KNOWN_KEYS {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                config.set(key, value);
            }
        }
        config
    }

    /// Builder-style setter for any key.
    pub fn with_option(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value.into());
        self
    }

    fn set(&mut self, key: &str, value: String) {
        match key {
            "OPENAI_API_KEY" => self.openai_api_key = Some(value),
            "HELIUS_API_KEY" => self.helius_api_key = Some(value),
            "COINGECKO_PRO_API_KEY" => self.coingecko_pro_api_key = Some(value),
            "COINGECKO_DEMO_API_KEY" => self.coingecko_demo_api_key = Some(value),
            "JUPITER_REFERRAL_ACCOUNT" => self.jupiter_referral_account = Some(value),
            "JUPITER_FEE_BPS" => match value.trim().parse() {
                Ok(bps) => self.jupiter_fee_bps = Some(bps),
                Err(_) => warn!(value = %value, "ignoring JUPITER_FEE_BPS, not a basis point count"),
            },
            "FLEXLEND_API_KEY" => self.flexlend_api_key = Some(value),
            "SIGN_ONLY" => {
                self.sign_only = matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
            }
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
    }

    /// Any configured option by key, recognized or extra.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "OPENAI_API_KEY" => self.openai_api_key.clone(),
            "HELIUS_API_KEY" => self.helius_api_key.clone(),
            "COINGECKO_PRO_API_KEY" => self.coingecko_pro_api_key.clone(),
            "COINGECKO_DEMO_API_KEY" => self.coingecko_demo_api_key.clone(),
            "JUPITER_REFERRAL_ACCOUNT" => self.jupiter_referral_account.clone(),
            "JUPITER_FEE_BPS" => self.jupiter_fee_bps.map(|bps| bps.to_string()),
            "FLEXLEND_API_KEY" => self.flexlend_api_key.clone(),
            "SIGN_ONLY" => Some(self.sign_only.to_string()),
            _ => self.extra.get(key).cloned(),
        }
    }
}

/// A non-fatal problem noticed while registering plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    pub plugin: String,
    pub key: String,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.plugin, self.key, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_reads_known_keys_only() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("SIGN_ONLY", "true"),
            ("JUPITER_FEE_BPS", "50"),
            ("HELIUS_API_KEY", "  "),
            ("UNRELATED", "x"),
        ]);
        let config = AgentConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert!(config.sign_only);
        assert_eq!(config.jupiter_fee_bps, Some(50));
        assert_eq!(config.helius_api_key, None);
        assert!(config.extra.is_empty());
    }

    #[test]
    fn bad_fee_bps_is_ignored() {
        let config = AgentConfig::default().with_option("JUPITER_FEE_BPS", "lots");
        assert_eq!(config.jupiter_fee_bps, None);
    }

    #[test]
    fn get_covers_typed_and_extra_keys() {
        let config = AgentConfig::default()
            .with_option("OPENAI_API_KEY", "sk")
            .with_option("ELFA_AI_API_KEY", "elfa");
        assert_eq!(config.get("OPENAI_API_KEY").as_deref(), Some("sk"));
        assert_eq!(config.get("ELFA_AI_API_KEY").as_deref(), Some("elfa"));
        assert_eq!(config.get("SIGN_ONLY").as_deref(), Some("false"));
        assert_eq!(config.get("MISSING"), None);
    }

    #[test]
    fn deserializes_screaming_snake_case() {
        let config: AgentConfig = serde_json::from_value(serde_json::json!({
            "OPENAI_API_KEY": "sk",
            "SIGN_ONLY": true,
            "CUSTOM": "value",
        }))
        .unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk"));
        assert!(config.sign_only);
        assert_eq!(config.extra.get("CUSTOM").map(String::as_str), Some("value"));
    }
}
