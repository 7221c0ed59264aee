use anyhow::{bail, ensure, Result};
use serde_json::{Map, Value};
use solana_agent_core::AgentConfig;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub sns: String,
    pub coingecko: String,
    pub coingecko_pro: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sns: "https://sns-sdk-proxy.bonfida.workers.dev".to_string(),
            coingecko: "https://api.coingecko.com/api/v3".to_string(),
            coingecko_pro: "https://pro-api.coingecko.com/api/v3".to_string(),
        }
    }
}

impl Endpoints {
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            sns: base.to_string(),
            coingecko: base.to_string(),
            coingecko_pro: format!("{base}/pro"),
        }
    }
}

/// Which CoinGecko tier a request goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoingeckoAccess {
    Pro(String),
    Demo(String),
    Public,
}

impl CoingeckoAccess {
    /// Pro wins over demo; with neither key the public endpoint is used.
    pub fn from_config(config: &AgentConfig) -> Self {
        let non_empty = |key: &Option<String>| key.clone().filter(|k| !k.is_empty());
        if let Some(key) = non_empty(&config.coingecko_pro_api_key) {
            CoingeckoAccess::Pro(key)
        } else if let Some(key) = non_empty(&config.coingecko_demo_api_key) {
            CoingeckoAccess::Demo(key)
        } else {
            CoingeckoAccess::Public
        }
    }
}

/// Strip a trailing `.sol`; the proxy wants the bare name.
pub fn bare_domain(domain: &str) -> &str {
    let domain = domain.trim();
    domain.strip_suffix(".sol").unwrap_or(domain)
}

#[derive(Debug, Clone, Default)]
pub struct MiscApi {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl MiscApi {
    pub fn new(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    async fn sns(&self, route: &str, arg: &str) -> Result<Option<Value>> {
        let url = format!("{}/{route}/{}", self.endpoints.sns, urlencoding::encode(arg));
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            bail!("SNS proxy returned {}", response.status());
        }
        let data: Value = response.json().await?;
        match data.get("s").and_then(Value::as_str) {
            Some("ok") => Ok(data.get("result").cloned().filter(|r| !r.is_null())),
            _ => {
                debug!(route, arg, response = %data, "sns lookup returned no result");
                Ok(None)
            }
        }
    }

    /// Owner of a `.sol` domain, if it is registered.
    pub async fn resolve_domain(&self, domain: &str) -> Result<Option<Pubkey>> {
        let name = bare_domain(domain);
        ensure!(!name.is_empty(), "domain name is empty");
        match self.sns("resolve", name).await? {
            Some(Value::String(owner)) => Ok(Some(owner.parse()?)),
            Some(other) => bail!("unexpected SNS response: {other}"),
            None => Ok(None),
        }
    }

    /// Primary (favourite) domain of `owner`, with the `.sol` suffix.
    pub async fn primary_domain(&self, owner: &Pubkey) -> Result<Option<String>> {
        let result = self.sns("favorite-domain", &owner.to_string()).await?;
        let name = match &result {
            Some(Value::String(name)) => Some(name.as_str()),
            Some(Value::Object(fields)) => fields.get("reverse").and_then(Value::as_str),
            _ => None,
        };
        Ok(name.map(|name| format!("{}.sol", bare_domain(name))))
    }

    /// USD prices of SPL tokens by mint, keyed exactly as requested.
    pub async fn token_prices(&self, access: &CoingeckoAccess, mints: &[String]) -> Result<Map<String, Value>> {
        ensure!(!mints.is_empty(), "at least one token address is required");

        let base = match access {
            CoingeckoAccess::Pro(_) => &self.endpoints.coingecko_pro,
            _ => &self.endpoints.coingecko,
        };
        let mut request = self
            .http
            .get(format!("{base}/simple/token_price/solana"))
            .query(&[("contract_addresses", mints.join(",")), ("vs_currencies", "usd".to_string())]);
        request = match access {
            CoingeckoAccess::Pro(key) => request.header("x-cg-pro-api-key", key),
            CoingeckoAccess::Demo(key) => request.header("x-cg-demo-api-key", key),
            CoingeckoAccess::Public => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("CoinGecko returned {status}");
        }
        let data: Map<String, Value> = response.json().await?;

        // CoinGecko may echo addresses lowercased.
        let mut prices = Map::new();
        for mint in mints {
            let price = data
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(mint))
                .and_then(|(_, entry)| entry.get("usd"))
                .cloned()
                .unwrap_or(Value::Null);
            prices.insert(mint.clone(), price);
        }
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_suffix_is_optional() {
        assert_eq!(bare_domain("toly.sol"), "toly");
        assert_eq!(bare_domain(" toly "), "toly");
        assert_eq!(bare_domain("sol"), "sol");
    }

    #[test]
    fn pro_key_beats_demo_key() {
        let both = AgentConfig::default()
            .with_option("COINGECKO_PRO_API_KEY", "pro")
            .with_option("COINGECKO_DEMO_API_KEY", "demo");
        assert_eq!(CoingeckoAccess::from_config(&both), CoingeckoAccess::Pro("pro".into()));

        let demo = AgentConfig::default().with_option("COINGECKO_DEMO_API_KEY", "demo");
        assert_eq!(CoingeckoAccess::from_config(&demo), CoingeckoAccess::Demo("demo".into()));

        let empty = AgentConfig::default().with_option("COINGECKO_PRO_API_KEY", "");
        assert_eq!(CoingeckoAccess::from_config(&empty), CoingeckoAccess::Public);
    }
}
