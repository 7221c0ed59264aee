//! Solana Actions client: resolve an action URL, ask it for a transaction,
//! and sign/send what comes back.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use solana_agent_core::{submit_encoded, Agent, TxOutcome};
use tracing::info;
use url::Url;

const ACTION_SCHEME: &str = "solana-action:";

/// The action server's answer to a POST.
#[derive(Debug, Deserialize)]
pub struct ActionPostResponse {
    pub transaction: String,
    pub message: Option<String>,
}

/// Turn a blink, `solana-action:` URI or plain action URL into the action
/// endpoint, with `params` appended as query parameters.
pub fn action_url(raw: &str, params: &Map<String, Value>) -> Result<Url> {
    let raw = raw.trim();
    let raw = raw.strip_prefix(ACTION_SCHEME).unwrap_or(raw);
    let mut url = Url::parse(raw).with_context(|| format!("invalid action URL '{raw}'"))?;

    // Interstitial blink links carry the real endpoint in `?action=`.
    let nested = url
        .query_pairs()
        .find(|(key, value)| key == "action" && (value.starts_with(ACTION_SCHEME) || value.starts_with("http")))
        .map(|(_, value)| value.into_owned());
    if let Some(nested) = nested {
        let nested = nested.strip_prefix(ACTION_SCHEME).unwrap_or(&nested);
        url = Url::parse(nested).with_context(|| format!("invalid nested action URL '{nested}'"))?;
    }

    if !matches!(url.scheme(), "http" | "https") {
        bail!("unsupported action URL scheme '{}'", url.scheme());
    }

    if !params.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            query.append_pair(key, &value);
        }
    }
    Ok(url)
}

#[derive(Debug, Clone, Default)]
pub struct BlinksClient {
    http: reqwest::Client,
}

impl BlinksClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// POST the agent's account to the action and submit the transaction it
    /// returns.
    pub async fn execute(&self, agent: &Agent, url: &Url) -> Result<(ActionPostResponse, TxOutcome)> {
        let response = self
            .http
            .post(url.clone())
            .json(&json!({ "account": agent.pubkey().to_string() }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["message"].as_str().unwrap_or("action request rejected");
            bail!("action server returned {status}: {message}");
        }

        let reply: ActionPostResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("action server response has no transaction: {e}"))?;
        let outcome = submit_encoded(agent, &reply.transaction).await?;
        info!(action = %url, "blink executed");
        Ok((reply, outcome))
    }
}
