use anyhow::{anyhow, bail, ensure, Result};
use serde_json::{json, Value};
use solana_agent_core::Agent;

pub const IMAGE_SIZES: &[&str] = &["256x256", "512x512", "1024x1024"];
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";
const IMAGE_MODEL: &str = "dall-e-3";

#[derive(Debug, Clone)]
pub struct NftApi {
    http: reqwest::Client,
    openai_url: String,
}

impl Default for NftApi {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), "https://api.openai.com/v1")
    }
}

impl NftApi {
    pub fn new(http: reqwest::Client, openai_url: &str) -> Self {
        Self {
            http,
            openai_url: openai_url.trim_end_matches('/').to_string(),
        }
    }

    /// `getAsset` from the DAS API served by the agent's RPC endpoint.
    pub async fn get_asset(&self, agent: &Agent, asset_id: &str) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": "get-asset",
            "method": "getAsset",
            "params": { "id": asset_id },
        });

        let data: Value = self
            .http
            .post(agent.chain().url())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = data.get("error") {
            let message = error["message"].as_str().unwrap_or("unknown error");
            bail!("DAS API error: {message}");
        }
        Ok(data["result"].clone())
    }

    /// Generate images with OpenAI and return their URLs.
    pub async fn create_image(&self, agent: &Agent, prompt: &str, size: &str, n: u8) -> Result<Vec<String>> {
        let api_key = agent
            .config()
            .openai_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is not configured"))?;
        ensure!(IMAGE_SIZES.contains(&size), "unsupported image size {size}");
        ensure!((1..=10).contains(&n), "n must be between 1 and 10");

        let response = self
            .http
            .post(format!("{}/images/generations", self.openai_url))
            .bearer_auth(api_key)
            .json(&json!({
                "model": IMAGE_MODEL,
                "prompt": prompt,
                "n": n,
                "size": size,
            }))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body["error"]["message"].as_str().unwrap_or("request rejected");
            bail!("OpenAI returned {status}: {message}");
        }

        let images: Vec<String> = body["data"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|image| image["url"].as_str().map(str::to_string))
            .collect();
        ensure!(!images.is_empty(), "OpenAI returned no images");
        Ok(images)
    }
}
