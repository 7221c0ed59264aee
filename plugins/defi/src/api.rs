//! HTTP clients for the DeFi protocols behind the plugin's actions.

use std::str::FromStr;

use anyhow::{anyhow, bail, ensure, Context, Result};
use serde_json::{json, Value};
use solana_agent_core::units::{to_base_units, SOL_DECIMALS};
use solana_agent_core::{submit_encoded, Agent, TxOutcome};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const DEFAULT_SLIPPAGE_BPS: u16 = 300;
const REFERRAL_PROGRAM: &str = "REFER4ZgmyYx9c6He5XfaTMiGfdLwRnkV4RPp9t9iF3";
const LULO_PRIORITY_FEE: u64 = 50_000;

/// Base URLs of the services the plugin talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub jupiter: String,
    pub lulo: String,
    pub sanctum: String,
    pub solayer: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            jupiter: "https://quote-api.jup.ag/v6".to_string(),
            lulo: "https://api.flexlend.fi".to_string(),
            sanctum: "https://sanctum-extra-api.ngrok.dev".to_string(),
            solayer: "https://app.solayer.org".to_string(),
        }
    }
}

impl Endpoints {
    /// Every service served from one base URL (a mock server).
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            jupiter: base.clone(),
            lulo: base.clone(),
            sanctum: base.clone(),
            solayer: base,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub output_mint: Pubkey,
    pub input_amount: f64,
    pub input_mint: Pubkey,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone, Default)]
pub struct DefiApi {
    http: reqwest::Client,
    endpoints: Endpoints,
}

/// Fail with the response body's `message` (or `error`) when the status is
/// not a success.
async fn checked_json(response: reqwest::Response, service: &str) -> Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        let detail = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string());
        bail!("{service} request failed: {detail}");
    }
    Ok(body)
}

/// Jupiter referral token account for `referral` and `mint`.
pub fn referral_fee_account(referral: &Pubkey, mint: &Pubkey) -> Result<Pubkey> {
    let program = Pubkey::from_str(REFERRAL_PROGRAM)?;
    let (account, _) =
        Pubkey::find_program_address(&[b"referral_ata", referral.as_ref(), mint.as_ref()], &program);
    Ok(account)
}

impl DefiApi {
    pub fn new(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Swap through Jupiter: fetch a quote, request the swap transaction for
    /// the agent's wallet, then sign/send it.
    pub async fn trade(&self, agent: &Agent, req: &TradeRequest) -> Result<TxOutcome> {
        ensure!(req.input_mint != req.output_mint, "input and output mints must differ");
        ensure!(req.slippage_bps <= 10_000, "slippage cannot exceed 10000 bps");

        let decimals = if req.input_mint.to_string() == SOL_MINT {
            SOL_DECIMALS
        } else {
            agent.chain().get_mint_decimals(&req.input_mint).await?
        };
        let amount = to_base_units(req.input_amount, decimals)?;

        let config = agent.config();
        let referral = config
            .jupiter_referral_account
            .as_deref()
            .map(|account| Pubkey::from_str(account).context("JUPITER_REFERRAL_ACCOUNT is not an address"))
            .transpose()?;

        let mut query = vec![
            ("inputMint", req.input_mint.to_string()),
            ("outputMint", req.output_mint.to_string()),
            ("amount", amount.to_string()),
            ("slippageBps", req.slippage_bps.to_string()),
            ("onlyDirectRoutes", "true".to_string()),
        ];
        if referral.is_some() {
            if let Some(fee_bps) = config.jupiter_fee_bps {
                query.push(("platformFeeBps", fee_bps.to_string()));
            }
        }

        let quote = self
            .http
            .get(format!("{}/quote", self.endpoints.jupiter))
            .query(&query)
            .send()
            .await?;
        let quote = checked_json(quote, "Jupiter quote").await?;
        debug!(out_amount = ?quote.get("outAmount"), "jupiter quote");

        let mut body = json!({
            "quoteResponse": quote,
            "userPublicKey": agent.pubkey().to_string(),
            "wrapAndUnwrapSol": true,
            "dynamicComputeUnitLimit": true,
            "prioritizationFeeLamports": "auto",
        });
        if let Some(referral) = referral {
            body["feeAccount"] = json!(referral_fee_account(&referral, &req.output_mint)?.to_string());
        }

        let swap = self
            .http
            .post(format!("{}/swap", self.endpoints.jupiter))
            .json(&body)
            .send()
            .await?;
        let swap = checked_json(swap, "Jupiter swap").await?;
        let encoded = swap["swapTransaction"]
            .as_str()
            .ok_or_else(|| anyhow!("No swap transaction in response"))?;

        let outcome = submit_encoded(agent, encoded).await?;
        info!(input = %req.input_mint, output = %req.output_mint, amount, "swap submitted");
        Ok(outcome)
    }

    /// Deposit into Lulo (formerly Flexlend).
    pub async fn lend(&self, agent: &Agent, mint: &Pubkey, amount: f64) -> Result<TxOutcome> {
        let api_key = agent
            .config()
            .flexlend_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("FLEXLEND_API_KEY is not configured"))?;
        let owner = agent.pubkey().to_string();

        let response = self
            .http
            .post(format!("{}/generate/account/deposit", self.endpoints.lulo))
            .query(&[("priorityFee", LULO_PRIORITY_FEE)])
            .header("x-wallet-pubkey", &owner)
            .header("x-api-key", api_key)
            .json(&json!({
                "owner": owner,
                "mintAddress": mint.to_string(),
                "depositAmount": amount,
            }))
            .send()
            .await?;
        let data = checked_json(response, "Lulo").await?;
        let encoded = data["data"]["transactionMeta"][0]["transaction"]
            .as_str()
            .ok_or_else(|| anyhow!("No transaction in Lulo response"))?;

        submit_encoded(agent, encoded).await
    }

    /// SOL value of each LST, keyed by the mint or symbol asked for.
    pub async fn sanctum_prices(&self, mints: &[String]) -> Result<Value> {
        ensure!(!mints.is_empty(), "at least one LST is required");
        let query: Vec<(&str, &str)> = mints.iter().map(|m| ("lst", m.as_str())).collect();

        let response = self
            .http
            .get(format!("{}/v1/sol-value/current", self.endpoints.sanctum))
            .query(&query)
            .send()
            .await?;
        let data = checked_json(response, "Sanctum").await?;
        match data.get("solValues") {
            Some(values) if values.is_object() => Ok(values.clone()),
            _ => bail!("Sanctum response has no solValues"),
        }
    }

    /// Restake native SOL for sSOL through Solayer's action endpoint.
    pub async fn stake_with_solayer(&self, agent: &Agent, amount: f64) -> Result<TxOutcome> {
        ensure!(amount > 0.0, "amount must be positive");
        let response = self
            .http
            .post(format!("{}/api/action/restake/ssol", self.endpoints.solayer))
            .query(&[("amount", amount.to_string())])
            .json(&json!({ "account": agent.pubkey().to_string() }))
            .send()
            .await?;
        let data = checked_json(response, "Solayer").await?;
        let encoded = data["transaction"]
            .as_str()
            .ok_or_else(|| anyhow!("No transaction in response"))?;

        submit_encoded(agent, encoded).await
    }
}
