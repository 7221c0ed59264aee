//! Token plugin: SOL/SPL balances and transfers, faucet, TPS and wallet
//! switching.

pub mod actions;
pub mod tools;

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_agent_core::{Action, MethodTable, Plugin};

use crate::actions::{
    GetBalanceAction, GetTpsAction, RequestFundsAction, TokenBalancesAction, TransferAction, UseWalletAction,
    WalletAddressAction,
};
use crate::tools::parse_pubkey;

pub const PLUGIN_NAME: &str = "token";

#[derive(Debug, Clone, Default)]
pub struct TokenPlugin {
    http: reqwest::Client,
}

impl TokenPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct MintArg {
    mint: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferArgs {
    to: String,
    amount: f64,
    mint: Option<String>,
}

fn args<T: for<'de> Deserialize<'de> + Default>(input: Value) -> Result<T> {
    if input.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(input)?)
}

impl Plugin for TokenPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn methods(&self) -> MethodTable {
        let http = self.http.clone();
        MethodTable::new()
            .with("get_balance", |agent, input| async move {
                let arg: MintArg = args(input)?;
                let mint = arg.mint.as_deref().map(|m| parse_pubkey("mint", m)).transpose()?;
                Ok(json!(tools::get_balance(&agent, mint).await?))
            })
            .with("transfer", |agent, input| async move {
                let arg: TransferArgs = serde_json::from_value(input)?;
                let to = parse_pubkey("recipient", &arg.to)?;
                let mint = arg.mint.as_deref().map(|m| parse_pubkey("mint", m)).transpose()?;
                tools::transfer(&agent, to, arg.amount, mint).await?.to_fields()
            })
            .with("get_wallet_address", |agent, _| async move {
                Ok(json!(tools::get_wallet_address(&agent)))
            })
            .with("get_token_balances", move |agent, _| {
                let http = http.clone();
                async move {
                    let owner = agent.pubkey();
                    tools::get_token_balances(&agent, &http, owner).await
                }
            })
            .with("request_faucet_funds", |agent, _| async move {
                Ok(json!(tools::request_faucet_funds(&agent).await?.to_string()))
            })
            .with("get_tps", |agent, _| async move { Ok(json!(tools::get_tps(&agent).await?)) })
    }

    fn actions(&self) -> Vec<Arc<dyn Action>> {
        vec![
            Arc::new(GetBalanceAction::new()),
            Arc::new(TokenBalancesAction::new(self.http.clone())),
            Arc::new(TransferAction::new()),
            Arc::new(WalletAddressAction::new()),
            Arc::new(RequestFundsAction::new()),
            Arc::new(GetTpsAction::new()),
            Arc::new(UseWalletAction::new()),
        ]
    }
}
