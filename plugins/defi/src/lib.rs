//! DeFi plugin: Jupiter swaps, Lulo lending, Sanctum LST prices and Solayer
//! restaking.

pub mod actions;
pub mod api;

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use solana_agent_core::{parse_pubkey, Action, Agent, MethodTable, Plugin};

use crate::actions::{GetSanctumPriceAction, LendAssetAction, StakeWithSolayerAction, TradeAction};
pub use crate::api::{DefiApi, Endpoints, TradeRequest};
use crate::api::{DEFAULT_SLIPPAGE_BPS, SOL_MINT, USDC_MINT};

pub const PLUGIN_NAME: &str = "defi";

#[derive(Debug, Clone, Default)]
pub struct DefiPlugin {
    api: Arc<DefiApi>,
}

impl DefiPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self {
            api: Arc::new(DefiApi::new(reqwest::Client::new(), endpoints)),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeArgs {
    output_mint: String,
    input_amount: f64,
    input_mint: Option<String>,
    slippage_bps: Option<u16>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LendArgs {
    amount: f64,
    mint_address: Option<String>,
}

#[derive(Deserialize)]
struct AmountArg {
    amount: f64,
}

#[derive(Deserialize)]
struct MintsArg {
    mints: Vec<String>,
}

impl Plugin for DefiPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn methods(&self) -> MethodTable {
        let trade_api = self.api.clone();
        let lend_api = self.api.clone();
        let price_api = self.api.clone();
        let stake_api = self.api.clone();

        MethodTable::new()
            .with("trade", move |agent: Agent, input: Value| {
                let api = trade_api.clone();
                async move {
                    let args: TradeArgs = serde_json::from_value(input)?;
                    let req = TradeRequest {
                        output_mint: parse_pubkey("output mint", &args.output_mint)?,
                        input_amount: args.input_amount,
                        input_mint: parse_pubkey("input mint", args.input_mint.as_deref().unwrap_or(SOL_MINT))?,
                        slippage_bps: args.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS),
                    };
                    api.trade(&agent, &req).await?.to_fields()
                }
            })
            .with("lend_asset", move |agent: Agent, input: Value| {
                let api = lend_api.clone();
                async move {
                    let args: LendArgs = serde_json::from_value(input)?;
                    let mint = parse_pubkey("mint", args.mint_address.as_deref().unwrap_or(USDC_MINT))?;
                    api.lend(&agent, &mint, args.amount).await?.to_fields()
                }
            })
            .with("fetch_sanctum_prices", move |_agent: Agent, input: Value| {
                let api = price_api.clone();
                async move {
                    let args: MintsArg = serde_json::from_value(input)?;
                    api.sanctum_prices(&args.mints).await
                }
            })
            .with("stake_with_solayer", move |agent: Agent, input: Value| {
                let api = stake_api.clone();
                async move {
                    let args: AmountArg = serde_json::from_value(input)?;
                    api.stake_with_solayer(&agent, args.amount).await?.to_fields()
                }
            })
    }

    fn actions(&self) -> Vec<Arc<dyn Action>> {
        vec![
            Arc::new(TradeAction::new(self.api.clone())),
            Arc::new(LendAssetAction::new(self.api.clone())),
            Arc::new(GetSanctumPriceAction::new(self.api.clone())),
            Arc::new(StakeWithSolayerAction::new(self.api.clone())),
        ]
    }

    fn initialize(&self, agent: &Agent) -> Result<()> {
        agent.require_config(PLUGIN_NAME, "FLEXLEND_API_KEY");
        Ok(())
    }
}
