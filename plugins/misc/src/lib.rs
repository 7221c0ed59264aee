//! Misc plugin: SNS domain resolution and CoinGecko token prices.

pub mod actions;
pub mod api;

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_agent_core::{parse_pubkey, Action, Agent, MethodTable, Plugin};

use crate::actions::{GetPrimaryDomainAction, GetTokenPriceAction, ResolveSolDomainAction};
pub use crate::api::{CoingeckoAccess, Endpoints, MiscApi};

pub const PLUGIN_NAME: &str = "misc";

#[derive(Debug, Clone, Default)]
pub struct MiscPlugin {
    api: Arc<MiscApi>,
}

impl MiscPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self {
            api: Arc::new(MiscApi::new(reqwest::Client::new(), endpoints)),
        }
    }
}

#[derive(Deserialize)]
struct DomainArg {
    domain: String,
}

#[derive(Deserialize)]
struct AccountArg {
    account: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintsArg {
    token_addresses: Vec<String>,
}

impl Plugin for MiscPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn methods(&self) -> MethodTable {
        let resolve_api = self.api.clone();
        let primary_api = self.api.clone();
        let price_api = self.api.clone();

        MethodTable::new()
            .with("resolve_sol_domain", move |_agent: Agent, input: Value| {
                let api = resolve_api.clone();
                async move {
                    let arg: DomainArg = serde_json::from_value(input)?;
                    let owner = api.resolve_domain(&arg.domain).await?;
                    Ok(json!(owner.map(|o| o.to_string())))
                }
            })
            .with("get_primary_domain", move |_agent: Agent, input: Value| {
                let api = primary_api.clone();
                async move {
                    let arg: AccountArg = serde_json::from_value(input)?;
                    let owner = parse_pubkey("account", &arg.account)?;
                    Ok(json!(api.primary_domain(&owner).await?))
                }
            })
            .with("get_token_price", move |agent: Agent, input: Value| {
                let api = price_api.clone();
                async move {
                    let arg: MintsArg = serde_json::from_value(input)?;
                    let access = CoingeckoAccess::from_config(agent.config());
                    Ok(Value::Object(api.token_prices(&access, &arg.token_addresses).await?))
                }
            })
    }

    fn actions(&self) -> Vec<Arc<dyn Action>> {
        vec![
            Arc::new(ResolveSolDomainAction::new(self.api.clone())),
            Arc::new(GetPrimaryDomainAction::new(self.api.clone())),
            Arc::new(GetTokenPriceAction::new(self.api.clone())),
        ]
    }

    fn initialize(&self, agent: &Agent) -> Result<()> {
        if CoingeckoAccess::from_config(agent.config()) == CoingeckoAccess::Public {
            agent.warn_config(
                PLUGIN_NAME,
                "COINGECKO_PRO_API_KEY",
                "neither COINGECKO_PRO_API_KEY nor COINGECKO_DEMO_API_KEY is configured; using the rate-limited public CoinGecko API",
            );
        }
        Ok(())
    }
}
