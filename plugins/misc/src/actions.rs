use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_agent_core::{parse_pubkey, Action, ActionExample, ActionMetadata, Agent};

use crate::api::{bare_domain, CoingeckoAccess, MiscApi};

// =============================================================================
// RESOLVE_SOL_DOMAIN - .sol domain to owner address
// =============================================================================

#[derive(Debug)]
pub struct ResolveSolDomainAction {
    meta: ActionMetadata,
    api: Arc<MiscApi>,
}

impl ResolveSolDomainAction {
    pub fn new(api: Arc<MiscApi>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "domain": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The .sol domain to resolve (with or without .sol suffix)",
                }
            },
            "required": ["domain"],
            "additionalProperties": false,
        });

        let examples = vec![ActionExample {
            input: json!({ "domain": "toly.sol" }),
            output: json!({
                "status": "success",
                "owner": "86xCnPeV69n6t3DnyGvkKobf9FdN2H9oiVDdaMpo2MMY",
                "message": "Successfully resolved toly.sol",
            }),
            explanation: "Resolve a .sol domain to get the owner's wallet address".to_string(),
        }];

        let meta = ActionMetadata {
            name: "RESOLVE_SOL_DOMAIN".to_string(),
            similes: vec![
                "resolve sol domain".to_string(),
                "lookup sol domain".to_string(),
                "get domain owner".to_string(),
                "find sol address".to_string(),
                "resolve .sol".to_string(),
            ],
            description: "Resolve a .sol domain to its corresponding Solana wallet address using Bonfida Name Service".to_string(),
            examples,
            input_schema,
        };

        Self { meta, api }
    }
}

#[async_trait]
impl Action for ResolveSolDomainAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, _agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Input {
            domain: String,
        }

        let input: Input = serde_json::from_value(input)?;
        let name = bare_domain(&input.domain);
        let owner = self
            .api
            .resolve_domain(name)
            .await
            .context("Failed to resolve domain")?;

        Ok(match owner {
            Some(owner) => json!({
                "status": "success",
                "owner": owner.to_string(),
                "message": format!("Successfully resolved {name}.sol"),
            }),
            None => json!({
                "status": "error",
                "message": format!("{name}.sol is not registered"),
            }),
        })
    }
}

// =============================================================================
// GET_PRIMARY_DOMAIN - Reverse lookup of a wallet's primary .sol domain
// =============================================================================

#[derive(Debug)]
pub struct GetPrimaryDomainAction {
    meta: ActionMetadata,
    api: Arc<MiscApi>,
}

impl GetPrimaryDomainAction {
    pub fn new(api: Arc<MiscApi>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "account": {
                    "type": "string",
                    "minLength": 32,
                    "description": "Wallet address to look up; defaults to the agent's wallet",
                }
            },
            "additionalProperties": false,
        });

        let examples = vec![ActionExample {
            input: json!({ "account": "86xCnPeV69n6t3DnyGvkKobf9FdN2H9oiVDdaMpo2MMY" }),
            output: json!({
                "status": "success",
                "domain": "toly.sol",
            }),
            explanation: "Get the primary .sol domain of a wallet".to_string(),
        }];

        let meta = ActionMetadata {
            name: "GET_PRIMARY_DOMAIN".to_string(),
            similes: vec![
                "reverse domain lookup".to_string(),
                "get wallet domain".to_string(),
                "find domain for address".to_string(),
                "wallet to domain".to_string(),
                "primary domain".to_string(),
            ],
            description: "Get the primary .sol domain associated with a Solana wallet address (reverse lookup)".to_string(),
            examples,
            input_schema,
        };

        Self { meta, api }
    }
}

#[async_trait]
impl Action for GetPrimaryDomainAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Input {
            account: Option<String>,
        }

        let input: Input = serde_json::from_value(input)?;
        let owner = match input.account.as_deref() {
            Some(account) => parse_pubkey("account", account)?,
            None => agent.pubkey(),
        };
        let domain = self
            .api
            .primary_domain(&owner)
            .await
            .context("Failed to look up primary domain")?;

        Ok(match domain {
            Some(domain) => json!({ "status": "success", "domain": domain }),
            None => json!({
                "status": "success",
                "domain": null,
                "message": "No .sol domain associated with this wallet",
            }),
        })
    }
}

// =============================================================================
// GET_TOKEN_PRICE - CoinGecko USD prices by mint
// =============================================================================

#[derive(Debug)]
pub struct GetTokenPriceAction {
    meta: ActionMetadata,
    api: Arc<MiscApi>,
}

impl GetTokenPriceAction {
    pub fn new(api: Arc<MiscApi>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "tokenAddresses": {
                    "type": "array",
                    "items": { "type": "string", "minLength": 32 },
                    "minItems": 1,
                    "maxItems": 50,
                    "description": "Mint addresses of the tokens to price",
                }
            },
            "required": ["tokenAddresses"],
            "additionalProperties": false,
        });

        let examples = vec![ActionExample {
            input: json!({ "tokenAddresses": ["EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"] }),
            output: json!({
                "status": "success",
                "prices": { "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v": 1.0 },
            }),
            explanation: "Get the USD price of USDC".to_string(),
        }];

        let meta = ActionMetadata {
            name: "GET_TOKEN_PRICE".to_string(),
            similes: vec![
                "token price".to_string(),
                "get token price".to_string(),
                "check token price".to_string(),
                "coingecko price".to_string(),
            ],
            description: "Get the USD price of one or more Solana tokens by mint address from CoinGecko".to_string(),
            examples,
            input_schema,
        };

        Self { meta, api }
    }
}

#[async_trait]
impl Action for GetTokenPriceAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            token_addresses: Vec<String>,
        }

        let input: Input = serde_json::from_value(input)?;
        let access = CoingeckoAccess::from_config(agent.config());
        let prices = self
            .api
            .token_prices(&access, &input.token_addresses)
            .await
            .context("Failed to fetch token prices")?;

        Ok(json!({
            "status": "success",
            "prices": prices,
        }))
    }
}
