use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_agent_core::{Action, ActionExample, ActionMetadata, Agent};

use crate::tools::{self, parse_pubkey};

const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const RECIPIENT: &str = "8x2dR8Mpzuz2YqyZyZjUbYWKSWesBo5jMx2Q9Y86udVk";

fn similes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// BALANCE_ACTION - Get SOL or SPL token balance
// =============================================================================

#[derive(Debug)]
pub struct GetBalanceAction {
    meta: ActionMetadata,
}

impl GetBalanceAction {
    pub fn new() -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "tokenAddress": {
                    "type": "string",
                    "minLength": 32,
                    "description": "Optional SPL token mint address; if omitted, SOL balance is returned",
                }
            },
            "additionalProperties": false,
        });

        let examples = vec![
            ActionExample {
                input: json!({}),
                output: json!({
                    "status": "success",
                    "balance": 100.0,
                    "token": "SOL",
                }),
                explanation: "Get SOL balance of the wallet".to_string(),
            },
            ActionExample {
                input: json!({ "tokenAddress": USDC }),
                output: json!({
                    "status": "success",
                    "balance": 1000.0,
                    "token": USDC,
                }),
                explanation: "Get USDC token balance".to_string(),
            },
        ];

        let meta = ActionMetadata {
            name: "BALANCE_ACTION".to_string(),
            similes: similes(&[
                "check balance",
                "get wallet balance",
                "view balance",
                "show balance",
                "check token balance",
            ]),
            description: "Get the balance of a Solana wallet or token account. If no tokenAddress is provided, the balance will be in SOL.".to_string(),
            examples,
            input_schema,
        };

        Self { meta }
    }
}

#[async_trait]
impl Action for GetBalanceAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            token_address: Option<String>,
        }

        let input: Input = serde_json::from_value(input)?;
        let mint = input
            .token_address
            .as_deref()
            .map(|addr| parse_pubkey("token", addr))
            .transpose()?;

        let balance = tools::get_balance(agent, mint)
            .await
            .context("Balance lookup failed")?;

        Ok(json!({
            "status": "success",
            "balance": balance,
            "token": input.token_address.unwrap_or_else(|| "SOL".to_string()),
        }))
    }
}

// =============================================================================
// TOKEN_BALANCE_ACTION - SOL plus every SPL token held by a wallet
// =============================================================================

#[derive(Debug)]
pub struct TokenBalancesAction {
    meta: ActionMetadata,
    http: reqwest::Client,
}

impl TokenBalancesAction {
    pub fn new(http: reqwest::Client) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "walletAddress": {
                    "type": "string",
                    "minLength": 32,
                    "description": "Wallet to inspect; defaults to the agent's wallet",
                }
            },
            "additionalProperties": false,
        });

        let examples = vec![ActionExample {
            input: json!({}),
            output: json!({
                "status": "success",
                "balance": {
                    "sol": 5.5,
                    "tokens": [{
                        "tokenAddress": USDC,
                        "balance": 120.5,
                        "decimals": 6,
                    }],
                },
            }),
            explanation: "List every token the agent's wallet holds".to_string(),
        }];

        let meta = ActionMetadata {
            name: "TOKEN_BALANCE_ACTION".to_string(),
            similes: similes(&["list token balances", "show all tokens", "portfolio balances"]),
            description: "Get SOL and all SPL token balances of a wallet.".to_string(),
            examples,
            input_schema,
        };

        Self { meta, http }
    }
}

#[async_trait]
impl Action for TokenBalancesAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            wallet_address: Option<String>,
        }

        let input: Input = serde_json::from_value(input)?;
        let owner = match input.wallet_address.as_deref() {
            Some(addr) => parse_pubkey("wallet", addr)?,
            None => agent.pubkey(),
        };

        let balance = tools::get_token_balances(agent, &self.http, owner)
            .await
            .context("Token balance lookup failed")?;

        Ok(json!({
            "status": "success",
            "balance": balance,
        }))
    }
}

// =============================================================================
// TRANSFER - Send SOL or SPL tokens
// =============================================================================

#[derive(Debug)]
pub struct TransferAction {
    meta: ActionMetadata,
}

impl TransferAction {
    pub fn new() -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "minLength": 32,
                    "maxLength": 44,
                    "description": "Recipient wallet address",
                },
                "amount": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Amount to transfer, in SOL or token units",
                },
                "mint": {
                    "type": "string",
                    "minLength": 32,
                    "description": "SPL token mint; omit to transfer SOL",
                }
            },
            "required": ["to", "amount"],
            "additionalProperties": false,
        });

        let examples = vec![
            ActionExample {
                input: json!({ "to": RECIPIENT, "amount": 1 }),
                output: json!({
                    "status": "success",
                    "message": "Transfer completed successfully",
                    "amount": 1,
                    "recipient": RECIPIENT,
                    "token": "SOL",
                    "signature": "5UfgJ5vVZxUxefDGqzqkVLHzHxVTyYH9StYyHKgvHYmXJgqJKxEqy9k4Rz9LpXrHF9kUZB7",
                }),
                explanation: "Transfer 1 SOL to the recipient address".to_string(),
            },
            ActionExample {
                input: json!({ "to": RECIPIENT, "amount": 100, "mint": USDC }),
                output: json!({
                    "status": "success",
                    "message": "Transfer completed successfully",
                    "amount": 100,
                    "recipient": RECIPIENT,
                    "token": USDC,
                    "signature": "4VfgJ5vVZxUxefDGqzqkVLHzHxVTyYH9StYyHKgvHYmXJgqJKxEqy9k4Rz9LpXrHF9kUZB7",
                }),
                explanation: "Transfer 100 USDC".to_string(),
            },
        ];

        let meta = ActionMetadata {
            name: "TRANSFER".to_string(),
            similes: similes(&[
                "send tokens",
                "transfer funds",
                "send money",
                "send sol",
                "transfer tokens",
            ]),
            description: "Transfer tokens or SOL to another address (also called as wallet address).".to_string(),
            examples,
            input_schema,
        };

        Self { meta }
    }
}

#[async_trait]
impl Action for TransferAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Input {
            to: String,
            amount: f64,
            mint: Option<String>,
        }

        let input: Input = serde_json::from_value(input)?;
        let to = parse_pubkey("recipient", &input.to)?;
        let mint = input.mint.as_deref().map(|m| parse_pubkey("mint", m)).transpose()?;

        let outcome = tools::transfer(agent, to, input.amount, mint)
            .await
            .context("Transfer failed")?;

        let mut result = json!({
            "status": "success",
            "message": "Transfer completed successfully",
            "amount": input.amount,
            "recipient": input.to,
            "token": input.mint.unwrap_or_else(|| "SOL".to_string()),
        });
        merge(&mut result, outcome.to_fields()?);
        Ok(result)
    }
}

// =============================================================================
// WALLET_ADDRESS - Report the agent's wallet address
// =============================================================================

#[derive(Debug)]
pub struct WalletAddressAction {
    meta: ActionMetadata,
}

impl WalletAddressAction {
    pub fn new() -> Self {
        let meta = ActionMetadata {
            name: "WALLET_ADDRESS".to_string(),
            similes: similes(&["wallet address", "address", "wallet", "my address"]),
            description: "Get wallet address of the agent".to_string(),
            examples: vec![ActionExample {
                input: json!({}),
                output: json!({ "status": "success", "address": RECIPIENT }),
                explanation: "The agent's wallet address".to_string(),
            }],
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false,
            }),
        };
        Self { meta }
    }
}

#[async_trait]
impl Action for WalletAddressAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, _input: Value) -> Result<Value> {
        Ok(json!({
            "status": "success",
            "address": tools::get_wallet_address(agent),
        }))
    }
}

// =============================================================================
// REQUEST_FUNDS - Devnet/testnet airdrop
// =============================================================================

#[derive(Debug)]
pub struct RequestFundsAction {
    meta: ActionMetadata,
}

impl RequestFundsAction {
    pub fn new() -> Self {
        let meta = ActionMetadata {
            name: "REQUEST_FUNDS".to_string(),
            similes: similes(&["request sol", "get test sol", "use faucet", "request test tokens", "airdrop"]),
            description: "Request SOL from the faucet on devnet or testnet".to_string(),
            examples: vec![ActionExample {
                input: json!({}),
                output: json!({
                    "status": "success",
                    "message": "Successfully requested faucet funds",
                    "network": "http://127.0.0.1:8899",
                }),
                explanation: "Request SOL from the devnet faucet".to_string(),
            }],
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false,
            }),
        };
        Self { meta }
    }
}

#[async_trait]
impl Action for RequestFundsAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, _input: Value) -> Result<Value> {
        let signature = tools::request_faucet_funds(agent)
            .await
            .context("Faucet request failed")?;
        Ok(json!({
            "status": "success",
            "message": "Successfully requested faucet funds",
            "network": agent.chain().url(),
            "signature": signature.to_string(),
        }))
    }
}

// =============================================================================
// GET_TPS - Current network throughput
// =============================================================================

#[derive(Debug)]
pub struct GetTpsAction {
    meta: ActionMetadata,
}

impl GetTpsAction {
    pub fn new() -> Self {
        let meta = ActionMetadata {
            name: "GET_TPS".to_string(),
            similes: similes(&[
                "get transactions per second",
                "check network speed",
                "network performance",
                "transaction throughput",
                "network tps",
            ]),
            description: "Get the current transactions per second (TPS) of the Solana network".to_string(),
            examples: vec![ActionExample {
                input: json!({}),
                output: json!({
                    "status": "success",
                    "tps": 3000,
                    "message": "Current network TPS: 3000",
                }),
                explanation: "Get the current TPS of the Solana network".to_string(),
            }],
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false,
            }),
        };
        Self { meta }
    }
}

#[async_trait]
impl Action for GetTpsAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, _input: Value) -> Result<Value> {
        let tps = tools::get_tps(agent).await.context("TPS lookup failed")?;
        Ok(json!({
            "status": "success",
            "tps": tps,
            "message": format!("Current network TPS: {tps:.0}"),
        }))
    }
}

// =============================================================================
// USE_WALLET - Swap the agent's wallet
// =============================================================================

#[derive(Debug)]
pub struct UseWalletAction {
    meta: ActionMetadata,
}

impl UseWalletAction {
    pub fn new() -> Self {
        let meta = ActionMetadata {
            name: "USE_WALLET".to_string(),
            similes: similes(&["switch wallet", "change wallet", "load wallet"]),
            description: "Replace the agent's wallet with one derived from a base58 secret key. Every later action signs with the new wallet.".to_string(),
            examples: vec![ActionExample {
                input: json!({ "secretKey": "4Z7cXSyeFR8wNGMVXUE1TwtKn5D5Vu7FzEv69dokLv7KrQk7h6pu4LF8ZRR9yQBhc7uSM6RTTZtU1fmaxiNrxXrs" }),
                output: json!({ "status": "success", "address": RECIPIENT }),
                explanation: "Switch to another keypair".to_string(),
            }],
            input_schema: json!({
                "type": "object",
                "properties": {
                    "secretKey": {
                        "type": "string",
                        "minLength": 64,
                        "errorMessage": "must be a base58 encoded 64-byte keypair",
                    }
                },
                "required": ["secretKey"],
                "additionalProperties": false,
            }),
        };
        Self { meta }
    }
}

#[async_trait]
impl Action for UseWalletAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            secret_key: String,
        }

        let input: Input = serde_json::from_value(input)?;
        let pubkey = tools::use_wallet(agent, &input.secret_key).context("Wallet swap failed")?;
        Ok(json!({
            "status": "success",
            "address": pubkey.to_string(),
        }))
    }
}

/// Copy `extra`'s fields into `target`; both must be objects.
pub(crate) fn merge(target: &mut Value, extra: Value) {
    if let (Some(target), Value::Object(extra)) = (target.as_object_mut(), extra) {
        target.extend(extra);
    }
}
