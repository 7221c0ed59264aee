use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_agent_core::{parse_pubkey, Action, ActionExample, ActionMetadata, Agent};

use crate::api::{DefiApi, TradeRequest, DEFAULT_SLIPPAGE_BPS, SOL_MINT, USDC_MINT};

fn with_fields(mut result: Value, extra: Value) -> Value {
    if let (Some(target), Value::Object(extra)) = (result.as_object_mut(), extra) {
        target.extend(extra);
    }
    result
}

// =============================================================================
// TRADE - Swap tokens through Jupiter
// =============================================================================

pub struct TradeAction {
    meta: ActionMetadata,
    api: Arc<DefiApi>,
}

impl TradeAction {
    pub fn new(api: Arc<DefiApi>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "outputMint": {
                    "type": "string",
                    "minLength": 32,
                    "description": "Mint address of the token to receive",
                },
                "inputAmount": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Amount of the input token to swap, in UI units",
                },
                "inputMint": {
                    "type": "string",
                    "minLength": 32,
                    "default": SOL_MINT,
                    "description": "Mint address of the token to sell; defaults to SOL",
                },
                "slippageBps": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": 10000,
                    "default": DEFAULT_SLIPPAGE_BPS,
                    "description": "Slippage tolerance in basis points",
                }
            },
            "required": ["outputMint", "inputAmount"],
            "additionalProperties": false,
        });

        let examples = vec![
            ActionExample {
                input: json!({ "outputMint": USDC_MINT, "inputAmount": 1 }),
                output: json!({
                    "status": "success",
                    "message": "Trade executed successfully",
                    "signature": "2ZE7Rz6hP7Lxma4fMuv8NUL4tYhCT8kdC8CmUDfHPAQwpE9G6p6xKG3FBhYshKeDsuHFo9vA7BKBENxLqLTtUvvS",
                    "inputAmount": 1,
                    "inputToken": SOL_MINT,
                    "outputToken": USDC_MINT,
                }),
                explanation: "Swap 1 SOL for USDC".to_string(),
            },
            ActionExample {
                input: json!({
                    "outputMint": SOL_MINT,
                    "inputAmount": 100,
                    "inputMint": USDC_MINT,
                    "slippageBps": 100,
                }),
                output: json!({
                    "status": "success",
                    "message": "Trade executed successfully",
                    "signature": "4VfgJ5vVZxUxefDGqzqkVLHzHxVTyYH9StYyHKgvHYmXJgqJKxEqy9k4Rz9LpXrHF9kUZB7",
                    "inputAmount": 100,
                    "inputToken": USDC_MINT,
                    "outputToken": SOL_MINT,
                }),
                explanation: "Swap 100 USDC for SOL with 1% slippage".to_string(),
            },
        ];

        let meta = ActionMetadata {
            name: "TRADE".to_string(),
            similes: vec![
                "swap tokens".to_string(),
                "exchange tokens".to_string(),
                "trade tokens".to_string(),
                "convert tokens".to_string(),
                "swap sol".to_string(),
            ],
            description: "This tool can be used to swap tokens to another token (It uses Jupiter Exchange).".to_string(),
            examples,
            input_schema,
        };

        Self { meta, api }
    }
}

#[async_trait]
impl Action for TradeAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            output_mint: String,
            input_amount: f64,
            input_mint: String,
            slippage_bps: u16,
        }

        let input: Input = serde_json::from_value(input)?;
        let req = TradeRequest {
            output_mint: parse_pubkey("output mint", &input.output_mint)?,
            input_amount: input.input_amount,
            input_mint: parse_pubkey("input mint", &input.input_mint)?,
            slippage_bps: input.slippage_bps,
        };

        let outcome = self.api.trade(agent, &req).await.context("Swap failed")?;

        Ok(with_fields(
            json!({
                "status": "success",
                "message": "Trade executed successfully",
                "inputAmount": input.input_amount,
                "inputToken": input.input_mint,
                "outputToken": input.output_mint,
            }),
            outcome.to_fields()?,
        ))
    }
}

// =============================================================================
// LEND_ASSET - Deposit into Lulo
// =============================================================================

pub struct LendAssetAction {
    meta: ActionMetadata,
    api: Arc<DefiApi>,
}

impl LendAssetAction {
    pub fn new(api: Arc<DefiApi>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "amount": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Amount to lend",
                },
                "mintAddress": {
                    "type": "string",
                    "minLength": 32,
                    "default": USDC_MINT,
                    "description": "Mint of the asset to lend; defaults to USDC",
                }
            },
            "required": ["amount"],
            "additionalProperties": false,
        });

        let meta = ActionMetadata {
            name: "LEND_ASSET".to_string(),
            similes: vec![
                "lend usdc".to_string(),
                "deposit for yield".to_string(),
                "earn yield".to_string(),
                "lend with lulo".to_string(),
            ],
            description: "Lend an asset (USDC by default) for yield using Lulo".to_string(),
            examples: vec![ActionExample {
                input: json!({ "amount": 100 }),
                output: json!({
                    "status": "success",
                    "signature": "4xKpN2...",
                    "message": "Successfully lent 100 of EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                }),
                explanation: "Lend 100 USDC for yield on Lulo".to_string(),
            }],
            input_schema,
        };

        Self { meta, api }
    }
}

#[async_trait]
impl Action for LendAssetAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            amount: f64,
            mint_address: String,
        }

        let input: Input = serde_json::from_value(input)?;
        let mint = parse_pubkey("mint", &input.mint_address)?;
        let outcome = self
            .api
            .lend(agent, &mint, input.amount)
            .await
            .context("Lending failed")?;

        Ok(with_fields(
            json!({
                "status": "success",
                "message": format!("Successfully lent {} of {}", input.amount, input.mint_address),
            }),
            outcome.to_fields()?,
        ))
    }
}

// =============================================================================
// GET_SANCTUM_PRICE - LST prices in SOL
// =============================================================================

pub struct GetSanctumPriceAction {
    meta: ActionMetadata,
    api: Arc<DefiApi>,
}

impl GetSanctumPriceAction {
    pub fn new(api: Arc<DefiApi>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "mints": {
                    "type": "array",
                    "items": { "type": "string", "minLength": 1 },
                    "minItems": 1,
                    "description": "Mint addresses or symbols of the LSTs to price",
                }
            },
            "required": ["mints"],
            "additionalProperties": false,
        });

        let examples = vec![ActionExample {
            input: json!({
                "mints": ["INF", "pwrsol", "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So"],
            }),
            output: json!({
                "status": "success",
                "message": "Price fetched successfully",
                "prices": {
                    "INF": "1303329251",
                    "pwrsol": "1105899448",
                },
            }),
            explanation: "Fetch the prices of LSTs on Sanctum".to_string(),
        }];

        let meta = ActionMetadata {
            name: "GET_SANCTUM_PRICE".to_string(),
            similes: vec![
                "get sanctum LST price".to_string(),
                "fetch sanctum LST price".to_string(),
                "sanctum price".to_string(),
                "lst price".to_string(),
            ],
            description: "Fetch the Price of LST (Liquid Staking Token) on Sanctum with specified mint addresses or symbols".to_string(),
            examples,
            input_schema,
        };

        Self { meta, api }
    }
}

#[async_trait]
impl Action for GetSanctumPriceAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, _agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Input {
            mints: Vec<String>,
        }

        let input: Input = serde_json::from_value(input)?;
        let prices = self
            .api
            .sanctum_prices(&input.mints)
            .await
            .context("Failed to fetch Sanctum prices")?;

        Ok(json!({
            "status": "success",
            "message": "Price fetched successfully",
            "prices": prices,
        }))
    }
}

// =============================================================================
// STAKE_WITH_SOLAYER - Restake SOL for sSOL
// =============================================================================

pub struct StakeWithSolayerAction {
    meta: ActionMetadata,
    api: Arc<DefiApi>,
}

impl StakeWithSolayerAction {
    pub fn new(api: Arc<DefiApi>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "amount": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Amount of SOL to stake",
                }
            },
            "required": ["amount"],
            "additionalProperties": false,
        });

        let examples = vec![ActionExample {
            input: json!({ "amount": 1.0 }),
            output: json!({
                "status": "success",
                "signature": "3FgHn9...",
                "message": "Successfully staked 1 SOL for Solayer SOL (sSOL)",
            }),
            explanation: "Stake 1.0 SOL to receive Solayer SOL (sSOL)".to_string(),
        }];

        let meta = ActionMetadata {
            name: "STAKE_WITH_SOLAYER".to_string(),
            similes: vec![
                "stake sol with solayer".to_string(),
                "solayer staking".to_string(),
                "get ssol".to_string(),
                "solayer restaking".to_string(),
                "liquid staking solayer".to_string(),
            ],
            description: "Stake native SOL with Solayer's restaking protocol to receive Solayer SOL (sSOL)".to_string(),
            examples,
            input_schema,
        };

        Self { meta, api }
    }
}

#[async_trait]
impl Action for StakeWithSolayerAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Input {
            amount: f64,
        }

        let input: Input = serde_json::from_value(input)?;
        let outcome = self
            .api
            .stake_with_solayer(agent, input.amount)
            .await
            .context("Solayer staking failed")?;

        Ok(with_fields(
            json!({
                "status": "success",
                "message": format!("Successfully staked {} SOL for Solayer SOL (sSOL)", input.amount),
            }),
            outcome.to_fields()?,
        ))
    }
}
