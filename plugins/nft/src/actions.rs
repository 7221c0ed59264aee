use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_agent_core::{parse_pubkey, Action, ActionExample, ActionMetadata, Agent};

use crate::api::{NftApi, DEFAULT_IMAGE_SIZE, IMAGE_SIZES};
use crate::mint::{mint_nft, MintRequest, DEFAULT_SELLER_FEE_BPS};

// =============================================================================
// MINT_NFT - Mint a one-of-one Metaplex NFT
// =============================================================================

#[derive(Debug)]
pub struct MintNftAction {
    meta: ActionMetadata,
}

impl MintNftAction {
    pub fn new() -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "minLength": 1,
                    "maxLength": 32,
                    "description": "Name of the NFT",
                },
                "uri": {
                    "type": "string",
                    "minLength": 1,
                    "maxLength": 200,
                    "description": "Metadata URI for the NFT (must be a valid URL pointing to JSON)",
                },
                "symbol": {
                    "type": "string",
                    "maxLength": 10,
                    "default": "",
                    "description": "Symbol for the NFT",
                },
                "sellerFeeBasisPoints": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": 10000,
                    "default": DEFAULT_SELLER_FEE_BPS,
                    "description": "Royalty in basis points (100 = 1%, default 500 = 5%)",
                },
                "collectionMint": {
                    "type": "string",
                    "minLength": 32,
                    "description": "Collection mint address to add the NFT to",
                },
                "recipient": {
                    "type": "string",
                    "minLength": 32,
                    "description": "Recipient wallet address (defaults to the agent's wallet)",
                }
            },
            "required": ["name", "uri"],
            "additionalProperties": false,
        });

        let examples = vec![ActionExample {
            input: json!({
                "name": "My NFT #1",
                "uri": "https://example.com/nft1.json",
                "symbol": "MNFT",
                "sellerFeeBasisPoints": 500,
            }),
            output: json!({
                "status": "success",
                "mint": "7nE9GvcUvRCb1GzGqGzVFaeRQFbGHqDsvZhp8EwLmNv2",
                "metadata": "8mF0HwdK1xHxTHDw2jHPrvXN6aSbKzA3rpGPv7fP1uSt",
                "masterEdition": "4tTQbK9Ycy2wTw4g9c5N8jvxpi9tTADmnLGKHZnj3yXY",
                "tokenAccount": "9TzLfqShLrQ1f4rQ5Zkc9QzXh7LpLqfY1hTGTqGDQXL7",
                "recipient": "8x2dR8Mpzuz2YqyZyZjUbYWKSWesBo5jMx2Q9Y86udVk",
                "name": "My NFT #1",
                "symbol": "MNFT",
                "signature": "5xY2AbcQ3m9Hk8TgYbY8sRfnpQ8cWrJ2Gq1nK4Ly7vE3",
            }),
            explanation: "Mint a new NFT with 5% royalty".to_string(),
        }];

        let meta = ActionMetadata {
            name: "MINT_NFT".to_string(),
            similes: vec![
                "create nft".to_string(),
                "mint nft".to_string(),
                "create collectible".to_string(),
                "mint collectible".to_string(),
            ],
            description: "Mint a new NFT on Solana with Metaplex metadata, optionally as part of a collection".to_string(),
            examples,
            input_schema,
        };

        Self { meta }
    }
}

#[async_trait]
impl Action for MintNftAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            name: String,
            uri: String,
            symbol: String,
            seller_fee_basis_points: u16,
            collection_mint: Option<String>,
            recipient: Option<String>,
        }

        let input: Input = serde_json::from_value(input)?;
        let req = MintRequest {
            collection: input
                .collection_mint
                .as_deref()
                .map(|m| parse_pubkey("collection mint", m))
                .transpose()?,
            recipient: input
                .recipient
                .as_deref()
                .map(|r| parse_pubkey("recipient", r))
                .transpose()?,
            name: input.name,
            uri: input.uri,
            symbol: input.symbol,
            seller_fee_basis_points: input.seller_fee_basis_points,
        };

        let minted = mint_nft(agent, &req).await.context("NFT mint failed")?;

        let mut result = json!({
            "status": "success",
            "mint": minted.mint.to_string(),
            "metadata": minted.metadata.to_string(),
            "masterEdition": minted.master_edition.to_string(),
            "tokenAccount": minted.token_account.to_string(),
            "recipient": minted.recipient.to_string(),
            "name": req.name,
            "symbol": req.symbol,
        });
        if let (Some(map), Value::Object(fields)) = (result.as_object_mut(), minted.outcome.to_fields()?) {
            map.extend(fields);
        }
        Ok(result)
    }
}

// =============================================================================
// GET_ASSET - Metaplex DAS lookup
// =============================================================================

#[derive(Debug)]
pub struct GetAssetAction {
    meta: ActionMetadata,
    api: Arc<NftApi>,
}

impl GetAssetAction {
    pub fn new(api: Arc<NftApi>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "assetId": {
                    "type": "string",
                    "minLength": 32,
                    "description": "The asset ID (mint address) to fetch details for",
                }
            },
            "required": ["assetId"],
            "additionalProperties": false,
        });

        let examples = vec![ActionExample {
            input: json!({ "assetId": "8x2dR8Mpzuz2YqyZyZjUbYWKSWesBo5jMx2Q9Y86udVk" }),
            output: json!({
                "status": "success",
                "message": "Asset retrieved successfully",
                "result": {
                    "name": "Example NFT",
                    "symbol": "ENFT",
                    "uri": "https://example.com/asset.json",
                },
            }),
            explanation: "Fetch details of an NFT asset using its ID".to_string(),
        }];

        let meta = ActionMetadata {
            name: "GET_ASSET".to_string(),
            similes: vec![
                "fetch asset".to_string(),
                "retrieve asset".to_string(),
                "get asset details".to_string(),
                "get nft details".to_string(),
            ],
            description: "Fetch asset details using the Metaplex DAS API".to_string(),
            examples,
            input_schema,
        };

        Self { meta, api }
    }
}

#[async_trait]
impl Action for GetAssetAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            asset_id: String,
        }

        let input: Input = serde_json::from_value(input)?;
        let asset = self
            .api
            .get_asset(agent, &input.asset_id)
            .await
            .context("Asset lookup failed")?;

        Ok(json!({
            "status": "success",
            "message": "Asset retrieved successfully",
            "result": asset,
        }))
    }
}

// =============================================================================
// CREATE_IMAGE - OpenAI image generation
// =============================================================================

#[derive(Debug)]
pub struct CreateImageAction {
    meta: ActionMetadata,
    api: Arc<NftApi>,
}

impl CreateImageAction {
    pub fn new(api: Arc<NftApi>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "minLength": 1,
                    "maxLength": 1000,
                    "description": "Text description of the image to generate",
                },
                "size": {
                    "type": "string",
                    "enum": IMAGE_SIZES,
                    "default": DEFAULT_IMAGE_SIZE,
                    "description": "Image size",
                },
                "n": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 10,
                    "default": 1,
                    "description": "Number of images to generate",
                }
            },
            "required": ["prompt"],
            "additionalProperties": false,
        });

        let meta = ActionMetadata {
            name: "CREATE_IMAGE".to_string(),
            similes: vec![
                "generate image".to_string(),
                "create artwork".to_string(),
                "make image".to_string(),
                "generate artwork".to_string(),
                "create picture".to_string(),
                "generate picture".to_string(),
            ],
            description: "Create an AI-generated image based on a text prompt using OpenAI's DALL-E models".to_string(),
            examples: vec![ActionExample {
                input: json!({ "prompt": "A beautiful sunset over a mountain landscape", "size": "1024x1024", "n": 1 }),
                output: json!({
                    "status": "success",
                    "imageUrl": "https://example.com/image.png",
                    "images": ["https://example.com/image.png"],
                    "message": "Successfully generated 1 image(s)",
                }),
                explanation: "Generate an image of a sunset landscape".to_string(),
            }],
            input_schema,
        };

        Self { meta, api }
    }
}

#[async_trait]
impl Action for CreateImageAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Input {
            prompt: String,
            size: String,
            n: u8,
        }

        let input: Input = serde_json::from_value(input)?;
        let images = self
            .api
            .create_image(agent, &input.prompt, &input.size, input.n)
            .await
            .context("Image generation failed")?;

        Ok(json!({
            "status": "success",
            "imageUrl": images[0],
            "images": images,
            "message": format!("Successfully generated {} image(s)", images.len()),
        }))
    }
}
