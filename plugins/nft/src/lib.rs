//! NFT plugin: Metaplex minting, DAS asset lookup and image generation.

pub mod actions;
pub mod api;
pub mod mint;

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_agent_core::{parse_pubkey, Action, Agent, MethodTable, Plugin};

use crate::actions::{CreateImageAction, GetAssetAction, MintNftAction};
pub use crate::api::NftApi;
use crate::api::DEFAULT_IMAGE_SIZE;
use crate::mint::{mint_nft, MintRequest, DEFAULT_SELLER_FEE_BPS};

pub const PLUGIN_NAME: &str = "nft";

#[derive(Debug, Clone, Default)]
pub struct NftPlugin {
    api: Arc<NftApi>,
}

impl NftPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api(api: NftApi) -> Self {
        Self { api: Arc::new(api) }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintArgs {
    name: String,
    uri: String,
    #[serde(default)]
    symbol: String,
    seller_fee_basis_points: Option<u16>,
    collection_mint: Option<String>,
    recipient: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetArgs {
    asset_id: String,
}

#[derive(Deserialize)]
struct ImageArgs {
    prompt: String,
    size: Option<String>,
    n: Option<u8>,
}

impl Plugin for NftPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn methods(&self) -> MethodTable {
        let asset_api = self.api.clone();
        let image_api = self.api.clone();

        MethodTable::new()
            .with("mint_nft", |agent: Agent, input: Value| async move {
                let args: MintArgs = serde_json::from_value(input)?;
                let req = MintRequest {
                    name: args.name,
                    uri: args.uri,
                    symbol: args.symbol,
                    seller_fee_basis_points: args.seller_fee_basis_points.unwrap_or(DEFAULT_SELLER_FEE_BPS),
                    collection: args
                        .collection_mint
                        .as_deref()
                        .map(|m| parse_pubkey("collection mint", m))
                        .transpose()?,
                    recipient: args.recipient.as_deref().map(|r| parse_pubkey("recipient", r)).transpose()?,
                };
                let minted = mint_nft(&agent, &req).await?;
                Ok(json!({ "mint": minted.mint.to_string(), "tx": minted.outcome.to_fields()? }))
            })
            .with("get_asset", move |agent: Agent, input: Value| {
                let api = asset_api.clone();
                async move {
                    let args: AssetArgs = serde_json::from_value(input)?;
                    api.get_asset(&agent, &args.asset_id).await
                }
            })
            .with("create_image", move |agent: Agent, input: Value| {
                let api = image_api.clone();
                async move {
                    let args: ImageArgs = serde_json::from_value(input)?;
                    let size = args.size.as_deref().unwrap_or(DEFAULT_IMAGE_SIZE);
                    let images = api.create_image(&agent, &args.prompt, size, args.n.unwrap_or(1)).await?;
                    Ok(json!(images))
                }
            })
    }

    fn actions(&self) -> Vec<Arc<dyn Action>> {
        vec![
            Arc::new(MintNftAction::new()),
            Arc::new(GetAssetAction::new(self.api.clone())),
            Arc::new(CreateImageAction::new(self.api.clone())),
        ]
    }

    fn initialize(&self, agent: &Agent) -> Result<()> {
        agent.require_config(PLUGIN_NAME, "OPENAI_API_KEY");
        Ok(())
    }
}
