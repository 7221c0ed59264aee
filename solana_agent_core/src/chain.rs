//! The blockchain RPC collaborator.
//!
//! Actions never talk to `solana-client` directly; they go through
//! [`ChainClient`] so the agent can be pointed at a test double.

use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction,
};

/// Parse an address from user input, naming the field in the error.
pub fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|e| anyhow!("invalid {field} address '{value}': {e}"))
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// JSON-RPC endpoint, for raw requests (DAS and friends).
    fn url(&self) -> String;

    /// Native balance in lamports.
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64>;

    /// UI amount held by an SPL token account.
    async fn get_token_account_balance(&self, account: &Pubkey) -> Result<f64>;

    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<u8>;

    async fn get_latest_blockhash(&self) -> Result<Hash>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    /// Submit an already signed transaction and wait for confirmation.
    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature>;

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature>;

    /// Transactions per second over the most recent performance sample,
    /// `None` when the node has no samples yet.
    async fn get_tps(&self) -> Result<Option<f64>>;
}

#[async_trait]
impl ChainClient for RpcClient {
    fn url(&self) -> String {
        RpcClient::url(self)
    }

    async fn get_balance(&self, owner: &Pubkey) -> Result<u64> {
        Ok(RpcClient::get_balance(self, owner).await?)
    }

    async fn get_token_account_balance(&self, account: &Pubkey) -> Result<f64> {
        let amount = RpcClient::get_token_account_balance(self, account).await?;
        Ok(amount.ui_amount.unwrap_or(0.0))
    }

    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<u8> {
        let supply = RpcClient::get_token_supply(self, mint)
            .await
            .with_context(|| format!("failed to load mint {mint}"))?;
        Ok(supply.decimals)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(RpcClient::get_latest_blockhash(self).await?)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(RpcClient::get_minimum_balance_for_rent_exemption(self, data_len).await?)
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature> {
        Ok(RpcClient::send_and_confirm_transaction(self, tx).await?)
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature> {
        let signature = RpcClient::request_airdrop(self, to, lamports).await?;
        RpcClient::poll_for_signature(self, &signature).await?;
        Ok(signature)
    }

    async fn get_tps(&self) -> Result<Option<f64>> {
        let samples = RpcClient::get_recent_performance_samples(self, Some(1)).await?;
        Ok(samples.first().map(|sample| {
            if sample.sample_period_secs > 0 {
                sample.num_transactions as f64 / sample.sample_period_secs as f64
            } else {
                0.0
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pubkey_errors_name_the_field() {
        let err = parse_pubkey("recipient", "nope").unwrap_err();
        assert!(err.to_string().starts_with("invalid recipient address 'nope'"));
        assert!(parse_pubkey("mint", " EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v ").is_ok());
    }
}
