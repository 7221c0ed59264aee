//! Signing and submission of transactions built by actions.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction};
use tracing::debug;

use crate::agent::Agent;

/// What happened to a transaction handed to [`Agent::sign_or_send`].
#[derive(Debug, Clone)]
pub enum TxOutcome {
    /// Submitted and confirmed.
    Sent(Signature),
    /// Signed only; the caller is responsible for submission.
    Signed(VersionedTransaction),
}

impl TxOutcome {
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            TxOutcome::Sent(signature) => Some(signature),
            TxOutcome::Signed(_) => None,
        }
    }

    /// Envelope fields: `signature`, or a base64 `signedTransaction`.
    pub fn to_fields(&self) -> Result<Value> {
        match self {
            TxOutcome::Sent(signature) => Ok(json!({ "signature": signature.to_string() })),
            TxOutcome::Signed(tx) => {
                let encoded = encode_transaction(tx).context("failed to serialize signed transaction")?;
                Ok(json!({ "signedTransaction": encoded }))
            }
        }
    }
}

/// Pluggable signing/sending strategy for an agent.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    async fn sign_or_send(&self, agent: &Agent, tx: VersionedTransaction) -> Result<TxOutcome>;
}

/// Default strategy: sign with the agent's current wallet and either return
/// the signed transaction (`SIGN_ONLY`) or submit it through the agent's
/// chain client.
#[derive(Debug, Default, Clone, Copy)]
pub struct WalletSender;

#[async_trait]
impl TransactionSender for WalletSender {
    async fn sign_or_send(&self, agent: &Agent, tx: VersionedTransaction) -> Result<TxOutcome> {
        let wallet = agent.wallet();
        if agent.config().sign_only {
            debug!(signer = %wallet.pubkey(), "signing transaction without sending");
            return Ok(TxOutcome::Signed(wallet.sign_transaction(tx).await?));
        }
        let signature = wallet.send_transaction(tx, agent.chain()).await?;
        debug!(%signature, "transaction confirmed");
        Ok(TxOutcome::Sent(signature))
    }
}

/// Decode a base64, bincode-serialized transaction as returned by swap,
/// staking and blink APIs.
pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .context("transaction is not valid base64")?;
    bincode::deserialize(&bytes).context("transaction bytes do not decode")
}

/// Inverse of [`decode_transaction`].
pub fn encode_transaction(tx: &VersionedTransaction) -> Result<String> {
    Ok(STANDARD.encode(bincode::serialize(tx)?))
}

/// Decode a transaction prepared by a third-party API and hand it to the
/// agent's sender.
///
/// The blockhash is refreshed unless another party already signed the
/// transaction; rewriting the message would invalidate that signature.
pub async fn submit_encoded(agent: &Agent, encoded: &str) -> Result<TxOutcome> {
    let mut tx = decode_transaction(encoded)?;
    if has_foreign_signatures(&tx, &agent.pubkey()) {
        debug!("keeping the provided blockhash of a co-signed transaction");
    } else {
        let blockhash = agent.chain().get_latest_blockhash().await?;
        tx.message.set_recent_blockhash(blockhash);
    }
    agent.sign_or_send(tx).await
}

fn has_foreign_signatures(tx: &VersionedTransaction, signer: &Pubkey) -> bool {
    let keys = tx.message.static_account_keys();
    tx.signatures
        .iter()
        .zip(keys)
        .any(|(signature, key)| key != signer && *signature != Signature::default())
}
