use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};

use crate::chain::ChainClient;

/// trait for signing Solana transactions.
/// allows for flexible wallet implementations, from local keypairs to remote signers.
#[async_trait]
pub trait Wallet: Send + Sync + Debug {
    fn pubkey(&self) -> Pubkey;

    async fn sign_transaction(&self, tx: VersionedTransaction) -> Result<VersionedTransaction>;

    async fn sign_all_transactions(
        &self,
        txs: Vec<VersionedTransaction>,
    ) -> Result<Vec<VersionedTransaction>> {
        let mut signed = Vec::with_capacity(txs.len());
        for tx in txs {
            signed.push(self.sign_transaction(tx).await?);
        }
        Ok(signed)
    }

    /// Sign and submit through the given chain client.
    async fn send_transaction(
        &self,
        tx: VersionedTransaction,
        chain: &dyn ChainClient,
    ) -> Result<Signature> {
        let signed = self.sign_transaction(tx).await?;
        chain.send_transaction(&signed).await
    }
}

/// Place `signer`'s signature at its own index among the message's required
/// signers, leaving any other signatures untouched.
pub fn partial_sign<S: Signer + ?Sized>(tx: &mut VersionedTransaction, signer: &S) -> Result<()> {
    let pubkey = signer.pubkey();
    let required = tx.message.header().num_required_signatures as usize;
    let index = tx
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|key| *key == pubkey)
        .ok_or_else(|| anyhow!("{pubkey} is not a required signer of this transaction"))?;

    if tx.signatures.len() < required {
        tx.signatures.resize(required, Signature::default());
    }
    tx.signatures[index] = signer.sign_message(&tx.message.serialize());
    Ok(())
}

/// wallet implementation using a local Solana Keypair.
#[derive(Debug)]
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Build from a base58-encoded 64-byte secret key.
    pub fn from_base58(secret: &str) -> Result<Self> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .context("secret key is not valid base58")?;
        let keypair =
            Keypair::from_bytes(&bytes).map_err(|e| anyhow!("invalid secret key: {e}"))?;
        Ok(Self::new(keypair))
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

#[async_trait]
impl Wallet for KeypairWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, mut tx: VersionedTransaction) -> Result<VersionedTransaction> {
        partial_sign(&mut tx, self.keypair.as_ref())?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        message::{v0, VersionedMessage},
        system_instruction, system_program,
    };

    fn unsigned(payer: &Pubkey, instructions: &[solana_sdk::instruction::Instruction]) -> VersionedTransaction {
        let message = v0::Message::try_compile(payer, instructions, &[], Hash::default()).unwrap();
        VersionedTransaction {
            signatures: vec![],
            message: VersionedMessage::V0(message),
        }
    }

    #[tokio::test]
    async fn keypair_wallet_signs_as_fee_payer() {
        let wallet = KeypairWallet::new(Keypair::new());
        let to = Pubkey::new_unique();
        let tx = unsigned(&wallet.pubkey(), &[system_instruction::transfer(&wallet.pubkey(), &to, 10)]);

        let signed = wallet.sign_transaction(tx).await.unwrap();
        assert_eq!(signed.signatures.len(), 1);
        assert_eq!(signed.verify_with_results(), vec![true]);
    }

    #[tokio::test]
    async fn partial_signatures_are_preserved() {
        let wallet = KeypairWallet::new(Keypair::new());
        let mint = Keypair::new();
        let ix = system_instruction::create_account(
            &wallet.pubkey(),
            &mint.pubkey(),
            1_000,
            82,
            &system_program::id(),
        );
        let mut tx = unsigned(&wallet.pubkey(), &[ix]);

        partial_sign(&mut tx, &mint).unwrap();
        let signed = wallet.sign_transaction(tx).await.unwrap();

        assert_eq!(signed.signatures.len(), 2);
        assert_eq!(signed.verify_with_results(), vec![true, true]);
    }

    #[test]
    fn partial_sign_rejects_strangers() {
        let payer = Keypair::new();
        let mut tx = unsigned(
            &payer.pubkey(),
            &[system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1)],
        );
        let err = partial_sign(&mut tx, &Keypair::new()).unwrap_err();
        assert!(err.to_string().contains("not a required signer"));
    }

    #[test]
    fn base58_secret_round_trip() {
        let keypair = Keypair::new();
        let wallet = KeypairWallet::from_base58(&keypair.to_base58_string()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());

        assert!(KeypairWallet::from_base58("not-base58-0OIl").is_err());
        assert!(KeypairWallet::from_base58("3yZe7d").is_err());
    }
}
