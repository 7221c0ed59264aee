//! Test doubles for the chain collaborator.
//!
//! Enabled for this crate's tests and, through the `testing` feature, for
//! plugin crates' tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};

use crate::agent::Agent;
use crate::chain::ChainClient;
use crate::config::AgentConfig;
use crate::wallet::KeypairWallet;

/// In-memory [`ChainClient`] that records submitted transactions and can be
/// told to fail every call.
pub struct StubChain {
    url: String,
    lamports: u64,
    token_balance: f64,
    decimals: u8,
    tps: Option<f64>,
    failure: Mutex<Option<String>>,
    sent: Mutex<Vec<VersionedTransaction>>,
    calls: AtomicUsize,
}

impl Default for StubChain {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8899".to_string(),
            lamports: 2_500_000_000,
            token_balance: 42.5,
            decimals: 6,
            tps: Some(3500.0),
            failure: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl StubChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_lamports(mut self, lamports: u64) -> Self {
        self.lamports = lamports;
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_tps(mut self, tps: Option<f64>) -> Self {
        self.tps = tps;
        self
    }

    /// Make every subsequent call fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock() = Some(message.to_string());
    }

    pub fn sent(&self) -> Vec<VersionedTransaction> {
        self.sent.lock().clone()
    }

    /// Number of collaborator calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().as_deref() {
            Some(message) => Err(anyhow!(message.to_string())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChainClient for StubChain {
    fn url(&self) -> String {
        self.url.clone()
    }

    async fn get_balance(&self, _owner: &Pubkey) -> Result<u64> {
        self.hit()?;
        Ok(self.lamports)
    }

    async fn get_token_account_balance(&self, _account: &Pubkey) -> Result<f64> {
        self.hit()?;
        Ok(self.token_balance)
    }

    async fn get_mint_decimals(&self, _mint: &Pubkey) -> Result<u8> {
        self.hit()?;
        Ok(self.decimals)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.hit()?;
        Ok(Hash::new_unique())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.hit()?;
        Ok(890_880 + data_len as u64 * 6_960)
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature> {
        self.hit()?;
        self.sent.lock().push(tx.clone());
        Ok(tx.signatures.first().copied().unwrap_or_default())
    }

    async fn request_airdrop(&self, _to: &Pubkey, _lamports: u64) -> Result<Signature> {
        self.hit()?;
        Ok(Signature::new_unique())
    }

    async fn get_tps(&self) -> Result<Option<f64>> {
        self.hit()?;
        Ok(self.tps)
    }
}

/// An agent over a fresh keypair and the given stub chain.
pub fn stub_agent(chain: Arc<StubChain>, config: AgentConfig) -> Agent {
    let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
    Agent::builder(wallet, chain).config(config).build()
}

/// Run every documented example of every registered action and list the
/// places where the live result no longer has the example's shape: a
/// different `status`, a missing field, or a field of another JSON type.
///
/// `prepare` sees each action name and example input before the call, so
/// tests can point URLs at a mock server or swap in throwaway keys.
pub async fn example_mismatches<F>(agent: &Agent, prepare: F) -> Vec<String>
where
    F: Fn(&str, Value) -> Value,
{
    let mut mismatches = Vec::new();
    for meta in agent.actions() {
        for (index, example) in meta.examples.iter().enumerate() {
            let label = format!("{}[{index}]", meta.name);
            let input = prepare(&meta.name, example.input.clone());
            let actual = agent.execute(&meta.name, input).await.to_value();

            let Some(expected) = example.output.as_object() else {
                mismatches.push(format!("{label}: example output is not an object"));
                continue;
            };
            if actual.get("status") != expected.get("status") {
                mismatches.push(format!("{label}: {actual}"));
                continue;
            }
            for (key, want) in expected {
                match actual.get(key) {
                    None => mismatches.push(format!("{label}: missing '{key}'")),
                    Some(got) if json_kind(got) != json_kind(want) => mismatches.push(format!(
                        "{label}: '{key}' is {} but the example shows {}",
                        json_kind(got),
                        json_kind(want)
                    )),
                    Some(_) => {}
                }
            }
        }
    }
    mismatches
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
