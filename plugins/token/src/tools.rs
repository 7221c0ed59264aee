//! Typed token operations. Actions and the plugin's method table both call
//! into these.

use std::sync::Arc;

use anyhow::{bail, ensure, Result};
use serde_json::{json, Value};
use solana_agent_core::units::{lamports_to_sol, to_base_units, SOL_DECIMALS};
use solana_agent_core::{Agent, KeypairWallet, TxOutcome, Wallet};
use solana_sdk::{
    instruction::Instruction,
    message::{v0, VersionedMessage},
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::Signature,
    system_instruction,
    transaction::VersionedTransaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use tracing::info;

const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
const FAUCET_LAMPORTS: u64 = 5 * LAMPORTS_PER_SOL;

pub use solana_agent_core::parse_pubkey;

/// Balance of the agent's wallet in SOL, or in UI units of `mint`.
pub async fn get_balance(agent: &Agent, mint: Option<Pubkey>) -> Result<f64> {
    let owner = agent.pubkey();
    match mint {
        None => Ok(lamports_to_sol(agent.chain().get_balance(&owner).await?)),
        Some(mint) => {
            let account = get_associated_token_address(&owner, &mint);
            agent.chain().get_token_account_balance(&account).await
        }
    }
}

/// Build the instructions for a SOL or SPL transfer from the agent's wallet.
pub async fn transfer_instructions(
    agent: &Agent,
    to: Pubkey,
    amount: f64,
    mint: Option<Pubkey>,
) -> Result<Vec<Instruction>> {
    ensure!(amount > 0.0, "amount must be positive");
    let from = agent.pubkey();

    match mint {
        None => Ok(vec![system_instruction::transfer(
            &from,
            &to,
            to_base_units(amount, SOL_DECIMALS)?,
        )]),
        Some(mint) => {
            let decimals = agent.chain().get_mint_decimals(&mint).await?;
            let raw = to_base_units(amount, decimals)?;
            let source = get_associated_token_address(&from, &mint);
            let destination = get_associated_token_address(&to, &mint);
            Ok(vec![
                create_associated_token_account_idempotent(&from, &to, &mint, &spl_token::id()),
                spl_token::instruction::transfer_checked(
                    &spl_token::id(),
                    &source,
                    &mint,
                    &destination,
                    &from,
                    &[],
                    raw,
                    decimals,
                )?,
            ])
        }
    }
}

/// Compile `instructions` with the agent as fee payer and hand the result to
/// the agent's transaction sender.
pub async fn submit(agent: &Agent, instructions: &[Instruction]) -> Result<TxOutcome> {
    let payer = agent.pubkey();
    let blockhash = agent.chain().get_latest_blockhash().await?;
    let message = v0::Message::try_compile(&payer, instructions, &[], blockhash)?;
    let tx = VersionedTransaction {
        signatures: vec![],
        message: VersionedMessage::V0(message),
    };
    agent.sign_or_send(tx).await
}

pub async fn transfer(agent: &Agent, to: Pubkey, amount: f64, mint: Option<Pubkey>) -> Result<TxOutcome> {
    let instructions = transfer_instructions(agent, to, amount, mint).await?;
    let outcome = submit(agent, &instructions).await?;
    info!(%to, amount, mint = ?mint, "transfer submitted");
    Ok(outcome)
}

pub fn get_wallet_address(agent: &Agent) -> String {
    agent.pubkey().to_string()
}

pub async fn request_faucet_funds(agent: &Agent) -> Result<Signature> {
    agent.chain().request_airdrop(&agent.pubkey(), FAUCET_LAMPORTS).await
}

pub async fn get_tps(agent: &Agent) -> Result<f64> {
    match agent.chain().get_tps().await? {
        Some(tps) => Ok(tps),
        None => bail!("No performance samples available"),
    }
}

/// Replace the agent's wallet with one built from a base58 secret key.
pub fn use_wallet(agent: &Agent, secret_key: &str) -> Result<Pubkey> {
    let wallet = KeypairWallet::from_base58(secret_key)?;
    let pubkey = wallet.pubkey();
    agent.set_wallet(Arc::new(wallet));
    Ok(pubkey)
}

/// SOL plus every non-empty SPL token account of `owner`, via
/// `getTokenAccountsByOwner` on the agent's RPC endpoint.
pub async fn get_token_balances(agent: &Agent, http: &reqwest::Client, owner: Pubkey) -> Result<Value> {
    let lamports = agent.chain().get_balance(&owner).await?;

    let request = json!({
        "jsonrpc": "2.0",
        "id": "token-balances",
        "method": "getTokenAccountsByOwner",
        "params": [
            owner.to_string(),
            { "programId": TOKEN_PROGRAM },
            { "encoding": "jsonParsed" }
        ]
    });

    let response = http
        .post(agent.chain().url())
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await?
        .error_for_status()?;
    let data: Value = response.json().await?;
    if let Some(err) = data.get("error") {
        bail!("RPC error: {}", err["message"].as_str().unwrap_or("unknown"));
    }

    let mut tokens = Vec::new();
    for account in data["result"]["value"].as_array().into_iter().flatten() {
        let info = &account["account"]["data"]["parsed"]["info"];
        let ui_amount = info["tokenAmount"]["uiAmount"].as_f64().unwrap_or(0.0);
        if ui_amount > 0.0 {
            tokens.push(json!({
                "tokenAddress": info["mint"],
                "balance": ui_amount,
                "decimals": info["tokenAmount"]["decimals"],
                "account": account["pubkey"],
            }));
        }
    }

    Ok(json!({
        "sol": lamports_to_sol(lamports),
        "tokens": tokens,
    }))
}

