//! Metaplex NFT minting.

use anyhow::Result;
use mpl_token_metadata::accounts::{MasterEdition, Metadata};
use mpl_token_metadata::instructions::{
    CreateMasterEditionV3, CreateMasterEditionV3InstructionArgs, CreateMetadataAccountV3,
    CreateMetadataAccountV3InstructionArgs,
};
use mpl_token_metadata::types::{Collection, Creator, DataV2};
use solana_agent_core::{partial_sign, Agent, TxOutcome};
use solana_sdk::{
    instruction::Instruction,
    message::{v0, VersionedMessage},
    program_pack::Pack,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction, system_program,
    transaction::VersionedTransaction,
};
use spl_associated_token_account::{get_associated_token_address, instruction::create_associated_token_account};
use spl_token::instruction as token_instruction;
use tracing::info;

pub const DEFAULT_SELLER_FEE_BPS: u16 = 500;

#[derive(Debug, Clone)]
pub struct MintRequest {
    pub name: String,
    pub uri: String,
    pub symbol: String,
    pub seller_fee_basis_points: u16,
    pub collection: Option<Pubkey>,
    /// Defaults to the agent's wallet.
    pub recipient: Option<Pubkey>,
}

#[derive(Debug, Clone)]
pub struct MintedNft {
    pub mint: Pubkey,
    pub metadata: Pubkey,
    pub master_edition: Pubkey,
    pub token_account: Pubkey,
    pub recipient: Pubkey,
    pub outcome: TxOutcome,
}

/// Instructions creating a one-of-one NFT: mint account, recipient ATA, the
/// single token, its metadata and a zero-supply master edition.
pub fn mint_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    recipient: &Pubkey,
    rent: u64,
    req: &MintRequest,
) -> Result<Vec<Instruction>> {
    let token_account = get_associated_token_address(recipient, mint);
    let (metadata, _) = Metadata::find_pda(mint);
    let (edition, _) = MasterEdition::find_pda(mint);

    let data = DataV2 {
        name: req.name.clone(),
        symbol: req.symbol.clone(),
        uri: req.uri.clone(),
        seller_fee_basis_points: req.seller_fee_basis_points,
        creators: Some(vec![Creator {
            address: *payer,
            verified: true,
            share: 100,
        }]),
        // Verification is the collection authority's job.
        collection: req.collection.map(|key| Collection { verified: false, key }),
        uses: None,
    };

    Ok(vec![
        system_instruction::create_account(
            payer,
            mint,
            rent,
            spl_token::state::Mint::LEN as u64,
            &spl_token::id(),
        ),
        token_instruction::initialize_mint(&spl_token::id(), mint, payer, Some(payer), 0)?,
        create_associated_token_account(payer, recipient, mint, &spl_token::id()),
        token_instruction::mint_to(&spl_token::id(), mint, &token_account, payer, &[], 1)?,
        CreateMetadataAccountV3 {
            metadata,
            mint: *mint,
            mint_authority: *payer,
            payer: *payer,
            update_authority: (*payer, true),
            system_program: system_program::id(),
            rent: None,
        }
        .instruction(CreateMetadataAccountV3InstructionArgs {
            data,
            is_mutable: true,
            collection_details: None,
        }),
        CreateMasterEditionV3 {
            edition,
            mint: *mint,
            update_authority: *payer,
            mint_authority: *payer,
            payer: *payer,
            metadata,
            token_program: spl_token::id(),
            system_program: system_program::id(),
            rent: None,
        }
        .instruction(CreateMasterEditionV3InstructionArgs { max_supply: Some(0) }),
    ])
}

pub async fn mint_nft(agent: &Agent, req: &MintRequest) -> Result<MintedNft> {
    let payer = agent.pubkey();
    let recipient = req.recipient.unwrap_or(payer);
    let mint = Keypair::new();

    let rent = agent
        .chain()
        .get_minimum_balance_for_rent_exemption(spl_token::state::Mint::LEN)
        .await?;
    let instructions = mint_instructions(&payer, &mint.pubkey(), &recipient, rent, req)?;

    let blockhash = agent.chain().get_latest_blockhash().await?;
    let message = v0::Message::try_compile(&payer, &instructions, &[], blockhash)?;
    let mut tx = VersionedTransaction {
        signatures: vec![],
        message: VersionedMessage::V0(message),
    };
    partial_sign(&mut tx, &mint)?;

    let outcome = agent.sign_or_send(tx).await?;
    info!(mint = %mint.pubkey(), %recipient, name = %req.name, "minted nft");

    Ok(MintedNft {
        mint: mint.pubkey(),
        metadata: Metadata::find_pda(&mint.pubkey()).0,
        master_edition: MasterEdition::find_pda(&mint.pubkey()).0,
        token_account: get_associated_token_address(&recipient, &mint.pubkey()),
        recipient,
        outcome,
    })
}
