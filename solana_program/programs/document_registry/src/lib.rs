// Solana program holding the registry of issued document hashes.
use anchor_lang::prelude::*;
use anchor_lang::solana_program::hash::hashv;

declare_id!("6fSQZwqdsr8zVSbE8DTo4tsHDW4af3iZyB5KGzEGqyW8");

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_HASH_LEN: usize = 128;
const DOCUMENT_SEED_DOMAIN: &[u8] = b"CERTDOC";

#[program]
pub mod document_registry {
    use super::*;

    pub fn init(ctx: Context<Init>, owner: Pubkey) -> Result<()> {
        ctx.accounts.config.owner = owner;
        Ok(())
    }

    pub fn store_document(
        ctx: Context<StoreDocument>,
        name: String,
        hash: String,
        hash_seed: [u8; 32],
    ) -> Result<()> {
        require!(name.len() <= MAX_NAME_LEN, RegistryError::NameTooLong);
        require!(hash.len() <= MAX_HASH_LEN, RegistryError::HashTooLong);
        require!(
            hashv(&[DOCUMENT_SEED_DOMAIN, hash.as_bytes()]).to_bytes() == hash_seed,
            RegistryError::SeedMismatch
        );

        let signer = ctx.accounts.signer.key();
        if signer != ctx.accounts.config.owner {
            let entry = ctx.accounts.whitelist_entry.to_account_info();
            let allowed = Account::<WhitelistEntry>::try_from(&entry)
                .map(|entry| entry.allowed)
                .unwrap_or(false);
            require!(allowed, RegistryError::NotAuthorized);
        }

        let document = &mut ctx.accounts.document;
        document.name = name;
        document.hash = hash;
        document.timestamp = Clock::get()?.unix_timestamp;
        document.added_by = signer;
        Ok(())
    }

    pub fn whitelist_address(ctx: Context<UpdateWhitelist>, _address: Pubkey) -> Result<()> {
        ctx.accounts.whitelist_entry.allowed = true;
        Ok(())
    }

    pub fn remove_from_whitelist(ctx: Context<UpdateWhitelist>, _address: Pubkey) -> Result<()> {
        ctx.accounts.whitelist_entry.allowed = false;
        Ok(())
    }

    pub fn transfer_ownership(ctx: Context<TransferOwnership>, new_owner: Pubkey) -> Result<()> {
        require_keys_neq!(new_owner, ctx.accounts.config.owner, RegistryError::SameOwner);
        ctx.accounts.config.owner = new_owner;
        Ok(())
    }
}

#[derive(Accounts)]
pub struct Init<'info> {
    #[account(
        init,
        payer = signer,
        space = 8 + RegistryConfig::INIT_SPACE,
        seeds = [b"registry_config"],
        bump
    )]
    pub config: Account<'info, RegistryConfig>,
    #[account(mut)]
    pub signer: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(name: String, hash: String, hash_seed: [u8; 32])]
pub struct StoreDocument<'info> {
    #[account(seeds = [b"registry_config"], bump)]
    pub config: Account<'info, RegistryConfig>,
    /// CHECK: may not exist; read only when the signer is not the owner.
    #[account(seeds = [b"whitelist", signer.key().as_ref()], bump)]
    pub whitelist_entry: UncheckedAccount<'info>,
    #[account(
        init,
        payer = signer,
        space = 8 + Document::INIT_SPACE,
        seeds = [b"document", hash_seed.as_ref()],
        bump
    )]
    pub document: Account<'info, Document>,
    #[account(mut)]
    pub signer: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(address: Pubkey)]
pub struct UpdateWhitelist<'info> {
    #[account(seeds = [b"registry_config"], bump, has_one = owner @ RegistryError::NotOwner)]
    pub config: Account<'info, RegistryConfig>,
    #[account(
        init_if_needed,
        payer = owner,
        space = 8 + WhitelistEntry::INIT_SPACE,
        seeds = [b"whitelist", address.as_ref()],
        bump
    )]
    pub whitelist_entry: Account<'info, WhitelistEntry>,
    #[account(mut)]
    pub owner: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct TransferOwnership<'info> {
    #[account(mut, seeds = [b"registry_config"], bump, has_one = owner @ RegistryError::NotOwner)]
    pub config: Account<'info, RegistryConfig>,
    pub owner: Signer<'info>,
}

#[account]
#[derive(InitSpace)]
pub struct RegistryConfig {
    pub owner: Pubkey,
}

#[account]
#[derive(InitSpace)]
pub struct Document {
    #[max_len(MAX_NAME_LEN)]
    pub name: String,
    #[max_len(MAX_HASH_LEN)]
    pub hash: String,
    pub timestamp: i64,
    pub added_by: Pubkey,
}

#[account]
#[derive(InitSpace)]
pub struct WhitelistEntry {
    pub allowed: bool,
}

#[error_code]
pub enum RegistryError {
    #[msg("not authorized: only owner or whitelisted address")]
    NotAuthorized,
    #[msg("only the owner may call this")]
    NotOwner,
    #[msg("document name too long")]
    NameTooLong,
    #[msg("document hash too long")]
    HashTooLong,
    #[msg("hash seed does not match the document hash")]
    SeedMismatch,
    #[msg("new owner must be different")]
    SameOwner,
}
