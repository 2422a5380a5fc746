use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::error::Error;
use crate::protocols::{WSOL_MINT, account_at, wrap_address};
use crate::types::RawInstruction;

/// Accounts of the AMM v4 pool-initialization instruction, by position.
///
/// The positions are fixed by the program's instruction layout. Offsets 1-3, 12 and 14
/// (token/system programs, rent sysvar, lp vault, config) are not recorded.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::EnumIter,
    strum_macros::Display,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum PoolField {
    ProgramId,
    AmmId,
    AmmAuthority,
    AmmOpenOrders,
    LpMint,
    CoinMint,
    PcMint,
    CoinVault,
    PcVault,
    AmmTargetOrders,
    SerumProgram,
    SerumMarket,
    Deployer,
}

impl PoolField {
    pub fn offset(self) -> usize {
        match self {
            Self::ProgramId => 0,
            Self::AmmId => 4,
            Self::AmmAuthority => 5,
            Self::AmmOpenOrders => 6,
            Self::LpMint => 7,
            Self::CoinMint => 8,
            Self::PcMint => 9,
            Self::CoinVault => 10,
            Self::PcVault => 11,
            Self::AmmTargetOrders => 13,
            Self::SerumProgram => 15,
            Self::SerumMarket => 16,
            Self::Deployer => 17,
        }
    }

    /// Shortest account list that covers every field.
    pub fn required_accounts() -> usize {
        Self::iter().map(Self::offset).max().unwrap_or_default() + 1
    }
}

/// Normalized description of one liquidity pool, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDescriptor {
    pub program_id: String,
    pub amm_id: String,
    pub amm_authority: String,
    pub amm_open_orders: String,
    pub lp_mint: String,
    pub coin_mint: String,
    pub pc_mint: String,
    pub coin_vault: String,
    pub pc_vault: String,
    pub amm_target_orders: String,
    pub serum_market: String,
    pub serum_program: String,
    pub deployer: String,
}

impl PoolDescriptor {
    pub fn get(&self, field: PoolField) -> &str {
        match field {
            PoolField::ProgramId => &self.program_id,
            PoolField::AmmId => &self.amm_id,
            PoolField::AmmAuthority => &self.amm_authority,
            PoolField::AmmOpenOrders => &self.amm_open_orders,
            PoolField::LpMint => &self.lp_mint,
            PoolField::CoinMint => &self.coin_mint,
            PoolField::PcMint => &self.pc_mint,
            PoolField::CoinVault => &self.coin_vault,
            PoolField::PcVault => &self.pc_vault,
            PoolField::AmmTargetOrders => &self.amm_target_orders,
            PoolField::SerumProgram => &self.serum_program,
            PoolField::SerumMarket => &self.serum_market,
            PoolField::Deployer => &self.deployer,
        }
    }
}

/// Project the pool-initialization instruction's accounts into a [`PoolDescriptor`].
///
/// The result is not yet canonical; see [`canonicalize`].
pub fn decode_pool(ix: &RawInstruction, account_keys: &[String]) -> Result<PoolDescriptor, Error> {
    let indices = ix
        .accounts
        .as_deref()
        .ok_or_else(|| Error::MalformedInstruction {
            reason: "pool instruction has no account list".into(),
        })?;

    let required = PoolField::required_accounts();
    if indices.len() < required {
        return Err(Error::MalformedInstruction {
            reason: format!(
                "pool instruction lists {} accounts, need at least {required}",
                indices.len()
            ),
        });
    }

    let address = |field: PoolField| -> Result<String, Error> {
        let offset = field.offset();
        wrap_address(offset, account_at(account_keys, indices, offset)?)
    };

    Ok(PoolDescriptor {
        program_id: address(PoolField::ProgramId)?,
        amm_id: address(PoolField::AmmId)?,
        amm_authority: address(PoolField::AmmAuthority)?,
        amm_open_orders: address(PoolField::AmmOpenOrders)?,
        lp_mint: address(PoolField::LpMint)?,
        coin_mint: address(PoolField::CoinMint)?,
        pc_mint: address(PoolField::PcMint)?,
        coin_vault: address(PoolField::CoinVault)?,
        pc_vault: address(PoolField::PcVault)?,
        amm_target_orders: address(PoolField::AmmTargetOrders)?,
        serum_market: address(PoolField::SerumMarket)?,
        serum_program: address(PoolField::SerumProgram)?,
        deployer: address(PoolField::Deployer)?,
    })
}

/// Keep wrapped SOL on the quote side.
///
/// Only the mint pair moves; vaults keep the positions they were decoded from.
pub fn canonicalize(mut pool: PoolDescriptor) -> PoolDescriptor {
    if pool.coin_mint == WSOL_MINT {
        std::mem::swap(&mut pool.coin_mint, &mut pool.pc_mint);
    }
    pool
}
