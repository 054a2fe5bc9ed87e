//! Token accounting the pool settles against.
//!
//! The pool never holds balances itself: each of its two tokens is backed
//! by a [`TokenLedger`] that tracks the pool's custody and what owners have
//! been paid out. Ledgers are only called after an operation has passed
//! every internal check.

use crate::FastMap;
use crate::error::LedgerError;
use alloy_primitives::{Address, I256, U256};

/// One of the two tokens of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenSlot {
    Token0,
    Token1,
}

impl TokenSlot {
    /// Token a swap in the given direction takes in.
    #[inline]
    pub const fn input(zero_for_one: bool) -> Self {
        if zero_for_one { Self::Token0 } else { Self::Token1 }
    }

    /// Token a swap in the given direction pays out.
    #[inline]
    pub const fn output(zero_for_one: bool) -> Self {
        if zero_for_one { Self::Token1 } else { Self::Token0 }
    }
}

/// Fungible-balance ledger of a single token.
///
/// An operation settles at most two legs. When a later leg fails, the pool
/// hands an earlier deposit back with a positive [`transfer`] of the same
/// amount to the same owner, so implementations must accept a transfer
/// that custody covers.
///
/// [`transfer`]: TokenLedger::transfer
pub trait TokenLedger {
    /// Moves `amount` from `owner` into pool custody.
    fn deposit(&mut self, owner: Address, amount: U256) -> Result<(), LedgerError>;

    /// Moves a signed `amount` out of pool custody to `owner`; a negative
    /// amount moves tokens from `owner` back into custody.
    fn transfer(&mut self, owner: Address, amount: I256) -> Result<(), LedgerError>;

    /// Tokens `owner` has received from the pool and still holds.
    fn balance_of(&self, owner: Address) -> U256;

    /// Tokens held in pool custody.
    fn total_supply(&self) -> U256;
}

/// In-memory [`TokenLedger`].
///
/// Deposits are unfunded: an owner can always pay in, which is what
/// simulators driving a pool want.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    reserve: U256,
    balances: FastMap<Address, U256>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenLedger for InMemoryLedger {
    fn deposit(&mut self, _owner: Address, amount: U256) -> Result<(), LedgerError> {
        self.reserve = self
            .reserve
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    fn transfer(&mut self, owner: Address, amount: I256) -> Result<(), LedgerError> {
        let magnitude = amount.unsigned_abs();
        let balance = self.balances.get(&owner).copied().unwrap_or_default();

        let (reserve, balance) = if amount.is_negative() {
            (
                self.reserve
                    .checked_add(magnitude)
                    .ok_or(LedgerError::Overflow)?,
                balance
                    .checked_sub(magnitude)
                    .ok_or(LedgerError::InsufficientReserve)?,
            )
        } else {
            (
                self.reserve
                    .checked_sub(magnitude)
                    .ok_or(LedgerError::InsufficientReserve)?,
                balance.checked_add(magnitude).ok_or(LedgerError::Overflow)?,
            )
        };

        self.reserve = reserve;
        self.balances.insert(owner, balance);
        Ok(())
    }

    fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    fn total_supply(&self) -> U256 {
        self.reserve
    }
}
