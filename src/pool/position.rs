use alloy_primitives::{Address, U256};

use crate::FastMap;
use crate::Q128;
use crate::error::{Error, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::mul_div;

/// Identity of a position: owner plus tick range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionKey {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl PositionKey {
    pub const fn new(owner: Address, tick_lower: i32, tick_upper: i32) -> Self {
        Self {
            owner,
            tick_lower,
            tick_upper,
        }
    }
}

/// Liquidity and owed tokens of one owner over one tick range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub liquidity: u128,
    /// Fee growth inside the range as of the last update, Q128.128.
    pub fee_growth_inside_0_last_x128: U256,
    pub fee_growth_inside_1_last_x128: U256,
    /// Tokens owed to the owner: accrued fees plus burned principal.
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

/// Keeps the low 128 bits, the `uint128(x)` cast.
#[inline]
pub(crate) fn truncate_to_u128(value: U256) -> u128 {
    let limbs = value.as_limbs();
    (limbs[0] as u128) | ((limbs[1] as u128) << 64)
}

impl Position {
    /// Accrues fees earned since the last snapshot, applies
    /// `liquidity_delta` and moves the snapshot to the given fee growth.
    ///
    /// A zero delta is a poke: fees accrue, liquidity is unchanged.
    /// Owed amounts wrap at 2^128; they must be collected before that.
    ///
    /// # Errors
    ///
    /// - `LiquidityUnderflow` / `LiquidityOverflow` from the delta. The
    ///   position is left untouched.
    pub fn update(
        &mut self,
        liquidity_delta: i128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<(), Error> {
        let liquidity_next = add_delta(self.liquidity, liquidity_delta)?;
        let liquidity = U256::from(self.liquidity);

        let owed_0 = mul_div(
            fee_growth_inside_0_x128.wrapping_sub(self.fee_growth_inside_0_last_x128),
            liquidity,
            Q128,
        )?;
        let owed_1 = mul_div(
            fee_growth_inside_1_x128.wrapping_sub(self.fee_growth_inside_1_last_x128),
            liquidity,
            Q128,
        )?;

        self.liquidity = liquidity_next;
        self.fee_growth_inside_0_last_x128 = fee_growth_inside_0_x128;
        self.fee_growth_inside_1_last_x128 = fee_growth_inside_1_x128;
        self.tokens_owed_0 = self.tokens_owed_0.wrapping_add(truncate_to_u128(owed_0));
        self.tokens_owed_1 = self.tokens_owed_1.wrapping_add(truncate_to_u128(owed_1));

        Ok(())
    }

    /// Adds withdrawn principal to the owed balances.
    pub fn credit(&mut self, amount_0: u128, amount_1: u128) {
        self.tokens_owed_0 = self.tokens_owed_0.wrapping_add(amount_0);
        self.tokens_owed_1 = self.tokens_owed_1.wrapping_add(amount_1);
    }

    /// Takes up to the requested amounts out of the owed balances and
    /// returns what was taken.
    pub fn collect(&mut self, amount_0_requested: u128, amount_1_requested: u128) -> (u128, u128) {
        let amount_0 = amount_0_requested.min(self.tokens_owed_0);
        let amount_1 = amount_1_requested.min(self.tokens_owed_1);

        self.tokens_owed_0 -= amount_0;
        self.tokens_owed_1 -= amount_1;

        (amount_0, amount_1)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.liquidity == 0 && self.tokens_owed_0 == 0 && self.tokens_owed_1 == 0
    }
}

/// Positions of a pool by owner and range.
///
/// Entries are created by the first liquidity change and kept afterwards,
/// even once emptied, so that `collect` keeps working on them.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: FastMap<PositionKey, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position at the key, or a zeroed one if it was never written.
    pub fn get(&self, owner: Address, tick_lower: i32, tick_upper: i32) -> Position {
        self.positions
            .get(&PositionKey::new(owner, tick_lower, tick_upper))
            .copied()
            .unwrap_or_default()
    }

    /// Position at the key.
    ///
    /// # Errors
    ///
    /// - [`PoolError::PositionNotFound`] if no liquidity change ever
    ///   created it.
    pub fn assert_exists(
        &self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Result<Position, PoolError> {
        self.positions
            .get(&PositionKey::new(owner, tick_lower, tick_upper))
            .copied()
            .ok_or(PoolError::PositionNotFound)
    }

    /// Runs [`Position::update`] on the entry at the key, creating it if
    /// needed, and returns the updated position.
    pub fn update(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<Position, Error> {
        let mut position = self.get(owner, tick_lower, tick_upper);
        position.update(
            liquidity_delta,
            fee_growth_inside_0_x128,
            fee_growth_inside_1_x128,
        )?;
        self.store(owner, tick_lower, tick_upper, position);
        Ok(position)
    }

    /// Writes a position back.
    pub fn store(&mut self, owner: Address, tick_lower: i32, tick_upper: i32, position: Position) {
        self.positions
            .insert(PositionKey::new(owner, tick_lower, tick_upper), position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PositionKey, &Position)> {
        self.positions.iter()
    }
}
