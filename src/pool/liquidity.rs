//! Liquidity modification: mint, burn and collect.
//!
//! A modification is first staged against copies of the two boundary
//! ticks, the position and the in-range liquidity. It is written back only
//! once every check has passed and the token ledgers have settled.

use alloy_primitives::{Address, I256, U256};

use crate::error::{Error, MathError, PoolError};
use crate::ledger::{TokenLedger, TokenSlot};
use crate::math::liquidity_math::add_delta;
use crate::math::sqrt_price_math::{get_amount_0_delta, get_amount_1_delta};
use crate::math::tick_math::{get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio};
use crate::pool::engine::PoolEngine;
use crate::pool::position::{Position, truncate_to_u128};
use crate::pool::tick::{TickInfo, fee_growth_inside};

/// Result of a burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnResult {
    /// Token0 released from liquidity (`<= 0`, leaving the range).
    pub amount0: I256,
    /// Token1 released from liquidity (`<= 0`, leaving the range).
    pub amount1: I256,
    /// Owed balances of the position after the burn was credited.
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

/// A liquidity change computed but not yet written.
#[derive(Debug, Clone, Copy)]
struct StagedModification {
    lower: TickInfo,
    upper: TickInfo,
    flipped_lower: bool,
    flipped_upper: bool,
    position: Position,
    liquidity: u128,
    amount0: I256,
    amount1: I256,
}

/// Token amounts matching a liquidity change over `[tick_lower, tick_upper)`
/// for a pool at `tick_current` / `sqrt_price_x96`.
///
/// Below the range only token0 is involved, above it only token1, inside
/// it both. Amounts are rounded up for deposits and down for withdrawals.
fn amounts_for_liquidity_delta(
    tick_current: i32,
    sqrt_price_x96: U256,
    tick_lower: i32,
    tick_upper: i32,
    liquidity_delta: i128,
) -> Result<(I256, I256), Error> {
    if liquidity_delta == 0 {
        return Ok((I256::ZERO, I256::ZERO));
    }
    let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
    let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;

    if tick_current < tick_lower {
        Ok((
            get_amount_0_delta(sqrt_lower, sqrt_upper, liquidity_delta)?,
            I256::ZERO,
        ))
    } else if tick_current < tick_upper {
        Ok((
            get_amount_0_delta(sqrt_price_x96, sqrt_upper, liquidity_delta)?,
            get_amount_1_delta(sqrt_lower, sqrt_price_x96, liquidity_delta)?,
        ))
    } else {
        Ok((
            I256::ZERO,
            get_amount_1_delta(sqrt_lower, sqrt_upper, liquidity_delta)?,
        ))
    }
}

/// Quotes the token amounts a liquidity change over a range needs
/// (positive) or releases (negative) at the given price.
pub fn get_amounts_for_liquidity(
    sqrt_price_x96: U256,
    tick_lower: i32,
    tick_upper: i32,
    liquidity_delta: i128,
) -> Result<(I256, I256), Error> {
    let tick_current = get_tick_at_sqrt_ratio(sqrt_price_x96)?;
    amounts_for_liquidity_delta(
        tick_current,
        sqrt_price_x96,
        tick_lower,
        tick_upper,
        liquidity_delta,
    )
}

impl<L: TokenLedger> PoolEngine<L> {
    /// Stages a liquidity change for a position without writing anything.
    fn stage_modify_position(
        &self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<StagedModification, Error> {
        Self::check_ticks(tick_lower, tick_upper)?;

        let tick_current = self.slot0.tick;
        let max_liquidity = self.config.max_liquidity_per_tick();
        let (global_0, global_1) = (self.fee_growth_global_0_x128, self.fee_growth_global_1_x128);

        let ((lower, flipped_lower), (upper, flipped_upper)) = if liquidity_delta != 0 {
            (
                self.ticks.preview_update(
                    tick_lower,
                    tick_current,
                    liquidity_delta,
                    global_0,
                    global_1,
                    false,
                    max_liquidity,
                )?,
                self.ticks.preview_update(
                    tick_upper,
                    tick_current,
                    liquidity_delta,
                    global_0,
                    global_1,
                    true,
                    max_liquidity,
                )?,
            )
        } else {
            (
                (self.ticks.get(tick_lower).copied().unwrap_or_default(), false),
                (self.ticks.get(tick_upper).copied().unwrap_or_default(), false),
            )
        };

        let spacing = self.config.tick_spacing();
        for (tick, flipped) in [(tick_lower, flipped_lower), (tick_upper, flipped_upper)] {
            if flipped && tick % spacing != 0 {
                return Err(PoolError::MisalignedTick { tick, spacing }.into());
            }
        }

        let (inside_0, inside_1) = fee_growth_inside(
            &lower,
            &upper,
            tick_lower,
            tick_upper,
            tick_current,
            global_0,
            global_1,
        );

        let mut position = self.positions.get(owner, tick_lower, tick_upper);
        position.update(liquidity_delta, inside_0, inside_1)?;

        let in_range = tick_lower <= tick_current && tick_current < tick_upper;
        let liquidity = if in_range {
            add_delta(self.liquidity, liquidity_delta)?
        } else {
            self.liquidity
        };

        let (amount0, amount1) = amounts_for_liquidity_delta(
            tick_current,
            self.slot0.sqrt_price_x96,
            tick_lower,
            tick_upper,
            liquidity_delta,
        )?;

        Ok(StagedModification {
            lower,
            upper,
            flipped_lower,
            flipped_upper,
            position,
            liquidity,
            amount0,
            amount1,
        })
    }

    fn commit_modification(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
        staged: &StagedModification,
    ) {
        if liquidity_delta != 0 {
            self.ticks.store(tick_lower, staged.lower);
            self.ticks.store(tick_upper, staged.upper);
        }
        if liquidity_delta < 0 {
            if staged.flipped_lower {
                self.ticks.clear(tick_lower);
            }
            if staged.flipped_upper {
                self.ticks.clear(tick_upper);
            }
        }
        self.positions
            .store(owner, tick_lower, tick_upper, staged.position);
        self.liquidity = staged.liquidity;
    }

    /// Adds `amount` liquidity to `owner`'s position over the range and
    /// takes the required tokens from `owner`. Returns the amounts charged.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ZeroAmount`] for a zero amount.
    /// - [`PoolError::InvalidRange`], [`PoolError::MisalignedTick`],
    ///   [`PoolError::LiquidityCapExceeded`] from the range checks.
    /// - [`PoolError::InsufficientDeposit`] if the ledgers' custody did not
    ///   grow by the charged amounts.
    pub fn mint(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<(U256, U256), Error> {
        self.require_initialized()?;
        if amount == 0 {
            return Err(PoolError::ZeroAmount.into());
        }
        let liquidity_delta = i128::try_from(amount).map_err(|_| MathError::LiquidityOverflow)?;

        let staged = self.stage_modify_position(owner, tick_lower, tick_upper, liquidity_delta)?;
        let amount0 = staged.amount0.into_raw();
        let amount1 = staged.amount1.into_raw();

        self.deposit_checked(TokenSlot::Token0, owner, amount0)?;
        if let Err(error) = self.deposit_checked(TokenSlot::Token1, owner, amount1) {
            self.refund(TokenSlot::Token0, owner, amount0);
            return Err(error);
        }

        self.commit_modification(owner, tick_lower, tick_upper, liquidity_delta, &staged);

        tracing::debug!(
            %owner,
            tick_lower,
            tick_upper,
            liquidity = amount,
            %amount0,
            %amount1,
            "minted"
        );
        Ok((amount0, amount1))
    }

    /// Removes `amount` liquidity from `owner`'s position and credits the
    /// released tokens to the position's owed balances. Nothing is
    /// transferred; use [`PoolEngine::collect`] for that.
    ///
    /// A zero amount pokes the position: fees accrue, nothing else changes.
    ///
    /// # Errors
    ///
    /// - [`PoolError::PositionNotFound`] for a position never minted.
    /// - `LiquidityUnderflow` when burning more than the position holds.
    pub fn burn(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<BurnResult, Error> {
        self.require_initialized()?;
        self.positions.assert_exists(owner, tick_lower, tick_upper)?;
        let liquidity_delta = i128::try_from(amount)
            .map(|amount| -amount)
            .map_err(|_| MathError::LiquidityUnderflow)?;

        let mut staged =
            self.stage_modify_position(owner, tick_lower, tick_upper, liquidity_delta)?;

        let released0 = truncate_to_u128(staged.amount0.unsigned_abs());
        let released1 = truncate_to_u128(staged.amount1.unsigned_abs());
        staged.position.credit(released0, released1);

        self.commit_modification(owner, tick_lower, tick_upper, liquidity_delta, &staged);

        tracing::debug!(
            %owner,
            tick_lower,
            tick_upper,
            liquidity = amount,
            released0,
            released1,
            "burned"
        );
        Ok(BurnResult {
            amount0: staged.amount0,
            amount1: staged.amount1,
            tokens_owed_0: staged.position.tokens_owed_0,
            tokens_owed_1: staged.position.tokens_owed_1,
        })
    }

    /// Pays `min(requested, owed)` of each token to `owner` and returns the
    /// amounts paid.
    ///
    /// # Errors
    ///
    /// - [`PoolError::PositionNotFound`] for a position never minted.
    pub fn collect(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount0_requested: u128,
        amount1_requested: u128,
    ) -> Result<(u128, u128), Error> {
        self.require_initialized()?;
        let mut position = self.positions.assert_exists(owner, tick_lower, tick_upper)?;

        let (amount0, amount1) = position.collect(amount0_requested, amount1_requested);
        self.pay_out(owner, amount0, amount1)?;
        self.positions
            .store(owner, tick_lower, tick_upper, position);

        tracing::debug!(%owner, tick_lower, tick_upper, amount0, amount1, "collected");
        Ok((amount0, amount1))
    }
}
