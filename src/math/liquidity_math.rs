use crate::error::MathError;
use crate::math::tick_math::{MAX_TICK, MIN_TICK};

/// Adds a signed liquidity delta to an unsigned liquidity amount.
///
/// Fails with `LiquidityUnderflow` / `LiquidityOverflow` when the result
/// leaves the `u128` range.
pub fn add_delta(x: u128, y: i128) -> Result<u128, MathError> {
    if y < 0 {
        x.checked_sub(y.unsigned_abs())
            .ok_or(MathError::LiquidityUnderflow)
    } else {
        x.checked_add(y as u128).ok_or(MathError::LiquidityOverflow)
    }
}

/// Largest `liquidity_gross` a single tick may carry for the given spacing,
/// so that the sum over every usable tick still fits in a `u128`.
pub fn tick_spacing_to_max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let min_tick = (MIN_TICK / tick_spacing) * tick_spacing;
    let max_tick = (MAX_TICK / tick_spacing) * tick_spacing;
    let num_ticks = ((max_tick - min_tick) / tick_spacing) as u128 + 1;
    u128::MAX / num_ticks
}
