//! Immutable pool parameters fixed at pool creation.

use crate::error::PoolError;
use crate::math::liquidity_math::tick_spacing_to_max_liquidity_per_tick;

/// Fee is expressed in hundredths of a bip: `1_000_000` is 100%.
pub const FEE_DENOMINATOR: u32 = 1_000_000;

/// Largest tick spacing a pool may be created with.
pub const MAX_TICK_SPACING: i32 = 16384;

/// Configuration of a single pool.
///
/// # Validation
///
/// - `fee_pips` must be below [`FEE_DENOMINATOR`].
/// - `tick_spacing` must lie in `1..MAX_TICK_SPACING`.
///
/// `max_liquidity_per_tick` is derived from the spacing so that the gross
/// liquidity of every usable tick summed together fits in a `u128`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    fee_pips: u32,
    tick_spacing: i32,
    max_liquidity_per_tick: u128,
}

impl PoolConfig {
    /// Creates a new `PoolConfig`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidConfig`] if the fee reaches 100% or the tick
    ///   spacing is out of range.
    pub fn new(fee_pips: u32, tick_spacing: i32) -> Result<Self, PoolError> {
        let config = Self {
            fee_pips,
            tick_spacing,
            max_liquidity_per_tick: 0,
        };
        config.validate()?;
        Ok(Self {
            max_liquidity_per_tick: tick_spacing_to_max_liquidity_per_tick(tick_spacing),
            ..config
        })
    }

    /// Config of one of the standard fee tiers: 0.01%, 0.05%, 0.3% or 1%.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidConfig`] if `fee_pips` is not a standard tier.
    pub fn for_fee_tier(fee_pips: u32) -> Result<Self, PoolError> {
        let tick_spacing = match fee_pips {
            100 => 1,
            500 => 10,
            3000 => 60,
            10000 => 200,
            _ => return Err(PoolError::InvalidConfig("unknown fee tier")),
        };
        Self::new(fee_pips, tick_spacing)
    }

    /// Validates the configuration invariants.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidConfig`] describing the violated invariant.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.fee_pips >= FEE_DENOMINATOR {
            return Err(PoolError::InvalidConfig(
                "fee must be below 1_000_000 pips (100%)",
            ));
        }
        if self.tick_spacing <= 0 || self.tick_spacing >= MAX_TICK_SPACING {
            return Err(PoolError::InvalidConfig(
                "tick spacing must be in 1..16384",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn fee_pips(&self) -> u32 {
        self.fee_pips
    }

    #[must_use]
    pub const fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    #[must_use]
    pub const fn max_liquidity_per_tick(&self) -> u128 {
        self.max_liquidity_per_tick
    }
}
