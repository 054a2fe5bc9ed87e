use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use alloy_primitives::U256;

use crate::error::{Error, MathError, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::tick_math::{MAX_TICK, MIN_TICK};

/// Per-tick liquidity and fee bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickInfo {
    /// Total liquidity of all ranges that use this tick as a boundary.
    pub liquidity_gross: u128,
    /// Liquidity added to the pool when the price crosses this tick
    /// left to right (removed when crossing right to left).
    pub liquidity_net: i128,
    /// Fee growth per unit of liquidity on the other side of this tick
    /// from the current tick, Q128.128.
    pub fee_growth_outside_0_x128: U256,
    pub fee_growth_outside_1_x128: U256,
}

impl TickInfo {
    /// Applies a liquidity delta to this tick as the lower (`upper == false`)
    /// or upper boundary of a range and returns whether the tick flipped
    /// between initialized and uninitialized.
    ///
    /// A tick being initialized below or at the current tick assumes all
    /// fee growth so far happened below it. Nothing is written on error.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<bool, Error> {
        let liquidity_gross_before = self.liquidity_gross;
        let liquidity_gross_after = add_delta(liquidity_gross_before, liquidity_delta)?;

        if liquidity_gross_after > max_liquidity {
            return Err(PoolError::LiquidityCapExceeded { tick }.into());
        }

        let liquidity_net = if upper {
            self.liquidity_net.checked_sub(liquidity_delta)
        } else {
            self.liquidity_net.checked_add(liquidity_delta)
        }
        .ok_or(MathError::LiquidityOverflow)?;

        let flipped = (liquidity_gross_after == 0) != (liquidity_gross_before == 0);

        if liquidity_gross_before == 0 && tick <= tick_current {
            self.fee_growth_outside_0_x128 = fee_growth_global_0_x128;
            self.fee_growth_outside_1_x128 = fee_growth_global_1_x128;
        }
        self.liquidity_gross = liquidity_gross_after;
        self.liquidity_net = liquidity_net;

        Ok(flipped)
    }

    /// Flips the outside fee growth to the other side of the tick.
    pub fn cross(&mut self, fee_growth_global_0_x128: U256, fee_growth_global_1_x128: U256) {
        self.fee_growth_outside_0_x128 =
            fee_growth_global_0_x128.wrapping_sub(self.fee_growth_outside_0_x128);
        self.fee_growth_outside_1_x128 =
            fee_growth_global_1_x128.wrapping_sub(self.fee_growth_outside_1_x128);
    }
}

/// Sparse, ordered map of initialized ticks.
///
/// A tick is present exactly while some range references it. Ordering by
/// tick index makes the next-tick search a range query.
#[derive(Debug, Clone, Default)]
pub struct TickRegistry {
    ticks: BTreeMap<i32, TickInfo>,
}

impl TickRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tick: i32) -> Option<&TickInfo> {
        self.ticks.get(&tick)
    }

    pub fn is_initialized(&self, tick: i32) -> bool {
        self.ticks.contains_key(&tick)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Initialized ticks in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &TickInfo)> {
        self.ticks.iter().map(|(tick, info)| (*tick, info))
    }

    /// Computes the entry `tick` would hold after [`TickRegistry::update`]
    /// without writing it, together with the flip flag.
    #[allow(clippy::too_many_arguments)]
    pub fn preview_update(
        &self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<(TickInfo, bool), Error> {
        let mut info = self.ticks.get(&tick).copied().unwrap_or_default();
        let flipped = info.update(
            tick,
            tick_current,
            liquidity_delta,
            fee_growth_global_0_x128,
            fee_growth_global_1_x128,
            upper,
            max_liquidity,
        )?;
        Ok((info, flipped))
    }

    /// Stores an entry computed by [`TickRegistry::preview_update`]. Entries
    /// without gross liquidity are dropped instead.
    pub fn store(&mut self, tick: i32, info: TickInfo) {
        if info.liquidity_gross == 0 {
            self.ticks.remove(&tick);
        } else {
            self.ticks.insert(tick, info);
        }
    }

    /// Applies a liquidity delta to one boundary tick of a range, creating
    /// the entry on first use, and returns whether the tick flipped.
    ///
    /// # Errors
    ///
    /// - [`PoolError::LiquidityCapExceeded`] if gross liquidity would pass
    ///   `max_liquidity`.
    /// - `LiquidityUnderflow` / `LiquidityOverflow` on the gross or net
    ///   liquidity.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<bool, Error> {
        let (info, flipped) = self.preview_update(
            tick,
            tick_current,
            liquidity_delta,
            fee_growth_global_0_x128,
            fee_growth_global_1_x128,
            upper,
            max_liquidity,
        )?;
        self.store(tick, info);
        Ok(flipped)
    }

    /// Removes a tick whose gross liquidity went back to zero.
    pub fn clear(&mut self, tick: i32) {
        self.ticks.remove(&tick);
    }

    /// Crosses `tick` during a swap and returns its `liquidity_net`.
    /// Crossing an unregistered tick is a no-op returning zero.
    pub fn cross(
        &mut self,
        tick: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> i128 {
        match self.ticks.get_mut(&tick) {
            Some(info) => {
                info.cross(fee_growth_global_0_x128, fee_growth_global_1_x128);
                tracing::trace!(tick, liquidity_net = info.liquidity_net, "crossed tick");
                info.liquidity_net
            }
            None => 0,
        }
    }

    /// Fee growth per unit of liquidity accrued strictly inside
    /// `[tick_lower, tick_upper)`, modulo 2^256.
    pub fn get_fee_growth_inside(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        tick_current: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> (U256, U256) {
        let lower = self.ticks.get(&tick_lower).copied().unwrap_or_default();
        let upper = self.ticks.get(&tick_upper).copied().unwrap_or_default();
        fee_growth_inside(
            &lower,
            &upper,
            tick_lower,
            tick_upper,
            tick_current,
            fee_growth_global_0_x128,
            fee_growth_global_1_x128,
        )
    }

    /// Next initialized tick from `tick` in the search direction.
    ///
    /// With `lte` the search covers `tick` itself and everything left of
    /// it; otherwise it covers ticks strictly right of `tick`. When nothing
    /// is registered that way the global bound is returned, uninitialized.
    pub fn next_initialized_tick(&self, tick: i32, lte: bool) -> (i32, bool) {
        if lte {
            self.ticks
                .range(..=tick)
                .next_back()
                .map_or((MIN_TICK, false), |(next, _)| (*next, true))
        } else {
            self.ticks
                .range((Excluded(tick), Unbounded))
                .next()
                .map_or((MAX_TICK, false), |(next, _)| (*next, true))
        }
    }
}

/// Fee growth inside a range from explicit boundary entries, so staged
/// entries that are not stored yet can be used.
pub(crate) fn fee_growth_inside(
    lower: &TickInfo,
    upper: &TickInfo,
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    fee_growth_global_0_x128: U256,
    fee_growth_global_1_x128: U256,
) -> (U256, U256) {
    let (below_0, below_1) = if tick_current >= tick_lower {
        (lower.fee_growth_outside_0_x128, lower.fee_growth_outside_1_x128)
    } else {
        (
            fee_growth_global_0_x128.wrapping_sub(lower.fee_growth_outside_0_x128),
            fee_growth_global_1_x128.wrapping_sub(lower.fee_growth_outside_1_x128),
        )
    };

    let (above_0, above_1) = if tick_current < tick_upper {
        (upper.fee_growth_outside_0_x128, upper.fee_growth_outside_1_x128)
    } else {
        (
            fee_growth_global_0_x128.wrapping_sub(upper.fee_growth_outside_0_x128),
            fee_growth_global_1_x128.wrapping_sub(upper.fee_growth_outside_1_x128),
        )
    };

    (
        fee_growth_global_0_x128
            .wrapping_sub(below_0)
            .wrapping_sub(above_0),
        fee_growth_global_1_x128
            .wrapping_sub(below_1)
            .wrapping_sub(above_1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MAX_LIQUIDITY: u128 = u128::MAX;

    fn registry_with(ticks: &[i32]) -> TickRegistry {
        let mut registry = TickRegistry::new();
        for &tick in ticks {
            registry
                .update(tick, 0, 1, U256::ZERO, U256::ZERO, false, MAX_LIQUIDITY)
                .unwrap();
        }
        registry
    }

    #[rstest]
    fn update_lower_and_upper_boundaries() {
        let mut registry = TickRegistry::new();

        let flipped = registry
            .update(-60, 0, 1000, U256::ZERO, U256::ZERO, false, MAX_LIQUIDITY)
            .unwrap();
        assert!(flipped);
        let flipped = registry
            .update(60, 0, 1000, U256::ZERO, U256::ZERO, true, MAX_LIQUIDITY)
            .unwrap();
        assert!(flipped);

        assert_eq!(registry.get(-60).unwrap().liquidity_net, 1000);
        assert_eq!(registry.get(60).unwrap().liquidity_net, -1000);

        // second range on the same lower tick does not flip it
        let flipped = registry
            .update(-60, 0, 500, U256::ZERO, U256::ZERO, false, MAX_LIQUIDITY)
            .unwrap();
        assert!(!flipped);
        assert_eq!(registry.get(-60).unwrap().liquidity_gross, 1500);
    }

    #[rstest]
    fn removing_all_liquidity_flips_back() {
        let mut registry = TickRegistry::new();
        registry
            .update(0, 0, 10, U256::ZERO, U256::ZERO, false, MAX_LIQUIDITY)
            .unwrap();

        let flipped = registry
            .update(0, 0, -10, U256::ZERO, U256::ZERO, false, MAX_LIQUIDITY)
            .unwrap();
        assert!(flipped);
        assert!(!registry.is_initialized(0));
    }

    #[rstest]
    fn fee_growth_outside_seeded_only_at_or_below_current() {
        let mut registry = TickRegistry::new();
        let global_0 = U256::from(111u32);
        let global_1 = U256::from(222u32);

        registry
            .update(-60, 0, 1, global_0, global_1, false, MAX_LIQUIDITY)
            .unwrap();
        registry
            .update(0, 0, 1, global_0, global_1, false, MAX_LIQUIDITY)
            .unwrap();
        registry
            .update(60, 0, 1, global_0, global_1, true, MAX_LIQUIDITY)
            .unwrap();

        assert_eq!(registry.get(-60).unwrap().fee_growth_outside_0_x128, global_0);
        assert_eq!(registry.get(0).unwrap().fee_growth_outside_1_x128, global_1);
        assert_eq!(registry.get(60).unwrap().fee_growth_outside_0_x128, U256::ZERO);
    }

    #[rstest]
    fn liquidity_cap_is_enforced_without_writing() {
        let mut registry = TickRegistry::new();
        registry
            .update(60, 0, 90, U256::ZERO, U256::ZERO, false, 100)
            .unwrap();

        let res = registry.update(60, 0, 11, U256::ZERO, U256::ZERO, false, 100);
        assert!(matches!(
            res,
            Err(Error::PoolError(PoolError::LiquidityCapExceeded { tick: 60 }))
        ));
        assert_eq!(registry.get(60).unwrap().liquidity_gross, 90);
    }

    #[rstest]
    fn removing_more_than_gross_underflows() {
        let mut registry = TickRegistry::new();
        let res = registry.update(60, 0, -1, U256::ZERO, U256::ZERO, false, MAX_LIQUIDITY);
        assert!(matches!(
            res,
            Err(Error::MathError(MathError::LiquidityUnderflow))
        ));
        assert!(registry.is_empty());
    }

    #[rstest]
    fn zero_delta_on_unknown_tick_registers_nothing() {
        let mut registry = TickRegistry::new();
        let flipped = registry
            .update(60, 0, 0, U256::ZERO, U256::ZERO, false, MAX_LIQUIDITY)
            .unwrap();
        assert!(!flipped);
        assert!(registry.is_empty());
    }

    #[rstest]
    fn cross_flips_outside_growth() {
        let mut registry = TickRegistry::new();
        registry
            .update(60, 0, 1000, U256::from(5u8), U256::from(7u8), false, MAX_LIQUIDITY)
            .unwrap();
        registry
            .update(-60, 0, 1000, U256::from(5u8), U256::from(7u8), false, MAX_LIQUIDITY)
            .unwrap();

        let net = registry.cross(-60, U256::from(20u8), U256::from(30u8));
        assert_eq!(net, 1000);
        let info = registry.get(-60).unwrap();
        assert_eq!(info.fee_growth_outside_0_x128, U256::from(15u8));
        assert_eq!(info.fee_growth_outside_1_x128, U256::from(23u8));

        // never seeded above the current tick, so crossing takes all of the global growth
        registry.cross(60, U256::from(20u8), U256::from(30u8));
        assert_eq!(registry.get(60).unwrap().fee_growth_outside_0_x128, U256::from(20u8));

        assert_eq!(registry.cross(120, U256::ZERO, U256::ZERO), 0);
    }

    #[rstest]
    fn fee_growth_inside_for_current_tick_positions() {
        let mut registry = TickRegistry::new();
        registry
            .update(-60, 0, 1, U256::from(10u8), U256::from(10u8), false, MAX_LIQUIDITY)
            .unwrap();
        registry
            .update(60, 0, 1, U256::from(10u8), U256::from(10u8), true, MAX_LIQUIDITY)
            .unwrap();

        let global = U256::from(25u8);
        // inside: everything since the lower tick was seeded
        assert_eq!(
            registry.get_fee_growth_inside(-60, 60, 0, global, global),
            (U256::from(15u8), U256::from(15u8))
        );
        // price above the range: nothing has been earned inside since the
        // upper tick was never crossed
        let (inside_0, _) = registry.get_fee_growth_inside(-60, 60, 120, global, global);
        assert_eq!(inside_0, U256::from(15u8).wrapping_sub(global));
    }

    #[rstest]
    fn fee_growth_inside_wraps() {
        let mut registry = TickRegistry::new();
        registry
            .update(-60, 0, 1, U256::from(10u8), U256::ZERO, false, MAX_LIQUIDITY)
            .unwrap();
        registry
            .update(60, 0, 1, U256::from(10u8), U256::ZERO, true, MAX_LIQUIDITY)
            .unwrap();

        let (inside_0, inside_1) =
            registry.get_fee_growth_inside(-60, 60, 0, U256::from(4u8), U256::ZERO);
        assert_eq!(inside_0, U256::MAX - U256::from(5u8));
        assert_eq!(inside_1, U256::ZERO);
    }

    #[rstest]
    #[case(0, true, (0, true))]
    #[case(30, true, (0, true))]
    #[case(-1, true, (-60, true))]
    #[case(-61, true, (MIN_TICK, false))]
    #[case(0, false, (60, true))]
    #[case(-60, false, (0, true))]
    #[case(60, false, (MAX_TICK, false))]
    fn next_initialized_tick(#[case] from: i32, #[case] lte: bool, #[case] expected: (i32, bool)) {
        let registry = registry_with(&[-60, 0, 60]);
        assert_eq!(registry.next_initialized_tick(from, lte), expected);
    }

    #[rstest]
    fn next_initialized_tick_on_empty_registry() {
        let registry = TickRegistry::new();
        assert_eq!(registry.next_initialized_tick(0, true), (MIN_TICK, false));
        assert_eq!(registry.next_initialized_tick(0, false), (MAX_TICK, false));
    }
}
