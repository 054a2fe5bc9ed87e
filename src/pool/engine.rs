use alloy_primitives::{Address, I256, U256};

use crate::config::PoolConfig;
use crate::error::{Error, LedgerError, PoolError};
use crate::ledger::{InMemoryLedger, TokenLedger, TokenSlot};
use crate::math::tick_math::{MAX_TICK, MIN_TICK, get_tick_at_sqrt_ratio};
use crate::pool::position::{Position, PositionLedger};
use crate::pool::tick::TickRegistry;

/// Price state of a pool.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    /// Protocol fee denominators, token0 in the low nibble and token1 in
    /// the high nibble. Zero disables the protocol fee for that token.
    pub fee_protocol: u8,
}

impl Slot0 {
    /// Protocol fee denominator charged on the input token of a swap.
    #[inline]
    pub const fn fee_protocol_for(&self, zero_for_one: bool) -> u8 {
        if zero_for_one {
            self.fee_protocol % 16
        } else {
            self.fee_protocol >> 4
        }
    }
}

/// Protocol fees owed per token. Wrap at 2^128.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtocolFees {
    pub token0: u128,
    pub token1: u128,
}

/// A single concentrated-liquidity pool.
///
/// Owns the price state, the tick registry and the position ledger of one
/// token pair and settles against one [`TokenLedger`] per token. Every
/// operation takes `&mut self`; callers embedding several pools serialise
/// access per pool.
#[derive(Debug, Clone)]
pub struct PoolEngine<L: TokenLedger = InMemoryLedger> {
    pub(crate) config: PoolConfig,
    pub(crate) initialized: bool,
    pub(crate) slot0: Slot0,
    pub(crate) fee_growth_global_0_x128: U256,
    pub(crate) fee_growth_global_1_x128: U256,
    pub(crate) protocol_fees: ProtocolFees,
    /// Liquidity in range at the current tick.
    pub(crate) liquidity: u128,
    pub(crate) ticks: TickRegistry,
    pub(crate) positions: PositionLedger,
    token0: L,
    token1: L,
}

impl<L: TokenLedger> PoolEngine<L> {
    pub fn new(config: PoolConfig, token0: L, token1: L) -> Self {
        Self {
            config,
            initialized: false,
            slot0: Slot0::default(),
            fee_growth_global_0_x128: U256::ZERO,
            fee_growth_global_1_x128: U256::ZERO,
            protocol_fees: ProtocolFees::default(),
            liquidity: 0,
            ticks: TickRegistry::new(),
            positions: PositionLedger::new(),
            token0,
            token1,
        }
    }

    /// Sets the starting price. Can only be called once.
    ///
    /// # Errors
    ///
    /// - [`PoolError::AlreadyInitialized`] on a second call.
    /// - `SqrtPriceOutOfBounds` if the price is outside
    ///   `[MIN_SQRT_RATIO, MAX_SQRT_RATIO]`.
    pub fn initialize(&mut self, sqrt_price_x96: U256) -> Result<(), Error> {
        if self.initialized {
            return Err(PoolError::AlreadyInitialized.into());
        }
        let tick = get_tick_at_sqrt_ratio(sqrt_price_x96)?;

        self.slot0 = Slot0 {
            sqrt_price_x96,
            tick,
            fee_protocol: 0,
        };
        self.initialized = true;

        tracing::info!(%sqrt_price_x96, tick, "pool initialized");
        Ok(())
    }

    /// Sets the protocol fee denominators and returns
    /// `(old0, old1, new0, new1)`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidProtocolFee`] unless each fee is `0` or in `4..=10`.
    pub fn set_fee_protocol(&mut self, fee0: u8, fee1: u8) -> Result<(u8, u8, u8, u8), Error> {
        self.require_initialized()?;
        let valid = |fee: u8| fee == 0 || (4..=10).contains(&fee);
        if !valid(fee0) || !valid(fee1) {
            return Err(PoolError::InvalidProtocolFee { fee0, fee1 }.into());
        }

        let old = self.slot0.fee_protocol;
        self.slot0.fee_protocol = fee0 + (fee1 << 4);

        tracing::info!(fee0, fee1, old0 = old % 16, old1 = old >> 4, "protocol fee set");
        Ok((old % 16, old >> 4, fee0, fee1))
    }

    /// Pays out up to the requested protocol fees to `recipient`.
    pub fn collect_protocol(
        &mut self,
        recipient: Address,
        amount0_requested: u128,
        amount1_requested: u128,
    ) -> Result<(u128, u128), Error> {
        self.require_initialized()?;
        let amount0 = amount0_requested.min(self.protocol_fees.token0);
        let amount1 = amount1_requested.min(self.protocol_fees.token1);

        self.pay_out(recipient, amount0, amount1)?;
        self.protocol_fees.token0 -= amount0;
        self.protocol_fees.token1 -= amount1;

        tracing::debug!(%recipient, amount0, amount1, "protocol fees collected");
        Ok((amount0, amount1))
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn slot0(&self) -> Slot0 {
        self.slot0
    }

    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn fee_growth_global(&self) -> (U256, U256) {
        (self.fee_growth_global_0_x128, self.fee_growth_global_1_x128)
    }

    pub fn protocol_fees(&self) -> ProtocolFees {
        self.protocol_fees
    }

    pub fn ticks(&self) -> &TickRegistry {
        &self.ticks
    }

    pub fn positions(&self) -> &PositionLedger {
        &self.positions
    }

    pub fn position(&self, owner: Address, tick_lower: i32, tick_upper: i32) -> Position {
        self.positions.get(owner, tick_lower, tick_upper)
    }

    pub fn ledger(&self, slot: TokenSlot) -> &L {
        match slot {
            TokenSlot::Token0 => &self.token0,
            TokenSlot::Token1 => &self.token1,
        }
    }

    pub(crate) fn ledger_mut(&mut self, slot: TokenSlot) -> &mut L {
        match slot {
            TokenSlot::Token0 => &mut self.token0,
            TokenSlot::Token1 => &mut self.token1,
        }
    }

    #[inline]
    pub(crate) fn require_initialized(&self) -> Result<(), PoolError> {
        if self.initialized {
            Ok(())
        } else {
            Err(PoolError::NotInitialized)
        }
    }

    #[inline]
    pub(crate) fn check_ticks(tick_lower: i32, tick_upper: i32) -> Result<(), PoolError> {
        if tick_lower >= tick_upper || tick_lower < MIN_TICK || tick_upper > MAX_TICK {
            return Err(PoolError::InvalidRange {
                lower: tick_lower,
                upper: tick_upper,
            });
        }
        Ok(())
    }

    /// Deposits `amount` from `owner` into the ledger of `slot` and checks
    /// that custody grew by at least that much.
    pub(crate) fn deposit_checked(
        &mut self,
        slot: TokenSlot,
        owner: Address,
        amount: U256,
    ) -> Result<(), Error> {
        if amount.is_zero() {
            return Ok(());
        }
        let ledger = self.ledger_mut(slot);
        let expected = ledger
            .total_supply()
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        ledger.deposit(owner, amount)?;
        if ledger.total_supply() < expected {
            return Err(PoolError::InsufficientDeposit.into());
        }
        Ok(())
    }

    /// Hands a completed deposit back to `owner` when a later leg of the
    /// same operation failed. Custody returns to where it was before the
    /// deposit.
    pub(crate) fn refund(&mut self, slot: TokenSlot, owner: Address, amount: U256) {
        if amount.is_zero() {
            return;
        }
        let refunded = I256::try_from(amount)
            .map_err(|_| LedgerError::Overflow)
            .and_then(|amount| self.ledger_mut(slot).transfer(owner, amount));
        if let Err(error) = refunded {
            tracing::warn!(?slot, %owner, %amount, %error, "deposit refund failed");
        }
    }

    /// Transfers both amounts out of custody to `recipient`, after checking
    /// that custody covers both so that neither transfer happens alone.
    pub(crate) fn pay_out(
        &mut self,
        recipient: Address,
        amount0: u128,
        amount1: u128,
    ) -> Result<(), Error> {
        let amount0 = U256::from(amount0);
        let amount1 = U256::from(amount1);
        if self.token0.total_supply() < amount0 || self.token1.total_supply() < amount1 {
            return Err(LedgerError::InsufficientReserve.into());
        }
        if !amount0.is_zero() {
            self.token0.transfer(recipient, I256::from_raw(amount0))?;
        }
        if !amount1.is_zero() {
            self.token1.transfer(recipient, I256::from_raw(amount1))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Q96;
    use crate::math::tick_math::{MAX_SQRT_RATIO, MIN_SQRT_RATIO, get_sqrt_ratio_at_tick};
    use crate::error::StateError;
    use rstest::rstest;

    fn pool() -> PoolEngine {
        PoolEngine::new(
            PoolConfig::for_fee_tier(3000).unwrap(),
            InMemoryLedger::new(),
            InMemoryLedger::new(),
        )
    }

    #[rstest]
    fn initialize_sets_price_and_tick() {
        let mut pool = pool();
        assert!(!pool.is_initialized());

        pool.initialize(get_sqrt_ratio_at_tick(-600).unwrap()).unwrap();

        assert!(pool.is_initialized());
        assert_eq!(pool.slot0().tick, -600);
        assert_eq!(pool.slot0().fee_protocol, 0);
        assert_eq!(pool.liquidity(), 0);
    }

    #[rstest]
    fn initialize_twice_fails() {
        let mut pool = pool();
        pool.initialize(Q96).unwrap();
        let res = pool.initialize(Q96);
        assert!(matches!(
            res,
            Err(Error::PoolError(PoolError::AlreadyInitialized))
        ));
        assert_eq!(pool.slot0().sqrt_price_x96, Q96);
    }

    #[rstest]
    #[case(MIN_SQRT_RATIO - U256::ONE)]
    #[case(MAX_SQRT_RATIO + U256::ONE)]
    fn initialize_out_of_bounds(#[case] price: U256) {
        let mut pool = pool();
        let res = pool.initialize(price);
        assert!(matches!(
            res,
            Err(Error::StateError(StateError::SqrtPriceOutOfBounds))
        ));
        assert!(!pool.is_initialized());
    }

    #[rstest]
    fn initialize_at_bounds() {
        let mut pool = pool();
        pool.initialize(MAX_SQRT_RATIO).unwrap();
        assert_eq!(pool.slot0().tick, MAX_TICK);
    }

    #[rstest]
    fn operations_require_initialization() {
        let mut pool = pool();
        assert!(matches!(
            pool.set_fee_protocol(4, 4),
            Err(Error::PoolError(PoolError::NotInitialized))
        ));
        assert!(matches!(
            pool.collect_protocol(Address::ZERO, 1, 1),
            Err(Error::PoolError(PoolError::NotInitialized))
        ));
    }

    #[rstest]
    fn set_fee_protocol_packs_nibbles() {
        let mut pool = pool();
        pool.initialize(Q96).unwrap();

        assert_eq!(pool.set_fee_protocol(5, 7).unwrap(), (0, 0, 5, 7));
        assert_eq!(pool.slot0().fee_protocol, 5 + (7 << 4));
        assert_eq!(pool.slot0().fee_protocol_for(true), 5);
        assert_eq!(pool.slot0().fee_protocol_for(false), 7);

        assert_eq!(pool.set_fee_protocol(10, 0).unwrap(), (5, 7, 10, 0));
    }

    #[rstest]
    #[case(1, 0)]
    #[case(0, 3)]
    #[case(11, 4)]
    #[case(4, 255)]
    fn set_fee_protocol_rejects_invalid(#[case] fee0: u8, #[case] fee1: u8) {
        let mut pool = pool();
        pool.initialize(Q96).unwrap();
        pool.set_fee_protocol(6, 6).unwrap();

        let res = pool.set_fee_protocol(fee0, fee1);
        assert!(matches!(
            res,
            Err(Error::PoolError(PoolError::InvalidProtocolFee { .. }))
        ));
        assert_eq!(pool.slot0().fee_protocol, 6 + (6 << 4));
    }

    #[rstest]
    #[case(60, 60)]
    #[case(60, -60)]
    #[case(MIN_TICK - 1, 0)]
    #[case(0, MAX_TICK + 1)]
    fn check_ticks_rejects_invalid_ranges(#[case] lower: i32, #[case] upper: i32) {
        assert!(matches!(
            PoolEngine::<InMemoryLedger>::check_ticks(lower, upper),
            Err(PoolError::InvalidRange { .. })
        ));
    }

    #[rstest]
    fn collect_protocol_with_nothing_owed() {
        let mut pool = pool();
        pool.initialize(Q96).unwrap();
        assert_eq!(pool.collect_protocol(Address::ZERO, 10, 10).unwrap(), (0, 0));
    }
}
