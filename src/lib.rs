//! Deterministic concentrated-liquidity pool engine in pure Rust.
//!
//! This crate exposes:
//! - Low‑level fixed‑point math (`math::*`) for ticks, prices, liquidity
//!   deltas and single swap steps, bit‑exact with the Q64.96 / Q128.128
//!   integer semantics of Uniswap V3 style pools.
//! - A sparse [`TickRegistry`] and a [`PositionLedger`].
//! - A [`PoolEngine`] that ties them together: initialize, mint, burn,
//!   collect, protocol fees and swaps, settling through a [`TokenLedger`].
//!
//! Every engine operation either commits its full state transition or
//! returns an error with the pool untouched.
//!
//! # Examples
//!
//! ## Pure math
//! ```no_run
//! use clmm_pool::{math::tick_math, RESOLUTION, U256};
//!
//! let sqrt_price = tick_math::get_sqrt_ratio_at_tick(0).unwrap();
//! assert!(sqrt_price > U256::ZERO);
//! assert_eq!(RESOLUTION, 96);
//! ```
//!
//! ## Minting and swapping in an in‑memory pool
//! ```no_run
//! use clmm_pool::{
//!     math::tick_math::{get_sqrt_ratio_at_tick, MIN_SQRT_RATIO},
//!     Address, InMemoryLedger, PoolConfig, PoolEngine, I256, U256,
//! };
//!
//! let config = PoolConfig::for_fee_tier(3000).unwrap();
//! let mut pool = PoolEngine::new(config, InMemoryLedger::default(), InMemoryLedger::default());
//! pool.initialize(get_sqrt_ratio_at_tick(0).unwrap()).unwrap();
//!
//! let lp = Address::repeat_byte(0x11);
//! let (amount0, amount1) = pool.mint(lp, -600, 600, 1_000_000).unwrap();
//! println!("deposited {amount0} / {amount1}");
//!
//! let trader = Address::repeat_byte(0x22);
//! let result = pool
//!     .swap(trader, true, I256::try_from(1000).unwrap(), MIN_SQRT_RATIO + U256::ONE)
//!     .unwrap();
//! println!("amount0: {}, amount1: {}", result.amount0, result.amount1);
//! ```

pub use alloy_primitives::{Address, I256, U256};

pub mod config;
pub mod error;
mod hash;
pub mod ledger;
pub mod math;
pub mod pool;

pub use config::PoolConfig;
pub use error::{Error, LedgerError, MathError, PoolError, StateError};
pub use hash::FastMap;
pub use ledger::{InMemoryLedger, TokenLedger, TokenSlot};
pub use pool::{
    engine::{PoolEngine, ProtocolFees, Slot0},
    liquidity::{BurnResult, get_amounts_for_liquidity},
    position::{Position, PositionKey, PositionLedger},
    swap::SwapResult,
    tick::{TickInfo, TickRegistry},
};

/// `type(uint160).max`
const U160_MAX: U256 = U256::from_limbs([u64::MAX, u64::MAX, u32::MAX as u64, 0]);
const U256_E6: U256 = U256::from_limbs([1000000, 0, 0, 0]);

pub const RESOLUTION: u8 = 96;
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);
pub const Q128: U256 = U256::from_limbs([0, 0, 1, 0]);
