use crate::Q128;
use crate::error::{Error, MathError, PoolError};
use crate::ledger::{TokenLedger, TokenSlot};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::{mul_div_wrapping, unlikely};
use crate::math::swap_math::{SwapStep, compute_swap_step};
use crate::math::tick_math::{
    MAX_SQRT_RATIO, MIN_SQRT_RATIO, get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio,
};
use crate::pool::engine::PoolEngine;
use crate::pool::position::truncate_to_u128;
use alloy_primitives::{Address, I256, U256};

/// Outcome of a swap. Amounts are signed from the pool's side: positive
/// was paid into the pool, negative was paid out to the recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapResult {
    pub recipient: Address,
    pub amount0: I256,
    pub amount1: I256,
    /// Price, in-range liquidity and tick after the swap.
    pub sqrt_price_x96: U256,
    pub liquidity: u128,
    pub tick: i32,
    /// Total fee charged on the input token, protocol share included.
    pub fees_paid: U256,
    /// Initialized ticks crossed, in crossing order.
    pub ticks_crossed: Vec<i32>,
}

// the top level state of the swap, committed to the pool once the loop is done
struct SwapState {
    // the amount remaining to be swapped in/out of the input/output asset
    amount_specified_remaining: I256,
    // the amount already swapped out/in of the output/input asset
    amount_calculated: I256,
    sqrt_price_x96: U256,
    tick: i32,
    liquidity: u128,
    // global fee growth of the input token
    fee_growth_global_x128: U256,
    // protocol fee skimmed off the input token
    protocol_fee: u128,
    fees_paid: U256,
    // (tick, fee growth 0, fee growth 1) at each crossing
    crossings: Vec<(i32, U256, U256)>,
}

struct StepComputations {
    // the price at the beginning of the step
    sqrt_price_start_x96: U256,
    // the next tick to swap to from the current tick in the swap direction
    tick_next: i32,
    // whether tick_next is initialized or not
    initialized: bool,
    // sqrt(price) for the next tick
    sqrt_price_next_x96: U256,
    result: SwapStep,
}

#[inline]
fn to_signed(value: U256) -> Result<I256, MathError> {
    I256::try_from(value).map_err(|_| MathError::Overflow)
}

impl<L: TokenLedger> PoolEngine<L> {
    /// Swaps against the pool's liquidity.
    ///
    /// `amount_specified > 0` is an exact-input swap of that much of the
    /// input token, `< 0` an exact-output swap. The price never moves past
    /// `sqrt_price_limit_x96`; the swap stops early there.
    ///
    /// The input leg is deposited from `recipient` and the output leg is
    /// transferred to it. Nothing about the pool changes unless the whole
    /// swap, settlement included, succeeds.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ZeroAmount`] for a zero amount.
    /// - [`PoolError::InvalidPriceLimit`] unless the limit lies strictly
    ///   between the current price and the global bound in the swap
    ///   direction.
    /// - [`PoolError::InsufficientOutput`] if the output ledger's custody
    ///   cannot cover the output leg.
    /// - `Overflow` / `SqrtPriceOutOfBounds` from the step math.
    pub fn swap(
        &mut self,
        recipient: Address,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: U256,
    ) -> Result<SwapResult, Error> {
        self.require_initialized()?;
        if unlikely(amount_specified.is_zero()) {
            return Err(PoolError::ZeroAmount.into());
        }

        let slot0 = self.slot0;
        let limit_ok = if zero_for_one {
            sqrt_price_limit_x96 < slot0.sqrt_price_x96 && sqrt_price_limit_x96 > MIN_SQRT_RATIO
        } else {
            sqrt_price_limit_x96 > slot0.sqrt_price_x96 && sqrt_price_limit_x96 < MAX_SQRT_RATIO
        };
        if unlikely(!limit_ok) {
            return Err(PoolError::InvalidPriceLimit.into());
        }

        let fee_protocol = slot0.fee_protocol_for(zero_for_one);
        let exact_input = amount_specified.is_positive();
        let fee_pips = self.config.fee_pips();

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: I256::ZERO,
            sqrt_price_x96: slot0.sqrt_price_x96,
            tick: slot0.tick,
            liquidity: self.liquidity,
            fee_growth_global_x128: if zero_for_one {
                self.fee_growth_global_0_x128
            } else {
                self.fee_growth_global_1_x128
            },
            protocol_fee: 0,
            fees_paid: U256::ZERO,
            crossings: Vec::new(),
        };

        while !state.amount_specified_remaining.is_zero()
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                tick_next: 0,
                initialized: false,
                sqrt_price_next_x96: U256::ZERO,
                result: SwapStep::default(),
            };

            (step.tick_next, step.initialized) =
                self.ticks.next_initialized_tick(state.tick, zero_for_one);
            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            let target = if zero_for_one {
                step.sqrt_price_next_x96.max(sqrt_price_limit_x96)
            } else {
                step.sqrt_price_next_x96.min(sqrt_price_limit_x96)
            };

            step.result = compute_swap_step(
                state.sqrt_price_x96,
                target,
                state.liquidity,
                state.amount_specified_remaining,
                fee_pips,
            )?;
            state.sqrt_price_x96 = step.result.sqrt_price_next_x96;

            let amount_in = to_signed(
                step.result
                    .amount_in
                    .checked_add(step.result.fee_amount)
                    .ok_or(MathError::Overflow)?,
            )?;
            let amount_out = to_signed(step.result.amount_out)?;
            if exact_input {
                state.amount_specified_remaining = state
                    .amount_specified_remaining
                    .checked_sub(amount_in)
                    .ok_or(MathError::Overflow)?;
                state.amount_calculated = state
                    .amount_calculated
                    .checked_sub(amount_out)
                    .ok_or(MathError::Overflow)?;
            } else {
                state.amount_specified_remaining = state
                    .amount_specified_remaining
                    .checked_add(amount_out)
                    .ok_or(MathError::Overflow)?;
                state.amount_calculated = state
                    .amount_calculated
                    .checked_add(amount_in)
                    .ok_or(MathError::Overflow)?;
            }

            let mut lp_fee = step.result.fee_amount;
            state.fees_paid = state.fees_paid.wrapping_add(lp_fee);
            if fee_protocol > 0 {
                let delta = lp_fee / U256::from(fee_protocol);
                lp_fee -= delta;
                state.protocol_fee = state.protocol_fee.wrapping_add(truncate_to_u128(delta));
            }

            if state.liquidity > 0 {
                state.fee_growth_global_x128 = state.fee_growth_global_x128.wrapping_add(
                    mul_div_wrapping(lp_fee, Q128, U256::from(state.liquidity))?,
                );
            }

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                if step.initialized {
                    let (global_0, global_1) = if zero_for_one {
                        (state.fee_growth_global_x128, self.fee_growth_global_1_x128)
                    } else {
                        (self.fee_growth_global_0_x128, state.fee_growth_global_x128)
                    };
                    state.crossings.push((step.tick_next, global_0, global_1));

                    let mut liquidity_net = self
                        .ticks
                        .get(step.tick_next)
                        .map_or(0, |info| info.liquidity_net);
                    if zero_for_one {
                        liquidity_net = liquidity_net
                            .checked_neg()
                            .ok_or(MathError::LiquidityOverflow)?;
                    }
                    state.liquidity = add_delta(state.liquidity, liquidity_net)?;
                }
                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
        }

        let amount_settled = amount_specified
            .checked_sub(state.amount_specified_remaining)
            .ok_or(MathError::Overflow)?;
        let (amount0, amount1) = if zero_for_one == exact_input {
            (amount_settled, state.amount_calculated)
        } else {
            (state.amount_calculated, amount_settled)
        };

        let (amount_in, amount_out) = if zero_for_one {
            (amount0, amount1)
        } else {
            (amount1, amount0)
        };
        let output = amount_out.unsigned_abs();
        if output > self.ledger(TokenSlot::output(zero_for_one)).total_supply() {
            return Err(PoolError::InsufficientOutput.into());
        }
        if amount_in.is_positive() {
            self.deposit_checked(
                TokenSlot::input(zero_for_one),
                recipient,
                amount_in.into_raw(),
            )?;
        }
        if amount_out.is_negative() {
            let paid = self
                .ledger_mut(TokenSlot::output(zero_for_one))
                .transfer(recipient, I256::from_raw(output));
            if let Err(error) = paid {
                if amount_in.is_positive() {
                    self.refund(
                        TokenSlot::input(zero_for_one),
                        recipient,
                        amount_in.into_raw(),
                    );
                }
                return Err(error.into());
            }
        }

        self.commit_swap(zero_for_one, &state);

        tracing::debug!(
            %recipient,
            zero_for_one,
            %amount0,
            %amount1,
            tick = state.tick,
            crossed = state.crossings.len(),
            "swapped"
        );
        Ok(SwapResult {
            recipient,
            amount0,
            amount1,
            sqrt_price_x96: state.sqrt_price_x96,
            liquidity: state.liquidity,
            tick: state.tick,
            fees_paid: state.fees_paid,
            ticks_crossed: state.crossings.iter().map(|(tick, _, _)| *tick).collect(),
        })
    }

    fn commit_swap(&mut self, zero_for_one: bool, state: &SwapState) {
        for &(tick, global_0, global_1) in &state.crossings {
            self.ticks.cross(tick, global_0, global_1);
        }

        self.slot0.sqrt_price_x96 = state.sqrt_price_x96;
        self.slot0.tick = state.tick;
        self.liquidity = state.liquidity;

        if zero_for_one {
            self.fee_growth_global_0_x128 = state.fee_growth_global_x128;
            self.protocol_fees.token0 = self.protocol_fees.token0.wrapping_add(state.protocol_fee);
        } else {
            self.fee_growth_global_1_x128 = state.fee_growth_global_x128;
            self.protocol_fees.token1 = self.protocol_fees.token1.wrapping_add(state.protocol_fee);
        }
    }

    /// Sells exactly `amount_in` of token0. The limit defaults to the lowest
    /// allowed price.
    pub fn swap_exact_0_for_1(
        &mut self,
        recipient: Address,
        amount_in: U256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapResult, Error> {
        let amount = to_signed(amount_in)?;
        self.swap(
            recipient,
            true,
            amount,
            sqrt_price_limit_x96.unwrap_or(MIN_SQRT_RATIO + U256::ONE),
        )
    }

    /// Buys exactly `amount_out` of token1 with token0.
    pub fn swap_0_for_exact_1(
        &mut self,
        recipient: Address,
        amount_out: U256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapResult, Error> {
        let amount = to_signed(amount_out)?;
        self.swap(
            recipient,
            true,
            -amount,
            sqrt_price_limit_x96.unwrap_or(MIN_SQRT_RATIO + U256::ONE),
        )
    }

    /// Sells exactly `amount_in` of token1. The limit defaults to the
    /// highest allowed price.
    pub fn swap_exact_1_for_0(
        &mut self,
        recipient: Address,
        amount_in: U256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapResult, Error> {
        let amount = to_signed(amount_in)?;
        self.swap(
            recipient,
            false,
            amount,
            sqrt_price_limit_x96.unwrap_or(MAX_SQRT_RATIO - U256::ONE),
        )
    }

    /// Buys exactly `amount_out` of token0 with token1.
    pub fn swap_1_for_exact_0(
        &mut self,
        recipient: Address,
        amount_out: U256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapResult, Error> {
        let amount = to_signed(amount_out)?;
        self.swap(
            recipient,
            false,
            -amount,
            sqrt_price_limit_x96.unwrap_or(MAX_SQRT_RATIO - U256::ONE),
        )
    }
}
