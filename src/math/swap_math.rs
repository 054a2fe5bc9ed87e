use crate::U256_E6;
use crate::error::Error;
use crate::math::math_helpers::{mul_div, mul_div_rounding_up};
use crate::math::sqrt_price_math::{
    get_amount_0_delta_base, get_amount_1_delta_base, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};
use alloy_primitives::{I256, U256};

/// Outcome of a single swap step within one liquidity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapStep {
    /// Price after the step, never past the step's target.
    pub sqrt_price_next_x96: U256,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Fee charged on the input leg, on top of `amount_in`.
    pub fee_amount: U256,
}

/// Computes how far the price moves toward `sqrt_ratio_target_x96` with
/// the liquidity of the current band, and the amounts that movement costs.
///
/// The direction is inferred from the prices: `current >= target` means
/// token0 is sold for token1. A non-negative `amount_remaining` is an
/// exact-input budget (fee included), a negative one an exact-output
/// demand. For exact input, `amount_in + fee_amount` never exceeds the
/// budget; for exact output, `amount_out` never exceeds the demand.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> Result<SwapStep, Error> {
    let zero_for_one = sqrt_ratio_current_x96 >= sqrt_ratio_target_x96;
    let exact_in = !amount_remaining.is_negative();
    let remaining_abs = amount_remaining.unsigned_abs();
    let fee = U256::from(fee_pips);

    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;

    let sqrt_price_next_x96 = if exact_in {
        let amount_remaining_less_fee = mul_div(remaining_abs, U256_E6 - fee, U256_E6)?;
        amount_in = if zero_for_one {
            get_amount_0_delta_base(sqrt_ratio_target_x96, sqrt_ratio_current_x96, liquidity, true)?
        } else {
            get_amount_1_delta_base(sqrt_ratio_current_x96, sqrt_ratio_target_x96, liquidity, true)?
        };
        if amount_remaining_less_fee >= amount_in {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_input(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?
        }
    } else {
        amount_out = if zero_for_one {
            get_amount_1_delta_base(sqrt_ratio_target_x96, sqrt_ratio_current_x96, liquidity, false)?
        } else {
            get_amount_0_delta_base(sqrt_ratio_current_x96, sqrt_ratio_target_x96, liquidity, false)?
        };
        if remaining_abs >= amount_out {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_output(
                sqrt_ratio_current_x96,
                liquidity,
                remaining_abs,
                zero_for_one,
            )?
        }
    };

    let max = sqrt_ratio_target_x96 == sqrt_price_next_x96;

    if zero_for_one {
        if !(max && exact_in) {
            amount_in =
                get_amount_0_delta_base(sqrt_price_next_x96, sqrt_ratio_current_x96, liquidity, true)?;
        }
        if !(max && !exact_in) {
            amount_out =
                get_amount_1_delta_base(sqrt_price_next_x96, sqrt_ratio_current_x96, liquidity, false)?;
        }
    } else {
        if !(max && exact_in) {
            amount_in =
                get_amount_1_delta_base(sqrt_ratio_current_x96, sqrt_price_next_x96, liquidity, true)?;
        }
        if !(max && !exact_in) {
            amount_out =
                get_amount_0_delta_base(sqrt_ratio_current_x96, sqrt_price_next_x96, liquidity, false)?;
        }
    }

    // exact output never pays out more than requested
    if !exact_in && amount_out > remaining_abs {
        amount_out = remaining_abs;
    }

    let fee_amount = if exact_in && sqrt_price_next_x96 != sqrt_ratio_target_x96 {
        // the budget is exhausted inside the band, the rest of it is fee
        remaining_abs - amount_in
    } else {
        mul_div_rounding_up(amount_in, fee, U256_E6 - fee)?
    };

    Ok(SwapStep {
        sqrt_price_next_x96,
        amount_in,
        amount_out,
        fee_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Q96;
    use std::str::FromStr;

    fn i256(value: i128) -> I256 {
        I256::try_from(value).unwrap()
    }

    #[test]
    fn exact_in_capped_at_price_target_one_for_zero() {
        // price 1 -> 1.01
        let price = Q96;
        let target = U256::from_str("79623317895830914510639640423").unwrap();

        let step = compute_swap_step(price, target, 2e18 as u128, i256(1e18 as i128), 600).unwrap();

        assert_eq!(step.sqrt_price_next_x96, target);
        assert_eq!(step.amount_in, U256::from(9975124224178055u64));
        assert_eq!(step.amount_out, U256::from(9925619580021728u64));
        assert_eq!(step.fee_amount, U256::from(5988667735148u64));
        assert!(step.amount_in + step.fee_amount < U256::from(1e18 as u128));
    }

    #[test]
    fn exact_out_fully_received_one_for_zero() {
        // price 1 -> 10, only reaches 4
        let price = Q96;
        let target = U256::from_str("250541448375047931186413801569").unwrap();

        let step =
            compute_swap_step(price, target, 2e18 as u128, i256(-(1e18 as i128)), 600).unwrap();

        assert_eq!(step.amount_in, U256::from(2e18 as u128));
        assert_eq!(step.amount_out, U256::from(1e18 as u128));
        assert_eq!(step.fee_amount, U256::from(1200720432259356u64));
        assert_eq!(
            step.sqrt_price_next_x96,
            U256::from_str("158456325028528675187087900672").unwrap()
        );
        assert!(step.sqrt_price_next_x96 < target);
    }

    #[test]
    fn exact_out_is_capped_at_desired_amount() {
        let step = compute_swap_step(
            U256::from_str("417332158212080721273783715441582").unwrap(),
            U256::from_str("1452870262520218020823638996").unwrap(),
            159344665391607089467575320103,
            i256(-1),
            1,
        )
        .unwrap();

        assert_eq!(step.amount_in, U256::ONE);
        assert_eq!(step.fee_amount, U256::ONE);
        assert_eq!(step.amount_out, U256::ONE);
        assert_eq!(
            step.sqrt_price_next_x96,
            U256::from_str("417332158212080721273783715441581").unwrap()
        );
    }

    #[test]
    fn entire_input_taken_as_fee() {
        let step = compute_swap_step(
            U256::from(2413u64),
            U256::from_str("79887613182836312").unwrap(),
            1985041575832132834610021537970,
            i256(10),
            1872,
        )
        .unwrap();

        assert_eq!(step.amount_in, U256::ZERO);
        assert_eq!(step.fee_amount, U256::from(10u8));
        assert_eq!(step.amount_out, U256::ZERO);
        assert_eq!(step.sqrt_price_next_x96, U256::from(2413u64));
    }

    #[test]
    fn zero_for_one_never_moves_past_target() {
        let price = Q96;
        let target = crate::math::tick_math::get_sqrt_ratio_at_tick(-60).unwrap();

        let step = compute_swap_step(price, target, 1_000_000, i256(1e18 as i128), 3000).unwrap();

        assert_eq!(step.sqrt_price_next_x96, target);
        assert!(step.amount_out > U256::ZERO);
    }

    #[test]
    fn zero_fee_charges_nothing() {
        let price = Q96;
        let target = crate::math::tick_math::get_sqrt_ratio_at_tick(600).unwrap();

        let step = compute_swap_step(price, target, 1_000_000_000, i256(1000), 0).unwrap();

        assert_eq!(step.fee_amount, U256::ZERO);
        assert_eq!(step.amount_in, U256::from(1000u32));
    }
}
