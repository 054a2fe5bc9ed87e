#![allow(dead_code)]

use std::hint::black_box;

use clmm_pool::math::bit_math::most_significant_bit;
use clmm_pool::math::liquidity_math::add_delta;
use clmm_pool::math::math_helpers::{mul_div, mul_div_rounding_up, mul_div_wrapping};
use clmm_pool::math::sqrt_price_math::{
    get_amount_0_delta, get_amount_1_delta, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};
use clmm_pool::math::swap_math::compute_swap_step;
use clmm_pool::math::tick_math::{
    MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio,
};
use clmm_pool::{Address, I256, InMemoryLedger, PoolConfig, PoolEngine, Q96, Q128, U256};
use criterion::{BatchSize, Criterion};

pub const LP: Address = Address::repeat_byte(0x11);
pub const TRADER: Address = Address::repeat_byte(0x22);

/// Pool at tick 0 with a ladder of overlapping ranges so that swaps cross
/// several initialized ticks.
pub fn ladder_pool() -> PoolEngine {
    let mut pool = PoolEngine::new(
        PoolConfig::for_fee_tier(3000).unwrap(),
        InMemoryLedger::new(),
        InMemoryLedger::new(),
    );
    pool.initialize(Q96).unwrap();
    for i in 1..=20 {
        pool.mint(LP, -600 * i, 600 * i, 1_000_000_000_000).unwrap();
    }
    pool
}

pub fn bench_tick_math(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_math");
    for tick in [MIN_TICK, -50_000, 0, 50_000, MAX_TICK] {
        group.bench_function(format!("get_sqrt_ratio_at_tick/{tick}"), |b| {
            b.iter(|| get_sqrt_ratio_at_tick(black_box(tick)))
        });
    }
    for tick in [MIN_TICK, 0, MAX_TICK] {
        let sqrt_price = get_sqrt_ratio_at_tick(tick).unwrap();
        group.bench_function(format!("get_tick_at_sqrt_ratio/{tick}"), |b| {
            b.iter(|| get_tick_at_sqrt_ratio(black_box(sqrt_price)))
        });
    }
    group.finish();
}

pub fn bench_sqrt_price_math(c: &mut Criterion) {
    let lower = get_sqrt_ratio_at_tick(-600).unwrap();
    let upper = get_sqrt_ratio_at_tick(600).unwrap();
    let liquidity = 10u128.pow(18);

    let mut group = c.benchmark_group("sqrt_price_math");
    group.bench_function("get_amount_0_delta", |b| {
        b.iter(|| get_amount_0_delta(black_box(lower), black_box(upper), black_box(liquidity as i128)))
    });
    group.bench_function("get_amount_1_delta", |b| {
        b.iter(|| get_amount_1_delta(black_box(lower), black_box(upper), black_box(-(liquidity as i128))))
    });
    group.bench_function("get_next_sqrt_price_from_input", |b| {
        b.iter(|| {
            get_next_sqrt_price_from_input(
                black_box(Q96),
                black_box(liquidity),
                black_box(U256::from(10u128.pow(15))),
                black_box(true),
            )
        })
    });
    group.bench_function("get_next_sqrt_price_from_output", |b| {
        b.iter(|| {
            get_next_sqrt_price_from_output(
                black_box(Q96),
                black_box(liquidity),
                black_box(U256::from(10u128.pow(15))),
                black_box(false),
            )
        })
    });
    group.finish();
}

pub fn bench_swap_math(c: &mut Criterion) {
    let target = get_sqrt_ratio_at_tick(-600).unwrap();
    let mut group = c.benchmark_group("swap_math");
    group.bench_function("compute_swap_step/exact_in", |b| {
        b.iter(|| {
            compute_swap_step(
                black_box(Q96),
                black_box(target),
                black_box(10u128.pow(18)),
                black_box(I256::try_from(10u64.pow(15)).unwrap()),
                black_box(3000),
            )
        })
    });
    group.bench_function("compute_swap_step/exact_out", |b| {
        b.iter(|| {
            compute_swap_step(
                black_box(Q96),
                black_box(target),
                black_box(10u128.pow(18)),
                black_box(-I256::try_from(10u64.pow(15)).unwrap()),
                black_box(3000),
            )
        })
    });
    group.finish();
}

pub fn bench_math_helpers(c: &mut Criterion) {
    let a = U256::MAX / U256::from(3u8);
    let b = U256::from(10u128.pow(30));
    let d = U256::from(10u128.pow(31));

    let mut group = c.benchmark_group("math_helpers");
    group.bench_function("mul_div", |bench| {
        bench.iter(|| mul_div(black_box(a), black_box(b), black_box(d)))
    });
    group.bench_function("mul_div_rounding_up", |bench| {
        bench.iter(|| mul_div_rounding_up(black_box(a), black_box(b), black_box(d)))
    });
    group.bench_function("mul_div_wrapping", |bench| {
        bench.iter(|| mul_div_wrapping(black_box(U256::from(3000u32)), black_box(Q128), black_box(U256::from(7u8))))
    });
    group.bench_function("add_delta", |bench| {
        bench.iter(|| add_delta(black_box(1_000_000u128), black_box(-250_000i128)))
    });
    group.finish();
}

pub fn bench_bit_math(c: &mut Criterion) {
    c.bench_function("most_significant_bit", |b| {
        b.iter(|| most_significant_bit(black_box(MIN_SQRT_RATIO)))
    });
}

pub fn bench_swap(c: &mut Criterion) {
    let pool = ladder_pool();
    let mut group = c.benchmark_group("pool");
    group.bench_function("swap/within_range", |b| {
        b.iter_batched(
            || pool.clone(),
            |mut pool| pool.swap_exact_0_for_1(TRADER, U256::from(1_000_000u32), None),
            BatchSize::SmallInput,
        )
    });
    group.bench_function("swap/crossing_ticks", |b| {
        b.iter_batched(
            || pool.clone(),
            |mut pool| pool.swap_exact_1_for_0(TRADER, U256::from(10u128.pow(13)), None),
            BatchSize::SmallInput,
        )
    });
    group.bench_function("mint", |b| {
        b.iter_batched(
            || pool.clone(),
            |mut pool| pool.mint(TRADER, -1200, 1800, 1_000_000),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
