use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - underflow")]
    Underflow,
    #[error("Math error - division by zero")]
    DivisionByZero,
    #[error("BitMath error - zero input value")]
    ZeroValue,
    #[error("Math error - liquidity overflow")]
    LiquidityOverflow,
    #[error("Math error - liquidity underflow")]
    LiquidityUnderflow,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("State error - sqrtPrice out of bounds")]
    SqrtPriceOutOfBounds,
    #[error("State error - sqrtPrice is 0")]
    SqrtPriceIsZero,
    #[error("State error - sqrtRatio is 0")]
    SqrtRatioIsZero,

    #[error("State error - tick out of bounds")]
    TickOutOfBounds,

    #[error("State error - liquidity is 0")]
    LiquidityIsZero,

    #[error("State error - requested amount exceeds pool reserves")]
    InsufficientReserves,
}

/// Precondition failures of the pool engine operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool error - already initialized")]
    AlreadyInitialized,
    #[error("Pool error - not initialized")]
    NotInitialized,
    #[error("Pool error - invalid tick range [{lower}, {upper}]")]
    InvalidRange { lower: i32, upper: i32 },
    #[error("Pool error - tick {tick} is not a multiple of spacing {spacing}")]
    MisalignedTick { tick: i32, spacing: i32 },
    #[error("Pool error - liquidity cap exceeded at tick {tick}")]
    LiquidityCapExceeded { tick: i32 },
    #[error("Pool error - position not found")]
    PositionNotFound,
    #[error("Pool error - amount is zero")]
    ZeroAmount,
    #[error("Pool error - invalid sqrtPrice limit")]
    InvalidPriceLimit,
    #[error("Pool error - deposit smaller than required amount")]
    InsufficientDeposit,
    #[error("Pool error - pool cannot cover swap output")]
    InsufficientOutput,
    #[error("Pool error - invalid protocol fee ({fee0}, {fee1})")]
    InvalidProtocolFee { fee0: u8, fee1: u8 },
    #[error("Pool error - invalid config: {0}")]
    InvalidConfig(&'static str),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger error - insufficient reserve")]
    InsufficientReserve,
    #[error("Ledger error - balance overflow")]
    Overflow,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    MathError(#[from] crate::error::MathError),

    #[error(transparent)]
    StateError(#[from] crate::error::StateError),

    #[error(transparent)]
    PoolError(#[from] crate::error::PoolError),

    #[error(transparent)]
    LedgerError(#[from] crate::error::LedgerError),
}
