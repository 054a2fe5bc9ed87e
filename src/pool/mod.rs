pub mod engine;
pub mod liquidity;
pub mod position;
pub mod swap;
pub mod tick;
