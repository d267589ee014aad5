//! Price selection
//!
//! Candidate grids, expected-profit scoring and the optimizer that turns a
//! sale-probability model into a published price.

pub mod price_optimizer;
pub mod price_utils;


pub use price_optimizer::{
    candidate_prices, evaluate_candidate, PriceDecision, PriceOptimizer, PricingStrategy,
};
pub use price_utils::{
    argmax, calculate_expected_profits, get_potential_prices, offset_price, random_price,
    scale_price,
};
