//! ML Pricing Merchant
//!
//! A pricing agent for a simulated marketplace that learns how likely an
//! offer is to sell under the current competition and prices for expected
//! profit.
//!
//! ## Architecture
//!
//! ```text
//! Market situations + Sales → Curator → Training sets → SaleModel
//!                                                          ↓
//!                   Competing offers → Price Optimizer ← ModelSet snapshot
//!                                           ↓
//!                                    Price to publish
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod merchant;
pub mod ml;
pub mod pricing;
pub mod training;
pub mod types;
