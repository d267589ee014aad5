//! Machine learning capability
//!
//! Provides the sale-probability side of the merchant:
//! - Feature extraction from a competitive context
//! - Substitutable model traits (train / predict)
//! - Atomically swappable model snapshots
//! - A per-product logistic regression implementation

pub mod features;
pub mod logistic;
pub mod model;

#[cfg(test)]
mod tests;

pub use features::{CompetitiveFeatureExtractor, FeatureExtractor, FEATURE_COUNT};
pub use logistic::{LogisticProductModel, LogisticSaleModel};
pub use model::{ModelHandle, ModelSet, ProductModel, SaleModel, SalePredictor};
