//! Core types shared by the curator, the models and the optimizer

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ProductId = String;
pub type MerchantId = String;
pub type OfferId = String;
pub type Timestamp = DateTime<Utc>;

/// Numeric description of one offer inside its competitive context
pub type FeatureVector = Vec<f64>;

/// Binary sale outcome: 1 = sold, 0 = not sold
pub type Label = u8;

/// One competitor's visible offer at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSituationRecord {
    pub timestamp: Timestamp,
    pub product_id: ProductId,
    pub merchant_id: MerchantId,
    pub offer_id: OfferId,
    pub price: Decimal,
    pub quality: u32,
}

/// One observed sale of a specific offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub timestamp: Timestamp,
    pub product_id: ProductId,
    pub offer_id: OfferId,
}

/// An offer as seen in a competitive context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub offer_id: OfferId,
    pub product_id: ProductId,
    pub merchant_id: MerchantId,
    pub price: Decimal,
    pub quality: u32,
}

impl Offer {
    /// Copy of this offer listed at another price
    pub fn with_price(&self, price: Decimal) -> Self {
        Self {
            price,
            ..self.clone()
        }
    }
}

/// Supervised examples for one product: parallel feature rows and labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<Label>,
}

impl TrainingSet {
    pub fn push(&mut self, features: FeatureVector, label: Label) {
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }
}
