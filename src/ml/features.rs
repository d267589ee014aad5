//! Feature extraction from a competitive context
//!
//! Turns "one offer among all offers currently listed for a product" into a
//! fixed-width numeric vector the sale models can consume.

use rust_decimal::prelude::*;

use crate::types::{FeatureVector, Offer};

/// Number of features produced by [`CompetitiveFeatureExtractor`]
pub const FEATURE_COUNT: usize = 7;

/// Extracts the feature vector of one offer within a set of offers
pub trait FeatureExtractor: Send + Sync {
    fn extract_features(&self, offer_id: &str, offers: &[Offer]) -> FeatureVector;
}

/// Rank and spread features relative to the competing offers
///
/// Layout:
/// 0. price rank (1 = cheapest, ties share the better rank)
/// 1. number of offers in the context
/// 2. own price
/// 3. own price minus the cheapest competitor price
/// 4. quality rank (1 = lowest quality value)
/// 5. 1.0 when the offer is the cheapest, else 0.0
/// 6. own price divided by the mean competitor price
///
/// An offer id missing from the context yields an all-zero vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompetitiveFeatureExtractor;

impl CompetitiveFeatureExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for CompetitiveFeatureExtractor {
    fn extract_features(&self, offer_id: &str, offers: &[Offer]) -> FeatureVector {
        let Some(own) = offers.iter().find(|o| o.offer_id == offer_id) else {
            return vec![0.0; FEATURE_COUNT];
        };

        let price_rank = 1 + offers.iter().filter(|o| o.price < own.price).count();
        let quality_rank = 1 + offers.iter().filter(|o| o.quality < own.quality).count();

        let competitors: Vec<&Offer> = offers.iter().filter(|o| o.offer_id != offer_id).collect();
        let own_price = own.price.to_f64().unwrap_or(0.0);

        let (gap_to_cheapest, relative_to_mean) = if competitors.is_empty() {
            (0.0, 1.0)
        } else {
            let cheapest = competitors
                .iter()
                .map(|o| o.price)
                .min()
                .unwrap_or(own.price);
            let mean = competitors.iter().map(|o| o.price).sum::<Decimal>()
                / Decimal::from(competitors.len());
            let gap = (own.price - cheapest).to_f64().unwrap_or(0.0);
            let relative = if mean.is_zero() {
                1.0
            } else {
                (own.price / mean).to_f64().unwrap_or(1.0)
            };
            (gap, relative)
        };

        vec![
            price_rank as f64,
            offers.len() as f64,
            own_price,
            gap_to_cheapest,
            quality_rank as f64,
            if price_rank == 1 { 1.0 } else { 0.0 },
            relative_to_mean,
        ]
    }
}
