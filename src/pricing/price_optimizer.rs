//! Expected-profit price optimizer
//!
//! Chooses the price of one offer:
//! 1. Exploration: with a fixed probability, a uniform whole-cent price
//!    between the purchase price and the exploration ceiling
//! 2. Exploitation: sweep `base + 0.1 .. base + 9.9`, predict the sale
//!    probability of each candidate in the current competitive context and
//!    keep the expected-profit maximizer
//! 3. Fallback: when the product has no usable model, an exponential markup
//!    over the purchase price

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp1};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use super::price_utils::{argmax, calculate_expected_profits, offset_price, scale_price};
use crate::config::PricingConfig;
use crate::error::{MerchantError, PredictionError, Result};
use crate::ml::{FeatureExtractor, SalePredictor};
use crate::types::{FeatureVector, Offer};

/// Number of exploitation candidates (offsets 0.1 to 9.9)
pub const CANDIDATE_COUNT: i64 = 99;

/// Floor of the fallback markup factor
const FALLBACK_MARKUP: Decimal = dec!(0.99);

/// How a price was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingStrategy {
    Exploration,
    Exploitation,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceDecision {
    pub price: Decimal,
    pub strategy: PricingStrategy,
    /// Expected profit of the chosen candidate (exploitation only)
    pub expected_profit: Option<f64>,
}

/// Exploitation candidates: `base + k/10` for `k = 1..=99`
pub fn candidate_prices(base_price: Decimal) -> Result<Vec<Decimal>> {
    (1..=CANDIDATE_COUNT)
        .map(|k| offset_price(base_price, Decimal::new(k, 1)))
        .collect()
}

/// Features of `offer` listed at `price` within `context`
///
/// Works on a copy of the context; the offer is added when the context does
/// not list it yet.
pub fn evaluate_candidate(
    extractor: &dyn FeatureExtractor,
    offer: &Offer,
    context: &[Offer],
    price: Decimal,
) -> FeatureVector {
    let mut listed = false;
    let mut offers: Vec<Offer> = context
        .iter()
        .map(|o| {
            if o.offer_id == offer.offer_id {
                listed = true;
                o.with_price(price)
            } else {
                o.clone()
            }
        })
        .collect();
    if !listed {
        offers.push(offer.with_price(price));
    }
    extractor.extract_features(&offer.offer_id, &offers)
}

pub struct PriceOptimizer {
    config: PricingConfig,
    rng: StdRng,
}

impl PriceOptimizer {
    /// Seeded from `config.seed` when set, from OS entropy otherwise
    pub fn new(config: PricingConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: PricingConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Price to publish for `offer`
    ///
    /// The returned price must be assigned to the offer by the caller;
    /// `competing_offers` is never modified.
    pub fn choose_price(
        &mut self,
        base_price: Decimal,
        offer: &Offer,
        competing_offers: &[Offer],
        extractor: &dyn FeatureExtractor,
        predictor: &dyn SalePredictor,
    ) -> Result<Decimal> {
        self.decide(base_price, offer, competing_offers, extractor, predictor)
            .map(|decision| decision.price)
    }

    /// Like [`choose_price`](Self::choose_price), reporting the branch taken
    pub fn decide(
        &mut self,
        base_price: Decimal,
        offer: &Offer,
        competing_offers: &[Offer],
        extractor: &dyn FeatureExtractor,
        predictor: &dyn SalePredictor,
    ) -> Result<PriceDecision> {
        if base_price <= Decimal::ZERO {
            return Err(MerchantError::InvalidPrice(format!(
                "purchase price of offer {} must be positive, got {}",
                offer.offer_id, base_price
            )));
        }

        if self.rng.random::<f64>() < self.config.exploration_rate {
            if let Some(price) = self.exploration_price(base_price)? {
                tracing::debug!("Exploring offer {} at {}", offer.offer_id, price);
                return Ok(PriceDecision {
                    price,
                    strategy: PricingStrategy::Exploration,
                    expected_profit: None,
                });
            }
            tracing::debug!(
                "Purchase price {} above exploration ceiling {}, exploiting instead",
                base_price,
                self.config.exploration_ceiling
            );
        }

        self.highest_expected_profit(base_price, offer, competing_offers, extractor, predictor)
    }

    /// Whole-cent draw in [base, ceiling]; `None` when base exceeds the ceiling
    fn exploration_price(&mut self, base_price: Decimal) -> Result<Option<Decimal>> {
        let low = scale_price(base_price, Decimal::ONE_HUNDRED)?.ceil().to_i64();
        let high = scale_price(self.config.exploration_ceiling, Decimal::ONE_HUNDRED)?
            .floor()
            .to_i64();
        match (low, high) {
            (Some(low), Some(high)) if low <= high => {
                Ok(Some(Decimal::new(self.rng.random_range(low..=high), 2)))
            }
            _ => Ok(None),
        }
    }

    fn highest_expected_profit(
        &mut self,
        base_price: Decimal,
        offer: &Offer,
        competing_offers: &[Offer],
        extractor: &dyn FeatureExtractor,
        predictor: &dyn SalePredictor,
    ) -> Result<PriceDecision> {
        let candidates = candidate_prices(base_price)?;
        let rows: Vec<FeatureVector> = candidates
            .iter()
            .map(|&price| evaluate_candidate(extractor, offer, competing_offers, price))
            .collect();

        let probabilities = match predictor.predict(&offer.product_id, &rows) {
            Ok(probabilities) => probabilities,
            Err(e) if e.is_recoverable() => return self.fallback(base_price, offer, &e),
            Err(e) => return Err(e.into()),
        };

        if probabilities.len() != candidates.len() {
            let e = PredictionError::Malformed(format!(
                "{} probabilities for {} candidates",
                probabilities.len(),
                candidates.len()
            ));
            return self.fallback(base_price, offer, &e);
        }
        if let Some(p) = probabilities.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            let e = PredictionError::Malformed(format!("sale probability {} outside [0, 1]", p));
            return self.fallback(base_price, offer, &e);
        }

        let profits = calculate_expected_profits(&candidates, base_price, &probabilities);
        let Some(best) = argmax(&profits) else {
            let e = PredictionError::Malformed("no candidate scored".to_string());
            return self.fallback(base_price, offer, &e);
        };

        tracing::debug!(
            "Offer {} priced at {} (p={:.3}, expected profit {:.4})",
            offer.offer_id,
            candidates[best],
            probabilities[best],
            profits[best]
        );
        Ok(PriceDecision {
            price: candidates[best],
            strategy: PricingStrategy::Exploitation,
            expected_profit: Some(profits[best]),
        })
    }

    /// `base * (X + 0.99)` with `X ~ Exp(1)`
    fn fallback(
        &mut self,
        base_price: Decimal,
        offer: &Offer,
        reason: &PredictionError,
    ) -> Result<PriceDecision> {
        let x: f64 = Exp1.sample(&mut self.rng);
        let markup = Decimal::from_f64(x)
            .map(|x| x + FALLBACK_MARKUP)
            .unwrap_or(FALLBACK_MARKUP);
        let price = scale_price(base_price, markup)?;
        tracing::debug!(
            "Fallback price {} for offer {} of product {}: {}",
            price,
            offer.offer_id,
            offer.product_id,
            reason
        );
        Ok(PriceDecision {
            price,
            strategy: PricingStrategy::Fallback,
            expected_profit: None,
        })
    }
}
