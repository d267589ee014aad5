//! ML merchant
//!
//! Ties curation, training and pricing together. Ingestion is serialised
//! behind one lock; price decisions run against an immutable model snapshot
//! that a retrain swaps atomically.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::ml::{
    CompetitiveFeatureExtractor, FeatureExtractor, LogisticSaleModel, ModelHandle, SaleModel,
};
use crate::pricing::{PriceDecision, PriceOptimizer};
use crate::training::{CurationSummary, IngestStats, TrainingSetCurator};
use crate::types::{MarketSituationRecord, Offer, SaleRecord};

/// Outcome of one retraining pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrainReport {
    pub products: usize,
    pub examples: usize,
    pub trained_products: usize,
}

pub struct MlMerchant {
    curator: Mutex<TrainingSetCurator>,
    model: Box<dyn SaleModel>,
    models: ModelHandle,
    extractor: Arc<dyn FeatureExtractor>,
    optimizer: Mutex<PriceOptimizer>,
}

impl MlMerchant {
    pub fn new(
        config: &Config,
        model: Box<dyn SaleModel>,
        extractor: Arc<dyn FeatureExtractor>,
    ) -> Self {
        let merchant_id = config.merchant.merchant_id.clone();
        let curator = TrainingSetCurator::new(merchant_id, extractor.clone())
            .with_alias(config.merchant.alias_merchant_id.clone());

        Self {
            curator: Mutex::new(curator),
            model,
            models: ModelHandle::empty(),
            extractor,
            optimizer: Mutex::new(PriceOptimizer::new(config.pricing.clone())),
        }
    }

    /// Logistic model over competitive features
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config,
            Box::new(LogisticSaleModel::new(config.training.clone())),
            Arc::new(CompetitiveFeatureExtractor::new()),
        )
    }

    /// Append one batch of market situations followed by its sales
    pub fn ingest(
        &self,
        market_situations: impl IntoIterator<Item = MarketSituationRecord>,
        sales: impl IntoIterator<Item = SaleRecord>,
    ) -> (IngestStats, IngestStats) {
        let mut curator = self.curator.lock();
        let situations = curator.append_market_situations(market_situations);
        let sales = curator.append_sales(sales);
        tracing::info!(
            "Ingested {} market situations ({} dropped), {} sales ({} dropped)",
            situations.accepted,
            situations.dropped,
            sales.accepted,
            sales.dropped
        );
        (situations, sales)
    }

    /// Rebuild all training sets and swap in freshly trained models
    pub fn retrain(&self) -> Result<RetrainReport> {
        let training_sets = self.curator.lock().build_all_training_sets()?;
        let models = self.model.train(&training_sets)?;

        let report = RetrainReport {
            products: training_sets.len(),
            examples: training_sets.values().map(|set| set.len()).sum(),
            trained_products: models.len(),
        };
        self.models.swap(models);
        tracing::info!(
            "Retrained {} model: {}/{} products on {} examples",
            self.model.name(),
            report.trained_products,
            report.products,
            report.examples
        );
        Ok(report)
    }

    /// Price to publish for `offer`, bought at `base_price`
    pub fn price_offer(
        &self,
        base_price: Decimal,
        offer: &Offer,
        competing_offers: &[Offer],
    ) -> Result<PriceDecision> {
        let snapshot = self.models.load();
        self.optimizer.lock().decide(
            base_price,
            offer,
            competing_offers,
            self.extractor.as_ref(),
            snapshot.as_ref(),
        )
    }

    pub fn summary(&self) -> CurationSummary {
        self.curator.lock().summary()
    }

    pub fn models(&self) -> &ModelHandle {
        &self.models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, MerchantConfig, PricingConfig, TrainingConfig};
    use crate::pricing::PricingStrategy;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn make_config() -> Config {
        Config {
            merchant: MerchantConfig {
                merchant_id: "me".to_string(),
                alias_merchant_id: None,
            },
            pricing: PricingConfig {
                exploration_rate: 0.0,
                seed: Some(3),
                ..Default::default()
            },
            training: TrainingConfig::default(),
            data: DataConfig::default(),
        }
    }

    fn offer(id: &str, merchant: &str, price: Decimal) -> Offer {
        Offer {
            offer_id: id.to_string(),
            product_id: "1".to_string(),
            merchant_id: merchant.to_string(),
            price,
            quality: 1,
        }
    }

    /// Own offer undercuts the rival every other snapshot and only sells then
    fn history() -> (Vec<MarketSituationRecord>, Vec<SaleRecord>) {
        let start = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        let mut situations = Vec::new();
        let mut sales = Vec::new();
        for i in 0..60 {
            let at = start + Duration::minutes(i * 10);
            let own_price = if i % 2 == 0 { dec!(11) } else { dec!(16) };
            let listed = [("me", "own", own_price), ("rival", "r1", dec!(14))];
            for (merchant, offer_id, price) in listed {
                situations.push(MarketSituationRecord {
                    timestamp: at,
                    product_id: "1".to_string(),
                    merchant_id: merchant.to_string(),
                    offer_id: offer_id.to_string(),
                    price,
                    quality: 1,
                });
            }
            if i % 2 == 0 {
                sales.push(SaleRecord {
                    timestamp: at + Duration::minutes(1),
                    product_id: "1".to_string(),
                    offer_id: "own".to_string(),
                });
            }
        }
        (situations, sales)
    }

    #[test]
    fn test_cold_start_uses_fallback() {
        let merchant = MlMerchant::from_config(&make_config());
        let own = offer("own", "me", dec!(15));

        let decision = merchant.price_offer(dec!(10), &own, &[own.clone()]).unwrap();

        assert_eq!(decision.strategy, PricingStrategy::Fallback);
        assert!(decision.price >= dec!(9.9));
    }

    #[test]
    fn test_ingest_retrain_and_price() {
        let merchant = MlMerchant::from_config(&make_config());
        let (situations, sales) = history();

        let (situation_stats, sale_stats) = merchant.ingest(situations, sales);
        assert_eq!(situation_stats.accepted, 120);
        assert_eq!(sale_stats.accepted, 30);

        let report = merchant.retrain().unwrap();
        assert_eq!(
            report,
            RetrainReport {
                products: 1,
                examples: 60,
                trained_products: 1
            }
        );

        let own = offer("own", "me", dec!(15));
        let context = vec![own.clone(), offer("r1", "rival", dec!(14))];
        let decision = merchant.price_offer(dec!(10), &own, &context).unwrap();

        assert_eq!(decision.strategy, PricingStrategy::Exploitation);
        assert!(decision.price > dec!(10) && decision.price < dec!(20));
        // caller assigns the price; context stays as given
        assert_eq!(context[0].price, dec!(15));
    }

    #[test]
    fn test_replayed_batch_is_ignored() {
        let merchant = MlMerchant::from_config(&make_config());
        let (situations, sales) = history();

        merchant.ingest(situations.clone(), sales.clone());
        let (situation_stats, sale_stats) = merchant.ingest(situations, sales);

        assert_eq!(situation_stats.accepted, 0);
        assert_eq!(sale_stats.accepted, 0);
        assert_eq!(merchant.summary().sale_entries, 30);
    }
}
