//! Training set curation
//!
//! Joins market situations and sales into time buckets per product:
//!
//! ```text
//! product_id
//!   └─ snapshot timestamp
//!        ├─ merchant_id ─ offer_id ─ (price, quality)
//!        └─ sales: [(sale timestamp, offer_id), ...]
//! ```
//!
//! A sale is attributed to the most recent snapshot at or before it. Both
//! streams are append-only: records at or before the last accepted timestamp
//! are dropped, not reordered.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{MerchantError, Result};
use crate::ml::FeatureExtractor;
use crate::types::{
    MarketSituationRecord, MerchantId, Offer, OfferId, ProductId, SaleRecord, Timestamp,
    TrainingSet,
};


/// Price and quality of one offer at one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct OfferObservation {
    pub price: Decimal,
    pub quality: u32,
}

/// A sale attributed to a snapshot, keeping its own timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct SaleEvent {
    pub timestamp: Timestamp,
    pub offer_id: OfferId,
}

/// Everything observed for one product at one snapshot timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    pub merchants: BTreeMap<MerchantId, BTreeMap<OfferId, OfferObservation>>,
    pub sales: Vec<SaleEvent>,
}

impl Bucket {
    /// All offers listed in this bucket, across merchants
    pub fn offers(&self, product_id: &str) -> Vec<Offer> {
        self.merchants
            .iter()
            .flat_map(|(merchant_id, offers)| {
                offers.iter().map(move |(offer_id, obs)| Offer {
                    offer_id: offer_id.clone(),
                    product_id: product_id.to_string(),
                    merchant_id: merchant_id.clone(),
                    price: obs.price,
                    quality: obs.quality,
                })
            })
            .collect()
    }

    pub fn offer_count(&self) -> usize {
        self.merchants.values().map(|offers| offers.len()).sum()
    }
}

pub type JoinedDataset = BTreeMap<ProductId, BTreeMap<Timestamp, Bucket>>;

/// Number of sales recorded for `offer_id`, whatever their own timestamps
pub fn extract_sales(sales: &[SaleEvent], offer_id: &str) -> usize {
    sales.iter().filter(|s| s.offer_id == offer_id).count()
}

/// Accepted / dropped counts of one ingestion batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: usize,
    pub dropped: usize,
}

impl IngestStats {
    fn record(&mut self, accepted: bool) {
        if accepted {
            self.accepted += 1;
        } else {
            self.dropped += 1;
        }
    }
}

/// Overview of the curated data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurationSummary {
    pub products: usize,
    pub market_situation_entries: usize,
    pub sale_entries: usize,
    pub distinct_timestamps: usize,
    pub first_timestamp: Option<Timestamp>,
    pub last_timestamp: Option<Timestamp>,
    pub first_sale: Option<Timestamp>,
    pub last_sale: Option<Timestamp>,
    /// Buckets in which one offer sold more than once
    pub multi_sale_buckets: usize,
}

/// Owns the joined dataset and turns it into per-product training sets
pub struct TrainingSetCurator {
    merchant_id: MerchantId,
    alias_merchant_id: Option<MerchantId>,
    joined: JoinedDataset,
    /// Sorted snapshot timestamps per product, rebuilt at batch boundaries
    timestamps: HashMap<ProductId, Vec<Timestamp>>,
    /// Latest accepted market situation per product, committed or not
    last_situation: HashMap<ProductId, Timestamp>,
    last_sale: HashMap<ProductId, Timestamp>,
    extractor: Arc<dyn FeatureExtractor>,
}

impl TrainingSetCurator {
    pub fn new(merchant_id: impl Into<MerchantId>, extractor: Arc<dyn FeatureExtractor>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            alias_merchant_id: None,
            joined: JoinedDataset::new(),
            timestamps: HashMap::new(),
            last_situation: HashMap::new(),
            last_sale: HashMap::new(),
            extractor,
        }
    }

    /// Treat records of `alias` as our own (bootstrap data recorded under
    /// another merchant id)
    pub fn with_alias(mut self, alias: Option<MerchantId>) -> Self {
        self.alias_merchant_id = alias;
        self
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn dataset(&self) -> &JoinedDataset {
        &self.joined
    }

    /// Committed snapshot timestamps of a product
    pub fn timestamps(&self, product_id: &str) -> &[Timestamp] {
        self.timestamps
            .get(product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Insert one market situation; returns whether it was accepted
    ///
    /// Records at or before the last committed snapshot of the product are
    /// dropped, as are records older than the last accepted one. Records
    /// sharing the timestamp of the snapshot being ingested are accepted
    /// until [`refresh_timestamps`](Self::refresh_timestamps) commits it.
    pub fn append_market_situation(&mut self, record: MarketSituationRecord) -> bool {
        let committed = self.timestamps(&record.product_id).last().copied();
        let accepted = self.last_situation.get(&record.product_id).copied();
        let stale = committed.is_some_and(|last| record.timestamp <= last)
            || accepted.is_some_and(|last| record.timestamp < last);
        if stale {
            tracing::debug!(
                "Dropping stale market situation {} for product {} at {} (last {:?})",
                record.offer_id,
                record.product_id,
                record.timestamp,
                accepted.or(committed)
            );
            return false;
        }
        self.last_situation
            .insert(record.product_id.clone(), record.timestamp);

        let merchant_id = match &self.alias_merchant_id {
            Some(alias) if *alias == record.merchant_id => self.merchant_id.clone(),
            _ => record.merchant_id,
        };

        self.joined
            .entry(record.product_id)
            .or_default()
            .entry(record.timestamp)
            .or_default()
            .merchants
            .entry(merchant_id)
            .or_default()
            .entry(record.offer_id)
            .or_insert(OfferObservation {
                price: record.price,
                quality: record.quality,
            });
        true
    }

    /// Rebuild the sorted timestamp index of every product
    pub fn refresh_timestamps(&mut self) {
        self.timestamps = self
            .joined
            .iter()
            .map(|(product_id, buckets)| (product_id.clone(), buckets.keys().copied().collect()))
            .collect();
    }

    /// Append one batch of market situations and commit the index
    pub fn append_market_situations(
        &mut self,
        records: impl IntoIterator<Item = MarketSituationRecord>,
    ) -> IngestStats {
        let mut stats = IngestStats::default();
        for record in records {
            stats.record(self.append_market_situation(record));
        }
        self.refresh_timestamps();
        tracing::debug!(
            "Market situations: {} accepted, {} dropped",
            stats.accepted,
            stats.dropped
        );
        stats
    }

    /// Attribute one sale to its snapshot; returns whether it was accepted
    pub fn append_sale(&mut self, record: SaleRecord) -> bool {
        if let Some(last) = self.last_sale.get(&record.product_id) {
            if record.timestamp <= *last {
                tracing::debug!(
                    "Dropping stale sale of {} at {} (last {})",
                    record.offer_id,
                    record.timestamp,
                    last
                );
                return false;
            }
        }

        let index = self.timestamps(&record.product_id);
        let position = index.partition_point(|t| *t <= record.timestamp);
        if position == 0 {
            tracing::debug!(
                "Dropping sale of {} at {}: no earlier snapshot for product {}",
                record.offer_id,
                record.timestamp,
                record.product_id
            );
            return false;
        }
        let snapshot = index[position - 1];

        let Some(bucket) = self
            .joined
            .get_mut(&record.product_id)
            .and_then(|buckets| buckets.get_mut(&snapshot))
        else {
            return false;
        };
        bucket.sales.push(SaleEvent {
            timestamp: record.timestamp,
            offer_id: record.offer_id,
        });
        self.last_sale.insert(record.product_id, record.timestamp);
        true
    }

    pub fn append_sales(&mut self, records: impl IntoIterator<Item = SaleRecord>) -> IngestStats {
        let mut stats = IngestStats::default();
        for record in records {
            stats.record(self.append_sale(record));
        }
        tracing::debug!("Sales: {} accepted, {} dropped", stats.accepted, stats.dropped);
        stats
    }

    /// Supervised examples for one product
    ///
    /// Every own offer in every bucket yields one negative example when it
    /// did not sell, or one positive example per sale. Features describe the
    /// offer against all offers of the bucket.
    pub fn build_training_set(&self, product_id: &str) -> Result<TrainingSet> {
        let buckets = self
            .joined
            .get(product_id)
            .ok_or_else(|| MerchantError::UnknownProduct(product_id.to_string()))?;

        let mut set = TrainingSet::default();
        for bucket in buckets.values() {
            let Some(own_offers) = bucket.merchants.get(&self.merchant_id) else {
                continue;
            };
            let offers = bucket.offers(product_id);

            for offer_id in own_offers.keys() {
                let features = self.extractor.extract_features(offer_id, &offers);
                match extract_sales(&bucket.sales, offer_id) {
                    0 => set.push(features, 0),
                    sold => {
                        for _ in 0..sold {
                            set.push(features.clone(), 1);
                        }
                    }
                }
            }
        }
        Ok(set)
    }

    /// Training sets for every known product
    pub fn build_all_training_sets(&self) -> Result<BTreeMap<ProductId, TrainingSet>> {
        self.joined
            .keys()
            .map(|product_id| Ok((product_id.clone(), self.build_training_set(product_id)?)))
            .collect()
    }

    pub fn summary(&self) -> CurationSummary {
        let mut summary = CurationSummary {
            products: self.joined.len(),
            ..Default::default()
        };
        let mut timestamps: Vec<DateTime<Utc>> = Vec::new();

        for buckets in self.joined.values() {
            for (timestamp, bucket) in buckets {
                timestamps.push(*timestamp);
                summary.market_situation_entries += bucket.offer_count();
                summary.sale_entries += bucket.sales.len();

                let mut per_offer: HashMap<&str, usize> = HashMap::new();
                for sale in &bucket.sales {
                    *per_offer.entry(sale.offer_id.as_str()).or_default() += 1;
                    summary.first_sale = Some(match summary.first_sale {
                        Some(first) => first.min(sale.timestamp),
                        None => sale.timestamp,
                    });
                    summary.last_sale = Some(match summary.last_sale {
                        Some(last) => last.max(sale.timestamp),
                        None => sale.timestamp,
                    });
                }
                if per_offer.values().any(|&count| count > 1) {
                    summary.multi_sale_buckets += 1;
                }
            }
        }

        timestamps.sort();
        timestamps.dedup();
        summary.distinct_timestamps = timestamps.len();
        summary.first_timestamp = timestamps.first().copied();
        summary.last_timestamp = timestamps.last().copied();
        summary
    }
}
