//! Sale probability models
//!
//! A [`SaleModel`] turns curated training sets into a [`ModelSet`]; the
//! optimizer only ever sees the [`SalePredictor`] side of it. Concrete
//! learning techniques plug in behind [`ProductModel`].

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{PredictionError, Result};
use crate::types::{FeatureVector, ProductId, TrainingSet};

/// Predicts one sale probability per feature row
#[cfg_attr(test, mockall::automock)]
pub trait SalePredictor: Send + Sync {
    fn predict(
        &self,
        product_id: &str,
        rows: &[FeatureVector],
    ) -> std::result::Result<Vec<f64>, PredictionError>;
}

/// A trained model for a single product
pub trait ProductModel: Send + Sync {
    fn predict_proba(
        &self,
        rows: &[FeatureVector],
    ) -> std::result::Result<Vec<f64>, PredictionError>;
}

/// Learning technique that builds per-product models
pub trait SaleModel: Send + Sync {
    fn train(&self, training_sets: &BTreeMap<ProductId, TrainingSet>) -> Result<ModelSet>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// Immutable set of trained per-product models
#[derive(Default)]
pub struct ModelSet {
    models: HashMap<ProductId, Box<dyn ProductModel>>,
}

impl ModelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product_id: impl Into<ProductId>, model: Box<dyn ProductModel>) {
        self.models.insert(product_id.into(), model);
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.models.contains_key(product_id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl SalePredictor for ModelSet {
    fn predict(
        &self,
        product_id: &str,
        rows: &[FeatureVector],
    ) -> std::result::Result<Vec<f64>, PredictionError> {
        let model = self
            .models
            .get(product_id)
            .ok_or_else(|| PredictionError::UnknownProduct(product_id.to_string()))?;

        let probabilities = model.predict_proba(rows)?;
        if probabilities.len() != rows.len() {
            return Err(PredictionError::Malformed(format!(
                "{} probabilities for {} rows",
                probabilities.len(),
                rows.len()
            )));
        }
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0) {
            return Err(PredictionError::Malformed(format!("probability out of range: {}", bad)));
        }
        Ok(probabilities)
    }
}

/// Shared handle to the current model snapshot
///
/// Readers clone the inner `Arc` and keep predicting against it while a
/// retrain swaps in a new snapshot.
pub struct ModelHandle {
    current: RwLock<Arc<ModelSet>>,
}

impl ModelHandle {
    pub fn new(models: ModelSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(models)),
        }
    }

    pub fn empty() -> Self {
        Self::new(ModelSet::new())
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<ModelSet> {
        self.current.read().clone()
    }

    /// Replace the snapshot, returning the previous one
    pub fn swap(&self, models: ModelSet) -> Arc<ModelSet> {
        std::mem::replace(&mut *self.current.write(), Arc::new(models))
    }
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self::empty()
    }
}

impl SalePredictor for ModelHandle {
    fn predict(
        &self,
        product_id: &str,
        rows: &[FeatureVector],
    ) -> std::result::Result<Vec<f64>, PredictionError> {
        self.load().predict(product_id, rows)
    }
}
