//! Per-product logistic regression
//!
//! Standardised features, full-batch gradient descent with an L2 penalty.
//! One model per product; products whose examples carry a single class are
//! left untrained so they fall through to cold-start pricing.

use std::collections::BTreeMap;

use super::model::{ModelSet, ProductModel, SaleModel};
use crate::config::TrainingConfig;
use crate::error::{MerchantError, PredictionError, Result};
use crate::types::{FeatureVector, ProductId, TrainingSet};

/// Trains a [`LogisticProductModel`] per product
#[derive(Debug, Clone)]
pub struct LogisticSaleModel {
    config: TrainingConfig,
}

impl LogisticSaleModel {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Fit a single product; `None` when the data cannot separate classes
    pub fn fit(&self, set: &TrainingSet) -> Result<Option<LogisticProductModel>> {
        if set.is_empty() {
            return Ok(None);
        }
        let positives = set.positives();
        if positives == 0 || positives == set.len() {
            return Ok(None);
        }

        let width = set.features[0].len();
        if let Some(row) = set.features.iter().find(|r| r.len() != width) {
            return Err(MerchantError::Training(format!(
                "inconsistent feature width: {} vs {}",
                row.len(),
                width
            )));
        }

        let n = set.len() as f64;
        let mut means = vec![0.0; width];
        for row in &set.features {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        let mut scales = vec![0.0; width];
        for row in &set.features {
            for ((s, x), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (x - m).powi(2) / n;
            }
        }
        for s in scales.iter_mut() {
            *s = if *s > f64::EPSILON { s.sqrt() } else { 1.0 };
        }

        let standardised: Vec<Vec<f64>> = set
            .features
            .iter()
            .map(|row| standardise(row, &means, &scales))
            .collect();

        let mut weights = vec![0.0; width];
        let mut bias = 0.0;
        for _ in 0..self.config.epochs {
            let mut grad_w = vec![0.0; width];
            let mut grad_b = 0.0;
            for (row, &label) in standardised.iter().zip(&set.labels) {
                let error = sigmoid(dot(&weights, row) + bias) - f64::from(label);
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += error * x;
                }
                grad_b += error;
            }
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= self.config.learning_rate * (g / n + self.config.l2 * *w);
            }
            bias -= self.config.learning_rate * grad_b / n;
        }

        Ok(Some(LogisticProductModel {
            means,
            scales,
            weights,
            bias,
        }))
    }
}

impl SaleModel for LogisticSaleModel {
    fn train(&self, training_sets: &BTreeMap<ProductId, TrainingSet>) -> Result<ModelSet> {
        let mut models = ModelSet::new();
        for (product_id, set) in training_sets {
            match self.fit(set)? {
                Some(model) => {
                    tracing::debug!(
                        "Trained product {} on {} examples ({} sales)",
                        product_id,
                        set.len(),
                        set.positives()
                    );
                    models.insert(product_id.clone(), Box::new(model));
                }
                None => {
                    tracing::debug!(
                        "Skipping product {}: {} examples, {} sales",
                        product_id,
                        set.len(),
                        set.positives()
                    );
                }
            }
        }
        tracing::info!(
            "{} trained {} of {} products",
            self.name(),
            models.len(),
            training_sets.len()
        );
        Ok(models)
    }

    fn name(&self) -> &str {
        "logistic"
    }
}

#[derive(Debug, Clone)]
pub struct LogisticProductModel {
    means: Vec<f64>,
    scales: Vec<f64>,
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticProductModel {
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl ProductModel for LogisticProductModel {
    fn predict_proba(
        &self,
        rows: &[FeatureVector],
    ) -> std::result::Result<Vec<f64>, PredictionError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.weights.len() {
                    return Err(PredictionError::FeatureWidth {
                        expected: self.weights.len(),
                        actual: row.len(),
                    });
                }
                let x = standardise(row, &self.means, &self.scales);
                Ok(sigmoid(dot(&self.weights, &x) + self.bias))
            })
            .collect()
    }
}

fn standardise(row: &[f64], means: &[f64], scales: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(means)
        .zip(scales)
        .map(|((x, m), s)| (x - m) / s)
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
