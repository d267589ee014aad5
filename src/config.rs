//! Configuration management

use crate::error::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub merchant: MerchantConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MerchantConfig {
    /// Our merchant id on the marketplace
    pub merchant_id: String,
    /// Merchant id under which bootstrap data was recorded; its records are
    /// attributed to `merchant_id` during curation
    #[serde(default)]
    pub alias_merchant_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Probability of ignoring the model and drawing a random price
    #[serde(default = "default_exploration_rate")]
    pub exploration_rate: f64,
    /// Upper bound of the exploration draw (currency units)
    #[serde(default = "default_exploration_ceiling")]
    pub exploration_ceiling: Decimal,
    /// Fixed RNG seed; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_exploration_rate() -> f64 {
    0.3
}

fn default_exploration_ceiling() -> Decimal {
    dec!(100)
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            exploration_rate: default_exploration_rate(),
            exploration_ceiling: default_exploration_ceiling(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// L2 penalty on the weights
    #[serde(default = "default_l2")]
    pub l2: f64,
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_epochs() -> usize {
    500
}

fn default_l2() -> f64 {
    0.001
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            l2: default_l2(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_market_situations_path")]
    pub market_situations_path: String,
    #[serde(default = "default_sales_path")]
    pub sales_path: String,
}

fn default_market_situations_path() -> String {
    "data/marketSituation.jsonl".to_string()
}

fn default_sales_path() -> String {
    "data/buyOffer.jsonl".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            market_situations_path: default_market_situations_path(),
            sales_path: default_sales_path(),
        }
    }
}

impl DataConfig {
    /// Market situation path with `~` and environment variables expanded
    pub fn market_situations(&self) -> String {
        expand(&self.market_situations_path)
    }

    /// Sales path with `~` and environment variables expanded
    pub fn sales(&self) -> String {
        expand(&self.sales_path)
    }
}

fn expand(path: &str) -> String {
    match shellexpand::full(path) {
        Ok(expanded) => expanded.into_owned(),
        Err(e) => {
            tracing::warn!("Could not expand path {}: {}", path, e);
            path.to_string()
        }
    }
}

impl Config {
    /// Load from an optional config file, then `MERCHANT__*` env overrides
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("MERCHANT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
