//! ML Pricing Merchant
//!
//! Curates marketplace history, trains sale models and prices offers.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ml_merchant::{config::Config, data, merchant::MlMerchant};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ml-merchant")]
#[command(about = "Machine-learning pricing merchant for a simulated marketplace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics of the curated history
    Summary,
    /// Train sale models and report per-product example counts
    Train,
    /// Price one offer against a competitive context
    Price {
        /// JSON array of the offers currently listed for the product
        #[arg(long)]
        offers: String,
        /// Offer to price (must appear in the offers file)
        #[arg(long)]
        offer_id: String,
        /// Purchase price of the product
        #[arg(long)]
        base_price: Decimal,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Summary => show_summary(config),
        Commands::Train => train(config),
        Commands::Price {
            offers,
            offer_id,
            base_price,
        } => price(config, &offers, &offer_id, base_price),
    }
}

/// Build a merchant from the configured history files
fn load_merchant(config: &Config) -> anyhow::Result<MlMerchant> {
    let situations_path = config.data.market_situations();
    let sales_path = config.data.sales();

    let situations = data::load_market_situations(&situations_path)
        .with_context(|| format!("loading market situations from {}", situations_path))?;
    let sales = data::load_sales(&sales_path)
        .with_context(|| format!("loading sales from {}", sales_path))?;

    let merchant = MlMerchant::from_config(config);
    merchant.ingest(situations, sales);
    Ok(merchant)
}

fn show_summary(config: Config) -> anyhow::Result<()> {
    let merchant = load_merchant(&config)?;
    let summary = merchant.summary();

    println!("Training data:");
    println!("  Products:                {}", summary.products);
    println!("  Market situation entries: {}", summary.market_situation_entries);
    println!("  Sale entries:            {}", summary.sale_entries);
    println!("  Distinct timestamps:     {}", summary.distinct_timestamps);
    println!("  First timestamp:         {}", display(summary.first_timestamp));
    println!("  Last timestamp:          {}", display(summary.last_timestamp));
    println!("  First sale:              {}", display(summary.first_sale));
    println!("  Last sale:               {}", display(summary.last_sale));
    println!("  Multiple sales in bucket: {}", summary.multi_sale_buckets);
    Ok(())
}

fn train(config: Config) -> anyhow::Result<()> {
    let merchant = load_merchant(&config)?;
    let report = merchant.retrain()?;

    println!(
        "Trained {} of {} products on {} examples",
        report.trained_products, report.products, report.examples
    );
    Ok(())
}

fn price(
    config: Config,
    offers_path: &str,
    offer_id: &str,
    base_price: Decimal,
) -> anyhow::Result<()> {
    let offers = data::load_offers(offers_path)
        .with_context(|| format!("loading offers from {}", offers_path))?;
    let offer = offers
        .iter()
        .find(|o| o.offer_id == offer_id)
        .cloned()
        .with_context(|| format!("offer {} not found in {}", offer_id, offers_path))?;

    let merchant = load_merchant(&config)?;
    merchant.retrain()?;
    let decision = merchant.price_offer(base_price, &offer, &offers)?;

    println!(
        "Offer {} (product {}): {} via {:?}",
        offer.offer_id, offer.product_id, decision.price, decision.strategy
    );
    if let Some(profit) = decision.expected_profit {
        println!("  Expected profit: {:.4}", profit);
    }
    Ok(())
}

fn display(timestamp: Option<chrono::DateTime<chrono::Utc>>) -> String {
    timestamp
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}
