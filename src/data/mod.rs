//! Record loading
//!
//! Market situations and sales are read from JSON-lines files, one record
//! per line. Offer contexts are a plain JSON array.

use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{MerchantError, Result};
use crate::types::{MarketSituationRecord, Offer, SaleRecord};


/// Parse JSON-lines; blank lines are skipped, a bad line is an error
pub fn read_jsonl<T: DeserializeOwned, R: BufRead>(reader: R) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|source| MerchantError::MalformedRecord { line: i + 1, source })?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_jsonl<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let records = read_jsonl(BufReader::new(File::open(path)?))?;
    tracing::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

pub fn load_market_situations(path: impl AsRef<Path>) -> Result<Vec<MarketSituationRecord>> {
    load_jsonl(path)
}

pub fn load_sales(path: impl AsRef<Path>) -> Result<Vec<SaleRecord>> {
    load_jsonl(path)
}

pub fn load_offers(path: impl AsRef<Path>) -> Result<Vec<Offer>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
