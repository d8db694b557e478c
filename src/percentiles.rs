//! Population percentile distributions.

use std::collections::HashMap;

use log::info;
use serde::Serialize;

use crate::analyzer::WalletMetrics;
use crate::utils::round_to;

/// The seven metrics every wallet record is scored on.
pub const TRACKED_METRICS: [&str; 7] = [
    "transaction_count_rpc",
    "balance",
    "total_received",
    "total_sent",
    "total_fees",
    "transaction_count_api",
    "contract_interactions",
];

/// Immutable snapshot of the sampled population, one ascending-sorted value
/// sequence per tracked metric. Built once per batch run and read-only after.
#[derive(Debug, Clone, Serialize)]
pub struct PopulationDistribution {
    metrics: HashMap<String, Vec<f64>>,
    wallet_count: usize,
}

impl PopulationDistribution {
    pub fn from_wallets(wallets: &[WalletMetrics]) -> Self {
        let mut metrics = HashMap::new();
        for name in TRACKED_METRICS {
            let mut values: Vec<f64> = wallets
                .iter()
                .filter_map(|wallet| wallet.metric_value(name))
                .collect();
            values.sort_by(f64::total_cmp);
            metrics.insert(name.to_string(), values);
        }
        Self {
            metrics,
            wallet_count: wallets.len(),
        }
    }

    pub fn wallet_count(&self) -> usize {
        self.wallet_count
    }

    pub fn values(&self, metric: &str) -> Option<&[f64]> {
        self.metrics.get(metric).map(Vec::as_slice)
    }

    /// Percentile rank of `value` against the stored population: the share of
    /// entries at or below it (ties inclusive), as a percentage to 2 decimal
    /// places. `None` for an unknown metric or an empty population.
    pub fn percentile_of(&self, metric: &str, value: f64) -> Option<f64> {
        let values = self.metrics.get(metric)?;
        if values.is_empty() {
            return None;
        }
        let rank = values.iter().filter(|v| **v <= value).count();
        Some(round_to(rank as f64 / values.len() as f64 * 100.0, 2))
    }

    /// Log every metric's sorted values with their k/len percentile.
    pub fn log_summary(&self) {
        info!("Percentiles calculated for the random wallets:");
        for metric in TRACKED_METRICS {
            info!("Percentiles for {}:", metric);
            if let Some(values) = self.values(metric) {
                for (index, value) in values.iter().enumerate() {
                    let percentile = (index + 1) as f64 / values.len() as f64 * 100.0;
                    info!("{:.2}%: {}", percentile, value);
                }
            }
        }
    }
}
