//! Per-wallet metric assembly.

use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;

use crate::explorer::{AggregateTotals, Provider};
use crate::rpc::ChainReader;
use crate::utils::round_to;

/// One wallet's enriched metric record. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletMetrics {
    pub address: String,
    pub transaction_count_rpc: u64,
    pub balance: f64,
    pub total_received: f64,
    pub total_sent: f64,
    pub total_fees: f64,
    pub transaction_count_api: u64,
    pub contract_interactions: u64,
}

impl WalletMetrics {
    fn zeroed(address: String, balance: f64) -> Self {
        Self {
            address,
            transaction_count_rpc: 0,
            balance,
            total_received: 0.0,
            total_sent: 0.0,
            total_fees: 0.0,
            transaction_count_api: 0,
            contract_interactions: 0,
        }
    }

    /// Numeric value of one of the seven tracked metrics.
    pub fn metric_value(&self, metric: &str) -> Option<f64> {
        match metric {
            "transaction_count_rpc" => Some(self.transaction_count_rpc as f64),
            "balance" => Some(self.balance),
            "total_received" => Some(self.total_received),
            "total_sent" => Some(self.total_sent),
            "total_fees" => Some(self.total_fees),
            "transaction_count_api" => Some(self.transaction_count_api as f64),
            "contract_interactions" => Some(self.contract_interactions as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalletAnalyzer {
    reader: ChainReader,
    provider: Provider,
    zero_result_attempts: u32,
    zero_result_delay: Duration,
}

impl WalletAnalyzer {
    pub fn new(reader: ChainReader, provider: Provider) -> Self {
        Self {
            reader,
            provider,
            zero_result_attempts: 30,
            zero_result_delay: Duration::from_secs(2),
        }
    }

    /// Bound on re-polls of a zero-total aggregate before the zeros are
    /// accepted as the answer.
    pub fn with_zero_result_policy(mut self, attempts: u32, delay: Duration) -> Self {
        self.zero_result_attempts = attempts;
        self.zero_result_delay = delay;
        self
    }

    /// Build the full metric record for one address.
    ///
    /// A wallet the chain has never seen send a transaction cannot have
    /// explorer-API activity, so a zero on-chain count short-circuits to a
    /// zeroed record without touching the explorer at all. Errors are
    /// per-address: the batch caller skips the wallet and continues.
    pub async fn analyze(&self, address: &str) -> Result<WalletMetrics> {
        let transaction_count = self.reader.transaction_count(address).await?;
        let balance = self.reader.balance(address).await?;

        if transaction_count == 0 {
            debug!("{} has no on-chain transactions, skipping explorer lookup", address);
            return Ok(WalletMetrics::zeroed(address.to_string(), balance));
        }

        let totals = self.aggregate_with_repoll(address).await?;

        Ok(WalletMetrics {
            address: address.to_string(),
            transaction_count_rpc: transaction_count,
            balance,
            total_received: round_to(totals.total_eth_received, 6),
            total_sent: round_to(totals.total_eth_sent, 6),
            total_fees: round_to(totals.total_fees, 6),
            transaction_count_api: totals.total_txs_api,
            contract_interactions: totals.contract_interactions,
        })
    }

    /// Zero API transactions from a wallet with on-chain activity usually
    /// means the explorer is lagging, so the call is re-polled after a pause.
    /// Once the attempt budget is spent the zero totals are accepted.
    async fn aggregate_with_repoll(&self, address: &str) -> Result<AggregateTotals> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let totals = self.provider.aggregate(address).await?;
            if totals.total_txs_api > 0 {
                return Ok(totals);
            }
            if attempt >= self.zero_result_attempts {
                warn!(
                    "Still no API transactions for {} after {} attempts, accepting zero totals",
                    address, attempt
                );
                return Ok(totals);
            }
            info!("No API transactions found for {}. Retrying...", address);
            tokio::time::sleep(self.zero_result_delay).await;
        }
    }
}
