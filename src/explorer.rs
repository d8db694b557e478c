//! Block-explorer transaction aggregation.
//!
//! Two provider strategies behind one `aggregate(address)` capability:
//! Blockscout pages by a block_number+index cursor, Scrollscan pages by page
//! number with a hard cap on accumulated transactions. Selection happens once
//! at construction. Pagination is an explicit loop accumulating into a local
//! total; fetch failures are retried under each provider's [`RetryPolicy`].

use std::time::Duration;

use anyhow::{bail, Result};
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::constants::{Env, SCROLLSCAN_PAGE_SIZE, SCROLLSCAN_TX_CAP, WEI_PER_ETH};
use crate::retry::{RetriesExhausted, RetryPolicy};

/// Output of one aggregation call, in whole-ETH units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateTotals {
    pub total_txs_api: u64,
    pub total_eth_sent: f64,
    pub total_eth_received: f64,
    pub total_fees: f64,
    pub contract_interactions: u64,
}

#[derive(Debug, Clone)]
pub enum Provider {
    Blockscout(BlockscoutClient),
    Scrollscan(ScrollscanClient),
}

impl Provider {
    pub fn blockscout(client: Client, base_url: impl Into<String>) -> Self {
        Provider::Blockscout(BlockscoutClient::new(client, base_url))
    }

    pub fn scrollscan(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Provider::Scrollscan(ScrollscanClient::new(client, base_url, api_key))
    }

    /// Select the configured provider. Selection happens once, here.
    pub fn from_env(client: Client, env: &Env) -> Self {
        if env.use_blockscout {
            Self::blockscout(client, &env.blockscout_api)
        } else {
            Self::scrollscan(client, &env.scrollscan_api, &env.scrollscan_api_key)
        }
    }

    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        match self {
            Provider::Blockscout(mut c) => {
                c.retry = retry;
                Provider::Blockscout(c)
            }
            Provider::Scrollscan(mut c) => {
                c.retry = retry;
                Provider::Scrollscan(c)
            }
        }
    }

    pub async fn aggregate(&self, address: &str) -> Result<AggregateTotals> {
        match self {
            Provider::Blockscout(c) => c.aggregate(address).await,
            Provider::Scrollscan(c) => c.aggregate(address).await,
        }
    }
}

fn wei_str_to_eth(value: Option<&str>) -> f64 {
    value.and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0) / WEI_PER_ETH
}

// ---------------------------------------------------------------------------
// Blockscout (cursor pagination)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BlockscoutPage {
    #[serde(default)]
    pub items: Vec<BlockscoutTx>,
    pub next_page_params: Option<NextPageParams>,
}

/// Opaque continuation cursor threaded through successive Blockscout fetches.
#[derive(Debug, Clone, Deserialize)]
pub struct NextPageParams {
    pub block_number: u64,
    pub index: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockscoutTx {
    pub from: Option<TxParty>,
    pub to: Option<TxParty>,
    pub value: Option<String>,
    pub fee: Option<TxFee>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxParty {
    pub hash: Option<String>,
    #[serde(default)]
    pub is_contract: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxFee {
    pub value: Option<String>,
}

/// Fold one page of Blockscout transactions into the running totals.
///
/// Sent/received classification compares the from/to hashes against the target
/// address case-insensitively; the fee is charged to the sender only. A
/// contract interaction is any transaction whose recipient is a contract.
pub fn accumulate_blockscout_page(
    address: &str,
    transactions: &[BlockscoutTx],
    totals: &mut AggregateTotals,
) {
    let target = address.to_lowercase();
    for tx in transactions {
        let value = wei_str_to_eth(tx.value.as_deref());
        let from = tx.from.as_ref().and_then(|p| p.hash.as_deref());
        let to = tx.to.as_ref().and_then(|p| p.hash.as_deref());

        if from.map_or(false, |h| h.to_lowercase() == target) {
            totals.total_eth_sent += value;
            totals.total_fees +=
                wei_str_to_eth(tx.fee.as_ref().and_then(|f| f.value.as_deref()));
        } else if to.map_or(false, |h| h.to_lowercase() == target) {
            totals.total_eth_received += value;
        }

        if tx.to.as_ref().map_or(false, |p| p.is_contract) {
            totals.contract_interactions += 1;
        }
    }
    totals.total_txs_api += transactions.len() as u64;
}

#[derive(Debug, Clone)]
pub struct BlockscoutClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl BlockscoutClient {
    fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            retry: RetryPolicy::new(10, Duration::from_secs(10), 1.05),
        }
    }

    async fn fetch_page(
        &self,
        address: &str,
        cursor: Option<&NextPageParams>,
    ) -> Result<BlockscoutPage> {
        let mut url = format!(
            "{}/addresses/{}/transactions?filter=to%20%7C%20from",
            self.base_url, address
        );
        if let Some(cursor) = cursor {
            url.push_str(&format!(
                "&block_number={}&index={}",
                cursor.block_number, cursor.index
            ));
        }

        info!("Fetching Blockscout transactions for {} from: {}", address, url);
        let page: BlockscoutPage = self.client.get(&url).send().await?.json().await?;

        // An empty page from an address known to be active is API lag.
        if page.items.is_empty() {
            bail!("no transactions found for {}", address);
        }
        Ok(page)
    }

    async fn aggregate(&self, address: &str) -> Result<AggregateTotals> {
        let mut totals = AggregateTotals::default();
        let mut cursor: Option<NextPageParams> = None;
        let mut attempt = 0u32;

        loop {
            match self.fetch_page(address, cursor.as_ref()).await {
                Ok(page) => {
                    accumulate_blockscout_page(address, &page.items, &mut totals);
                    match page.next_page_params {
                        Some(next) => cursor = Some(next),
                        None => break,
                    }
                }
                Err(source) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(RetriesExhausted {
                            operation: format!("Blockscout aggregation for {}", address),
                            attempts: attempt,
                            source,
                        }
                        .into());
                    }
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "Error fetching Blockscout transactions for {}: {:#}. Retrying in {:?}...",
                        address, source, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Ok(totals)
    }
}

// ---------------------------------------------------------------------------
// Scrollscan (page-number pagination)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ScrollscanResponse {
    result: Option<Vec<ScrollscanTx>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrollscanTx {
    pub hash: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<String>,
    #[serde(rename = "gasPrice")]
    pub gas_price: Option<String>,
    #[serde(rename = "methodId")]
    pub method_id: Option<String>,
}

/// Fold one page of Scrollscan transactions into the running totals.
///
/// Transactions missing a from or to address are skipped with a warning. The
/// fee is gasUsed * gasPrice scaled to ETH; a contract interaction is any
/// transaction carrying a non-empty method selector.
pub fn accumulate_scrollscan_page(
    address: &str,
    transactions: &[ScrollscanTx],
    totals: &mut AggregateTotals,
) {
    let target = address.to_lowercase();
    for tx in transactions {
        let (from, to) = match (tx.from.as_deref(), tx.to.as_deref()) {
            (Some(f), Some(t)) if !f.is_empty() && !t.is_empty() => {
                (f.to_lowercase(), t.to_lowercase())
            }
            _ => {
                warn!(
                    "Skipping transaction {} due to missing from or to address",
                    tx.hash.as_deref().unwrap_or("<unknown>")
                );
                continue;
            }
        };

        let value = wei_str_to_eth(tx.value.as_deref());
        if from == target {
            totals.total_eth_sent += value;
            let gas_used = tx.gas_used.as_deref().and_then(|v| v.parse::<f64>().ok());
            let gas_price = tx.gas_price.as_deref().and_then(|v| v.parse::<f64>().ok());
            totals.total_fees +=
                gas_used.unwrap_or(0.0) * gas_price.unwrap_or(0.0) / WEI_PER_ETH;
        }
        if to == target {
            totals.total_eth_received += value;
        }

        if tx
            .method_id
            .as_deref()
            .map_or(false, |m| !m.is_empty() && m != "0x")
        {
            totals.contract_interactions += 1;
        }
    }
    totals.total_txs_api += transactions.len() as u64;
}

#[derive(Debug, Clone)]
pub struct ScrollscanClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
    page_delay: Duration,
}

impl ScrollscanClient {
    fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            retry: RetryPolicy::new(5, Duration::from_secs(1), 2.0),
            page_delay: Duration::from_millis(500),
        }
    }

    async fn fetch_page(&self, address: &str, page: u32) -> Result<Vec<ScrollscanTx>> {
        let url = format!(
            "{}?module=account&action=txlist&address={}&startblock=0&endblock=latest&sort=asc&page={}&offset={}&apikey={}",
            self.base_url, address, page, SCROLLSCAN_PAGE_SIZE, self.api_key
        );

        info!(
            "Fetching Scrollscan transactions for {} (page: {}) from: {}",
            address, page, url
        );
        let response: ScrollscanResponse = self.client.get(&url).send().await?.json().await?;

        let transactions = response.result.unwrap_or_default();
        if transactions.is_empty() {
            bail!("no transactions found for {} on page {}", address, page);
        }
        Ok(transactions)
    }

    /// Best-effort aggregation: once the retry budget for the whole call is
    /// spent, the totals accumulated so far are returned instead of an error.
    async fn aggregate(&self, address: &str) -> Result<AggregateTotals> {
        let mut totals = AggregateTotals::default();
        let mut page = 1u32;
        let mut attempt = 0u32;

        loop {
            let transactions = match self.fetch_page(address, page).await {
                Ok(transactions) => transactions,
                Err(source) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        warn!(
                            "Max retries reached for page {} of {}. Returning totals accumulated so far.",
                            page, address
                        );
                        break;
                    }
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "Error fetching Scrollscan transactions for {} (page: {}): {:#}. Retrying in {:?}...",
                        address, page, source, delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let page_len = transactions.len();
            accumulate_scrollscan_page(address, &transactions, &mut totals);

            if totals.total_txs_api >= SCROLLSCAN_TX_CAP {
                info!(
                    "Reached limit of {} transactions for {}. Stopping.",
                    SCROLLSCAN_TX_CAP, address
                );
                break;
            }
            if page_len < SCROLLSCAN_PAGE_SIZE {
                break;
            }

            tokio::time::sleep(self.page_delay).await;
            page += 1;
        }

        Ok(totals)
    }
}
