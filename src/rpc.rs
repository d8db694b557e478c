//! JSON-RPC chain reader.
//!
//! One request in flight at a time; every call except `eth_blockNumber` is
//! retried under the reader's [`RetryPolicy`] before surfacing a typed error.

use anyhow::{anyhow, bail, Context, Result};
use log::warn;
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};

use crate::constants::WEI_PER_ETH;
use crate::retry::RetryPolicy;
use crate::utils::round_to;

/// Parse a "0x"-prefixed hexadecimal string into a u64.
pub fn parse_hex_u64(hex: &str) -> Result<u64> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid hex quantity {:?}", hex))
}

/// Parse a "0x"-prefixed hexadecimal string into a u128 (wei amounts).
pub fn parse_hex_u128(hex: &str) -> Result<u128> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    u128::from_str_radix(digits, 16).with_context(|| format!("invalid hex quantity {:?}", hex))
}

#[derive(Debug, Clone)]
pub struct ChainReader {
    client: Client,
    rpc_url: String,
    retry: RetryPolicy,
}

impl ChainReader {
    pub fn new(client: Client, rpc_url: impl Into<String>) -> Self {
        Self {
            client,
            rpc_url: rpc_url.into(),
            retry: RetryPolicy::immediate(3),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One JSON-RPC 2.0 call; no retries at this level.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        let response: Value = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            bail!("{} returned an error: {}", method, error);
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn call_with_retry(&self, method: &str, params: Value) -> Result<Value> {
        self.retry
            .run(method, || self.call(method, params.clone()))
            .await
            .map_err(Into::into)
    }

    /// Current block height. Single attempt; the batch run aborts on failure.
    pub async fn current_block_number(&self) -> Result<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| anyhow!("eth_blockNumber returned a non-string result"))?;
        parse_hex_u64(hex)
    }

    pub async fn transaction_count(&self, address: &str) -> Result<u64> {
        let result = self
            .call_with_retry("eth_getTransactionCount", json!([address, "latest"]))
            .await?;
        let hex = result
            .as_str()
            .ok_or_else(|| anyhow!("eth_getTransactionCount returned a non-string result"))?;
        parse_hex_u64(hex)
    }

    /// Balance in whole ETH, rounded to 4 decimal places.
    pub async fn balance(&self, address: &str) -> Result<f64> {
        let result = self
            .call_with_retry("eth_getBalance", json!([address, "latest"]))
            .await?;
        let hex = result
            .as_str()
            .ok_or_else(|| anyhow!("eth_getBalance returned a non-string result"))?;
        let wei = parse_hex_u128(hex)?;
        Ok(round_to(wei as f64 / WEI_PER_ETH, 4))
    }

    /// Number of transactions in a block (hashes only, no full objects).
    pub async fn block_transaction_count(&self, block_number: u64) -> Result<u64> {
        let params = json!([format!("0x{:x}", block_number), false]);
        let result = self.call_with_retry("eth_getBlockByNumber", params).await?;
        let transactions = result
            .get("transactions")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("block data is incomplete for block {}", block_number))?;
        Ok(transactions.len() as u64)
    }

    pub async fn transaction_by_index(&self, block_number: u64, index: u64) -> Result<Value> {
        let params = json!([format!("0x{:x}", block_number), format!("0x{:x}", index)]);
        self.call_with_retry("eth_getTransactionByBlockNumberAndIndex", params)
            .await
    }

    /// Sender of a uniformly random transaction in the block.
    ///
    /// `Ok(None)` is the legitimate empty outcome: an empty block, a null
    /// transaction, or a transaction without a sender. Not retried.
    pub async fn random_sender_in_block(&self, block_number: u64) -> Result<Option<String>> {
        let transaction_count = self.block_transaction_count(block_number).await?;
        if transaction_count == 0 {
            warn!("No transactions found in block {}", block_number);
            return Ok(None);
        }

        let index = rand::thread_rng().gen_range(0..transaction_count);
        let transaction = self.transaction_by_index(block_number, index).await?;

        let sender = transaction
            .get("from")
            .and_then(Value::as_str)
            .map(str::to_owned);
        if sender.is_none() {
            warn!(
                "No valid transaction found at block {}, index {}",
                block_number, index
            );
        }
        Ok(sender)
    }
}
