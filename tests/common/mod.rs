#![allow(dead_code)]

//! In-process stand-ins for the node RPC and explorer APIs, bound on
//! ephemeral local ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use warp::Filter;

/// Canned node responses for the mock JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct MockChain {
    pub block_number_hex: String,
    pub tx_count_hex: String,
    pub balance_hex: String,
    pub block_tx_count: usize,
    pub tx_from: Option<String>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            block_number_hex: "0x64".to_string(),
            tx_count_hex: "0x0".to_string(),
            balance_hex: "0x0".to_string(),
            block_tx_count: 0,
            tx_from: None,
        }
    }
}

pub async fn spawn_rpc(chain: MockChain) -> String {
    let chain = Arc::new(chain);
    let route = warp::post()
        .and(warp::body::json())
        .map(move |request: Value| {
            let method = request["method"].as_str().unwrap_or("");
            let result = match method {
                "eth_blockNumber" => json!(chain.block_number_hex),
                "eth_getTransactionCount" => json!(chain.tx_count_hex),
                "eth_getBalance" => json!(chain.balance_hex),
                "eth_getBlockByNumber" => {
                    json!({ "transactions": vec![json!("0xdeadbeef"); chain.block_tx_count] })
                }
                "eth_getTransactionByBlockNumberAndIndex" => match &chain.tx_from {
                    Some(from) => json!({ "from": from }),
                    None => Value::Null,
                },
                _ => Value::Null,
            };
            warp::reply::json(&json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
        });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}

/// Scrollscan-style endpoint serving `pages[page - 1]`; out-of-range pages
/// return an empty result. Every request bumps `hits`.
pub async fn spawn_scrollscan(pages: Vec<Value>, hits: Arc<AtomicUsize>) -> String {
    let pages = Arc::new(pages);
    let route = warp::get()
        .and(warp::query::<HashMap<String, String>>())
        .map(move |query: HashMap<String, String>| {
            hits.fetch_add(1, Ordering::SeqCst);
            let page: usize = query
                .get("page")
                .and_then(|p| p.parse().ok())
                .unwrap_or(1)
                .max(1);
            let result = pages.get(page - 1).cloned().unwrap_or_else(|| json!([]));
            warp::reply::json(&json!({ "status": "1", "message": "OK", "result": result }))
        });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}

/// Blockscout-style endpoint: the first page is served until the request
/// carries the pagination cursor, which selects the second page.
pub async fn spawn_blockscout(first: Value, second: Value) -> String {
    let route = warp::get()
        .and(warp::query::<HashMap<String, String>>())
        .map(move |query: HashMap<String, String>| {
            let body = if query.contains_key("block_number") {
                second.clone()
            } else {
                first.clone()
            };
            warp::reply::json(&body)
        });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}
