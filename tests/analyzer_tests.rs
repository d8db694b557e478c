mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use walletscope::analyzer::WalletAnalyzer;
use walletscope::explorer::Provider;
use walletscope::retry::RetryPolicy;
use walletscope::rpc::ChainReader;
use walletscope::sampler::sample_addresses;

use common::{spawn_rpc, spawn_scrollscan, MockChain};

const WALLET: &str = "0xAbCd000000000000000000000000000000000001";
const OTHER: &str = "0x0000000000000000000000000000000000000002";

const ONE_ETH_HEX: &str = "0xde0b6b3a7640000";
const FIVE_ETH_HEX: &str = "0x4563918244f40000";

fn analyzer(rpc_url: String, explorer_url: String) -> WalletAnalyzer {
    let client = reqwest::Client::new();
    let reader = ChainReader::new(client.clone(), rpc_url);
    let provider = Provider::scrollscan(client, explorer_url, "test-key")
        .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(5), 2.0));
    WalletAnalyzer::new(reader, provider).with_zero_result_policy(2, Duration::from_millis(5))
}

#[tokio::test]
async fn zero_rpc_count_short_circuits_the_explorer() {
    let rpc_url = spawn_rpc(MockChain {
        tx_count_hex: "0x0".to_string(),
        balance_hex: ONE_ETH_HEX.to_string(),
        ..Default::default()
    })
    .await;
    let hits = Arc::new(AtomicUsize::new(0));
    let explorer_url = spawn_scrollscan(vec![json!([{ "from": WALLET, "to": OTHER }])], hits.clone()).await;

    let metrics = analyzer(rpc_url, explorer_url).analyze(WALLET).await.unwrap();

    assert_eq!(metrics.address, WALLET);
    assert_eq!(metrics.transaction_count_rpc, 0);
    assert_eq!(metrics.balance, 1.0);
    assert_eq!(metrics.transaction_count_api, 0);
    assert_eq!(metrics.contract_interactions, 0);
    assert_eq!(metrics.total_received, 0.0);
    assert_eq!(metrics.total_sent, 0.0);
    assert_eq!(metrics.total_fees, 0.0);
    // The explorer API was never consulted.
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn active_wallet_aggregates_explorer_history() {
    let rpc_url = spawn_rpc(MockChain {
        tx_count_hex: "0x2".to_string(),
        balance_hex: FIVE_ETH_HEX.to_string(),
        ..Default::default()
    })
    .await;
    let page = json!([
        {
            "hash": "0x01",
            "from": WALLET.to_uppercase().replace("0X", "0x"),
            "to": OTHER,
            "value": "2000000000000000000",
            "gasUsed": "21000",
            "gasPrice": "1000000000",
            "methodId": "0x",
        },
        {
            "hash": "0x02",
            "from": OTHER,
            "to": WALLET.to_lowercase(),
            "value": "1000000000000000000",
            "gasUsed": "50000",
            "gasPrice": "1000000000",
            "methodId": "0xa9059cbb",
        },
    ]);
    let hits = Arc::new(AtomicUsize::new(0));
    let explorer_url = spawn_scrollscan(vec![page], hits).await;

    let metrics = analyzer(rpc_url, explorer_url).analyze(WALLET).await.unwrap();

    assert_eq!(metrics.transaction_count_rpc, 2);
    assert_eq!(metrics.balance, 5.0);
    assert_eq!(metrics.transaction_count_api, 2);
    assert_eq!(metrics.total_sent, 2.0);
    assert_eq!(metrics.total_received, 1.0);
    assert_eq!(metrics.total_fees, 0.000021);
    assert_eq!(metrics.contract_interactions, 1);
}

#[tokio::test]
async fn zero_api_results_are_accepted_after_the_repoll_budget() {
    let rpc_url = spawn_rpc(MockChain {
        tx_count_hex: "0x2".to_string(),
        balance_hex: ONE_ETH_HEX.to_string(),
        ..Default::default()
    })
    .await;
    // The explorer never has anything for this wallet: every page is empty.
    let hits = Arc::new(AtomicUsize::new(0));
    let explorer_url = spawn_scrollscan(vec![], hits.clone()).await;

    let client = reqwest::Client::new();
    let reader = ChainReader::new(client.clone(), rpc_url);
    let provider = Provider::scrollscan(client, explorer_url, "test-key")
        .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(5), 2.0));
    let analyzer = WalletAnalyzer::new(reader, provider)
        .with_zero_result_policy(3, Duration::from_millis(5));

    let metrics = analyzer.analyze(WALLET).await.unwrap();

    // The wallet is active on-chain, but the zero totals stand once the
    // re-poll budget is spent.
    assert_eq!(metrics.transaction_count_rpc, 2);
    assert_eq!(metrics.balance, 1.0);
    assert_eq!(metrics.transaction_count_api, 0);
    assert_eq!(metrics.total_sent, 0.0);
    assert_eq!(metrics.total_received, 0.0);
    assert_eq!(metrics.total_fees, 0.0);
    assert_eq!(metrics.contract_interactions, 0);
    // 3 re-polls, each a best-effort aggregation of 2 fetch attempts.
    assert_eq!(hits.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn analysis_is_idempotent_against_frozen_data() {
    let rpc_url = spawn_rpc(MockChain {
        tx_count_hex: "0x2".to_string(),
        balance_hex: ONE_ETH_HEX.to_string(),
        ..Default::default()
    })
    .await;
    let page = json!([{
        "hash": "0x01",
        "from": WALLET.to_lowercase(),
        "to": OTHER,
        "value": "1000000000000000000",
        "gasUsed": "21000",
        "gasPrice": "1000000000",
        "methodId": "0x",
    }]);
    let hits = Arc::new(AtomicUsize::new(0));
    let explorer_url = spawn_scrollscan(vec![page], hits).await;
    let analyzer = analyzer(rpc_url, explorer_url);

    let first = analyzer.analyze(WALLET).await.unwrap();
    let second = analyzer.analyze(WALLET).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn sampler_collects_the_requested_sample() {
    let rpc_url = spawn_rpc(MockChain {
        block_tx_count: 3,
        tx_from: Some(WALLET.to_string()),
        ..Default::default()
    })
    .await;
    let reader = ChainReader::new(reqwest::Client::new(), rpc_url);

    let addresses = sample_addresses(&reader, 100, 5).await.unwrap();
    assert_eq!(addresses.len(), 5);
    assert!(addresses.iter().all(|a| a == WALLET));
}

#[tokio::test]
async fn sampler_gives_up_on_an_empty_chain() {
    let rpc_url = spawn_rpc(MockChain {
        block_tx_count: 0,
        ..Default::default()
    })
    .await;
    let reader = ChainReader::new(reqwest::Client::new(), rpc_url);

    assert!(sample_addresses(&reader, 100, 3).await.is_err());
}

#[tokio::test]
async fn sampler_skips_transactions_without_a_sender() {
    // Blocks have transactions but the node returns null for each lookup;
    // the sampler redraws until its budget runs out, then errors (nothing
    // was collected).
    let rpc_url = spawn_rpc(MockChain {
        block_tx_count: 2,
        tx_from: None,
        ..Default::default()
    })
    .await;
    let reader = ChainReader::new(reqwest::Client::new(), rpc_url);

    assert!(sample_addresses(&reader, 100, 1).await.is_err());
}
