mod common;

use walletscope::rpc::{parse_hex_u128, parse_hex_u64, ChainReader};

use common::{spawn_rpc, MockChain};

#[test]
fn parses_hex_quantities() {
    assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
    assert_eq!(parse_hex_u64("0x64").unwrap(), 100);
    assert_eq!(parse_hex_u64("0xDE0B6B3A7640000").unwrap(), 10u64.pow(18));
    assert_eq!(
        parse_hex_u128("0xde0b6b3a7640000").unwrap(),
        1_000_000_000_000_000_000
    );
    assert!(parse_hex_u64("0xzz").is_err());
    assert!(parse_hex_u64("").is_err());
}

#[tokio::test]
async fn reads_the_current_block_height() {
    let rpc_url = spawn_rpc(MockChain {
        block_number_hex: "0x1b4".to_string(),
        ..Default::default()
    })
    .await;
    let reader = ChainReader::new(reqwest::Client::new(), rpc_url);
    assert_eq!(reader.current_block_number().await.unwrap(), 436);
}

#[tokio::test]
async fn current_block_fails_fast_on_an_unreachable_node() {
    // Port 9 (discard) is not listening; the call is unretried.
    let reader = ChainReader::new(reqwest::Client::new(), "http://127.0.0.1:9");
    assert!(reader.current_block_number().await.is_err());
}

#[tokio::test]
async fn balance_is_converted_to_eth_and_rounded() {
    // 1.23456789 ETH in wei, rounded to 4 decimal places.
    let rpc_url = spawn_rpc(MockChain {
        balance_hex: format!("0x{:x}", 1_234_567_890_000_000_000u128),
        ..Default::default()
    })
    .await;
    let reader = ChainReader::new(reqwest::Client::new(), rpc_url);
    assert_eq!(reader.balance("0xabc").await.unwrap(), 1.2346);
}
