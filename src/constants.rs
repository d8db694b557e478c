/// Wei per whole token (ETH).
pub const WEI_PER_ETH: f64 = 1e18;

/// Scrollscan page size and the hard cap on accumulated transactions per wallet.
pub const SCROLLSCAN_PAGE_SIZE: usize = 10_000;
pub const SCROLLSCAN_TX_CAP: u64 = 10_000;

pub fn get_env(key: &str) -> String {
    std::env::var(key).unwrap_or(String::from(""))
}

#[derive(Debug, Clone)]
pub struct Env {
    pub rpc_url: String,
    pub blockscout_api: String,
    pub scrollscan_api: String,
    pub scrollscan_api_key: String,
    pub use_blockscout: bool,
    pub confidence_level: u32,
    pub margin_of_error: f64,
    pub population_size: Option<u64>,
    pub port: u16,
}

impl Env {
    pub fn new() -> Self {
        Env {
            rpc_url: get_env("RPC_URL"),
            blockscout_api: get_env("BLOCKSCOUT_API"),
            scrollscan_api: get_env("SCROLLSCAN_API"),
            scrollscan_api_key: get_env("API_KEY_SCROLL"),
            use_blockscout: get_env("USE_BLOCKSCOUT") == "true",
            confidence_level: get_env("confidenceLevel").parse().unwrap_or(95),
            margin_of_error: get_env("marginOfError").parse().unwrap_or(0.05),
            population_size: get_env("populationSize").parse().ok(),
            port: get_env("PORT").parse().unwrap_or(3000),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
