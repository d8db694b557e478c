use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};

use walletscope::{
    analyzer::WalletAnalyzer,
    constants::Env,
    explorer::Provider,
    percentiles::PopulationDistribution,
    rpc::ChainReader,
    sampler::sample_addresses,
    server::{self, AppContext},
    statistics::calculate_sample_size,
    utils::setup_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    dotenv::dotenv().ok();
    setup_logger()?;

    let env = Env::new();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let reader = ChainReader::new(client.clone(), &env.rpc_url);
    let provider = Provider::from_env(client, &env);
    let analyzer = WalletAnalyzer::new(reader.clone(), provider);

    // Batch run: derive the sample, analyze it, build the distribution.
    let sample_size = calculate_sample_size(
        env.confidence_level,
        env.margin_of_error,
        env.population_size,
        0.5,
    );
    info!("Sample size to analyze: {}", sample_size);

    let current_block = match reader.current_block_number().await {
        Ok(block) => block,
        Err(e) => {
            error!("Could not retrieve the current block number: {:#}", e);
            return Ok(());
        }
    };
    info!("Current block number: {}", current_block);

    let addresses = sample_addresses(&reader, current_block, sample_size as usize).await?;
    info!("Selected {} random addresses", addresses.len());

    let bar = ProgressBar::new(addresses.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} wallets",
    )?);

    let mut wallets = Vec::new();
    for address in &addresses {
        match analyzer.analyze(address).await {
            Ok(metrics) => wallets.push(metrics),
            Err(e) => error!("Error analyzing wallet {}: {:#}", address, e),
        }
        bar.inc(1);
    }
    bar.finish();

    info!("Analyzed {} of {} sampled wallets", wallets.len(), addresses.len());

    let distribution = PopulationDistribution::from_wallets(&wallets);
    distribution.log_summary();

    // Serve on-demand comparisons against the frozen snapshot.
    let ctx = Arc::new(AppContext {
        analyzer,
        distribution,
    });
    info!("Wallet analysis API listening on port {}", env.port);
    server::serve(ctx, env.port).await;

    Ok(())
}
