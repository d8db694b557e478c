//! Inbound HTTP surface: wallet scoring against the batch distribution.

use std::convert::Infallible;
use std::sync::Arc;

use log::error;
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::analyzer::WalletAnalyzer;
use crate::percentiles::{PopulationDistribution, TRACKED_METRICS};

/// Everything the comparison endpoint needs: the analyzer for fresh lookups
/// and the immutable distribution snapshot produced by the batch run.
pub struct AppContext {
    pub analyzer: WalletAnalyzer,
    pub distribution: PopulationDistribution,
}

pub fn routes(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::post()
        .and(warp::path("analyze-wallets"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and_then(move |body: Value| {
            let ctx = ctx.clone();
            async move { handle_analyze(ctx, body).await }
        })
}

pub async fn serve(ctx: Arc<AppContext>, port: u16) {
    warp::serve(routes(ctx)).run(([0, 0, 0, 0], port)).await;
}

async fn handle_analyze(ctx: Arc<AppContext>, body: Value) -> Result<impl Reply, Infallible> {
    let addresses = match parse_addresses(&body) {
        Ok(addresses) => addresses,
        Err(message) => {
            return Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "error": message })),
                StatusCode::BAD_REQUEST,
            ));
        }
    };

    // Strictly sequential, like the batch run: one wallet at a time.
    let mut results = Vec::with_capacity(addresses.len());
    for address in &addresses {
        results.push(analyze_and_compare(&ctx, address).await);
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "results": results })),
        StatusCode::OK,
    ))
}

fn parse_addresses(body: &Value) -> Result<Vec<String>, &'static str> {
    const INVALID: &str = "Invalid input. Please provide an array of wallet addresses.";

    let list = body
        .get("addresses")
        .and_then(Value::as_array)
        .ok_or(INVALID)?;
    if list.is_empty() {
        return Err(INVALID);
    }
    list.iter()
        .map(|entry| entry.as_str().map(str::to_owned).ok_or(INVALID))
        .collect()
}

async fn analyze_and_compare(ctx: &AppContext, address: &str) -> Value {
    let metrics = match ctx.analyzer.analyze(address).await {
        Ok(metrics) => metrics,
        Err(e) => {
            error!("Error analyzing wallet {}: {:#}", address, e);
            return json!({ "error": format!("Could not analyze wallet {}", address) });
        }
    };

    let mut comparisons = serde_json::Map::new();
    for metric in TRACKED_METRICS {
        let value = metrics.metric_value(metric).unwrap_or(0.0);
        comparisons.insert(
            metric.to_string(),
            json!({
                "value": value,
                "percentile": ctx.distribution.percentile_of(metric, value),
            }),
        );
    }

    json!({
        "address": address,
        "metrics": metrics,
        "comparisons": comparisons,
    })
}
