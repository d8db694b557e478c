//! Random wallet selection from chain blocks.

use anyhow::{bail, Result};
use log::warn;
use rand::Rng;

use crate::rpc::ChainReader;

/// Upper bound on random draws per requested sample entry. On a mostly-empty
/// chain the sampler stops once the budget is spent instead of looping forever.
const MAX_DRAWS_PER_SAMPLE: usize = 50;

/// Draw random blocks in `[0, current_block)` and collect the sender of a
/// random transaction from each until `sample_size` addresses are gathered.
///
/// Duplicate addresses are allowed; the sample models population frequency.
/// Returns a partial sample (with a warning) if the draw budget runs out, and
/// an error only when not a single address could be drawn.
pub async fn sample_addresses(
    reader: &ChainReader,
    current_block: u64,
    sample_size: usize,
) -> Result<Vec<String>> {
    if current_block == 0 {
        bail!("cannot sample addresses from an empty chain");
    }

    let draw_budget = sample_size
        .saturating_mul(MAX_DRAWS_PER_SAMPLE)
        .max(MAX_DRAWS_PER_SAMPLE);
    let mut addresses = Vec::with_capacity(sample_size);
    let mut draws = 0usize;

    while addresses.len() < sample_size {
        if draws >= draw_budget {
            if addresses.is_empty() {
                bail!(
                    "no addresses sampled after {} draws; is the chain empty?",
                    draws
                );
            }
            warn!(
                "Draw budget exhausted: sampled {} of {} addresses after {} draws",
                addresses.len(),
                sample_size,
                draws
            );
            break;
        }
        draws += 1;

        let block_number = rand::thread_rng().gen_range(0..current_block);
        match reader.random_sender_in_block(block_number).await {
            Ok(Some(address)) => addresses.push(address),
            Ok(None) => {}
            Err(e) => warn!(
                "Failed to sample an address from block {}: {:#}",
                block_number, e
            ),
        }
    }

    Ok(addresses)
}
