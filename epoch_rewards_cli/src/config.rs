use core::{num::NonZeroUsize, time::Duration};

use epoch_rewards::{AggregatorConfig, RewardSourceMode};
use log::info;
use types::{primitives::Epoch, redacting_url::RedactingUrl};

#[derive(Debug)]
pub struct EpochRewardsConfig {
    pub beacon_node_url: RedactingUrl,
    pub execution_rpc_url: RedactingUrl,
    pub epoch: Epoch,
    pub concurrency_limit: NonZeroUsize,
    pub reward_source_mode: RewardSourceMode,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub pretty: bool,
}

impl EpochRewardsConfig {
    pub fn report(&self) {
        let Self {
            beacon_node_url,
            execution_rpc_url,
            epoch,
            concurrency_limit,
            reward_source_mode,
            request_timeout,
            max_retries,
            retry_delay,
            pretty: _,
        } = self;

        info!("computing income for epoch {epoch}");
        info!("beacon node: {beacon_node_url}");
        info!("execution client: {execution_rpc_url}");
        info!("reward source mode: {reward_source_mode}");
        info!("concurrency limit: {concurrency_limit}");
        info!(
            "request timeout: {request_timeout:?}, \
             retries: {max_retries}, first retry after {retry_delay:?}",
        );
    }

    #[must_use]
    pub fn beacon_api_config(&self) -> beacon_api::Config {
        beacon_api::Config {
            beacon_node_url: self.beacon_node_url.clone(),
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        }
    }

    #[must_use]
    pub const fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            concurrency_limit: self.concurrency_limit,
            reward_source_mode: self.reward_source_mode,
        }
    }
}
