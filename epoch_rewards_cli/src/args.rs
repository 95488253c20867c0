use core::{fmt::Display, num::NonZeroUsize, time::Duration};

use anyhow::{ensure, Result};
use beacon_api::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
use clap::{error::ErrorKind, CommandFactory as _, Error as ClapError, Parser};
use epoch_rewards::{RewardSourceMode, DEFAULT_CONCURRENCY_LIMIT};
use thiserror::Error;
use types::{primitives::Epoch, redacting_url::RedactingUrl};

use crate::config::EpochRewardsConfig;

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Computes income and penalties of every validator for a single epoch
/// from a beacon node and an execution client.
#[derive(Parser)]
#[clap(name = "epoch-rewards", verbatim_doc_comment)]
pub struct EpochRewardsArgs {
    /// Beacon node API URL
    #[clap(long, value_name = "URL")]
    beacon_node_url: RedactingUrl,

    /// Execution client JSON-RPC URL used to compute transaction fees and withdrawals
    #[clap(long, value_name = "URL")]
    execution_rpc_url: RedactingUrl,

    /// Epoch to compute income for
    #[clap(long)]
    epoch: Epoch,

    /// Maximum number of slots processed at the same time
    #[clap(long, default_value_t = DEFAULT_CONCURRENCY_LIMIT)]
    concurrency_limit: NonZeroUsize,

    /// Execution layer income to credit: combined, transaction-fees or withdrawals
    #[clap(long, default_value_t = RewardSourceMode::default())]
    reward_source_mode: RewardSourceMode,

    /// Timeout of a single request in seconds
    #[clap(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECONDS)]
    request_timeout: u64,

    /// Number of retries of throttled or failed beacon node requests
    #[clap(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Delay before the first retry in milliseconds. Doubles with every subsequent retry.
    #[clap(long, default_value_t = EpochRewardsArgs::default_retry_delay_millis())]
    retry_delay_millis: u64,

    /// Pretty-print the resulting JSON
    #[clap(long)]
    pretty: bool,
}

impl EpochRewardsArgs {
    pub fn try_into_config(self) -> Result<EpochRewardsConfig> {
        let Self {
            beacon_node_url,
            execution_rpc_url,
            epoch,
            concurrency_limit,
            reward_source_mode,
            request_timeout,
            max_retries,
            retry_delay_millis,
            pretty,
        } = self;

        ensure!(request_timeout > 0, Error::ZeroRequestTimeout);

        for url in [&beacon_node_url, &execution_rpc_url] {
            ensure!(
                matches!(url.scheme(), "http" | "https"),
                Error::UnsupportedScheme { url: url.clone() },
            );
        }

        Ok(EpochRewardsConfig {
            beacon_node_url,
            execution_rpc_url,
            epoch,
            concurrency_limit,
            reward_source_mode,
            request_timeout: Duration::from_secs(request_timeout),
            max_retries,
            retry_delay: Duration::from_millis(retry_delay_millis),
            pretty,
        })
    }

    pub fn clap_error(message: impl Display) -> ClapError {
        Self::command().error(ErrorKind::ValueValidation, message)
    }

    // `#[clap(value_parser = …)]` cannot be used because `Duration` does not implement `Display`.
    fn default_retry_delay_millis() -> u64 {
        u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("--request-timeout must be positive")]
    ZeroRequestTimeout,
    #[error("{url} must use http or https")]
    UnsupportedScheme { url: RedactingUrl },
}
