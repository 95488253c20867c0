use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use epoch_rewards::{ExecutionRewardProvider, ProviderError, RewardSourceMode};
use log::debug;
use num_bigint::BigUint;
use prometheus_metrics::Metrics;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use types::{
    containers::{ExecutionRewards, Withdrawal},
    primitives::ExecutionBlockNumber,
    redacting_url::RedactingUrl,
};
use web3::{
    error::TransportError, helpers::CallFuture, transports::Http, Error as Web3Error,
    Transport as _,
};

use crate::{
    fees,
    responses::{ExecutionBlock, Receipt},
};

const GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";
const GET_BLOCK_RECEIPTS: &str = "eth_getBlockReceipts";

#[derive(Debug, Error)]
pub enum Error {
    #[error("execution block {block_number} not found")]
    BlockNotFound { block_number: ExecutionBlockNumber },
    #[error("{method} returned JSON-RPC error {code}: {message}")]
    JsonRpc {
        method: &'static str,
        code: i64,
        message: String,
    },
    #[error("{method} request to {url} failed with status {status}")]
    UnexpectedStatus {
        method: &'static str,
        url: RedactingUrl,
        status: u16,
    },
    #[error("{method} request to {url} failed: {source}")]
    Request {
        method: &'static str,
        url: RedactingUrl,
        source: Web3Error,
    },
}

/// Execution client JSON-RPC API used to compute fee recipient income and withdrawals.
pub struct ExecutionApi {
    client: Client,
    url: RedactingUrl,
    metrics: Option<Arc<Metrics>>,
}

impl ExecutionApi {
    #[must_use]
    pub const fn new(client: Client, url: RedactingUrl, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            client,
            url,
            metrics,
        }
    }

    pub async fn block_rewards(
        &self,
        block_number: ExecutionBlockNumber,
        mode: RewardSourceMode,
    ) -> Result<ExecutionRewards> {
        let number = Value::from(format!("{block_number:#x}"));

        let Some(block) = self
            .execute::<ExecutionBlock>(GET_BLOCK_BY_NUMBER, vec![number.clone(), false.into()])
            .await?
        else {
            bail!(Error::BlockNotFound { block_number });
        };

        let tx_fee_reward_wei = if mode.includes_transaction_fees() {
            let receipts = self
                .execute::<Vec<Receipt>>(GET_BLOCK_RECEIPTS, vec![number])
                .await?
                .unwrap_or_default();

            let base_fee = block.base_fee_per_gas.as_ref().map(|base_fee| &base_fee.0);

            fees::priority_fees(base_fee, &receipts)
        } else {
            BigUint::default()
        };

        let withdrawals = if mode.includes_withdrawals() {
            block
                .withdrawals
                .into_iter()
                .map(|withdrawal| Withdrawal {
                    validator_index: withdrawal.validator_index,
                    amount: withdrawal.amount,
                })
                .collect()
        } else {
            vec![]
        };

        debug!(
            "execution block {block_number}: {tx_fee_reward_wei} wei in fees, {} withdrawals",
            withdrawals.len(),
        );

        Ok(ExecutionRewards {
            tx_fee_reward_wei,
            withdrawals,
        })
    }

    // `null` results are valid for some methods, e.g. `eth_getBlockByNumber` for unknown blocks.
    async fn execute<T: DeserializeOwned + Send>(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<Option<T>> {
        let timer = self.metrics.as_ref().and_then(|metrics| {
            prometheus_metrics::start_timer_vec(&metrics.provider_request_times, method)
        });

        debug!("sending {method} request to {}", self.url);

        let http = Http::with_client(self.client.clone(), self.url.clone().into_url());
        let result = CallFuture::<Option<T>, _>::new(http.execute(method, params)).await;

        match result {
            Ok(output) => {
                prometheus_metrics::stop_and_record(timer);
                Ok(output)
            }
            Err(error) => {
                prometheus_metrics::stop_and_discard(timer);

                if let Some(metrics) = self.metrics.as_ref() {
                    metrics.register_provider_error(method);
                }

                bail!(self.request_error(method, error))
            }
        }
    }

    fn request_error(&self, method: &'static str, error: Web3Error) -> Error {
        match error {
            Web3Error::Rpc(error) => Error::JsonRpc {
                method,
                code: error.code.code(),
                message: error.message,
            },
            Web3Error::Transport(TransportError::Code(status)) => Error::UnexpectedStatus {
                method,
                url: self.url.clone(),
                status,
            },
            source => Error::Request {
                method,
                url: self.url.clone(),
                source,
            },
        }
    }
}

#[async_trait]
impl ExecutionRewardProvider for ExecutionApi {
    async fn execution_rewards(
        &self,
        block_number: ExecutionBlockNumber,
        mode: RewardSourceMode,
    ) -> Result<ExecutionRewards, ProviderError> {
        self.block_rewards(block_number, mode)
            .await
            .map_err(Into::into)
    }
}
