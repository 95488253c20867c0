use std::sync::Arc;

use anyhow::{bail, Error as AnyhowError, Result};
use async_trait::async_trait;
use epoch_rewards::{
    AttestationRewardProvider, BlockRewardProvider, ExecutionBlockResolver,
    ProposerDutiesProvider, ProviderCall, ProviderError, SkipReason, SyncCommitteeRewardProvider,
};
use log::{debug, warn};
use prometheus_metrics::Metrics;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use types::{
    containers::{
        BlockRewards, ProposerDuty, SyncCommitteeReward, TotalAttestationReward, ValidatorBalance,
    },
    primitives::{Epoch, ExecutionBlockNumber, Gwei, Slot, ValidatorIndex},
    redacting_url::RedactingUrl,
};

use crate::{
    config::Config,
    responses::{AttestationRewards, DataResponse, SignedBeaconBlock},
};

const VALIDATOR_BALANCE_REQUEST: &str = "validator_balance";

// An empty list of validator indices requests rewards of all validators.
const ALL_VALIDATORS: [ValidatorIndex; 0] = [];

const NO_CONDITIONS: &[(StatusCode, SkipReason)] = &[];
const BLOCK_CONDITIONS: &[(StatusCode, SkipReason)] =
    &[(StatusCode::NOT_FOUND, SkipReason::BlockNotFound)];
// Beacon nodes respond with a server error when asked for rewards of a slot before Altair.
const SYNC_COMMITTEE_CONDITIONS: &[(StatusCode, SkipReason)] = &[
    (StatusCode::NOT_FOUND, SkipReason::BlockNotFound),
    (StatusCode::INTERNAL_SERVER_ERROR, SkipReason::PreSyncCommittees),
];

#[derive(Debug, Error)]
pub enum Error {
    #[error("Beacon Node API request {request} to {url} failed with status {status}: {message}")]
    UnexpectedStatus {
        request: &'static str,
        url: RedactingUrl,
        status: StatusCode,
        message: String,
    },
    #[error("Beacon Node API request {request} to {url} failed: {source}")]
    Transport {
        request: &'static str,
        url: RedactingUrl,
        source: reqwest::Error,
    },
    #[error("balance of validator {validator_index} at slot {slot} not found")]
    ValidatorBalanceNotFound {
        slot: Slot,
        validator_index: ValidatorIndex,
    },
}

/// Client for the reward related endpoints of the Eth Beacon Node API.
///
/// Connection failures, timeouts and overload responses are retried with exponential backoff.
/// Timeouts themselves are configured on the [`Client`].
pub struct BeaconApi {
    client: Client,
    config: Config,
    metrics: Option<Arc<Metrics>>,
}

impl BeaconApi {
    #[must_use]
    pub const fn new(client: Client, config: Config, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            client,
            config,
            metrics,
        }
    }

    pub async fn validator_balance(
        &self,
        slot: Slot,
        validator_index: ValidatorIndex,
    ) -> Result<Gwei> {
        let path = format!("/eth/v1/beacon/states/{slot}/validator_balances?id={validator_index}");

        let balances = self
            .fetch::<Vec<ValidatorBalance>>(
                VALIDATOR_BALANCE_REQUEST,
                Method::GET,
                &path,
                NO_CONDITIONS,
            )
            .await
            .map_err(provider_error_into_anyhow)?;

        match balances
            .into_iter()
            .find(|balance| balance.index == validator_index)
        {
            Some(balance) => Ok(balance.balance),
            None => bail!(Error::ValidatorBalanceNotFound {
                slot,
                validator_index,
            }),
        }
    }

    async fn fetch<T: DeserializeOwned + Send>(
        &self,
        request: &'static str,
        method: Method,
        path: &str,
        conditions: &[(StatusCode, SkipReason)],
    ) -> Result<T, ProviderError> {
        let url = self
            .config
            .beacon_node_url
            .join_api_path(path)
            .map(RedactingUrl::from)
            .map_err(AnyhowError::from)?;

        let timer = self.metrics.as_ref().and_then(|metrics| {
            prometheus_metrics::start_timer_vec(&metrics.provider_request_times, request)
        });

        let result = self.send(request, method, &url, conditions).await;

        match &result {
            Ok(_) => prometheus_metrics::stop_and_record(timer),
            Err(ProviderError::Other(_)) => {
                prometheus_metrics::stop_and_discard(timer);

                if let Some(metrics) = self.metrics.as_ref() {
                    metrics.register_provider_error(request);
                }
            }
            Err(_) => prometheus_metrics::stop_and_discard(timer),
        }

        let response = result?;

        let DataResponse { data } = response
            .json::<DataResponse<T>>()
            .await
            .map_err(|source| Error::Transport {
                request,
                url,
                source: source.without_url(),
            })
            .map_err(AnyhowError::from)?;

        Ok(data)
    }

    async fn send(
        &self,
        request: &'static str,
        method: Method,
        url: &RedactingUrl,
        conditions: &[(StatusCode, SkipReason)],
    ) -> Result<Response, ProviderError> {
        let mut attempt = 0;

        loop {
            debug!("sending {request} request to {url} (attempt {attempt})");

            let mut builder = self
                .client
                .request(method.clone(), url.clone().into_url());

            if method == Method::POST {
                builder = builder.json(&ALL_VALIDATORS);
            }

            let failure = match builder.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if let Some((_, reason)) = conditions.iter().find(|(code, _)| *code == status)
                    {
                        debug!("{request} request to {url} returned {status}: {reason}");
                        return Err((*reason).into());
                    }

                    if !is_retryable_status(status) || attempt >= self.config.max_retries {
                        let message = response.text().await.unwrap_or_default();

                        return Err(AnyhowError::from(Error::UnexpectedStatus {
                            request,
                            url: url.clone(),
                            status,
                            message,
                        })
                        .into());
                    }

                    format!("status {status}")
                }
                Err(error) => {
                    if !is_retryable_error(&error) || attempt >= self.config.max_retries {
                        return Err(AnyhowError::from(Error::Transport {
                            request,
                            url: url.clone(),
                            source: error.without_url(),
                        })
                        .into());
                    }

                    error.without_url().to_string()
                }
            };

            let delay = self.config.backoff(attempt);

            warn!("{request} request to {url} failed ({failure}), retrying in {delay:?}");

            tokio::time::sleep(delay).await;

            attempt += 1;
        }
    }
}

fn provider_error_into_anyhow(error: ProviderError) -> AnyhowError {
    match error {
        ProviderError::Other(error) => error,
        condition => condition.into(),
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

#[async_trait]
impl ProposerDutiesProvider for BeaconApi {
    async fn proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerDuty>, ProviderError> {
        self.fetch(
            ProviderCall::ProposerDuties.into(),
            Method::GET,
            &format!("/eth/v1/validator/duties/proposer/{epoch}"),
            NO_CONDITIONS,
        )
        .await
    }
}

#[async_trait]
impl ExecutionBlockResolver for BeaconApi {
    async fn execution_block_number(
        &self,
        slot: Slot,
    ) -> Result<ExecutionBlockNumber, ProviderError> {
        let block = self
            .fetch::<SignedBeaconBlock>(
                ProviderCall::ExecutionBlockNumber.into(),
                Method::GET,
                &format!("/eth/v2/beacon/blocks/{slot}"),
                BLOCK_CONDITIONS,
            )
            .await?;

        // Blocks between Bellatrix and the merge carry a default payload.
        match block.message.body.execution_payload {
            Some(payload) if payload.block_number > 0 => Ok(payload.block_number),
            _ => Err(ProviderError::PreMerge),
        }
    }
}

#[async_trait]
impl SyncCommitteeRewardProvider for BeaconApi {
    async fn sync_committee_rewards(
        &self,
        slot: Slot,
    ) -> Result<Vec<SyncCommitteeReward>, ProviderError> {
        self.fetch(
            ProviderCall::SyncCommitteeRewards.into(),
            Method::POST,
            &format!("/eth/v1/beacon/rewards/sync_committee/{slot}"),
            SYNC_COMMITTEE_CONDITIONS,
        )
        .await
    }
}

#[async_trait]
impl BlockRewardProvider for BeaconApi {
    async fn block_rewards(&self, slot: Slot) -> Result<BlockRewards, ProviderError> {
        self.fetch(
            ProviderCall::BlockRewards.into(),
            Method::GET,
            &format!("/eth/v1/beacon/rewards/blocks/{slot}"),
            BLOCK_CONDITIONS,
        )
        .await
    }
}

#[async_trait]
impl AttestationRewardProvider for BeaconApi {
    async fn attestation_rewards(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<TotalAttestationReward>, ProviderError> {
        let rewards = self
            .fetch::<AttestationRewards>(
                ProviderCall::AttestationRewards.into(),
                Method::POST,
                &format!("/eth/v1/beacon/rewards/attestations/{epoch}"),
                NO_CONDITIONS,
            )
            .await?;

        Ok(rewards.total_rewards)
    }
}
