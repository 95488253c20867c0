use core::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{ensure, Result};
use derivative::Derivative;
use log::{debug, info};
use nonzero_ext::nonzero;
use prometheus_metrics::Metrics;
use tokio_util::sync::CancellationToken;
use types::{
    containers::ExecutionRewards,
    primitives::{Epoch, ExecutionBlockNumber, Slot, ValidatorIndex},
};

use crate::{
    classifier::{classify, classify_required, Outcome, SkipReason},
    duties::ProposerDutyTable,
    error::Error,
    income::{AttestationIncome, EpochIncome, IncomeMap, ValidatorEpochIncome},
    providers::{ProviderCall, Providers, RewardSourceMode},
    task_group::TaskGroup,
};

pub const DEFAULT_CONCURRENCY_LIMIT: NonZeroUsize = nonzero!(32_usize);

#[derive(Clone, Copy, Debug, Derivative)]
#[derivative(Default)]
pub struct AggregatorConfig {
    /// Maximum number of slots processed at the same time.
    /// The epoch-wide attestation request does not count toward it.
    #[derivative(Default(value = "DEFAULT_CONCURRENCY_LIMIT"))]
    pub concurrency_limit: NonZeroUsize,
    pub reward_source_mode: RewardSourceMode,
}

pub struct EpochRewardsAggregator {
    config: AggregatorConfig,
    providers: Providers,
    metrics: Option<Arc<Metrics>>,
}

impl EpochRewardsAggregator {
    #[must_use]
    pub const fn new(
        config: AggregatorConfig,
        providers: Providers,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            config,
            providers,
            metrics,
        }
    }

    pub async fn compute_epoch_rewards(&self, epoch: Epoch) -> Result<EpochIncome> {
        self.compute_epoch_rewards_with_cancellation(epoch, &CancellationToken::new())
            .await
    }

    /// Computes income of every validator that earned or lost anything in `epoch`.
    ///
    /// Either every request succeeds or fails benignly and the complete table is returned,
    /// or the first fatal error is returned and all partial results are dropped.
    /// Cancelling `cancellation` stops the computation before its next provider request
    /// and makes it fail with [`Error::Cancelled`].
    pub async fn compute_epoch_rewards_with_cancellation(
        &self,
        epoch: Epoch,
        cancellation: &CancellationToken,
    ) -> Result<EpochIncome> {
        let timer = self
            .metrics
            .as_ref()
            .map(|metrics| metrics.epoch_computation_times.start_timer());

        let result = self.compute(epoch, cancellation).await;

        match &result {
            Ok(income) => {
                prometheus_metrics::stop_and_record(timer);

                if let Some(metrics) = self.metrics.as_ref() {
                    metrics.set_income_records(income.len());
                }

                info!(
                    "computed rewards of {} validators for epoch {epoch}",
                    income.len(),
                );
            }
            Err(error) => {
                prometheus_metrics::stop_and_discard(timer);

                if let Some(metrics) = self.metrics.as_ref() {
                    metrics.fatal_errors.inc();
                }

                debug!("computing rewards for epoch {epoch} failed: {error:?}");
            }
        }

        result
    }

    async fn compute(&self, epoch: Epoch, cancellation: &CancellationToken) -> Result<EpochIncome> {
        ensure!(!cancellation.is_cancelled(), Error::Cancelled);

        let duties = classify_required(
            ProviderCall::ProposerDuties,
            self.providers.proposer_duties.proposer_duties(epoch).await,
        )?;

        let duty_table = ProposerDutyTable::new(epoch, &duties)?;
        let slots = duty_table.epoch_slots(epoch)?;

        debug!(
            "computing rewards for epoch {epoch} (slots {}..={}, concurrency limit {})",
            slots.start(),
            slots.end(),
            self.config.concurrency_limit,
        );

        let mut group = TaskGroup::new(self.config.concurrency_limit, cancellation);

        let context = TaskContext {
            providers: self.providers.clone(),
            duty_table: Arc::new(duty_table),
            income: Arc::default(),
            cancellation: group.cancellation_token(),
            mode: self.config.reward_source_mode,
            metrics: self.metrics.clone(),
        };

        group.spawn_unlimited(context.clone().process_attestation_rewards(epoch));

        for slot in slots {
            if !group.spawn_limited(context.clone().process_slot(slot)).await {
                debug!("epoch {epoch} computation failed, not starting slot {slot} or later");
                break;
            }
        }

        group.wait().await?;

        Ok(context.income.take())
    }
}

#[derive(Clone)]
struct TaskContext {
    providers: Providers,
    duty_table: Arc<ProposerDutyTable>,
    income: Arc<IncomeMap>,
    cancellation: CancellationToken,
    mode: RewardSourceMode,
    metrics: Option<Arc<Metrics>>,
}

impl TaskContext {
    async fn process_slot(self, slot: Slot) -> Result<()> {
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.inc_slot_tasks_in_flight();
        }

        let result = self.process_slot_steps(slot).await;

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.dec_slot_tasks_in_flight();
        }

        result
    }

    async fn process_slot_steps(&self, slot: Slot) -> Result<()> {
        let proposer = self
            .duty_table
            .proposer(slot)
            .ok_or(Error::ProposerNotFound { slot })?;

        self.income.ensure(proposer);

        self.ensure_not_cancelled()?;

        let call = ProviderCall::ExecutionBlockNumber;
        let result = self
            .providers
            .execution_blocks
            .execution_block_number(slot)
            .await;

        match classify(call, result) {
            Outcome::Continue(block_number) => {
                self.process_execution_rewards(proposer, block_number)
                    .await?;
            }
            Outcome::BenignSkip(SkipReason::BlockNotFound) => {
                self.register_skip(slot, call, SkipReason::BlockNotFound);
                self.income
                    .update(proposer, ValidatorEpochIncome::record_missed_proposal);
                return Ok(());
            }
            Outcome::BenignSkip(reason) => self.register_skip(slot, call, reason),
            Outcome::Fatal(error) => return Err(error),
        }

        self.ensure_not_cancelled()?;

        let call = ProviderCall::SyncCommitteeRewards;
        let result = self
            .providers
            .sync_committee_rewards
            .sync_committee_rewards(slot)
            .await;

        match classify(call, result) {
            Outcome::Continue(rewards) => self.income.update_many(
                rewards
                    .into_iter()
                    .map(|reward| (reward.validator_index, reward.reward)),
                ValidatorEpochIncome::add_sync_committee_reward,
            ),
            Outcome::BenignSkip(reason) => self.register_skip(slot, call, reason),
            Outcome::Fatal(error) => return Err(error),
        }

        self.ensure_not_cancelled()?;

        let block_rewards = classify_required(
            ProviderCall::BlockRewards,
            self.providers.block_rewards.block_rewards(slot).await,
        )?;

        self.income.update(block_rewards.proposer_index, |income| {
            income.add_block_rewards(&block_rewards)
        });

        Ok(())
    }

    async fn process_execution_rewards(
        &self,
        proposer: ValidatorIndex,
        block_number: ExecutionBlockNumber,
    ) -> Result<()> {
        self.ensure_not_cancelled()?;

        let ExecutionRewards {
            tx_fee_reward_wei,
            withdrawals,
        } = classify_required(
            ProviderCall::ExecutionRewards,
            self.providers
                .execution_rewards
                .execution_rewards(block_number, self.mode)
                .await,
        )?;

        if self.mode.includes_transaction_fees() {
            self.income.update(proposer, |income| {
                income.add_tx_fee_reward(&tx_fee_reward_wei)
            });
        }

        if self.mode.includes_withdrawals() {
            self.income.update_many(
                withdrawals
                    .into_iter()
                    .filter(|withdrawal| withdrawal.amount > 0)
                    .map(|withdrawal| (withdrawal.validator_index, withdrawal.amount)),
                ValidatorEpochIncome::add_withdrawal,
            );
        }

        Ok(())
    }

    async fn process_attestation_rewards(self, epoch: Epoch) -> Result<()> {
        self.ensure_not_cancelled()?;

        let rewards = classify_required(
            ProviderCall::AttestationRewards,
            self.providers
                .attestation_rewards
                .attestation_rewards(epoch)
                .await,
        )?;

        // Validate the whole response before merging any of it.
        let incomes = rewards
            .into_iter()
            .map(|reward| Ok((reward.validator_index, AttestationIncome::try_from(reward)?)))
            .collect::<Result<Vec<_>>>()?;

        self.income
            .update_many(incomes, ValidatorEpochIncome::set_attestation_income);

        Ok(())
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        ensure!(!self.cancellation.is_cancelled(), Error::Cancelled);
        Ok(())
    }

    fn register_skip(&self, slot: Slot, call: ProviderCall, reason: SkipReason) {
        debug!("skipping {call} for slot {slot}: {reason}");

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.register_benign_skip(reason.into());
        }
    }
}
