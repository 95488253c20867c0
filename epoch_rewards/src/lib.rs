pub use crate::{
    aggregator::{AggregatorConfig, EpochRewardsAggregator, DEFAULT_CONCURRENCY_LIMIT},
    classifier::{classify, classify_required, Outcome, SkipReason},
    duties::ProposerDutyTable,
    error::Error,
    income::{EpochIncome, IncomeMap, ValidatorEpochIncome},
    providers::{
        AttestationRewardProvider, BlockRewardProvider, ExecutionBlockResolver,
        ExecutionRewardProvider, ProposerDutiesProvider, ProviderCall, ProviderError, Providers,
        RewardSourceMode, SyncCommitteeRewardProvider,
    },
    task_group::TaskGroup,
};

mod aggregator;
mod classifier;
mod duties;
mod error;
mod income;
mod providers;
mod task_group;

#[cfg(test)]
mod mock;
