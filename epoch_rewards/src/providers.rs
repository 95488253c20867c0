use std::sync::Arc;

use async_trait::async_trait;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;
use types::{
    containers::{
        BlockRewards, ExecutionRewards, ProposerDuty, SyncCommitteeReward, TotalAttestationReward,
    },
    primitives::{Epoch, ExecutionBlockNumber, Slot},
};

use crate::classifier::SkipReason;

/// Failure of a single provider request.
///
/// The first three variants describe expected protocol conditions.
/// Whether they are tolerated depends on the request that produced them.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("block not found")]
    BlockNotFound,
    #[error("slot precedes the merge")]
    PreMerge,
    #[error("slot precedes sync committees")]
    PreSyncCommittees,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<SkipReason> for ProviderError {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::BlockNotFound => Self::BlockNotFound,
            SkipReason::PreMerge => Self::PreMerge,
            SkipReason::PreSyncCommittees => Self::PreSyncCommittees,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProviderCall {
    ProposerDuties,
    ExecutionBlockNumber,
    ExecutionRewards,
    SyncCommitteeRewards,
    BlockRewards,
    AttestationRewards,
}

/// Selects which execution layer income is credited to validators.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum RewardSourceMode {
    /// Transaction fees of proposed blocks and withdrawals of every validator.
    #[default]
    Combined,
    TransactionFees,
    Withdrawals,
}

impl RewardSourceMode {
    #[must_use]
    pub const fn includes_transaction_fees(self) -> bool {
        matches!(self, Self::Combined | Self::TransactionFees)
    }

    #[must_use]
    pub const fn includes_withdrawals(self) -> bool {
        matches!(self, Self::Combined | Self::Withdrawals)
    }
}

#[async_trait]
pub trait ProposerDutiesProvider: Send + Sync {
    async fn proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerDuty>, ProviderError>;
}

#[async_trait]
pub trait ExecutionBlockResolver: Send + Sync {
    /// Fails with [`ProviderError::BlockNotFound`] for empty slots
    /// and [`ProviderError::PreMerge`] for blocks without an execution payload.
    async fn execution_block_number(
        &self,
        slot: Slot,
    ) -> Result<ExecutionBlockNumber, ProviderError>;
}

#[async_trait]
pub trait ExecutionRewardProvider: Send + Sync {
    /// Implementations may leave out components that `mode` does not include.
    async fn execution_rewards(
        &self,
        block_number: ExecutionBlockNumber,
        mode: RewardSourceMode,
    ) -> Result<ExecutionRewards, ProviderError>;
}

#[async_trait]
pub trait SyncCommitteeRewardProvider: Send + Sync {
    /// Fails with [`ProviderError::PreSyncCommittees`] for slots before Altair.
    async fn sync_committee_rewards(
        &self,
        slot: Slot,
    ) -> Result<Vec<SyncCommitteeReward>, ProviderError>;
}

#[async_trait]
pub trait BlockRewardProvider: Send + Sync {
    async fn block_rewards(&self, slot: Slot) -> Result<BlockRewards, ProviderError>;
}

#[async_trait]
pub trait AttestationRewardProvider: Send + Sync {
    async fn attestation_rewards(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<TotalAttestationReward>, ProviderError>;
}

#[derive(Clone)]
pub struct Providers {
    pub proposer_duties: Arc<dyn ProposerDutiesProvider>,
    pub execution_blocks: Arc<dyn ExecutionBlockResolver>,
    pub execution_rewards: Arc<dyn ExecutionRewardProvider>,
    pub sync_committee_rewards: Arc<dyn SyncCommitteeRewardProvider>,
    pub block_rewards: Arc<dyn BlockRewardProvider>,
    pub attestation_rewards: Arc<dyn AttestationRewardProvider>,
}

impl Providers {
    /// Bundles a consensus layer client serving every per-slot and per-epoch request
    /// with an execution layer client serving execution rewards.
    #[must_use]
    pub fn new<C, E>(consensus: &Arc<C>, execution: &Arc<E>) -> Self
    where
        C: ProposerDutiesProvider
            + ExecutionBlockResolver
            + SyncCommitteeRewardProvider
            + BlockRewardProvider
            + AttestationRewardProvider
            + 'static,
        E: ExecutionRewardProvider + 'static,
    {
        Self {
            proposer_duties: Arc::<C>::clone(consensus),
            execution_blocks: Arc::<C>::clone(consensus),
            execution_rewards: Arc::<E>::clone(execution),
            sync_committee_rewards: Arc::<C>::clone(consensus),
            block_rewards: Arc::<C>::clone(consensus),
            attestation_rewards: Arc::<C>::clone(consensus),
        }
    }
}
