use core::mem;
use std::collections::{BTreeMap, HashMap};

use anyhow::{ensure, Error as AnyhowError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use types::{
    containers::{BlockRewards, TotalAttestationReward},
    primitives::{Gwei, GweiDelta, ValidatorIndex, Wei},
};

use crate::error::Error;

pub type EpochIncome = BTreeMap<ValidatorIndex, ValidatorEpochIncome>;

/// Income of a single validator in a single epoch.
///
/// Amounts are in Gwei except for [`ValidatorEpochIncome::tx_fee_reward_wei`].
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct ValidatorEpochIncome {
    pub proposals_missed: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub tx_fee_reward_wei: Wei,
    pub withdrawal_amount: Gwei,
    pub sync_committee_reward: Gwei,
    pub sync_committee_penalty: Gwei,
    pub proposer_attestation_inclusion_reward: Gwei,
    pub proposer_slashing_inclusion_reward: Gwei,
    pub proposer_sync_inclusion_reward: Gwei,
    pub attestation_head_reward: Gwei,
    pub attestation_source_reward: Gwei,
    pub attestation_source_penalty: Gwei,
    pub attestation_target_reward: Gwei,
    pub attestation_target_penalty: Gwei,
    pub finality_delay_penalty: Gwei,
}

impl ValidatorEpochIncome {
    pub fn record_missed_proposal(&mut self) {
        self.proposals_missed += 1;
    }

    pub fn add_tx_fee_reward(&mut self, amount: &Wei) {
        self.tx_fee_reward_wei += amount;
    }

    pub fn add_withdrawal(&mut self, amount: Gwei) {
        self.withdrawal_amount += amount;
    }

    pub fn add_sync_committee_reward(&mut self, reward: GweiDelta) {
        if reward > 0 {
            self.sync_committee_reward += reward.unsigned_abs();
        } else {
            self.sync_committee_penalty += reward.unsigned_abs();
        }
    }

    pub fn add_block_rewards(&mut self, rewards: &BlockRewards) {
        self.proposer_attestation_inclusion_reward += rewards.attestations;
        self.proposer_slashing_inclusion_reward += rewards.slashing_inclusion();
        self.proposer_sync_inclusion_reward += rewards.sync_aggregate;
    }

    // Attestation terms are reported once per validator per epoch, so they are assigned.
    pub fn set_attestation_income(&mut self, income: AttestationIncome) {
        let AttestationIncome {
            head_reward,
            source_reward,
            source_penalty,
            target_reward,
            target_penalty,
            finality_delay_penalty,
        } = income;

        self.attestation_head_reward = head_reward;
        self.attestation_source_reward = source_reward;
        self.attestation_source_penalty = source_penalty;
        self.attestation_target_reward = target_reward;
        self.attestation_target_penalty = target_penalty;
        self.finality_delay_penalty = finality_delay_penalty;
    }

    /// Sum of all Gwei denominated rewards.
    #[must_use]
    pub const fn total_reward(&self) -> Gwei {
        self.withdrawal_amount
            + self.sync_committee_reward
            + self.proposer_attestation_inclusion_reward
            + self.proposer_slashing_inclusion_reward
            + self.proposer_sync_inclusion_reward
            + self.attestation_head_reward
            + self.attestation_source_reward
            + self.attestation_target_reward
    }

    #[must_use]
    pub const fn total_penalty(&self) -> Gwei {
        self.sync_committee_penalty
            + self.attestation_source_penalty
            + self.attestation_target_penalty
            + self.finality_delay_penalty
    }
}

/// Validated attestation terms of one validator.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct AttestationIncome {
    head_reward: Gwei,
    source_reward: Gwei,
    source_penalty: Gwei,
    target_reward: Gwei,
    target_penalty: Gwei,
    finality_delay_penalty: Gwei,
}

impl TryFrom<TotalAttestationReward> for AttestationIncome {
    type Error = AnyhowError;

    fn try_from(reward: TotalAttestationReward) -> Result<Self, Self::Error> {
        let TotalAttestationReward {
            validator_index,
            head,
            target,
            source,
            inclusion_delay,
        } = reward;

        ensure!(
            head >= 0,
            Error::NegativeHeadReward {
                validator_index,
                head,
            },
        );

        ensure!(
            inclusion_delay <= 0,
            Error::PositiveInclusionDelay {
                validator_index,
                inclusion_delay,
            },
        );

        let (source_reward, source_penalty) = split_by_sign(source);
        let (target_reward, target_penalty) = split_by_sign(target);

        Ok(Self {
            head_reward: head.unsigned_abs(),
            source_reward,
            source_penalty,
            target_reward,
            target_penalty,
            finality_delay_penalty: inclusion_delay.unsigned_abs(),
        })
    }
}

const fn split_by_sign(delta: GweiDelta) -> (Gwei, Gwei) {
    if delta > 0 {
        (delta.unsigned_abs(), 0)
    } else {
        (0, delta.unsigned_abs())
    }
}

/// Income records of all validators touched during one epoch computation.
///
/// Every lookup-or-create and the field updates that follow it happen in one critical section.
/// Callers must not hold the lock across provider requests, which [`IncomeMap::update`] enforces
/// by only accepting synchronous closures.
#[derive(Default, Debug)]
pub struct IncomeMap {
    records: Mutex<HashMap<ValidatorIndex, ValidatorEpochIncome>>,
}

impl IncomeMap {
    pub fn ensure(&self, validator_index: ValidatorIndex) {
        self.records.lock().entry(validator_index).or_default();
    }

    pub fn update(
        &self,
        validator_index: ValidatorIndex,
        update: impl FnOnce(&mut ValidatorEpochIncome),
    ) {
        update(self.records.lock().entry(validator_index).or_default())
    }

    /// Applies updates for multiple validators while holding the lock once.
    pub fn update_many<T>(
        &self,
        updates: impl IntoIterator<Item = (ValidatorIndex, T)>,
        mut update: impl FnMut(&mut ValidatorEpochIncome, T),
    ) {
        let mut records = self.records.lock();

        for (validator_index, value) in updates {
            update(records.entry(validator_index).or_default(), value);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn take(&self) -> EpochIncome {
        mem::take(&mut *self.records.lock()).into_iter().collect()
    }
}
