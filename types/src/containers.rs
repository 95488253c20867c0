// Containers in the shape the Eth Beacon Node API returns them.
// Unknown fields are tolerated because servers add fields across forks
// (`pubkey` in proposer duties, `inactivity` in attestation rewards, etc.).

use serde::{Deserialize, Serialize};

use crate::primitives::{Gwei, GweiDelta, Slot, ValidatorIndex, Wei};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ProposerDuty {
    #[serde(with = "serde_utils::string_or_native")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct BlockRewards {
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_index: ValidatorIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub total: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    pub attestations: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    pub sync_aggregate: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_slashings: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    pub attester_slashings: Gwei,
}

impl BlockRewards {
    #[must_use]
    pub const fn slashing_inclusion(&self) -> Gwei {
        self.attester_slashings + self.proposer_slashings
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SyncCommitteeReward {
    #[serde(with = "serde_utils::string_or_native")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub reward: GweiDelta,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct TotalAttestationReward {
    #[serde(with = "serde_utils::string_or_native")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub head: GweiDelta,
    #[serde(with = "serde_utils::string_or_native")]
    pub target: GweiDelta,
    #[serde(with = "serde_utils::string_or_native")]
    pub source: GweiDelta,
    // Only present before Altair.
    #[serde(default, with = "serde_utils::string_or_native")]
    pub inclusion_delay: GweiDelta,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ValidatorBalance {
    #[serde(with = "serde_utils::string_or_native")]
    pub index: ValidatorIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub balance: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Withdrawal {
    pub validator_index: ValidatorIndex,
    pub amount: Gwei,
}

/// Income of a single execution block as seen by its fee recipient and withdrawal beneficiaries.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct ExecutionRewards {
    pub tx_fee_reward_wei: Wei,
    pub withdrawals: Vec<Withdrawal>,
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Result};

    use super::*;

    #[test]
    fn proposer_duty_ignores_pubkey() -> Result<()> {
        let duty = serde_json::from_value::<ProposerDuty>(json!({
            "pubkey": "0x93247f2209abcacf57b75a51dafae777f9dd38bc7053d1af526f220a7489a6d3a2753e5f3e8b1cfe39b56f43611df74a",
            "validator_index": "1",
            "slot": "32",
        }))?;

        assert_eq!(
            duty,
            ProposerDuty {
                validator_index: 1,
                slot: 32,
            },
        );

        Ok(())
    }

    #[test]
    fn total_attestation_reward_defaults_inclusion_delay() -> Result<()> {
        let reward = serde_json::from_value::<TotalAttestationReward>(json!({
            "validator_index": "0",
            "head": "2000",
            "target": "-2000",
            "source": "1500",
            "inactivity": "0",
        }))?;

        assert_eq!(
            reward,
            TotalAttestationReward {
                validator_index: 0,
                head: 2000,
                target: -2000,
                source: 1500,
                inclusion_delay: 0,
            },
        );

        Ok(())
    }

    #[test]
    fn block_rewards_sum_both_slashing_kinds() {
        let rewards = BlockRewards {
            proposer_slashings: 3,
            attester_slashings: 4,
            ..BlockRewards::default()
        };

        assert_eq!(rewards.slashing_inclusion(), 7);
    }
}
