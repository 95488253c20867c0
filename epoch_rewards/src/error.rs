use core::num::NonZeroU64;

use thiserror::Error;
use types::primitives::{Epoch, GweiDelta, Slot, ValidatorIndex};

use crate::{classifier::SkipReason, providers::ProviderCall};

#[derive(Debug, Error)]
pub enum Error {
    #[error("no proposer duties returned for epoch {epoch}")]
    NoProposerDuties { epoch: Epoch },
    #[error("slots of epoch {epoch} overflow with {slots_per_epoch} slots per epoch")]
    SlotOverflow {
        epoch: Epoch,
        slots_per_epoch: NonZeroU64,
    },
    #[error("assigned proposer for slot {slot} not found")]
    ProposerNotFound { slot: Slot },
    #[error("retrieved negative attestation head reward for validator {validator_index}: {head}")]
    NegativeHeadReward {
        validator_index: ValidatorIndex,
        head: GweiDelta,
    },
    #[error(
        "retrieved positive inclusion delay penalty for validator {validator_index}: \
         {inclusion_delay}"
    )]
    PositiveInclusionDelay {
        validator_index: ValidatorIndex,
        inclusion_delay: GweiDelta,
    },
    #[error("{call} request failed with a condition it cannot tolerate: {reason}")]
    UnexpectedCondition {
        call: ProviderCall,
        reason: SkipReason,
    },
    #[error("epoch reward computation was cancelled")]
    Cancelled,
    #[error("reward task panicked: {message}")]
    TaskPanicked { message: String },
}
