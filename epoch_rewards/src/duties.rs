use core::{num::NonZeroU64, ops::RangeInclusive};
use std::collections::HashMap;

use anyhow::Result;
use types::{
    containers::ProposerDuty,
    primitives::{Epoch, Slot, ValidatorIndex},
};

use crate::error::Error;

/// Proposer assignments of one epoch.
///
/// Built before any slot task starts and only read afterwards.
#[derive(Debug)]
pub struct ProposerDutyTable {
    proposers: HashMap<Slot, ValidatorIndex>,
    slots_per_epoch: NonZeroU64,
}

impl ProposerDutyTable {
    pub fn new(epoch: Epoch, duties: &[ProposerDuty]) -> Result<Self> {
        let slots_per_epoch = u64::try_from(duties.len())
            .ok()
            .and_then(NonZeroU64::new)
            .ok_or(Error::NoProposerDuties { epoch })?;

        let proposers = duties
            .iter()
            .map(|duty| (duty.slot, duty.validator_index))
            .collect();

        Ok(Self {
            proposers,
            slots_per_epoch,
        })
    }

    #[must_use]
    pub fn proposer(&self, slot: Slot) -> Option<ValidatorIndex> {
        self.proposers.get(&slot).copied()
    }

    #[must_use]
    pub const fn slots_per_epoch(&self) -> NonZeroU64 {
        self.slots_per_epoch
    }

    pub fn epoch_slots(&self, epoch: Epoch) -> Result<RangeInclusive<Slot>> {
        let slots_per_epoch = self.slots_per_epoch;

        epoch
            .checked_mul(slots_per_epoch.get())
            .and_then(|start_slot| {
                let end_slot = start_slot.checked_add(slots_per_epoch.get() - 1)?;
                Some(start_slot..=end_slot)
            })
            .ok_or_else(|| {
                Error::SlotOverflow {
                    epoch,
                    slots_per_epoch,
                }
                .into()
            })
    }
}
