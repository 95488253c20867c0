use anyhow::{bail, Result};
use strum::{Display, IntoStaticStr};

use crate::{
    error::Error,
    providers::{ProviderCall, ProviderError},
};

/// Expected protocol condition that skips part of the work for a slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    BlockNotFound,
    PreMerge,
    PreSyncCommittees,
}

#[derive(Debug)]
pub enum Outcome<T> {
    Continue(T),
    BenignSkip(SkipReason),
    Fatal(anyhow::Error),
}

/// Decides how the result of a provider request affects the rest of the computation.
///
/// This is the only place that knows which conditions are benign for which request:
/// - [`ProviderError::BlockNotFound`] and [`ProviderError::PreMerge`] when resolving
///   the execution block number of a slot;
/// - [`ProviderError::PreSyncCommittees`] when fetching sync committee rewards.
///
/// Any other failure is fatal. Transport errors are passed through unchanged.
pub fn classify<T>(call: ProviderCall, result: Result<T, ProviderError>) -> Outcome<T> {
    let error = match result {
        Ok(value) => return Outcome::Continue(value),
        Err(error) => error,
    };

    let reason = match error {
        ProviderError::Other(error) => return Outcome::Fatal(error),
        ProviderError::BlockNotFound => SkipReason::BlockNotFound,
        ProviderError::PreMerge => SkipReason::PreMerge,
        ProviderError::PreSyncCommittees => SkipReason::PreSyncCommittees,
    };

    let benign = matches!(
        (call, reason),
        (
            ProviderCall::ExecutionBlockNumber,
            SkipReason::BlockNotFound | SkipReason::PreMerge,
        ) | (ProviderCall::SyncCommitteeRewards, SkipReason::PreSyncCommittees),
    );

    if benign {
        Outcome::BenignSkip(reason)
    } else {
        Outcome::Fatal(Error::UnexpectedCondition { call, reason }.into())
    }
}

/// Like [`classify`] for requests that have no benign failure modes.
pub fn classify_required<T>(call: ProviderCall, result: Result<T, ProviderError>) -> Result<T> {
    match classify(call, result) {
        Outcome::Continue(value) => Ok(value),
        Outcome::BenignSkip(reason) => bail!(Error::UnexpectedCondition { call, reason }),
        Outcome::Fatal(error) => Err(error),
    }
}
