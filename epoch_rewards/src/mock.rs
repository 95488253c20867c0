use core::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};
use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use num_bigint::BigUint;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng as _, SeedableRng as _};
use types::{
    containers::{
        BlockRewards, ExecutionRewards, ProposerDuty, SyncCommitteeReward, TotalAttestationReward,
    },
    primitives::{Epoch, ExecutionBlockNumber, Slot, ValidatorIndex},
};

use crate::providers::{
    AttestationRewardProvider, BlockRewardProvider, ExecutionBlockResolver,
    ExecutionRewardProvider, ProposerDutiesProvider, ProviderCall, ProviderError,
    RewardSourceMode, SyncCommitteeRewardProvider,
};

pub const DEFAULT_TX_FEE_REWARD_WEI: u64 = 1_000_000_000;
pub const DEFAULT_ATTESTATION_INCLUSION_REWARD: u64 = 100;
pub const DEFAULT_SYNC_INCLUSION_REWARD: u64 = 10;

#[derive(Clone, Debug)]
pub enum MockResponse<T> {
    Ok(T),
    BlockNotFound,
    PreMerge,
    PreSyncCommittees,
    Fail(&'static str),
    Panic,
}

impl<T: Clone> MockResponse<T> {
    fn respond(&self) -> Result<T, ProviderError> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::BlockNotFound => Err(ProviderError::BlockNotFound),
            Self::PreMerge => Err(ProviderError::PreMerge),
            Self::PreSyncCommittees => Err(ProviderError::PreSyncCommittees),
            Self::Fail(message) => Err(ProviderError::Other(anyhow!(*message))),
            Self::Panic => panic!("mock provider panicked"),
        }
    }
}

/// In-memory implementation of every provider.
///
/// By default every slot has a block whose execution block number equals the slot,
/// every block pays [`DEFAULT_TX_FEE_REWARD_WEI`] and no withdrawals,
/// and sync committee and attestation rewards are empty.
pub struct MockProviders {
    duties: MockResponse<Vec<ProposerDuty>>,
    block_numbers: HashMap<Slot, MockResponse<ExecutionBlockNumber>>,
    execution_rewards: HashMap<ExecutionBlockNumber, MockResponse<ExecutionRewards>>,
    sync_committee_rewards: HashMap<Slot, MockResponse<Vec<SyncCommitteeReward>>>,
    block_rewards: HashMap<Slot, MockResponse<BlockRewards>>,
    attestation_rewards: MockResponse<Vec<TotalAttestationReward>>,
    delays: HashMap<Slot, Duration>,
    attestation_delay: Duration,
    attestation_finished: AtomicBool,
    block_rewards_before_attestation: AtomicUsize,
    calls: Mutex<HashMap<ProviderCall, usize>>,
    modes: Mutex<Vec<RewardSourceMode>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockProviders {
    pub fn epoch(epoch: Epoch, proposers: impl IntoIterator<Item = ValidatorIndex>) -> Self {
        let proposers = proposers.into_iter().collect::<Vec<_>>();
        let slots_per_epoch = proposers.len() as u64;

        let duties = proposers
            .iter()
            .zip(epoch * slots_per_epoch..)
            .map(|(validator_index, slot)| ProposerDuty {
                validator_index: *validator_index,
                slot,
            })
            .collect::<Vec<_>>();

        let block_rewards = duties
            .iter()
            .map(|duty| {
                let rewards = BlockRewards {
                    proposer_index: duty.validator_index,
                    total: DEFAULT_ATTESTATION_INCLUSION_REWARD + DEFAULT_SYNC_INCLUSION_REWARD,
                    attestations: DEFAULT_ATTESTATION_INCLUSION_REWARD,
                    sync_aggregate: DEFAULT_SYNC_INCLUSION_REWARD,
                    proposer_slashings: 0,
                    attester_slashings: 0,
                };

                (duty.slot, MockResponse::Ok(rewards))
            })
            .collect();

        Self {
            duties: MockResponse::Ok(duties),
            block_numbers: HashMap::new(),
            execution_rewards: HashMap::new(),
            sync_committee_rewards: HashMap::new(),
            block_rewards,
            attestation_rewards: MockResponse::Ok(vec![]),
            delays: HashMap::new(),
            attestation_delay: Duration::ZERO,
            attestation_finished: AtomicBool::new(false),
            block_rewards_before_attestation: AtomicUsize::new(0),
            calls: Mutex::default(),
            modes: Mutex::default(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_duties(mut self, response: MockResponse<Vec<ProposerDuty>>) -> Self {
        self.duties = response;
        self
    }

    pub fn with_block_number(
        mut self,
        slot: Slot,
        response: MockResponse<ExecutionBlockNumber>,
    ) -> Self {
        self.block_numbers.insert(slot, response);
        self
    }

    pub fn with_execution_rewards(
        mut self,
        block_number: ExecutionBlockNumber,
        response: MockResponse<ExecutionRewards>,
    ) -> Self {
        self.execution_rewards.insert(block_number, response);
        self
    }

    pub fn with_sync_committee_rewards(
        mut self,
        slot: Slot,
        response: MockResponse<Vec<SyncCommitteeReward>>,
    ) -> Self {
        self.sync_committee_rewards.insert(slot, response);
        self
    }

    pub fn with_block_rewards(mut self, slot: Slot, response: MockResponse<BlockRewards>) -> Self {
        self.block_rewards.insert(slot, response);
        self
    }

    pub fn with_attestation_rewards(
        mut self,
        response: MockResponse<Vec<TotalAttestationReward>>,
    ) -> Self {
        self.attestation_rewards = response;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        for slot in self.slots() {
            self.delays.insert(slot, delay);
        }

        self
    }

    pub fn with_random_delays(mut self, seed: u64, max_delay: Duration) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let max_micros = u64::try_from(max_delay.as_micros()).unwrap_or(u64::MAX);

        for slot in self.slots() {
            let delay = Duration::from_micros(rng.gen_range(0..=max_micros));
            self.delays.insert(slot, delay);
        }

        self
    }

    pub fn with_attestation_delay(mut self, delay: Duration) -> Self {
        self.attestation_delay = delay;
        self
    }

    pub fn calls(&self, call: ProviderCall) -> usize {
        self.calls.lock().get(&call).copied().unwrap_or_default()
    }

    pub fn requested_modes(&self) -> Vec<RewardSourceMode> {
        self.modes.lock().clone()
    }

    /// Number of block reward requests made before the attestation request completed.
    pub fn block_rewards_before_attestation(&self) -> usize {
        self.block_rewards_before_attestation.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn slots(&self) -> Vec<Slot> {
        match &self.duties {
            MockResponse::Ok(duties) => duties.iter().map(|duty| duty.slot).collect(),
            _ => vec![],
        }
    }

    fn record_call(&self, call: ProviderCall) {
        *self.calls.lock().entry(call).or_default() += 1;
    }

    // Requests of a single slot task are sequential, so concurrent slot requests
    // are never more numerous than concurrent slot tasks.
    async fn slot_request<T: Clone>(
        &self,
        call: ProviderCall,
        slot: Slot,
        response: Option<&MockResponse<T>>,
        default: impl FnOnce() -> T,
    ) -> Result<T, ProviderError> {
        self.record_call(call);

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&slot) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match response {
            Some(response) => response.respond(),
            None => Ok(default()),
        }
    }
}

#[async_trait]
impl ProposerDutiesProvider for MockProviders {
    async fn proposer_duties(&self, _epoch: Epoch) -> Result<Vec<ProposerDuty>, ProviderError> {
        self.record_call(ProviderCall::ProposerDuties);
        self.duties.respond()
    }
}

#[async_trait]
impl ExecutionBlockResolver for MockProviders {
    async fn execution_block_number(
        &self,
        slot: Slot,
    ) -> Result<ExecutionBlockNumber, ProviderError> {
        let response = self.block_numbers.get(&slot);
        self.slot_request(ProviderCall::ExecutionBlockNumber, slot, response, || slot)
            .await
    }
}

#[async_trait]
impl ExecutionRewardProvider for MockProviders {
    async fn execution_rewards(
        &self,
        block_number: ExecutionBlockNumber,
        mode: RewardSourceMode,
    ) -> Result<ExecutionRewards, ProviderError> {
        self.modes.lock().push(mode);

        let response = self.execution_rewards.get(&block_number);

        // Default block numbers equal their slots.
        self.slot_request(ProviderCall::ExecutionRewards, block_number, response, || {
            ExecutionRewards {
                tx_fee_reward_wei: BigUint::from(DEFAULT_TX_FEE_REWARD_WEI),
                withdrawals: vec![],
            }
        })
        .await
    }
}

#[async_trait]
impl SyncCommitteeRewardProvider for MockProviders {
    async fn sync_committee_rewards(
        &self,
        slot: Slot,
    ) -> Result<Vec<SyncCommitteeReward>, ProviderError> {
        let response = self.sync_committee_rewards.get(&slot);
        self.slot_request(ProviderCall::SyncCommitteeRewards, slot, response, Vec::new)
            .await
    }
}

#[async_trait]
impl BlockRewardProvider for MockProviders {
    async fn block_rewards(&self, slot: Slot) -> Result<BlockRewards, ProviderError> {
        if !self.attestation_finished.load(Ordering::SeqCst) {
            self.block_rewards_before_attestation
                .fetch_add(1, Ordering::SeqCst);
        }

        let response = self.block_rewards.get(&slot);
        self.slot_request(ProviderCall::BlockRewards, slot, response, BlockRewards::default)
            .await
    }
}

#[async_trait]
impl AttestationRewardProvider for MockProviders {
    async fn attestation_rewards(
        &self,
        _epoch: Epoch,
    ) -> Result<Vec<TotalAttestationReward>, ProviderError> {
        self.record_call(ProviderCall::AttestationRewards);

        if !self.attestation_delay.is_zero() {
            tokio::time::sleep(self.attestation_delay).await;
        }

        self.attestation_finished.store(true, Ordering::SeqCst);
        self.attestation_rewards.respond()
    }
}
