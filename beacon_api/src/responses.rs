// Envelopes of Beacon Node API responses.
// Only the fields used for reward accounting are deserialized.

use serde::Deserialize;
use types::{containers::TotalAttestationReward, primitives::ExecutionBlockNumber};

#[derive(Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
}

#[derive(Deserialize)]
pub struct BeaconBlock {
    pub body: BeaconBlockBody,
}

#[derive(Deserialize)]
pub struct BeaconBlockBody {
    // Absent before Bellatrix.
    #[serde(default)]
    pub execution_payload: Option<ExecutionPayload>,
}

#[derive(Deserialize)]
pub struct ExecutionPayload {
    #[serde(with = "serde_utils::string_or_native")]
    pub block_number: ExecutionBlockNumber,
}

#[derive(Deserialize)]
pub struct AttestationRewards {
    pub total_rewards: Vec<TotalAttestationReward>,
}
