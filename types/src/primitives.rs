use num_bigint::BigUint;

pub type Epoch = u64;
pub type ExecutionBlockNumber = u64;
pub type Gwei = u64;
pub type Slot = u64;
pub type ValidatorIndex = u64;

/// Signed reward delta as reported by the Beacon Node API rewards endpoints.
pub type GweiDelta = i64;

/// Execution layer amounts do not fit in 64 bits in general.
pub type Wei = BigUint;
