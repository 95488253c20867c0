use serde::Deserialize;
use types::primitives::{Gwei, ValidatorIndex, Wei};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionBlock {
    // Absent before London.
    #[serde(default)]
    pub base_fee_per_gas: Option<BaseFee>,
    // Absent before Shanghai.
    #[serde(default)]
    pub withdrawals: Vec<RawWithdrawal>,
}

#[derive(Deserialize)]
pub struct BaseFee(#[serde(with = "serde_utils::prefixed_hex_quantity")] pub Wei);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWithdrawal {
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub amount: Gwei,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub gas_used: u64,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub effective_gas_price: Wei,
}
