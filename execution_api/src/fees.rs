use num_bigint::BigUint;
use types::primitives::Wei;

use crate::responses::Receipt;

/// Priority fees paid to the fee recipient of a block.
///
/// The base fee is burned. Blocks without one predate EIP-1559 and pay the whole gas price.
pub fn priority_fees(base_fee_per_gas: Option<&Wei>, receipts: &[Receipt]) -> Wei {
    receipts
        .iter()
        .map(|receipt| {
            let price = &receipt.effective_gas_price;

            let priority_fee_per_gas = match base_fee_per_gas {
                Some(base_fee) if price > base_fee => price - base_fee,
                Some(_) => BigUint::default(),
                None => price.clone(),
            };

            priority_fee_per_gas * receipt.gas_used
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn receipt(gas_used: u64, effective_gas_price: u64) -> Receipt {
        Receipt {
            gas_used,
            effective_gas_price: BigUint::from(effective_gas_price),
        }
    }

    #[test_case(Some(7), &[(21_000, 17), (100, 7)] => 210_000_u64; "base fee is burned")]
    #[test_case(None, &[(21_000, 17), (100, 7)] => 357_700_u64; "pre-London block")]
    #[test_case(Some(20), &[(21_000, 17)] => 0_u64; "price below base fee")]
    #[test_case(Some(1), &[] => 0_u64; "empty block")]
    fn priority_fees_are_summed(base_fee: Option<u64>, receipts: &[(u64, u64)]) -> u64 {
        let base_fee = base_fee.map(BigUint::from);

        let receipts = receipts
            .iter()
            .map(|(gas_used, price)| receipt(*gas_used, *price))
            .collect::<Vec<_>>();

        let fees = priority_fees(base_fee.as_ref(), &receipts);

        u64::try_from(fees).expect("test fees should fit in u64")
    }

    #[test]
    fn fees_do_not_overflow() {
        let price = BigUint::from(u128::MAX);
        let receipts = [Receipt {
            gas_used: u64::MAX,
            effective_gas_price: price.clone(),
        }];

        assert_eq!(priority_fees(None, &receipts), price * u64::MAX);
    }
}
