// Execution JSON-RPC `QUANTITY` values, e.g. `"0x1a"`.
// See <https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/common.md#encoding>.

use core::{
    fmt::{Display, Formatter, LowerHex, Result as FmtResult},
    marker::PhantomData,
};

use num_traits::Num;
use serde::{
    de::{Error as DeserializeError, Visitor},
    Deserializer, Serializer,
};

use crate::shared;

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Num<FromStrRadixErr: Display>,
    D: Deserializer<'de>,
{
    struct HexVisitor<T>(PhantomData<T>);

    impl<T: Num<FromStrRadixErr: Display>> Visitor<'_> for HexVisitor<T> {
        type Value = T;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str(shared::EXPECTING_PREFIXED_HEX)
        }

        fn visit_str<E: DeserializeError>(self, string: &str) -> Result<Self::Value, E> {
            let digits = shared::strip_hex_prefix(string)?;

            if digits.is_empty() {
                return Err(E::custom("string contains no hexadecimal digits"));
            }

            if digits == "0" {
                return Ok(T::zero());
            }

            if digits.starts_with('0') {
                return Err(E::custom(
                    "string contains leading zeros after hexadecimal prefix",
                ));
            }

            T::from_str_radix(digits, 16).map_err(E::custom)
        }
    }

    deserializer.deserialize_str(HexVisitor(PhantomData))
}

pub fn serialize<S: Serializer>(number: impl LowerHex, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{number:#x}"))
}
