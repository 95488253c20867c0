// The Eth Beacon Node API represents numbers as strings, including signed reward deltas.
// Fixtures and some nonstandard servers use native JSON numbers instead, so both are accepted.
// Values are always serialized as strings in human-readable formats.
//
// `serde_with::DisplayFromStr` rejects native numbers, which is why it is not used here.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    marker::PhantomData,
    str::FromStr,
};

use serde::{
    de::{Error, IntoDeserializer as _, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + FromStr<Err: Display>,
    D: Deserializer<'de>,
{
    struct AnyVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de> + FromStr<Err: Display>> Visitor<'de> for AnyVisitor<T> {
        type Value = T;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E: Error>(self, string: &str) -> Result<Self::Value, E> {
            string.parse().map_err(E::custom)
        }

        fn visit_u64<E: Error>(self, value: u64) -> Result<Self::Value, E> {
            T::deserialize(value.into_deserializer())
        }

        fn visit_i64<E: Error>(self, value: i64) -> Result<Self::Value, E> {
            T::deserialize(value.into_deserializer())
        }
    }

    if deserializer.is_human_readable() {
        deserializer.deserialize_any(AnyVisitor(PhantomData))
    } else {
        T::deserialize(deserializer)
    }
}

pub fn serialize<S: Serializer>(
    value: impl Serialize + Display,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.collect_str(&value)
    } else {
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Result};
    use test_case::test_case;

    #[derive(PartialEq, Eq, Debug, Deserialize, Serialize)]
    struct Signed(#[serde(with = "crate::string_or_native")] i64);

    #[derive(PartialEq, Eq, Debug, Deserialize, Serialize)]
    struct Unsigned(#[serde(with = "crate::string_or_native")] u64);

    #[test_case(json!("-50"), -50; "negative string")]
    #[test_case(json!("123"), 123; "positive string")]
    #[test_case(json!(-7), -7; "negative number")]
    #[test_case(json!(7), 7; "positive number")]
    fn signed_values_are_accepted_as_strings_and_numbers(
        json: serde_json::Value,
        expected: i64,
    ) -> Result<()> {
        assert_eq!(serde_json::from_value::<Signed>(json)?, Signed(expected));
        Ok(())
    }

    #[test]
    fn unsigned_values_are_serialized_as_strings() -> Result<()> {
        assert_eq!(serde_json::to_value(Unsigned(32))?, json!("32"));
        Ok(())
    }

    #[test]
    fn negative_value_is_rejected_for_unsigned_type() {
        serde_json::from_value::<Unsigned>(json!("-1"))
            .expect_err("negative string should not parse as u64");
    }
}
