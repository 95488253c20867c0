pub mod prefixed_hex_quantity;
pub mod string_or_native;

mod shared;
