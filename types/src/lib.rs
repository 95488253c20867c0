pub mod containers;
pub mod primitives;
pub mod redacting_url;
