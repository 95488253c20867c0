pub use crate::{
    api::{BeaconApi, Error},
    config::{Config, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY},
};

mod api;
mod config;
mod responses;
