pub use crate::execution_api::{Error, ExecutionApi};

mod execution_api;
mod fees;
mod responses;
