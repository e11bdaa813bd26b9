pub mod common;
pub mod config;
pub mod engine;
pub mod intake;
pub mod notify;
pub mod rpc;
pub mod store;
pub mod task;
