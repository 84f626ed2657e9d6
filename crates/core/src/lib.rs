pub mod engine;
mod lsn_counter;
mod metrics;
mod pending;
mod recovery;
mod replication;
mod rpc_handlers;

pub use engine::{Engine, EngineConfig};
