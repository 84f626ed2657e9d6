pub mod election;
pub mod state;

pub use election::{ConsensusEngine, ElectionConfig, LocalLog};
pub use state::ConsensusState;
