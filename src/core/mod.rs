pub mod config;
pub mod error;
pub mod random;
pub mod types;

pub use error::{Result, SimError};
pub use random::RandomSource;
pub use types::{AgentId, Pos, Step};
