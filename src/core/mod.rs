pub mod config;
pub mod error;
pub mod types;

pub use config::PlagueConfig;
pub use error::{PlagueError, Result};
pub use types::{EntityId, LayerMask, Vec2};
