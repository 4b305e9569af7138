use thiserror::Error;

use crate::core::types::EntityId;

#[derive(Error, Debug)]
pub enum PlagueError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Entity {0} cannot hold affinity toward itself")]
    InvalidSelfReference(EntityId),

    #[error("Proximity query failed: {0}")]
    ProximityQuery(String),

    #[error("No tokio runtime to run proximity scans on")]
    NoRuntime,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PlagueError>;
