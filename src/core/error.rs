use thiserror::Error;

use crate::planning::action::ActionKind;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No generator registered for weighted action kind {0:?}")]
    MissingGenerator(ActionKind),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
