use thiserror::Error;

use crate::core::types::CivId;

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Civilization not found: {0:?}")]
    UnknownCivilization(CivId),

    #[error("Invalid combat config: {0}")]
    InvalidConfig(String),

    #[error("Invalid encounter: {0}")]
    InvalidEncounter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CombatError>;
