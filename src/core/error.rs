use thiserror::Error;

use crate::core::types::{EntityId, ResourceKind};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient {kind}: need {required}, have {available}")]
    InsufficientResources {
        kind: ResourceKind,
        required: u64,
        available: u64,
    },

    #[error("Entity {0} is not idle")]
    EntityUnavailable(EntityId),

    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown archetype: {0}")]
    UnknownArchetype(String),

    #[error("{0} cannot be acquired directly")]
    NotForSale(String),

    #[error("Unknown rival: {0}")]
    UnknownRival(String),

    #[error("Entity {entity} does not meet requirement: {attribute} >= {minimum}")]
    RequirementNotMet {
        entity: EntityId,
        attribute: String,
        minimum: f64,
    },

    #[error("Entity {entity} is at its limit: {attribute} <= {maximum}")]
    LimitReached {
        entity: EntityId,
        attribute: String,
        maximum: f64,
    },

    #[error("Technology {0} is already researched or in progress")]
    AlreadyResearched(String),

    #[error("Action on cooldown until {until}: {key}")]
    OnCooldown { key: String, until: u64 },

    #[error("No combat units available")]
    NoArmy,

    #[error("Action {action} needs a partner")]
    PartnerRequired { action: String },

    #[error("Entity {entity} cannot take part in {action}")]
    InvalidSubject { entity: EntityId, action: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Game is paused")]
    Paused,

    #[error("Engine runtime has shut down")]
    RuntimeClosed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl EngineError {
    /// Rejections a player can cause by issuing a command the state cannot satisfy
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientResources { .. }
                | EngineError::EntityUnavailable(_)
                | EngineError::RequirementNotMet { .. }
                | EngineError::LimitReached { .. }
                | EngineError::AlreadyResearched(_)
                | EngineError::OnCooldown { .. }
                | EngineError::NoArmy
                | EngineError::PartnerRequired { .. }
                | EngineError::InvalidSubject { .. }
                | EngineError::NotForSale(_)
                | EngineError::Paused
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert!(EngineError::EntityUnavailable(EntityId(1)).is_rejection());
        assert!(EngineError::NoArmy.is_rejection());
        assert!(!EngineError::Persistence("disk full".into()).is_rejection());
        assert!(!EngineError::UnknownAction("fly".into()).is_rejection());
    }

    #[test]
    fn test_insufficient_resources_message() {
        let err = EngineError::InsufficientResources {
            kind: ResourceKind::from("gold"),
            required: 600,
            available: 500,
        };
        assert_eq!(err.to_string(), "Insufficient gold: need 600, have 500");
    }
}
