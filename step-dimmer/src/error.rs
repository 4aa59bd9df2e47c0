use hub_core::model::EntityId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DimmerError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("unreadable value {value} from sensor {sensor}: {reason}")]
    UnreadableSensorValue { sensor: EntityId, value: String, reason: &'static str },
    #[error("switch {switch} failed to {action}: {reason}")]
    ActionFailure { switch: EntityId, action: &'static str, reason: String },
}

impl DimmerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

pub type Result<T, E = DimmerError> = std::result::Result<T, E>;
