use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::model::{DeviceId, EntityDomain, EntityId};

pub const TOPIC_DEVICE_ANNOUNCE: &str = "hub.device.announce";
pub const TOPIC_ENTITY_ANNOUNCE: &str = "hub.entity.announce";
pub const TOPIC_STATE_UPDATE_PREFIX: &str = "hub.state.update.";
pub const TOPIC_COMMAND_PREFIX: &str = "hub.command.";

pub fn state_topic(entity_id: EntityId) -> String {
    format!("{TOPIC_STATE_UPDATE_PREFIX}{}", entity_id.0)
}

pub fn command_topic(entity_id: EntityId) -> String {
    format!("{TOPIC_COMMAND_PREFIX}{}", entity_id.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceAnnounce {
    pub id: DeviceId,
    pub name: String,
    pub adapter: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub sw_version: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityAnnounce {
    pub id: EntityId,
    pub device_id: DeviceId,
    pub name: String,
    pub domain: EntityDomain,
    pub icon: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateUpdate {
    pub entity_id: EntityId,
    pub value: serde_json::Value,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub ts: DateTime<Utc>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandSet {
    pub action: String,           // "set", "toggle", etc.
    pub value: serde_json::Value, // target value
    pub correlation_id: Option<Uuid>,
}
