use std::collections::BTreeMap;

use hub_core::{
    bus_contract::{DeviceAnnounce, EntityAnnounce},
    model::{DeviceId, EntityDomain, EntityId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceMeta {
    pub id: DeviceId,
    pub name: String,
    pub adapter: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub sw_version: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMeta {
    pub id: EntityId,
    pub name: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl DeviceMeta {
    pub fn announce(&self) -> DeviceAnnounce {
        DeviceAnnounce {
            id: self.id,
            name: self.name.clone(),
            adapter: self.adapter.clone(),
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            sw_version: self.sw_version.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl EntityMeta {
    /// Builds the announce for this entity; `extra` attributes (usually the
    /// capability description) are merged over the static ones.
    pub fn announce(
        &self,
        device_id: DeviceId,
        domain: EntityDomain,
        extra: BTreeMap<String, serde_json::Value>,
    ) -> EntityAnnounce {
        let mut attributes = self.attributes.clone();
        attributes.extend(extra);
        EntityAnnounce {
            id: self.id,
            device_id,
            name: self.name.clone(),
            domain,
            icon: self.icon.clone(),
            attributes,
        }
    }
}
