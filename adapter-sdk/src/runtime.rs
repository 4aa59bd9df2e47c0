use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use hub_core::{
    bus::Bus,
    bus_contract::{
        CommandSet, DeviceAnnounce, EntityAnnounce, StateUpdate, TOPIC_DEVICE_ANNOUNCE,
        TOPIC_ENTITY_ANNOUNCE, command_topic, state_topic,
    },
    model::EntityId,
};
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

/// A thin wrapper around the message bus that standardizes how adapters
/// announce devices/entities, publish telemetry, receive commands, and talk
/// to entities owned by other adapters.
#[derive(Clone)]
pub struct AdapterContext {
    bus: Arc<dyn Bus>,
}

impl AdapterContext {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> Arc<dyn Bus> {
        Arc::clone(&self.bus)
    }

    pub async fn announce_device(&self, announce: DeviceAnnounce) -> Result<()> {
        let bytes = Bytes::from(serde_json::to_vec(&announce)?);
        self.bus.publish(TOPIC_DEVICE_ANNOUNCE, bytes).await.context("publish device announce")
    }

    pub async fn announce_entity(&self, announce: EntityAnnounce) -> Result<()> {
        let bytes = Bytes::from(serde_json::to_vec(&announce)?);
        self.bus.publish(TOPIC_ENTITY_ANNOUNCE, bytes).await.context("publish entity announce")
    }

    pub async fn publish_state(&self, update: StateUpdate) -> Result<()> {
        let topic = state_topic(update.entity_id);
        let bytes = Bytes::from(serde_json::to_vec(&update)?);
        self.bus.publish(&topic, bytes).await.context("publish state update")
    }

    /// Sends a command to an entity, typically one owned by another adapter.
    /// Returns once the bus has accepted the message.
    pub async fn send_command(&self, entity_id: EntityId, cmd: CommandSet) -> Result<()> {
        let bytes = Bytes::from(serde_json::to_vec(&cmd)?);
        self.bus
            .publish(&command_topic(entity_id), bytes)
            .await
            .with_context(|| format!("send `{}` command to {entity_id}", cmd.action))
    }

    pub async fn subscribe_commands(
        &self,
        entity_id: EntityId,
    ) -> Result<Box<dyn Stream<Item = CommandSet> + Unpin + Send>> {
        let stream = self.bus.subscribe(&command_topic(entity_id)).await?.filter_map(move |msg| {
            let parsed = serde_json::from_slice(&msg.payload);
            if let Err(err) = &parsed {
                warn!(entity_id = %entity_id, error = %err, "failed to decode command payload");
            }
            parsed.ok()
        });
        Ok(Box::new(stream))
    }

    /// Follows the state updates published for `entity_id`.
    pub async fn subscribe_states(
        &self,
        entity_id: EntityId,
    ) -> Result<Box<dyn Stream<Item = StateUpdate> + Unpin + Send>> {
        let stream = self.bus.subscribe(&state_topic(entity_id)).await?.filter_map(move |msg| {
            match serde_json::from_slice::<StateUpdate>(&msg.payload) {
                Ok(update) if update.entity_id == entity_id => Some(update),
                Ok(update) => {
                    warn!(
                        expected = %entity_id,
                        got = %update.entity_id,
                        "state update on foreign topic"
                    );
                    None
                }
                Err(err) => {
                    warn!(entity_id = %entity_id, error = %err, "failed to decode state payload");
                    None
                }
            }
        });
        Ok(Box::new(stream))
    }
}
