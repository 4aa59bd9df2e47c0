use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use hub_core::{
    bus_contract::StateUpdate,
    cap::sensor::{PowerReading, PowerSensorDescription},
    model::{EntityDomain, EntityId},
};
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};

use crate::{
    meta::{DeviceMeta, EntityMeta},
    runtime::AdapterContext,
};

#[async_trait]
pub trait PowerSensorDriver: Send + Sync + 'static {
    fn describe(&self) -> PowerSensorDescription;
    async fn current_reading(&self) -> Result<PowerReading>;
    fn readings(&self) -> Result<Box<dyn Stream<Item = Result<PowerReading>> + Send + Unpin>>;
}

#[derive(Clone)]
pub struct PowerSensorComponent {
    ctx: AdapterContext,
    device: DeviceMeta,
    entity: EntityMeta,
    driver: Arc<dyn PowerSensorDriver>,
}

impl PowerSensorComponent {
    pub fn new(
        ctx: AdapterContext,
        device: DeviceMeta,
        entity: EntityMeta,
        driver: Arc<dyn PowerSensorDriver>,
    ) -> Self {
        Self { ctx, device, entity, driver }
    }

    /// Announces the sensor, publishes its current reading and then every
    /// reading the driver yields.
    pub async fn spawn(self) -> Result<JoinHandle<()>> {
        self.ctx.announce_device(self.device.announce()).await?;
        let mut unit = BTreeMap::new();
        unit.insert("unit".into(), self.driver.describe().unit.into());
        self.ctx
            .announce_entity(self.entity.announce(self.device.id, EntityDomain::Sensor, unit))
            .await?;

        let mut readings = self.driver.readings()?;
        let initial = self.driver.current_reading().await?;
        self.publish_reading(initial).await?;

        let this = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(next) = readings.next().await {
                match next {
                    Ok(reading) => {
                        if let Err(err) = this.publish_reading(reading).await {
                            tracing::warn!("power sensor publish error: {err:#}");
                        }
                    }
                    Err(err) => {
                        tracing::warn!("power sensor driver update error: {err:#}");
                    }
                }
            }
        }))
    }

    pub async fn publish_reading(&self, reading: PowerReading) -> Result<()> {
        let description = self.driver.describe();
        let update = PowerSensorStateMapper::to_state_update(self.entity.id, &description, reading);
        self.ctx.publish_state(update).await
    }
}

struct PowerSensorStateMapper;

impl PowerSensorStateMapper {
    fn to_state_update(
        entity_id: EntityId,
        description: &PowerSensorDescription,
        reading: PowerReading,
    ) -> StateUpdate {
        let mut attrs = BTreeMap::new();
        attrs.insert("unit".into(), serde_json::Value::String(description.unit.clone()));
        StateUpdate {
            entity_id,
            value: reading.to_state_value(),
            attributes: attrs,
            ts: Utc::now(),
            source: Some("adapter-sdk:power-sensor".into()),
        }
    }
}
