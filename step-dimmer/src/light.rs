use std::{collections::BTreeMap, sync::Arc};

use adapter_sdk::{
    light::{LightComponent, LightDriver},
    meta::{DeviceMeta, EntityMeta},
    runtime::AdapterContext,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use hub_core::{
    cap::{
        light::{
            BRIGHTNESS_MAX, Brightness, LightCommand, LightDescription, LightFeatures, LightState,
        },
        sensor::PowerReading,
    },
    model::{DeviceId, EntityId},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::{
    actions::BusSwitchActions, config::DimmerConfig, controller::DimmerController,
    error::DimmerError,
};

pub const ADAPTER_NAME: &str = "step-dimmer";
pub const MANUFACTURER: &str = "Virtual Devices";
pub const MODEL: &str = "Step Dimmer";
pub const DEFAULT_NAME: &str = "Virtual Step-Dimmer";

/// Device record for a virtual dimmer; `name` falls back to [`DEFAULT_NAME`].
pub fn device_meta(id: DeviceId, name: Option<String>) -> DeviceMeta {
    DeviceMeta {
        id,
        name: name.unwrap_or_else(|| DEFAULT_NAME.into()),
        adapter: ADAPTER_NAME.into(),
        manufacturer: Some(MANUFACTURER.into()),
        model: Some(MODEL.into()),
        sw_version: Some(env!("CARGO_PKG_VERSION").into()),
        metadata: BTreeMap::new(),
    }
}

pub fn entity_meta(id: EntityId, name: Option<String>) -> EntityMeta {
    EntityMeta {
        id,
        name: name.unwrap_or_else(|| DEFAULT_NAME.into()),
        icon: Some("mdi:lightbulb".into()),
        attributes: BTreeMap::new(),
    }
}

/// A dimmable light entity backed by a switch and a power sensor.
///
/// Brightness is never set optimistically: every published state is derived
/// from the latest sensor reading.
pub struct StepDimmerLight {
    entity_id: EntityId,
    controller: DimmerController,
    tasks: Vec<JoinHandle<()>>,
}

impl StepDimmerLight {
    /// Announces the light and starts following its sensor and commands.
    pub async fn spawn(
        ctx: AdapterContext,
        config: &DimmerConfig,
        device: DeviceMeta,
        mut entity: EntityMeta,
    ) -> Result<Self> {
        let mapper = config.step_mapper()?;
        let settings = config.controller_settings()?;
        let entity_id = entity.id;
        entity.attributes.insert("switch_entity".into(), config.switch_entity.to_string().into());
        entity.attributes.insert("sensor_entity".into(), config.sensor_entity.to_string().into());

        let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
        let observer = move |power: PowerReading, brightness: u8| {
            let _ = updates_tx.send((power, brightness));
        };
        let description = LightDescription {
            entity_id,
            features: LightFeatures::ONOFF | LightFeatures::DIMMABLE,
            steps: Some(mapper.num_steps()),
        };
        let controller = DimmerController::new(
            mapper,
            settings,
            Arc::new(BusSwitchActions::new(ctx.clone())),
            Arc::new(observer),
        );

        // Follow the sensor before announcing so no reading published in
        // between is lost.
        let mut readings = ctx
            .subscribe_states(config.sensor_entity)
            .await
            .context("subscribe to power sensor")?;

        let driver = DimmerDriver { controller: controller.clone(), description };
        let component = LightComponent::new(ctx, device, entity, Arc::new(driver));
        let mut tasks = vec![component.clone().spawn().await?];

        tasks.push(tokio::spawn(async move {
            while let Some((power, brightness)) = updates_rx.recv().await {
                let state = LightState::from_brightness(Brightness(brightness), power.watts());
                if let Err(err) = component.publish_state(state).await {
                    warn!(entity_id = %entity_id, "failed to publish dimmer state: {err:#}");
                }
            }
        }));

        let sensor = config.sensor_entity;
        let feed = controller.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(update) = readings.next().await {
                match PowerReading::from_state_value(&update.value) {
                    Ok(power) => feed.handle_sensor_update(power),
                    Err(reason) => {
                        let err = DimmerError::UnreadableSensorValue {
                            sensor,
                            value: update.value.to_string(),
                            reason,
                        };
                        warn!("ignoring sensor update: {err}");
                    }
                }
            }
            debug!(sensor = %sensor, "sensor feed closed");
        }));

        info!(
            entity_id = %entity_id,
            switch = %config.switch_entity,
            sensor = %sensor,
            "step dimmer online"
        );
        Ok(Self { entity_id, controller, tasks })
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn controller(&self) -> &DimmerController {
        &self.controller
    }

    /// Cancels any step execution and stops the background tasks.
    pub fn shutdown(self) {
        self.controller.cancel();
        for task in &self.tasks {
            task.abort();
        }
        info!(entity_id = %self.entity_id, "step dimmer removed");
    }
}

struct DimmerDriver {
    controller: DimmerController,
    description: LightDescription,
}

impl DimmerDriver {
    fn target_for(&self, cmd: &LightCommand) -> u8 {
        match cmd {
            LightCommand::SetPower { on: true } => BRIGHTNESS_MAX,
            LightCommand::SetPower { on: false } => 0,
            LightCommand::SetBrightness { level } => level.0,
            LightCommand::Toggle if self.controller.current_brightness() > 0 => 0,
            LightCommand::Toggle => BRIGHTNESS_MAX,
        }
    }
}

#[async_trait]
impl LightDriver for DimmerDriver {
    fn describe(&self) -> LightDescription {
        self.description.clone()
    }

    async fn apply_command(&self, cmd: LightCommand) -> Result<LightState> {
        let target = self.target_for(&cmd);
        info!(entity_id = %self.description.entity_id, target, "brightness requested");
        self.controller.set_target_brightness(target);
        self.refresh().await
    }

    async fn refresh(&self) -> Result<LightState> {
        let power = self.controller.current_power();
        let brightness = self.controller.mapper().power_to_brightness(power);
        Ok(LightState::from_brightness(Brightness(brightness), power.watts()))
    }
}
