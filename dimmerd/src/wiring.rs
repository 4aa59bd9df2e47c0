use std::sync::Arc;

use adapter_mqtt::{MqttBus, MqttBusOptions};
use adapter_sdk::runtime::AdapterContext;
use anyhow::Result;
use hub_core::bus::{Bus, InMemoryBus};
use step_dimmer::{
    light::{StepDimmerLight, device_meta, entity_meta},
    sim::{SimulatedStepLamp, memory_for},
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{BusKind, Config};

/// Handles to what the daemon started. Background tasks keep running until
/// [`Running::shutdown`].
pub struct Running {
    bus: Arc<dyn Bus>,
    light: StepDimmerLight,
    simulation: Vec<JoinHandle<()>>,
}

impl Running {
    pub fn bus(&self) -> Arc<dyn Bus> {
        Arc::clone(&self.bus)
    }

    pub fn light(&self) -> &StepDimmerLight {
        &self.light
    }

    pub fn shutdown(self) {
        self.light.shutdown();
        for task in self.simulation {
            task.abort();
        }
    }
}

pub async fn build_bus(cfg: &Config) -> Result<Arc<dyn Bus>> {
    let bus: Arc<dyn Bus> = match cfg.bus {
        BusKind::InMem => Arc::new(InMemoryBus::default()),
        BusKind::Mqtt => Arc::new(
            MqttBus::connect(MqttBusOptions::new(
                cfg.mqtt.host.clone(),
                cfg.mqtt.port,
                cfg.mqtt.client_id.clone(),
            ))
            .await?,
        ),
    };
    Ok(bus)
}

/// Starts the dimmer entity and, when asked for, the simulated lamp it drives.
/// The dimmer comes first so it sees the lamp's initial reading.
pub async fn start(cfg: &Config) -> Result<Running> {
    let bus = build_bus(cfg).await?;
    let ctx = AdapterContext::new(Arc::clone(&bus));

    let memory = if cfg.simulate {
        Some(memory_for(&cfg.dimmer.controller_settings()?)?)
    } else {
        None
    };

    let light = StepDimmerLight::spawn(
        ctx.clone(),
        &cfg.dimmer,
        device_meta(cfg.device_id, cfg.name.clone()),
        entity_meta(cfg.entity_id, cfg.name.clone()),
    )
    .await?;

    let simulation = if let Some(memory) = memory {
        let lamp = SimulatedStepLamp::new(
            cfg.dimmer.switch_entity,
            cfg.dimmer.sensor_entity,
            &cfg.dimmer.step_mapper()?,
        )
        .with_memory(memory);
        info!(
            switch = %cfg.dimmer.switch_entity,
            sensor = %cfg.dimmer.sensor_entity,
            ?memory,
            "serving simulated step lamp"
        );
        let lamp = Arc::new(lamp);
        lamp.spawn(&ctx).await?
    } else {
        Vec::new()
    };

    Ok(Running { bus, light, simulation })
}
