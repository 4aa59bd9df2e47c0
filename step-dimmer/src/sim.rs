//! An in-process stand-in for a step lamp on a smart plug: the plug exposes a
//! switch and a power sensor, and the lamp cycles through its steps on every
//! off-to-on transition.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use adapter_sdk::{
    meta::{DeviceMeta, EntityMeta},
    runtime::AdapterContext,
    sensor::{PowerSensorComponent, PowerSensorDriver},
    switch::{SwitchComponent, SwitchDriver},
};
use anyhow::Result;
use async_trait::async_trait;
use hub_core::{
    cap::{
        sensor::{PowerReading, PowerSensorDescription},
        switch::{SwitchCommand, SwitchDescription, SwitchFeatures, SwitchState},
    },
    model::{DeviceId, EntityId},
};
use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tokio_stream::{Stream, StreamExt, wrappers::WatchStream};
use tracing::debug;

use crate::{
    controller::ControllerSettings,
    error::{DimmerError, Result as DimmerResult},
    logic::{Step, StepMapper},
};

/// How long the lamp remembers its last step while switched off.
pub const DEFAULT_MEMORY: Duration = Duration::from_secs(1);

/// A memory window a controller with `settings` can drive: longer than the
/// off half of a toggle pair, shorter than the settling pause after a
/// sequence. Uses the midpoint of the two delays.
pub fn memory_for(settings: &ControllerSettings) -> DimmerResult<Duration> {
    if settings.toggle_delay >= settings.settling_delay {
        return Err(DimmerError::config(format!(
            "simulated lamp needs toggle delay ({:?}) below settling delay ({:?})",
            settings.toggle_delay, settings.settling_delay
        )));
    }
    Ok((settings.toggle_delay + settings.settling_delay) / 2)
}

pub struct SimulatedStepLamp {
    switch: EntityId,
    sensor: EntityId,
    thresholds: Vec<f64>,
    memory: Duration,
    lamp: Mutex<Lamp>,
    power: watch::Sender<PowerReading>,
}

#[derive(Debug, Default)]
struct Lamp {
    lit: Step,
    last: Step,
    off_since: Option<Instant>,
}

impl SimulatedStepLamp {
    /// A lamp with the steps of `mapper`, switched off.
    pub fn new(switch: EntityId, sensor: EntityId, mapper: &StepMapper) -> Self {
        let (power, _) = watch::channel(PowerReading::Watts(0.0));
        Self {
            switch,
            sensor,
            thresholds: mapper.thresholds().to_vec(),
            memory: DEFAULT_MEMORY,
            lamp: Mutex::new(Lamp::default()),
            power,
        }
    }

    pub fn with_memory(mut self, memory: Duration) -> Self {
        self.memory = memory;
        self
    }

    /// The lit step, `0` when off.
    pub fn lit_step(&self) -> Step {
        self.lamp().lit
    }

    /// Announces a plug device with the switch and sensor entities and
    /// serves them until the returned tasks are aborted.
    pub async fn spawn(self: Arc<Self>, ctx: &AdapterContext) -> Result<Vec<JoinHandle<()>>> {
        let device = DeviceMeta {
            id: DeviceId::new(),
            name: "Simulated Step Lamp".into(),
            adapter: "step-dimmer-sim".into(),
            manufacturer: Some(crate::light::MANUFACTURER.into()),
            model: Some("Step Lamp".into()),
            sw_version: None,
            metadata: BTreeMap::new(),
        };
        let entity = |id, name: &str| EntityMeta {
            id,
            name: name.into(),
            icon: None,
            attributes: BTreeMap::new(),
        };

        let switch = SwitchComponent::new(
            ctx.clone(),
            device.clone(),
            entity(self.switch, "Lamp Plug"),
            Arc::clone(&self) as Arc<dyn SwitchDriver>,
        );
        let sensor = PowerSensorComponent::new(
            ctx.clone(),
            device,
            entity(self.sensor, "Lamp Plug Power"),
            self as Arc<dyn PowerSensorDriver>,
        );
        Ok(vec![switch.spawn().await?, sensor.spawn().await?])
    }

    fn lamp(&self) -> MutexGuard<'_, Lamp> {
        self.lamp.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flip(&self, lamp: &mut Lamp) {
        if lamp.lit > 0 {
            lamp.last = lamp.lit;
            lamp.lit = 0;
            lamp.off_since = Some(Instant::now());
        } else {
            let remembered = lamp
                .off_since
                .is_some_and(|since| since.elapsed() < self.memory && lamp.last > 0);
            lamp.lit = if remembered {
                lamp.last % self.thresholds.len() as Step + 1
            } else {
                1
            };
        }
        let watts = match lamp.lit {
            0 => 0.0,
            step => self.thresholds[step as usize - 1],
        };
        debug!(step = lamp.lit, watts, "simulated lamp changed");
        self.power.send_replace(PowerReading::Watts(watts));
    }
}

#[async_trait]
impl SwitchDriver for SimulatedStepLamp {
    fn describe(&self) -> SwitchDescription {
        SwitchDescription {
            entity_id: self.switch,
            features: SwitchFeatures::ONOFF | SwitchFeatures::TOGGLE,
        }
    }

    async fn apply_command(&self, cmd: SwitchCommand) -> Result<SwitchState> {
        let mut lamp = self.lamp();
        let on = lamp.lit > 0;
        match cmd {
            SwitchCommand::Toggle => self.flip(&mut lamp),
            SwitchCommand::Set { on: wanted } if wanted != on => self.flip(&mut lamp),
            SwitchCommand::Set { .. } => {}
        }
        Ok(SwitchState { on: lamp.lit > 0 })
    }
}

#[async_trait]
impl PowerSensorDriver for SimulatedStepLamp {
    fn describe(&self) -> PowerSensorDescription {
        PowerSensorDescription::watts(self.sensor)
    }

    async fn current_reading(&self) -> Result<PowerReading> {
        Ok(*self.power.borrow())
    }

    fn readings(&self) -> Result<Box<dyn Stream<Item = Result<PowerReading>> + Send + Unpin>> {
        let stream = WatchStream::from_changes(self.power.subscribe()).map(Ok::<_, anyhow::Error>);
        Ok(Box::new(stream))
    }
}
