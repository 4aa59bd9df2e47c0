use std::{collections::BTreeMap, sync::Arc};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use hub_core::{
    bus_contract::{CommandSet, StateUpdate},
    cap::light::{BRIGHTNESS_MAX, Brightness, LightCommand, LightDescription, LightState},
    model::{EntityDomain, EntityId},
};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::{
    meta::{DeviceMeta, EntityMeta},
    runtime::AdapterContext,
};

#[async_trait]
pub trait LightDriver: Send + Sync + 'static {
    fn describe(&self) -> LightDescription;
    async fn apply_command(&self, cmd: LightCommand) -> Result<LightState>;
    async fn refresh(&self) -> Result<LightState> {
        Err(anyhow!("refresh not implemented"))
    }
}

#[derive(Clone)]
pub struct LightComponent {
    ctx: AdapterContext,
    device: DeviceMeta,
    entity: EntityMeta,
    driver: Arc<dyn LightDriver>,
}

impl LightComponent {
    pub fn new(
        ctx: AdapterContext,
        device: DeviceMeta,
        entity: EntityMeta,
        driver: Arc<dyn LightDriver>,
    ) -> Self {
        Self { ctx, device, entity, driver }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity.id
    }

    /// Announces the device and entity, then handles commands until the
    /// returned task is aborted.
    pub async fn spawn(self) -> Result<JoinHandle<()>> {
        self.ctx.announce_device(self.device.announce()).await?;
        let description = self.driver.describe();
        self.ctx
            .announce_entity(self.entity.announce(
                self.device.id,
                EntityDomain::Light,
                description.attributes(),
            ))
            .await?;

        let mut commands = self.ctx.subscribe_commands(self.entity.id).await?;
        let this = self.clone();

        Ok(tokio::spawn(async move {
            while let Some(cmd) = commands.next().await {
                if let Err(e) = this.handle_command(&cmd).await {
                    tracing::warn!(
                        entity_id = %this.entity.id,
                        "light component command error: {e:#}"
                    );
                }
            }
        }))
    }

    pub async fn publish_state(&self, st: LightState) -> Result<()> {
        self.ctx.publish_state(LightStateMapper::to_state_update(self.entity.id, st)).await
    }

    async fn handle_command(&self, raw: &CommandSet) -> Result<()> {
        let cmd = LightCommandMapper::from_command(raw)?;
        let desc = self.driver.describe();
        desc.validate(&cmd).map_err(|e| anyhow!(e))?;
        let state = self.driver.apply_command(cmd).await?;
        self.publish_state(state).await
    }
}

struct LightCommandMapper;

impl LightCommandMapper {
    fn from_command(cmd: &CommandSet) -> Result<LightCommand> {
        let val = &cmd.value;
        match cmd.action.as_str() {
            "toggle" => Ok(LightCommand::Toggle),
            "set" => {
                if let Some(obj) = val.as_object() {
                    if let Some(n) = obj.get("brightness").and_then(|x| x.as_u64()) {
                        let level = u8::try_from(n).unwrap_or(BRIGHTNESS_MAX);
                        return Ok(LightCommand::SetBrightness { level: Brightness(level) });
                    }
                    if let Some(b) = obj.get("on").and_then(|x| x.as_bool()) {
                        return Ok(LightCommand::SetPower { on: b });
                    }
                }
                if let Some(b) = val.as_bool() {
                    return Ok(LightCommand::SetPower { on: b });
                }
                Err(anyhow!("unsupported light command payload"))
            }
            other => Err(anyhow!("unsupported light action `{other}`")),
        }
    }
}

struct LightStateMapper;

impl LightStateMapper {
    fn to_state_update(entity_id: EntityId, st: LightState) -> StateUpdate {
        let mut attrs = BTreeMap::new();
        if let Some(br) = st.brightness {
            attrs.insert("brightness".into(), (br.0 as u64).into());
        }
        if let Some(w) = st.power_w {
            attrs.insert("power_w".into(), serde_json::Value::from(w));
        }
        StateUpdate {
            entity_id,
            value: serde_json::Value::Bool(st.is_on()),
            attributes: attrs,
            ts: Utc::now(),
            source: Some("adapter-sdk:light".into()),
        }
    }
}
