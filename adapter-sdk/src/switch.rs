use std::{collections::BTreeMap, sync::Arc};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use hub_core::{
    bus_contract::{CommandSet, StateUpdate},
    cap::switch::{SwitchCommand, SwitchDescription, SwitchState},
    model::{EntityDomain, EntityId},
};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::{
    meta::{DeviceMeta, EntityMeta},
    runtime::AdapterContext,
};

#[async_trait]
pub trait SwitchDriver: Send + Sync + 'static {
    fn describe(&self) -> SwitchDescription;
    async fn apply_command(&self, cmd: SwitchCommand) -> Result<SwitchState>;
}

#[derive(Clone)]
pub struct SwitchComponent {
    ctx: AdapterContext,
    device: DeviceMeta,
    entity: EntityMeta,
    driver: Arc<dyn SwitchDriver>,
}

impl SwitchComponent {
    pub fn new(
        ctx: AdapterContext,
        device: DeviceMeta,
        entity: EntityMeta,
        driver: Arc<dyn SwitchDriver>,
    ) -> Self {
        Self { ctx, device, entity, driver }
    }

    pub async fn spawn(self) -> Result<JoinHandle<()>> {
        self.ctx.announce_device(self.device.announce()).await?;
        let mut features = BTreeMap::new();
        features.insert("features".into(), self.driver.describe().features.bits().into());
        self.ctx
            .announce_entity(self.entity.announce(self.device.id, EntityDomain::Switch, features))
            .await?;

        let mut commands = self.ctx.subscribe_commands(self.entity.id).await?;
        let this = self.clone();

        Ok(tokio::spawn(async move {
            while let Some(cmd) = commands.next().await {
                if let Err(err) = this.handle_command(&cmd).await {
                    tracing::warn!(
                        entity_id = %this.entity.id,
                        "switch component command error: {err:#}"
                    );
                }
            }
        }))
    }

    pub async fn publish_state(&self, state: SwitchState) -> Result<()> {
        self.ctx.publish_state(SwitchStateMapper::to_state_update(self.entity.id, state)).await
    }

    async fn handle_command(&self, raw: &CommandSet) -> Result<()> {
        let command = SwitchCommand::try_from(raw).map_err(|e| anyhow!(e))?;
        let description = self.driver.describe();
        description.validate(&command).map_err(|e| anyhow!(e))?;
        let state = self.driver.apply_command(command).await?;
        self.publish_state(state).await
    }
}

struct SwitchStateMapper;

impl SwitchStateMapper {
    fn to_state_update(entity_id: EntityId, state: SwitchState) -> StateUpdate {
        StateUpdate {
            entity_id,
            value: serde_json::Value::Bool(state.on),
            attributes: BTreeMap::new(),
            ts: Utc::now(),
            source: Some("adapter-sdk:switch".into()),
        }
    }
}
