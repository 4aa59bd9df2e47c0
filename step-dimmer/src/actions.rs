use adapter_sdk::runtime::AdapterContext;
use anyhow::Result;
use async_trait::async_trait;
use hub_core::{cap::switch::SwitchCommand, model::EntityId};
use tracing::debug;

use crate::controller::SwitchActions;

/// Drives the physical switch by publishing commands on the hub bus.
#[derive(Clone)]
pub struct BusSwitchActions {
    ctx: AdapterContext,
}

impl BusSwitchActions {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    async fn send(&self, switch: EntityId, cmd: SwitchCommand) -> Result<()> {
        debug!(switch = %switch, action = cmd.name(), "sending switch command");
        self.ctx.send_command(switch, cmd.into()).await
    }
}

#[async_trait]
impl SwitchActions for BusSwitchActions {
    async fn toggle(&self, switch: EntityId) -> Result<()> {
        self.send(switch, SwitchCommand::Toggle).await
    }

    async fn turn_off(&self, switch: EntityId) -> Result<()> {
        self.send(switch, SwitchCommand::TURN_OFF).await
    }
}
