use serde::{Deserialize, Serialize};

use crate::{bus_contract::CommandSet, model::EntityId};

bitflags::bitflags! {
    #[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SwitchFeatures: u32 {
        const ONOFF  = 0b0001;
        const TOGGLE = 0b0010;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchDescription {
    pub entity_id: EntityId,
    pub features: SwitchFeatures,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchState {
    pub on: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SwitchCommand {
    Set { on: bool },
    Toggle,
}

impl SwitchCommand {
    pub const TURN_OFF: Self = Self::Set { on: false };

    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { on: true } => "turn_on",
            Self::Set { on: false } => "turn_off",
            Self::Toggle => "toggle",
        }
    }
}

impl SwitchDescription {
    pub fn validate(&self, cmd: &SwitchCommand) -> Result<(), &'static str> {
        match cmd {
            SwitchCommand::Set { .. } => {
                if self.features.contains(SwitchFeatures::ONOFF) {
                    Ok(())
                } else {
                    Err("on/off unsupported")
                }
            }
            SwitchCommand::Toggle => {
                if self.features.contains(SwitchFeatures::TOGGLE) {
                    Ok(())
                } else {
                    Err("toggle unsupported")
                }
            }
        }
    }
}

impl From<SwitchCommand> for CommandSet {
    fn from(cmd: SwitchCommand) -> Self {
        match cmd {
            SwitchCommand::Set { on } => Self {
                action: "set".into(),
                value: serde_json::json!({ "on": on }),
                correlation_id: None,
            },
            SwitchCommand::Toggle => Self {
                action: "toggle".into(),
                value: serde_json::Value::Null,
                correlation_id: None,
            },
        }
    }
}

impl TryFrom<&CommandSet> for SwitchCommand {
    type Error = &'static str;

    fn try_from(cmd: &CommandSet) -> Result<Self, Self::Error> {
        match cmd.action.as_str() {
            "toggle" => Ok(Self::Toggle),
            "set" => {
                let on = cmd
                    .value
                    .get("on")
                    .and_then(|v| v.as_bool())
                    .or_else(|| cmd.value.as_bool())
                    .ok_or("switch set command without on/off value")?;
                Ok(Self::Set { on })
            }
            _ => Err("unsupported switch action"),
        }
    }
}
