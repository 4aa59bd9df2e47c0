use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bus_contract::CommandSet;
use crate::model::EntityId;

bitflags::bitflags! {
    #[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LightFeatures: u32 {
        const ONOFF    = 0b0001;
        const DIMMABLE = 0b0010;
    }
}

pub const BRIGHTNESS_MAX: u8 = 255;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Brightness(pub u8); // 0..=255

impl Brightness {
    pub const OFF: Self = Self(0);
    pub const FULL: Self = Self(BRIGHTNESS_MAX);
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LightDescription {
    pub entity_id: EntityId,
    pub features: LightFeatures,
    /// Number of discrete levels for lights that can only step through brightness.
    pub steps: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Power {
    Off,
    On,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LightState {
    pub power: Power,
    pub brightness: Option<Brightness>,
    pub power_w: Option<f64>,
}

impl LightState {
    pub fn off() -> Self {
        Self { power: Power::Off, brightness: Some(Brightness::OFF), power_w: None }
    }

    /// A light is on exactly when it reports a non-zero brightness.
    pub fn from_brightness(brightness: Brightness, power_w: Option<f64>) -> Self {
        let power = if brightness.0 > 0 { Power::On } else { Power::Off };
        Self { power, brightness: Some(brightness), power_w }
    }

    pub fn is_on(&self) -> bool {
        matches!(self.power, Power::On)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LightCommand {
    SetPower { on: bool },
    Toggle,
    SetBrightness { level: Brightness },
}

impl LightDescription {
    pub fn validate(&self, cmd: &LightCommand) -> Result<(), &'static str> {
        match cmd {
            LightCommand::SetPower { .. } | LightCommand::Toggle => {
                if self.features.contains(LightFeatures::ONOFF) {
                    Ok(())
                } else {
                    Err("on/off unsupported")
                }
            }
            LightCommand::SetBrightness { .. } => {
                if self.features.contains(LightFeatures::DIMMABLE) {
                    Ok(())
                } else {
                    Err("dimming unsupported")
                }
            }
        }
    }

    /// Attributes advertised with the entity announce.
    pub fn attributes(&self) -> BTreeMap<String, serde_json::Value> {
        let mut attrs = BTreeMap::new();
        attrs.insert("features".into(), self.features.bits().into());
        if let Some(steps) = self.steps {
            attrs.insert("steps".into(), steps.into());
        }
        attrs
    }
}

impl From<LightCommand> for CommandSet {
    fn from(cmd: LightCommand) -> Self {
        match cmd {
            LightCommand::SetPower { on } => Self {
                action: "set".into(),
                value: serde_json::json!({ "on": on }),
                correlation_id: None,
            },
            LightCommand::Toggle => Self {
                action: "toggle".into(),
                value: serde_json::Value::Null,
                correlation_id: None,
            },
            LightCommand::SetBrightness { level } => Self {
                action: "set".into(),
                value: serde_json::json!({ "brightness": level.0 }),
                correlation_id: None,
            },
        }
    }
}
