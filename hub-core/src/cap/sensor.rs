use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::EntityId;

/// States a host reports for a sensor that currently has no reading.
const NO_READING: [&str; 4] = ["", "unknown", "unavailable", "none"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PowerSensorDescription {
    pub entity_id: EntityId,
    pub unit: String,
}

impl PowerSensorDescription {
    pub fn watts(entity_id: EntityId) -> Self {
        Self { entity_id, unit: "W".into() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", content = "watts", rename_all = "snake_case")]
pub enum PowerReading {
    #[default]
    Unknown,
    Watts(f64),
}

impl PowerReading {
    pub fn watts(&self) -> Option<f64> {
        match self {
            Self::Unknown => None,
            Self::Watts(w) => Some(*w),
        }
    }

    /// Decodes the `value` of a sensor state update. Numbers may arrive either
    /// as JSON numbers or as strings; the host's "no reading" markers decode to
    /// `Unknown`.
    pub fn from_state_value(value: &Value) -> Result<Self, &'static str> {
        match value {
            Value::Null => Ok(Self::Unknown),
            Value::Number(n) => n.as_f64().ok_or("power reading out of range").and_then(finite),
            Value::String(s) => {
                let s = s.trim();
                if NO_READING.iter().any(|marker| s.eq_ignore_ascii_case(marker)) {
                    return Ok(Self::Unknown);
                }
                s.parse::<f64>().map_err(|_| "power reading is not a number").and_then(finite)
            }
            _ => Err("unexpected power reading type"),
        }
    }

    /// The state value published for this reading.
    pub fn to_state_value(&self) -> Value {
        match self {
            Self::Unknown => Value::String("unknown".into()),
            Self::Watts(w) => Value::from(*w),
        }
    }
}

fn finite(w: f64) -> Result<PowerReading, &'static str> {
    if w.is_finite() { Ok(PowerReading::Watts(w)) } else { Err("power reading is not finite") }
}
