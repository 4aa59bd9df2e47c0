use std::time::Duration;

use hub_core::model::EntityId;
use serde::{Deserialize, Serialize};

use crate::{
    controller::ControllerSettings,
    error::{DimmerError, Result},
    logic::StepMapper,
};

pub const DEFAULT_TOGGLE_DELAY_SEC: f64 = 0.5;
pub const DEFAULT_SETTLING_DELAY_SEC: f64 = 2.0;

/// Settings of one virtual dimmer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimmerConfig {
    pub switch_entity: EntityId,
    pub sensor_entity: EntityId,
    /// Comma-separated watt thresholds, one per lit step, e.g. `"10,25,50,100"`.
    pub brightness_steps: String,
    #[serde(default = "default_toggle_delay")]
    pub toggle_delay_sec: f64,
    #[serde(default = "default_settling_delay")]
    pub settling_delay_sec: f64,
}

fn default_toggle_delay() -> f64 {
    DEFAULT_TOGGLE_DELAY_SEC
}

fn default_settling_delay() -> f64 {
    DEFAULT_SETTLING_DELAY_SEC
}

impl DimmerConfig {
    pub fn new(
        switch_entity: EntityId,
        sensor_entity: EntityId,
        brightness_steps: impl Into<String>,
    ) -> Self {
        Self {
            switch_entity,
            sensor_entity,
            brightness_steps: brightness_steps.into(),
            toggle_delay_sec: DEFAULT_TOGGLE_DELAY_SEC,
            settling_delay_sec: DEFAULT_SETTLING_DELAY_SEC,
        }
    }

    pub fn with_delays(mut self, toggle_delay_sec: f64, settling_delay_sec: f64) -> Self {
        self.toggle_delay_sec = toggle_delay_sec;
        self.settling_delay_sec = settling_delay_sec;
        self
    }

    /// Checks everything a controller needs, without building one.
    pub fn validate(&self) -> Result<()> {
        self.step_mapper()?;
        self.controller_settings()?;
        Ok(())
    }

    pub fn step_mapper(&self) -> Result<StepMapper> {
        StepMapper::new(parse_brightness_steps(&self.brightness_steps)?)
    }

    pub fn controller_settings(&self) -> Result<ControllerSettings> {
        Ok(ControllerSettings {
            switch: self.switch_entity,
            toggle_delay: delay("toggle_delay_sec", self.toggle_delay_sec)?,
            settling_delay: delay("settling_delay_sec", self.settling_delay_sec)?,
        })
    }
}

/// Parses `"10, 25,50"` into `[10.0, 25.0, 50.0]`. Every item must be a
/// positive integer.
pub fn parse_brightness_steps(raw: &str) -> Result<Vec<f64>> {
    if raw.trim().is_empty() {
        return Err(DimmerError::config("brightness steps cannot be empty"));
    }
    raw.split(',')
        .map(|item| {
            let item = item.trim();
            let watts: i64 = item.parse().map_err(|_| {
                DimmerError::config(format!("brightness step `{item}` is not an integer"))
            })?;
            if watts <= 0 {
                return Err(DimmerError::config(format!(
                    "brightness step {watts} must be greater than zero"
                )));
            }
            Ok(watts as f64)
        })
        .collect()
}

fn delay(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        DimmerError::config(format!("{field} must be a non-negative number, got {secs}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_whitespace() {
        assert_eq!(parse_brightness_steps(" 10, 25 ,50").unwrap(), vec![10.0, 25.0, 50.0]);
    }

    #[test]
    fn rejects_bad_items() {
        for raw in ["", "  ", "10,,20", "10,abc", "10,2.5", "0", "10,-5"] {
            assert!(
                matches!(parse_brightness_steps(raw), Err(DimmerError::InvalidConfiguration(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
