use anyhow::{Context, Result, anyhow, bail};
use dotenv::dotenv;
use hub_core::model::{DeviceId, EntityId};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};
use step_dimmer::DimmerConfig;
use url::Url;

/// Thresholds used by the simulated lamp when none are configured.
pub const DEMO_STEPS: &str = "10,25,50,100";

#[derive(Clone, Debug, PartialEq)]
pub enum BusKind {
    InMem,
    Mqtt,
}

impl FromStr for BusKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inmem" => Ok(BusKind::InMem),
            "mqtt" => Ok(BusKind::Mqtt),
            other => bail!("unknown bus kind `{other}`, expected inmem or mqtt"),
        }
    }
}

impl BusKind {
    fn as_str(&self) -> &'static str {
        match self {
            BusKind::InMem => "inmem",
            BusKind::Mqtt => "mqtt",
        }
    }
}

impl Display for BusKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bus: BusKind,
    pub mqtt: MqttConfig,
    pub dimmer: DimmerConfig,
    pub device_id: DeviceId,
    pub entity_id: EntityId,
    pub name: Option<String>,
    /// Serve a simulated lamp on the configured switch and sensor ids.
    pub simulate: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `DIMMER_*` variables supplied by `var`.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let simulate = match var("DIMMER_SIMULATE") {
            Some(s) => parse_flag(&s).context("DIMMER_SIMULATE")?,
            None => false,
        };

        let bus = match var("DIMMER_BUS") {
            Some(s) => s.parse()?,
            None => BusKind::InMem,
        };
        let mut mqtt = match var("DIMMER_MQTT_URL") {
            Some(conn) => MqttConfig::from_connection_string(&conn)?,
            None => MqttConfig::default(),
        };
        if let Some(s) = var("DIMMER_MQTT_HOST") {
            mqtt.host = s;
        }
        if let Some(s) = var("DIMMER_MQTT_PORT") {
            mqtt.port = s.parse().context("DIMMER_MQTT_PORT")?;
        }
        if let Some(s) = var("DIMMER_MQTT_CLIENT_ID") {
            mqtt.client_id = s;
        }

        let entity = |key: &str| -> Result<EntityId> {
            match var(key) {
                Some(s) => s.parse().with_context(|| format!("{key} is not a valid id")),
                None if simulate => Ok(EntityId::new()),
                None => Err(anyhow!("{key} is required")),
            }
        };
        let switch_entity = entity("DIMMER_SWITCH_ENTITY")?;
        let sensor_entity = entity("DIMMER_SENSOR_ENTITY")?;
        let steps = match var("DIMMER_BRIGHTNESS_STEPS") {
            Some(s) => s,
            None if simulate => DEMO_STEPS.to_string(),
            None => bail!("DIMMER_BRIGHTNESS_STEPS is required"),
        };

        let mut dimmer = DimmerConfig::new(switch_entity, sensor_entity, steps);
        if let Some(s) = var("DIMMER_TOGGLE_DELAY_SEC") {
            dimmer.toggle_delay_sec = s.parse().context("DIMMER_TOGGLE_DELAY_SEC")?;
        }
        if let Some(s) = var("DIMMER_SETTLING_DELAY_SEC") {
            dimmer.settling_delay_sec = s.parse().context("DIMMER_SETTLING_DELAY_SEC")?;
        }
        dimmer.validate()?;

        let device_id = match var("DIMMER_DEVICE_ID") {
            Some(s) => s.parse().context("DIMMER_DEVICE_ID")?,
            None => DeviceId::new(),
        };
        let entity_id = match var("DIMMER_ENTITY_ID") {
            Some(s) => s.parse().context("DIMMER_ENTITY_ID")?,
            None => EntityId::new(),
        };

        Ok(Self {
            bus,
            mqtt,
            dimmer,
            device_id,
            entity_id,
            name: var("DIMMER_NAME").filter(|s| !s.trim().is_empty()),
            simulate,
        })
    }
}

fn parse_flag(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => bail!("expected a boolean, got `{other}`"),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 1883, client_id: "dimmerd".to_string() }
    }
}

impl MqttConfig {
    fn from_connection_string(conn: &str) -> Result<Self> {
        let url = Url::parse(conn)?;
        if url.scheme() != "mqtt" {
            bail!("unsupported mqtt url scheme: {}", url.scheme());
        }

        let host = url.host_str().ok_or_else(|| anyhow!("mqtt url missing host"))?.to_string();
        let port = url.port().unwrap_or(1883);
        let client_id = url
            .query_pairs()
            .find(|(k, _)| k == "client_id")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| "dimmerd".to_string());

        Ok(Self { host, port, client_id })
    }
}
