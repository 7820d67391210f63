use crate::frame::MAX_ADDRESS;
use crate::link::LinkSimulator;
use crate::phy::bpsk::DecisionRule;
use crate::phy::channel::ChannelModel;
use crate::scheduler::TdmaScheduler;
use crate::sensors::{SensorKind, SimulatedSensor};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const DEFAULT_SLOT_DURATION_MS: u64 = 300_000;
const DEFAULT_GATEWAY_ADDRESS: u16 = 12;
const DEFAULT_NOISE_STRENGTH: f64 = 0.05;

/// Setup-time failures. All of them abort before any frame is scheduled.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown sensor kind '{0}'")]
    UnknownSensorKind(String),
    #[error("no sensor sources registered")]
    NoSourcesRegistered,
    #[error("scheduler already running, sources are frozen")]
    AlreadyRunning,
    #[error("too many sensor sources (max {max})")]
    TooManySources { max: usize },
    #[error("slot duration must be greater than zero")]
    InvalidSlotDuration,
    #[error("address {0} exceeds 10-bit range")]
    AddressOutOfRange(u16),
    #[error("noise strength {0} must be finite and non-negative")]
    InvalidNoiseStrength(f64),
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub address: u16,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Length of one full TDMA cycle.
    pub slot_duration_ms: u64,
    pub gateway_address: u16,
    pub noise_strength: f64,
    /// Seed shared by simulated sensors and the channel. `None` draws from entropy.
    pub seed: Option<u64>,
    pub decision_rule: DecisionRule,
    pub sensors: Vec<SensorConfig>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            slot_duration_ms: DEFAULT_SLOT_DURATION_MS,
            gateway_address: DEFAULT_GATEWAY_ADDRESS,
            noise_strength: DEFAULT_NOISE_STRENGTH,
            seed: None,
            decision_rule: DecisionRule::default(),
            sensors: vec![
                SensorConfig {
                    address: 1,
                    kind: "people_count".to_string(),
                },
                SensorConfig {
                    address: 2,
                    kind: "temperature".to_string(),
                },
                SensorConfig {
                    address: 3,
                    kind: "co2".to_string(),
                },
            ],
        }
    }
}

impl LinkConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let config: LinkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        info!(path = %path.as_ref().display(), sensors = config.sensors.len(), "loaded link configuration");
        Ok(config)
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::from_millis(self.slot_duration_ms)
    }

    /// Resolve every configured sensor kind, in registration order.
    pub fn sensor_kinds(&self) -> Result<Vec<(u16, SensorKind)>, ConfigurationError> {
        self.sensors
            .iter()
            .map(|sensor| sensor.kind.parse::<SensorKind>().map(|kind| (sensor.address, kind)))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.slot_duration_ms == 0 {
            return Err(ConfigurationError::InvalidSlotDuration);
        }
        if self.gateway_address > MAX_ADDRESS {
            return Err(ConfigurationError::AddressOutOfRange(self.gateway_address));
        }
        if !self.noise_strength.is_finite() || self.noise_strength < 0.0 {
            return Err(ConfigurationError::InvalidNoiseStrength(self.noise_strength));
        }
        if self.sensors.is_empty() {
            return Err(ConfigurationError::NoSourcesRegistered);
        }
        for (address, _) in self.sensor_kinds()? {
            if address > MAX_ADDRESS {
                return Err(ConfigurationError::AddressOutOfRange(address));
            }
        }
        Ok(())
    }

    /// Scheduler with one simulated sensor per configured entry.
    pub fn build_scheduler(&self) -> Result<TdmaScheduler, ConfigurationError> {
        self.validate()?;
        let mut scheduler = TdmaScheduler::new(self.slot_duration(), self.gateway_address)?;

        for (position, (address, kind)) in self.sensor_kinds()?.into_iter().enumerate() {
            let sensor = match self.seed {
                Some(seed) => SimulatedSensor::new(kind, seed.wrapping_add(position as u64 + 1)),
                None => SimulatedSensor::from_entropy(kind),
            };
            scheduler.add_source(address, sensor)?;
        }
        Ok(scheduler)
    }

    pub fn build_link(&self) -> Result<LinkSimulator, ConfigurationError> {
        if !self.noise_strength.is_finite() || self.noise_strength < 0.0 {
            return Err(ConfigurationError::InvalidNoiseStrength(self.noise_strength));
        }
        let channel = match self.seed {
            Some(seed) => ChannelModel::new(seed),
            None => ChannelModel::from_entropy(),
        };
        Ok(LinkSimulator::new(channel, self.noise_strength).with_decision_rule(self.decision_rule))
    }
}
