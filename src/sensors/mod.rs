pub mod scripted;
pub mod simulated;

pub use scripted::ScriptedSensor;
pub use simulated::SimulatedSensor;

use crate::config::ConfigurationError;
use crate::sensor_frame::{self, SensorFrameError, SensorReading};
use core::ops::RangeInclusive;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

const TEMPERATURE_RANGE_C: RangeInclusive<i32> = -10..=40;
const PEOPLE_COUNT_RANGE: RangeInclusive<i32> = 0..=50;
const CO2_RANGE_PPM: RangeInclusive<i32> = 300..=2000;

/// Raw CO2 reading to air-quality byte, e.g. 1500 ppm -> 15.
pub const AIR_QUALITY_SCALE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    PeopleCount,
    Co2,
}

impl SensorKind {
    pub const ALL: [SensorKind; 3] = [SensorKind::Temperature, SensorKind::PeopleCount, SensorKind::Co2];

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::PeopleCount => "people_count",
            SensorKind::Co2 => "co2",
        }
    }

    /// Raw value range a healthy sensor of this kind reports.
    pub fn range(self) -> RangeInclusive<i32> {
        match self {
            SensorKind::Temperature => TEMPERATURE_RANGE_C,
            SensorKind::PeopleCount => PEOPLE_COUNT_RANGE,
            SensorKind::Co2 => CO2_RANGE_PPM,
        }
    }

    /// Place a raw value in this kind's payload field, other fields zero.
    pub fn reading(self, value: i32) -> Result<SensorReading, SensorFrameError> {
        let data = match self {
            SensorKind::Temperature => sensor_frame::pack(0, value, 0)?,
            SensorKind::PeopleCount => sensor_frame::pack(unsigned("nb_person", value)?, 0, 0)?,
            SensorKind::Co2 => {
                let scaled = (f64::from(value) * AIR_QUALITY_SCALE) as i32;
                sensor_frame::pack(0, 0, unsigned("air_quality", scaled)?)?
            }
        };
        Ok(sensor_frame::unpack(data))
    }
}

fn unsigned(field: &'static str, value: i32) -> Result<u32, SensorFrameError> {
    u32::try_from(value).map_err(|_| SensorFrameError::ValueOutOfRange {
        field,
        value: i64::from(value),
        min: 0,
        max: i64::from(u32::MAX),
    })
}

impl FromStr for SensorKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" => Ok(SensorKind::Temperature),
            "people_count" | "occupancy" => Ok(SensorKind::PeopleCount),
            "co2" | "air_quality" => Ok(SensorKind::Co2),
            _ => Err(ConfigurationError::UnknownSensorKind(s.to_string())),
        }
    }
}

impl core::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A sensor that can be polled once per TDMA slot.
pub trait SensorSource {
    fn kind(&self) -> SensorKind;
    fn read_value(&mut self) -> i32;
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    fn kind(&self) -> SensorKind {
        (**self).kind()
    }

    fn read_value(&mut self) -> i32 {
        (**self).read_value()
    }
}
