//! Sensor view of the 24-bit frame payload.
//!
//! Layout, most-significant byte first: `nb_person | temperature | air_quality`.
//! Temperature is an 8-bit two's-complement value.

use crate::frame::{self, DecodedFrame, Frame, FrameBytes, FrameError, MAX_DATA};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TEMPERATURE_MIN: i32 = i8::MIN as i32;
pub const TEMPERATURE_MAX: i32 = i8::MAX as i32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorFrameError {
    #[error("{field} value {value} outside [{min}, {max}]")]
    ValueOutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Decoded sensor payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    pub nb_person: u8,
    pub temperature: i8,
    pub air_quality: u8,
}

impl SensorReading {
    pub fn new(nb_person: u8, temperature: i8, air_quality: u8) -> Self {
        Self {
            nb_person,
            temperature,
            air_quality,
        }
    }

    pub fn to_data(self) -> u32 {
        (u32::from(self.nb_person) << 16) | (u32::from(self.temperature as u8) << 8) | u32::from(self.air_quality)
    }

    pub fn from_data(data: u32) -> Self {
        let data = data & MAX_DATA;
        Self {
            nb_person: (data >> 16) as u8,
            temperature: ((data >> 8) & 0xFF) as u8 as i8,
            air_quality: (data & 0xFF) as u8,
        }
    }
}

/// Pack raw readings into the 24-bit payload.
///
/// `nb_person` and `air_quality` are masked to 8 bits. Temperature outside
/// the signed 8-bit range is rejected so a faulty sensor is never wrapped
/// into a plausible value.
pub fn pack(nb_person: u32, temperature: i32, air_quality: u32) -> Result<u32, SensorFrameError> {
    let temperature = i8::try_from(temperature).map_err(|_| SensorFrameError::ValueOutOfRange {
        field: "temperature",
        value: i64::from(temperature),
        min: i64::from(TEMPERATURE_MIN),
        max: i64::from(TEMPERATURE_MAX),
    })?;

    Ok(SensorReading::new((nb_person & 0xFF) as u8, temperature, (air_quality & 0xFF) as u8).to_data())
}

pub fn unpack(data: u32) -> SensorReading {
    SensorReading::from_data(data)
}

/// Encode a sensor reading as a complete frame.
pub fn encode(
    flag: u8,
    dest_address: u16,
    src_address: u16,
    reading: SensorReading,
) -> Result<FrameBytes, SensorFrameError> {
    Ok(frame::encode(flag, dest_address, src_address, reading.to_data())?)
}

/// Decode wire bytes and interpret the payload as a sensor reading.
pub fn decode(bytes: &[u8]) -> Result<(DecodedFrame, SensorReading), SensorFrameError> {
    let decoded = frame::decode(bytes)?;
    let reading = decoded.frame.sensor_reading();
    Ok((decoded, reading))
}

impl Frame {
    /// Sensor view of this frame's payload.
    pub fn sensor_reading(&self) -> SensorReading {
        unpack(self.data())
    }
}

impl core::fmt::Display for SensorReading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "persons={} temperature={} air_quality={}",
            self.nb_person, self.temperature, self.air_quality
        )
    }
}
