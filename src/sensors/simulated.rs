use super::{SensorKind, SensorSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sensor producing uniformly random values within its kind's range.
#[derive(Debug)]
pub struct SimulatedSensor {
    kind: SensorKind,
    rng: StdRng,
}

impl SimulatedSensor {
    /// Deterministic sensor, same seed gives the same readings.
    pub fn new(kind: SensorKind, seed: u64) -> Self {
        Self {
            kind,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy(kind: SensorKind) -> Self {
        Self {
            kind,
            rng: StdRng::from_entropy(),
        }
    }
}

impl SensorSource for SimulatedSensor {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn read_value(&mut self) -> i32 {
        self.rng.gen_range(self.kind.range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_stay_in_range() {
        for kind in SensorKind::ALL {
            let mut sensor = SimulatedSensor::new(kind, 7);
            for _ in 0..500 {
                assert!(kind.range().contains(&sensor.read_value()));
            }
        }
    }

    #[test]
    fn test_same_seed_same_readings() {
        let mut a = SimulatedSensor::new(SensorKind::Co2, 99);
        let mut b = SimulatedSensor::new(SensorKind::Co2, 99);
        for _ in 0..20 {
            assert_eq!(a.read_value(), b.read_value());
        }
    }
}
