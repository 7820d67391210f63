use super::{SensorKind, SensorSource};
use std::collections::VecDeque;

/// Replays a fixed sequence of values, then repeats the last one.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    kind: SensorKind,
    values: VecDeque<i32>,
    last: i32,
}

impl ScriptedSensor {
    pub fn new(kind: SensorKind, values: impl IntoIterator<Item = i32>) -> Self {
        let values: VecDeque<i32> = values.into_iter().collect();
        let last = values.front().copied().unwrap_or(0);
        Self { kind, values, last }
    }

    pub fn constant(kind: SensorKind, value: i32) -> Self {
        Self::new(kind, [value])
    }
}

impl SensorSource for ScriptedSensor {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn read_value(&mut self) -> i32 {
        if let Some(value) = self.values.pop_front() {
            self.last = value;
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_then_holds_last() {
        let mut sensor = ScriptedSensor::new(SensorKind::PeopleCount, [1, 2, 3]);
        let values: Vec<i32> = (0..5).map(|_| sensor.read_value()).collect();
        assert_eq!(values, vec![1, 2, 3, 3, 3]);
    }

    #[test]
    fn test_empty_script_reads_zero() {
        let mut sensor = ScriptedSensor::new(SensorKind::Temperature, Vec::new());
        assert_eq!(sensor.read_value(), 0);
    }
}
