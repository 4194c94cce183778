//! Temperature sources. The bridge polls the source on every telemetry tick;
//! the simulated implementation stands in for the DHT-style probe and
//! produces a slow random walk around a sine base.

use rand::Rng;
use std::time::{Duration, Instant};

pub trait TemperatureSource: Send {
    /// Current reading in degrees Celsius.
    fn read(&mut self, now: Instant) -> f32;
}

const BASE_TEMP: f32 = 19.5;
const TEMP_MIN: f32 = 17.0;
const TEMP_MAX: f32 = 22.0;
const UPDATE_PERIOD: Duration = Duration::from_secs(1);

/// Simulated probe: refreshed at most once per second, drifting toward a
/// sine-modulated base with small random jitter, clamped to a plausible
/// indoor range.
pub struct SimulatedSensor {
    temp: f32,
    phase: f32,
    last_update: Option<Instant>,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            temp: BASE_TEMP,
            phase: 0.0,
            last_update: None,
        }
    }
}

impl TemperatureSource for SimulatedSensor {
    fn read(&mut self, now: Instant) -> f32 {
        let due = match self.last_update {
            None => true,
            Some(last) => now.duration_since(last) > UPDATE_PERIOD,
        };
        if due {
            self.last_update = Some(now);
            let mut rng = rand::thread_rng();

            self.phase += 0.15 + rng.gen_range(-0.10..0.10);
            if self.phase > std::f32::consts::TAU {
                self.phase -= std::f32::consts::TAU;
            }
            let base = BASE_TEMP + 2.0 * self.phase.sin();

            self.temp += rng.gen_range(-0.10..=0.10);
            self.temp += (base - self.temp) * 0.1;
            self.temp = self.temp.clamp(TEMP_MIN, TEMP_MAX);
        }
        self.temp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_stay_in_the_plausible_range() {
        let mut sensor = SimulatedSensor::new();
        let mut now = Instant::now();
        for _ in 0..500 {
            now += Duration::from_secs(2);
            let t = sensor.read(now);
            assert!((TEMP_MIN..=TEMP_MAX).contains(&t), "reading {t} out of range");
        }
    }

    #[test]
    fn readings_refresh_at_most_once_per_second() {
        let mut sensor = SimulatedSensor::new();
        let start = Instant::now();

        let first = sensor.read(start);
        // Sub-second re-reads return the cached value.
        for ms in [100u64, 500, 900] {
            assert_eq!(sensor.read(start + Duration::from_millis(ms)), first);
        }
    }
}
