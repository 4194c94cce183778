//! Periodic flat telemetry: bounded moving averages over the most recent
//! temperature and setpoint-1 samples, published as a legacy key/value
//! object distinct from the structured Sparkplug documents.

use serde::Serialize;
use std::time::Duration;

use crate::tags::TagStore;

pub const WINDOW: usize = 50;
pub const TELEMETRY_TOPIC: &str = "ventilation";
pub const TELEMETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Two circular sample buffers sharing one rotating index and one capped
/// sample counter. Averages are recomputed by full summation each time;
/// correctness over per-tick cost.
pub struct Averager {
    temp: [f32; WINDOW],
    sp1: [f32; WINDOW],
    index: usize,
    count: usize,
}

impl Averager {
    pub fn new() -> Self {
        Self {
            temp: [0.0; WINDOW],
            sp1: [0.0; WINDOW],
            index: 0,
            count: 0,
        }
    }

    /// Record one sample pair at the shared rotating index.
    pub fn record(&mut self, temp: f32, sp1: f32) {
        self.temp[self.index] = temp;
        self.sp1[self.index] = sp1;
        self.index = (self.index + 1) % WINDOW;
        if self.count < WINDOW {
            self.count += 1;
        }
    }

    /// Arithmetic means over the `min(WINDOW, samples seen)` valid entries.
    /// Returns (avg_temp, avg_sp1); zero before any sample is recorded.
    pub fn averages(&self) -> (f32, f32) {
        if self.count == 0 {
            return (0.0, 0.0);
        }
        let mut sum_temp = 0.0f32;
        let mut sum_sp1 = 0.0f32;
        for i in 0..self.count {
            sum_temp += self.temp[i];
            sum_sp1 += self.sp1[i];
        }
        (sum_temp / self.count as f32, sum_sp1 / self.count as f32)
    }
}

/// Flat snapshot published to the legacy `ventilation` topic. Field names
/// are the wire keys and must stay stable.
#[derive(Debug, Serialize)]
pub struct TelemetrySnapshot {
    pub temp: f32,
    #[serde(rename = "avgTemp")]
    pub avg_temp: f32,
    pub sp1: f32,
    #[serde(rename = "avgSp1")]
    pub avg_sp1: f32,
    pub sp2: f32,
    pub sp3: f32,
    pub eco_sp: f32,
    pub mode: i32,
    pub fan1_state: bool,
    pub fan2_state: bool,
    pub fan3_state: bool,
    pub fan1_speed: i32,
    pub fan2_speed: i32,
    pub fan3_speed: i32,
}

impl TelemetrySnapshot {
    pub fn capture(tags: &TagStore, avg_temp: f32, avg_sp1: f32) -> Self {
        Self {
            temp: tags.temp,
            avg_temp,
            sp1: tags.sp1,
            avg_sp1,
            sp2: tags.sp2,
            sp3: tags.sp3,
            eco_sp: tags.eco_sp,
            mode: tags.mode,
            fan1_state: tags.fans[0].state,
            fan2_state: tags.fans[1].state,
            fan3_state: tags.fans[2].state,
            fan1_speed: tags.fans[0].speed,
            fan2_speed: tags.fans[1].speed,
            fan3_speed: tags.fans[2].speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_window_averages_exactly_the_samples_seen() {
        let mut avg = Averager::new();
        avg.record(10.0, 20.0);
        avg.record(20.0, 22.0);
        avg.record(30.0, 24.0);

        let (t, s) = avg.averages();
        assert!((t - 20.0).abs() < 1e-6);
        assert!((s - 22.0).abs() < 1e-6);
    }

    #[test]
    fn full_window_evicts_the_oldest_samples() {
        let mut avg = Averager::new();
        // Fill the window with 1.0, then overwrite half of it with 3.0.
        for _ in 0..WINDOW {
            avg.record(1.0, 1.0);
        }
        for _ in 0..WINDOW / 2 {
            avg.record(3.0, 3.0);
        }

        let (t, _) = avg.averages();
        assert!((t - 2.0).abs() < 1e-5);

        // Overwrite the rest: the original samples are fully evicted.
        for _ in 0..WINDOW / 2 {
            avg.record(3.0, 3.0);
        }
        let (t, s) = avg.averages();
        assert!((t - 3.0).abs() < 1e-6);
        assert!((s - 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_averager_reports_zero() {
        assert_eq!(Averager::new().averages(), (0.0, 0.0));
    }

    #[test]
    fn snapshot_serializes_with_the_fixed_wire_keys() {
        let mut tags = TagStore::default();
        tags.mode = 1;
        tags.fans[1].state = true;
        tags.fans[1].speed = 2;

        let snap = TelemetrySnapshot::capture(&tags, 19.75, 22.5);
        let v = serde_json::to_value(&snap).unwrap();

        for key in [
            "temp", "avgTemp", "sp1", "avgSp1", "sp2", "sp3", "eco_sp", "mode",
            "fan1_state", "fan2_state", "fan3_state", "fan1_speed", "fan2_speed", "fan3_speed",
        ] {
            assert!(v.get(key).is_some(), "missing wire key {key}");
        }
        assert_eq!(v.as_object().unwrap().len(), 14);
        assert_eq!(v["avgTemp"], 19.75);
        assert_eq!(v["fan2_state"], true);
        assert_eq!(v["fan2_speed"], 2);
    }
}
