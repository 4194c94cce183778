//! Device tag store: the single aggregate holding every setpoint, mode, fan
//! channel and the latest temperature reading.
//!
//! Exactly one writer role exists per field: the message router writes the
//! command-driven tags, the telemetry tick writes `temp`. Everything else
//! only reads.

use parking_lot::Mutex;
use std::sync::Arc;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

pub const FAN_COUNT: usize = 3;

/// One fan channel: relay state plus commanded speed. Speed is stored as
/// received; clamping happens at the point of use, not here.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FanChannel {
    pub state: bool,
    pub speed: i32,
}

/// All synchronized device tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TagStore {
    pub sp1: f32,
    pub sp2: f32,
    pub sp3: f32,
    pub eco_sp: f32,
    /// 0 = actuator off, any nonzero value = sweeping.
    pub mode: i32,
    pub fans: [FanChannel; FAN_COUNT],
    pub temp: f32,
}

impl Default for TagStore {
    fn default() -> Self {
        Self {
            sp1: 22.0,
            sp2: 23.0,
            sp3: 24.0,
            eco_sp: 21.0,
            mode: 0,
            fans: [FanChannel::default(); FAN_COUNT],
            temp: 25.0,
        }
    }
}
