//! Actuator sweep state machine.
//!
//! Mode 0 forces the commanded position to 0 on every tick. Any nonzero mode
//! sweeps the actuator back and forth across [0, 180] degrees, one degree per
//! step, with the step delay derived from setpoint 1. The internal angle and
//! direction are intentionally not reset while off, so a later sweep resumes
//! from the stale position.

use std::time::{Duration, Instant};

use tracing::debug;

pub const ANGLE_MAX: i32 = 180;

const SP_MIN: f32 = 10.0;
const SP_MAX: f32 = 40.0;
const DELAY_SLOW_MS: i64 = 50;
const DELAY_FAST_MS: i64 = 2;

/// Step delay in milliseconds for a given setpoint-1 value: the setpoint is
/// clamped to [10, 40], truncated, then linearly mapped onto [50 ms, 2 ms]
/// with truncating integer arithmetic.
pub fn step_delay_ms(sp1: f32) -> u64 {
    let clamped = sp1.clamp(SP_MIN, SP_MAX) as i64;
    ((clamped - 10) * (DELAY_FAST_MS - DELAY_SLOW_MS) / 30 + DELAY_SLOW_MS) as u64
}

/// Position driver for the physical actuator. Accepts 0..=180 degrees.
pub trait ServoDriver: Send {
    fn set_position(&mut self, degrees: i32);
}

/// Default driver: logs commanded positions, no hardware attached.
pub struct LogServo;

impl ServoDriver for LogServo {
    fn set_position(&mut self, degrees: i32) {
        debug!("servo position: {degrees}");
    }
}

pub struct SweepController {
    angle: i32,
    direction: i32,
    last_step: Option<Instant>,
}

impl SweepController {
    pub fn new() -> Self {
        Self {
            angle: 0,
            direction: 1,
            last_step: None,
        }
    }

    /// One control tick. Returns the position to command, or None when the
    /// current step delay has not yet elapsed.
    pub fn tick(&mut self, now: Instant, mode: i32, sp1: f32) -> Option<i32> {
        if mode == 0 {
            // Off holds the actuator at 0 but keeps angle/direction as-is.
            return Some(0);
        }

        let delay = Duration::from_millis(step_delay_ms(sp1));
        let due = match self.last_step {
            None => true,
            Some(last) => now.duration_since(last) >= delay,
        };
        if !due {
            return None;
        }
        self.last_step = Some(now);

        let command = self.angle;
        self.angle += self.direction;
        if self.angle >= ANGLE_MAX {
            self.angle = ANGLE_MAX;
            self.direction = -1;
        } else if self.angle <= 0 {
            self.angle = 0;
            self.direction = 1;
        }
        Some(command)
    }
}
