//! Metric codec for the Sparkplug-style JSON payloads.
//!
//! Outbound metrics are fully typed (`MetricOut` with a `dataType` drawn from
//! the static name→type table). Inbound metrics deliberately read only `name`
//! and `value` and coerce the value to the destination tag's static type
//! without checking the message's own `dataType` field; that laxity is part
//! of the wire contract and must not be hardened.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use crate::tags::TagStore;

/// Wire data types the device emits. No complex or templated types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    Float,
    Int32,
    Boolean,
}

/// One outbound metric record.
#[derive(Debug, Clone, Serialize)]
pub struct MetricOut {
    pub name: &'static str,
    pub timestamp: u64,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
    pub value: Value,
}

/// Outbound structured document (DBIRTH / DDATA).
#[derive(Debug, Clone, Serialize)]
pub struct PayloadOut {
    pub timestamp: u64,
    pub seq: u64,
    pub metrics: Vec<MetricOut>,
}

/// Inbound structured document (NDATA / NCMD / DCMD). Missing fields default
/// rather than fail so that a metrics-only command still applies.
#[derive(Debug, Deserialize)]
pub struct PayloadIn {
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub metrics: Vec<MetricIn>,
}

/// Inbound metric. Only `name` and `value` matter; `timestamp` and
/// `dataType` are ignored on receive.
#[derive(Debug, Deserialize)]
pub struct MetricIn {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// Static name→type table for every tracked metric, `bdSeq` included.
/// Returns None for names this device does not publish.
pub fn metric_type(name: &str) -> Option<DataType> {
    match name {
        "temp" | "sp1" | "sp2" | "sp3" | "eco_sp" => Some(DataType::Float),
        "mode" | "fan1_speed" | "fan2_speed" | "fan3_speed" | "bdSeq" => Some(DataType::Int32),
        "fan1_state" | "fan2_state" | "fan3_state" => Some(DataType::Boolean),
        _ => None,
    }
}

fn metric(name: &'static str, ts: u64, data_type: DataType, value: Value) -> MetricOut {
    MetricOut {
        name,
        timestamp: ts,
        data_type,
        value,
    }
}

/// Full 13-metric birth snapshot: `bdSeq` plus every tag store field.
pub fn birth_metrics(tags: &TagStore, bd_seq: u64, ts: u64) -> Vec<MetricOut> {
    use DataType::*;
    vec![
        metric("bdSeq", ts, Int32, Value::from(bd_seq)),
        metric("temp", ts, Float, Value::from(tags.temp)),
        metric("mode", ts, Int32, Value::from(tags.mode)),
        metric("sp1", ts, Float, Value::from(tags.sp1)),
        metric("sp2", ts, Float, Value::from(tags.sp2)),
        metric("sp3", ts, Float, Value::from(tags.sp3)),
        metric("eco_sp", ts, Float, Value::from(tags.eco_sp)),
        metric("fan1_state", ts, Boolean, Value::from(tags.fans[0].state)),
        metric("fan1_speed", ts, Int32, Value::from(tags.fans[0].speed)),
        metric("fan2_state", ts, Boolean, Value::from(tags.fans[1].state)),
        metric("fan2_speed", ts, Int32, Value::from(tags.fans[1].speed)),
        metric("fan3_state", ts, Boolean, Value::from(tags.fans[2].state)),
        metric("fan3_speed", ts, Int32, Value::from(tags.fans[2].speed)),
    ]
}

/// Partial device-data snapshot: temperature and mode only. Known to cover
/// 2 of the 13 birth metrics; kept as-is rather than silently expanded.
pub fn data_metrics(tags: &TagStore, ts: u64) -> Vec<MetricOut> {
    vec![
        metric("temp", ts, DataType::Float, Value::from(tags.temp)),
        metric("mode", ts, DataType::Int32, Value::from(tags.mode)),
    ]
}

/// Coerce a wire value to a float tag. Booleans count as 0.0/1.0.
pub fn coerce_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Coerce a wire value to an integer tag, truncating fractional parts.
pub fn coerce_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v as i32),
        Value::Bool(b) => Some(if *b { 1 } else { 0 }),
        _ => None,
    }
}

/// Coerce a wire value to a boolean tag via an ordinary truth test.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}

/// Device-local monotonic millisecond clock used to stamp outbound metrics.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
