//! Inbound message routing: topic classification, payload decode and
//! in-order metric application onto the tag store.
//!
//! Decode failures discard the whole message and leave the tag store
//! untouched. Unknown metric names are skipped silently so that future
//! supervisory-side metrics never break the device.

use serde_json::Value;
use tracing::{debug, info};

use crate::metrics::{coerce_bool, coerce_f32, coerce_i32, PayloadIn};
use crate::tags::{FanChannel, Shared, TagStore, FAN_COUNT};

/// Errors raised while handling an inbound message.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Classification of an inbound topic. Exact string match only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NodeData,
    NodeCommand,
    DeviceCommand,
    Unrecognized,
}

/// All Sparkplug-style topics, built once from the configured identifiers.
#[derive(Debug, Clone)]
pub struct TopicSet {
    pub ndata: String,
    pub ncmd: String,
    pub dcmd: String,
    pub dbirth: String,
    pub ddata: String,
}

impl TopicSet {
    pub fn new(group: &str, node: &str, device: &str) -> Self {
        Self {
            ndata: format!("spBv1.0/{group}/NDATA/{node}"),
            ncmd: format!("spBv1.0/{group}/NCMD/{node}"),
            dcmd: format!("spBv1.0/{group}/DCMD/{node}/{device}"),
            dbirth: format!("spBv1.0/{group}/DBIRTH/{node}/{device}"),
            ddata: format!("spBv1.0/{group}/DDATA/{node}/{device}"),
        }
    }

    pub fn classify(&self, topic: &str) -> MessageKind {
        if topic == self.ndata {
            MessageKind::NodeData
        } else if topic == self.ncmd {
            MessageKind::NodeCommand
        } else if topic == self.dcmd {
            MessageKind::DeviceCommand
        } else {
            MessageKind::Unrecognized
        }
    }
}

/// Downstream fan actuation hook, invoked once per successfully decoded
/// message with the current fan channels.
pub trait FanBank: Send {
    fn apply(&mut self, fans: &[FanChannel; FAN_COUNT]);
}

/// Default fan hook: logs the commanded states, no hardware attached.
pub struct LogFanBank;

impl FanBank for LogFanBank {
    fn apply(&mut self, fans: &[FanChannel; FAN_COUNT]) {
        info!(
            "fans: 1={}({}) 2={}({}) 3={}({})",
            fans[0].state, fans[0].speed, fans[1].state, fans[1].speed, fans[2].state, fans[2].speed
        );
    }
}

pub struct Router {
    topics: TopicSet,
    tags: Shared<TagStore>,
    fans: Box<dyn FanBank>,
}

impl Router {
    pub fn new(topics: TopicSet, tags: Shared<TagStore>, fans: Box<dyn FanBank>) -> Self {
        Self { topics, tags, fans }
    }

    /// Handle one inbound (topic, payload) pair. Messages on unrecognized
    /// topics are ignored; this is documented behavior, not an error.
    pub fn handle(&mut self, topic: &str, payload: &[u8]) -> Result<(), RouterError> {
        let kind = self.topics.classify(topic);
        if kind == MessageKind::Unrecognized {
            debug!(%topic, "ignoring message on unrecognized topic");
            return Ok(());
        }

        let doc: PayloadIn = serde_json::from_slice(payload)?;
        debug!(%topic, ?kind, metrics = doc.metrics.len(), "decoded command message");

        let fans = {
            let mut tags = self.tags.lock();
            for m in &doc.metrics {
                apply_metric(&mut tags, &m.name, &m.value);
            }
            tags.fans
        };
        self.fans.apply(&fans);
        Ok(())
    }
}

/// Apply one metric to the tag store, coercing the value to the field's
/// static type. Later metrics with the same name overwrite earlier ones.
fn apply_metric(tags: &mut TagStore, name: &str, value: &Value) {
    match name {
        "sp1" => {
            if let Some(v) = coerce_f32(value) {
                tags.sp1 = v;
                debug!("updated sp1: {v:.2}");
            }
        }
        "sp2" => {
            if let Some(v) = coerce_f32(value) {
                tags.sp2 = v;
                debug!("updated sp2: {v:.2}");
            }
        }
        "sp3" => {
            if let Some(v) = coerce_f32(value) {
                tags.sp3 = v;
                debug!("updated sp3: {v:.2}");
            }
        }
        "eco_sp" => {
            if let Some(v) = coerce_f32(value) {
                tags.eco_sp = v;
                debug!("updated eco_sp: {v:.2}");
            }
        }
        "mode" => {
            if let Some(v) = coerce_i32(value) {
                tags.mode = v;
                debug!("updated mode: {v}");
            }
        }
        "fan1_state" => {
            if let Some(v) = coerce_bool(value) {
                tags.fans[0].state = v;
                debug!("updated fan1_state: {v}");
            }
        }
        "fan1_speed" => {
            if let Some(v) = coerce_i32(value) {
                tags.fans[0].speed = v;
                debug!("updated fan1_speed: {v}");
            }
        }
        "fan2_state" => {
            if let Some(v) = coerce_bool(value) {
                tags.fans[1].state = v;
                debug!("updated fan2_state: {v}");
            }
        }
        "fan2_speed" => {
            if let Some(v) = coerce_i32(value) {
                tags.fans[1].speed = v;
                debug!("updated fan2_speed: {v}");
            }
        }
        "fan3_state" => {
            if let Some(v) = coerce_bool(value) {
                tags.fans[2].state = v;
                debug!("updated fan3_state: {v}");
            }
        }
        "fan3_speed" => {
            if let Some(v) = coerce_i32(value) {
                tags.fans[2].speed = v;
                debug!("updated fan3_speed: {v}");
            }
        }
        // Forward compatibility: future metric names are not a fault.
        other => debug!("skipping unknown metric '{other}'"),
    }
}
