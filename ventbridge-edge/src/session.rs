//! Session lifecycle and sequence counters.
//!
//! The broker cannot be assumed to retain anything across a reconnect, so
//! every transition into `Subscribed` must be preceded by exactly one full
//! DBIRTH publish. Connect failures are never fatal; the bridge retries at a
//! fixed interval forever.

use std::time::Duration;

use crate::metrics::{birth_metrics, data_metrics, PayloadOut};
use crate::tags::TagStore;

/// Fixed reconnect delay. Deliberately not an exponential backoff.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Subscribed,
}

pub struct Session {
    pub state: ConnState,
    seq: u64,
    bd_seq: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: ConnState::Disconnected,
            seq: 0,
            bd_seq: 0,
        }
    }

    /// Sequence number for the next birth/data publish. Starts at 0 and
    /// increments once per call.
    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    /// Full-state DBIRTH document. Consumes one sequence number.
    pub fn birth_payload(&mut self, tags: &TagStore, ts: u64) -> PayloadOut {
        // bd_seq is initialized but never advanced; the original design
        // ships no death-certificate lifecycle.
        let metrics = birth_metrics(tags, self.bd_seq, ts);
        PayloadOut {
            timestamp: ts,
            seq: self.next_seq(),
            metrics,
        }
    }

    /// Partial DDATA document (temp + mode). Consumes one sequence number.
    pub fn data_payload(&mut self, tags: &TagStore, ts: u64) -> PayloadOut {
        PayloadOut {
            timestamp: ts,
            seq: self.next_seq(),
            metrics: data_metrics(tags, ts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::QoS;
    use ventbridge_devkit::MockMqttClient;

    #[test]
    fn sequence_starts_at_zero_and_is_consecutive() {
        let mut session = Session::new();
        let tags = TagStore::default();

        let birth = session.birth_payload(&tags, 10);
        let data1 = session.data_payload(&tags, 20);
        let data2 = session.data_payload(&tags, 30);
        assert_eq!(birth.seq, 0);
        assert_eq!(data1.seq, 1);
        assert_eq!(data2.seq, 2);
    }

    #[test]
    fn rebirth_contains_full_snapshot_every_time() {
        let mut session = Session::new();
        let tags = TagStore::default();

        for _ in 0..3 {
            let birth = session.birth_payload(&tags, 0);
            assert_eq!(birth.metrics.len(), 13);
        }
    }

    #[test]
    fn bd_seq_is_never_advanced() {
        let mut session = Session::new();
        let tags = TagStore::default();

        for _ in 0..4 {
            let birth = session.birth_payload(&tags, 0);
            let bd = birth.metrics.iter().find(|m| m.name == "bdSeq").unwrap();
            assert_eq!(bd.value, serde_json::json!(0));
        }
    }

    #[tokio::test]
    async fn birth_document_round_trips_through_the_stub_broker() {
        let client = MockMqttClient::new();
        let mut session = Session::new();
        let tags = TagStore::default();

        let payload = serde_json::to_vec(&session.birth_payload(&tags, 99)).unwrap();
        client
            .publish("spBv1.0/Ignition/DBIRTH/Master/Ventilation", QoS::AtLeastOnce, false, payload)
            .await
            .unwrap();

        let doc: Option<serde_json::Value> = client
            .get_last_json_message("spBv1.0/Ignition/DBIRTH/Master/Ventilation")
            .unwrap();
        let doc = doc.unwrap();
        assert_eq!(doc["seq"], 0);
        assert_eq!(doc["timestamp"], 99);
        assert_eq!(doc["metrics"].as_array().unwrap().len(), 13);
    }
}
