/*!
Mock MQTT client for development without a broker

Lets bridge components be exercised and asserted on without a running
Mosquitto. Records every publish and subscription and can simulate inbound
message delivery through a channel.
*/

use anyhow::Result;
use rumqttc::QoS;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct MockMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Mock MQTT client mimicking the `rumqttc::AsyncClient` surface the bridge
/// uses.
#[derive(Clone, Default)]
pub struct MockMqttClient {
    published: Arc<Mutex<Vec<MockMessage>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    inbound: Arc<Mutex<Option<mpsc::UnboundedSender<MockMessage>>>>,
}

impl MockMqttClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a channel on which simulated inbound messages are delivered.
    pub fn setup_receiver(&self) -> mpsc::UnboundedReceiver<MockMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.inbound.lock().unwrap() = Some(sender);
        receiver
    }

    /// Record a publish (signature-compatible with `AsyncClient::publish`).
    pub async fn publish<S, V>(&self, topic: S, qos: QoS, retain: bool, payload: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        let message = MockMessage {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain,
        };
        log::info!("[stub] published to {}: {} bytes", message.topic, message.payload.len());
        self.published.lock().unwrap().push(message);
        Ok(())
    }

    /// Record a subscription (signature-compatible with `AsyncClient::subscribe`).
    pub async fn subscribe<S: Into<String>>(&self, topic: S, _qos: QoS) -> Result<()> {
        let topic = topic.into();
        log::info!("[stub] subscribed to {topic}");
        self.subscriptions.lock().unwrap().push(topic);
        Ok(())
    }

    /// Simulate a message arriving from the broker.
    pub async fn simulate_incoming<S, V>(&self, topic: S, payload: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        let message = MockMessage {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtLeastOnce,
            retain: false,
        };
        if let Some(sender) = self.inbound.lock().unwrap().as_ref() {
            sender
                .send(message.clone())
                .map_err(|e| anyhow::anyhow!("send error: {e}"))?;
        }
        log::info!("[stub] simulated incoming on {}", message.topic);
        Ok(())
    }

    /// All recorded publishes, in order.
    pub fn get_published_messages(&self) -> Vec<MockMessage> {
        self.published.lock().unwrap().clone()
    }

    /// All recorded subscriptions, in order.
    pub fn get_subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Publishes recorded for one exact topic.
    pub fn find_messages_by_topic(&self, topic: &str) -> Vec<MockMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Parse the most recent message on a topic as JSON.
    pub fn get_last_json_message<T>(&self, topic: &str) -> Result<Option<T>>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        match self.find_messages_by_topic(topic).last() {
            Some(message) => Ok(Some(serde_json::from_slice(&message.payload)?)),
            None => Ok(None),
        }
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
        self.subscriptions.lock().unwrap().clear();
    }
}

/// Builder for Sparkplug-style structured documents, used to craft NDATA/
/// NCMD/DCMD payloads in tests.
///
/// ```
/// use ventbridge_devkit::SparkplugMessageBuilder;
///
/// let payload = SparkplugMessageBuilder::new(3)
///     .metric("sp1", "Float", 25.0)
///     .metric("mode", "Int32", 1)
///     .build_bytes();
/// ```
pub struct SparkplugMessageBuilder {
    timestamp: u64,
    seq: u64,
    metrics: Vec<Value>,
}

impl SparkplugMessageBuilder {
    pub fn new(seq: u64) -> Self {
        Self {
            timestamp: 0,
            seq,
            metrics: Vec::new(),
        }
    }

    pub fn timestamp(mut self, ts: u64) -> Self {
        self.timestamp = ts;
        self
    }

    /// Append one metric record. `data_type` is carried verbatim; the device
    /// ignores it on receive, so tests can deliberately mismatch it.
    pub fn metric<V: Into<Value>>(mut self, name: &str, data_type: &str, value: V) -> Self {
        self.metrics.push(serde_json::json!({
            "name": name,
            "timestamp": self.timestamp,
            "dataType": data_type,
            "value": value.into(),
        }));
        self
    }

    pub fn build(&self) -> Value {
        serde_json::json!({
            "timestamp": self.timestamp,
            "seq": self.seq,
            "metrics": self.metrics,
        })
    }

    pub fn build_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.build()).expect("payload serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_records_publishes_and_subscriptions() {
        let client = MockMqttClient::new();

        client.subscribe("spBv1.0/Ignition/NCMD/Master", QoS::AtLeastOnce).await.unwrap();
        assert_eq!(client.get_subscriptions(), vec!["spBv1.0/Ignition/NCMD/Master"]);

        let payload = b"telemetry body";
        client.publish("ventilation", QoS::AtLeastOnce, false, payload.to_vec()).await.unwrap();

        let messages = client.get_published_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, "ventilation");
        assert_eq!(messages[0].payload, payload);
    }

    #[tokio::test]
    async fn last_json_message_parses_per_topic() {
        let client = MockMqttClient::new();

        let first = serde_json::json!({"temp": 19.5});
        let second = serde_json::json!({"temp": 20.0});
        for doc in [&first, &second] {
            let body = serde_json::to_vec(doc).unwrap();
            client.publish("ventilation", QoS::AtLeastOnce, false, body).await.unwrap();
        }

        let parsed: Option<Value> = client.get_last_json_message("ventilation").unwrap();
        assert_eq!(parsed.unwrap()["temp"], 20.0);
        let none: Option<Value> = client.get_last_json_message("other").unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn simulated_inbound_reaches_the_receiver() {
        let client = MockMqttClient::new();
        let mut receiver = client.setup_receiver();

        client
            .simulate_incoming("spBv1.0/Ignition/DCMD/Master/Ventilation", b"{}".to_vec())
            .await
            .unwrap();

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.topic, "spBv1.0/Ignition/DCMD/Master/Ventilation");
    }

    #[test]
    fn builder_produces_the_wire_document_shape() {
        let doc = SparkplugMessageBuilder::new(7)
            .timestamp(1234)
            .metric("fan1_speed", "Int32", 75)
            .metric("fan1_state", "Boolean", true)
            .build();

        assert_eq!(doc["seq"], 7);
        assert_eq!(doc["timestamp"], 1234);
        let metrics = doc["metrics"].as_array().unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0]["name"], "fan1_speed");
        assert_eq!(metrics[0]["dataType"], "Int32");
        assert_eq!(metrics[0]["value"], 75);
        assert_eq!(metrics[1]["value"], true);
    }
}
