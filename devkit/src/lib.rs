/*!
# Ventbridge DevKit - Stubs and Utilities for Development

Library easing development and testing of the edge bridge without
infrastructure:
- Broker-less MQTT stub that records publishes and subscriptions
- Builders for Sparkplug-style command payloads
*/

pub mod mqtt_stub;

pub use mqtt_stub::{MockMqttClient, SparkplugMessageBuilder};
