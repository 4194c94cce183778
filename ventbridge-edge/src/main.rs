//! Ventbridge Edge - Sparkplug-style MQTT bridge for a ventilation field device
//!
//! The bridge synchronizes a small set of device tags with a central broker:
//! - Full-state DBIRTH on every (re)connection, so subscribers never see
//!   stale state after a broker-side reset
//! - NDATA/NCMD/DCMD command routing into the tag store
//! - Periodic flat telemetry with bounded moving averages, plus DDATA
//! - An actuator sweep whose step rate is derived from setpoint 1
//!
//! One logical actor drives everything: a single select loop over the MQTT
//! event loop, the telemetry interval and the control tick.

mod config;
mod metrics;
mod router;
mod sensor;
mod session;
mod sweep;
mod tags;
mod telemetry;

use anyhow::{Context, Result};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use config::BridgeConfig;
use metrics::Clock;
use router::{LogFanBank, Router, TopicSet};
use sensor::{SimulatedSensor, TemperatureSource};
use session::{ConnState, Session, RECONNECT_DELAY};
use sweep::{LogServo, ServoDriver, SweepController};
use tags::{new_shared, Shared, TagStore};
use telemetry::{Averager, TelemetrySnapshot, TELEMETRY_INTERVAL, TELEMETRY_TOPIC};

/// Granularity of the actuator control loop. Matches the fastest step delay
/// the setpoint map can produce.
const CONTROL_TICK: Duration = Duration::from_millis(2);

struct Bridge {
    client: AsyncClient,
    topics: TopicSet,
    tags: Shared<TagStore>,
    router: Router,
    session: Session,
    clock: Clock,
    averager: Averager,
    sweep: SweepController,
    sensor: Box<dyn TemperatureSource>,
    servo: Box<dyn ServoDriver>,
}

impl Bridge {
    fn new(cfg: &BridgeConfig, client: AsyncClient) -> Self {
        let sp = &cfg.sparkplug;
        let topics = TopicSet::new(&sp.group_id, &sp.node_id, &sp.device_id);
        let tags = new_shared(TagStore::default());
        let router = Router::new(topics.clone(), tags.clone(), Box::new(LogFanBank));

        Self {
            client,
            topics,
            tags,
            router,
            session: Session::new(),
            clock: Clock::start(),
            averager: Averager::new(),
            sweep: SweepController::new(),
            sensor: Box::new(SimulatedSensor::new()),
            servo: Box::new(LogServo),
        }
    }

    /// Subscribe to the three inbound topics, then publish the full-state
    /// birth. Runs once per broker connection, never more.
    async fn on_connected(&mut self) -> Result<()> {
        for topic in [&self.topics.ndata, &self.topics.ncmd, &self.topics.dcmd] {
            self.client
                .subscribe(topic, QoS::AtLeastOnce)
                .await
                .with_context(|| format!("failed to subscribe to {topic}"))?;
        }
        info!(
            "subscribed to {}, {}, {}",
            self.topics.ndata, self.topics.ncmd, self.topics.dcmd
        );

        let payload = {
            let tags = self.tags.lock();
            self.session.birth_payload(&tags, self.clock.now_ms())
        };
        let body = serde_json::to_vec(&payload).context("failed to serialize DBIRTH")?;
        self.client
            .publish(&self.topics.dbirth, QoS::AtLeastOnce, false, body)
            .await
            .context("failed to publish DBIRTH")?;
        info!("published DBIRTH (seq {})", payload.seq);

        self.session.state = ConnState::Subscribed;
        Ok(())
    }

    /// One telemetry tick: sample the sensor, update the averages, publish
    /// the flat snapshot and the DDATA document.
    async fn on_telemetry_tick(&mut self) -> Result<()> {
        let reading = self.sensor.read(Instant::now());
        let (snapshot, ddata) = {
            let mut tags = self.tags.lock();
            tags.temp = reading;
            self.averager.record(tags.temp, tags.sp1);
            let (avg_temp, avg_sp1) = self.averager.averages();
            let snapshot = TelemetrySnapshot::capture(&tags, avg_temp, avg_sp1);
            let ddata = self.session.data_payload(&tags, self.clock.now_ms());
            (snapshot, ddata)
        };

        self.client
            .publish(
                TELEMETRY_TOPIC,
                QoS::AtLeastOnce,
                false,
                serde_json::to_vec(&snapshot)?,
            )
            .await
            .context("failed to publish telemetry")?;
        self.client
            .publish(
                &self.topics.ddata,
                QoS::AtLeastOnce,
                false,
                serde_json::to_vec(&ddata)?,
            )
            .await
            .context("failed to publish DDATA")?;
        debug!("published telemetry (seq {})", ddata.seq);
        Ok(())
    }

    /// One control tick: sample mode/sp1 and advance the sweep.
    fn on_control_tick(&mut self) {
        let (mode, sp1) = {
            let tags = self.tags.lock();
            (tags.mode, tags.sp1)
        };
        if let Some(position) = self.sweep.tick(Instant::now(), mode, sp1) {
            self.servo.set_position(position);
        }
    }

    async fn run(mut self, mut eventloop: EventLoop) -> Result<()> {
        let mut telemetry = interval(TELEMETRY_INTERVAL);
        let mut control = interval(CONTROL_TICK);

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!("broker connection established");
                        if let Err(e) = self.on_connected().await {
                            // The event loop will surface the broken
                            // connection on its next poll and retry.
                            error!("session setup failed: {e:#}");
                        }
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        if let Err(e) = self.router.handle(&publish.topic, &publish.payload) {
                            warn!(topic = %publish.topic, "discarded message: {e}");
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if self.session.state == ConnState::Subscribed {
                            error!("broker connection lost: {e}");
                        } else {
                            error!("MQTT connect failed: {e} - retrying in {}s", RECONNECT_DELAY.as_secs());
                        }
                        self.session.state = ConnState::Connecting;
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                },

                _ = telemetry.tick() => {
                    // Telemetry is meaningless without a broker; the control
                    // loop below keeps running regardless.
                    if self.session.state == ConnState::Subscribed {
                        if let Err(e) = self.on_telemetry_tick().await {
                            error!("telemetry tick failed: {e:#}");
                        }
                    }
                }

                _ = control.tick() => self.on_control_tick(),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("ventbridge edge starting");

    let cfg = config::load_config().await;
    let mut options = MqttOptions::new(&cfg.mqtt.client_id, &cfg.mqtt.host, cfg.mqtt.port);
    options.set_keep_alive(Duration::from_secs(cfg.mqtt.keep_alive_secs));
    if let (Some(user), Some(pass)) = (&cfg.mqtt.username, &cfg.mqtt.password) {
        options.set_credentials(user, pass);
    }
    let (client, eventloop) = AsyncClient::new(options, 10);

    info!(
        "bridging device {}/{}/{} via {}:{}",
        cfg.sparkplug.group_id, cfg.sparkplug.node_id, cfg.sparkplug.device_id,
        cfg.mqtt.host, cfg.mqtt.port
    );

    let bridge = Bridge::new(&cfg, client);
    bridge.run(eventloop).await
}
