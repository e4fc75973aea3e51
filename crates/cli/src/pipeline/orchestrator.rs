//! Agent orchestrator - wires the components and supervises the two tasks.
//!
//! ```text
//!   MQTT broker ──> BusSubscriber ──> SensorChannel <── CycleScheduler ──> ObjectStore
//!        ^                                                   │
//!        └─────────────────── LED commands (MqttBus) ────────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use capture::{Capturer, ConfiguredCamera, LedHandshake, MetadataTagger};
use contracts::{AgentConfig, BusPublisher, Camera, ObjectStore};
use ingestion::{BusConnection, BusSubscriber, MqttBus, SensorChannel, SubscriberStats};
use observability::CycleMetricsAggregator;
use scheduler::{CycleRecord, CycleScheduler};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uploader::{ConfiguredStore, Uploader};

use super::AgentStats;
use crate::error::CliError;

type AgentScheduler = CycleScheduler<MqttBus, ConfiguredCamera, ConfiguredStore>;

/// Longest `run_once` waits for the first sensor reading
const FIRST_READING_WAIT: Duration = Duration::from_secs(10);
const FIRST_READING_POLL: Duration = Duration::from_millis(100);

/// Capture agent built from one configuration
pub struct Agent {
    config: AgentConfig,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Run both tasks until `shutdown` fires
    ///
    /// After cancellation each task gets `grace` to finish; a task still
    /// running after that is aborted and its statistics are lost.
    pub async fn run(self, shutdown: CancellationToken, grace: Duration) -> Result<AgentStats> {
        let start_time = Instant::now();
        let channel = Arc::new(SensorChannel::new());
        let (bus, connection) = MqttBus::open(&self.config.bus);

        // Everything that can fail at startup happens before the tasks spawn
        let scheduler = self.build_scheduler(bus, Arc::clone(&channel))?;
        let subscriber = self.subscriber(channel);

        info!(
            broker = %self.config.bus.host,
            sensor_topic = %self.config.bus.sensor_topic,
            period_secs = self.config.schedule.period_secs,
            "Capture agent running"
        );

        let (subscriber_stats, cycle_stats) =
            supervise(scheduler, subscriber, connection, shutdown, grace).await?;

        Ok(AgentStats {
            duration: start_time.elapsed(),
            subscriber: subscriber_stats,
            cycles: cycle_stats,
        })
    }

    /// Run exactly one capture cycle with the subscriber feeding readings
    ///
    /// Waits up to [`FIRST_READING_WAIT`] for a retained or fresh reading so
    /// the tag and the LED restore see the current sensor state.
    pub async fn run_once(self) -> Result<CycleRecord> {
        let channel = Arc::new(SensorChannel::new());
        let (bus, mut connection) = MqttBus::open(&self.config.bus);
        let scheduler = self.build_scheduler(bus, Arc::clone(&channel))?;

        let bus_shutdown = CancellationToken::new();
        let subscriber = self.subscriber(Arc::clone(&channel));
        let subscriber = tokio::spawn({
            let token = bus_shutdown.clone();
            async move { subscriber.run(&mut connection, token).await }
        });

        if !wait_for_reading(&channel, FIRST_READING_WAIT).await {
            warn!(
                wait_secs = FIRST_READING_WAIT.as_secs(),
                "No sensor reading yet, LED will be restored to off"
            );
        }

        let record = scheduler.run_cycle().await;

        bus_shutdown.cancel();
        join_with_grace("subscriber", subscriber, Duration::from_secs(5)).await?;
        Ok(record)
    }

    fn subscriber(&self, channel: Arc<SensorChannel>) -> BusSubscriber {
        BusSubscriber::new(&self.config.bus.sensor_topic, channel)
            .with_reconnect_delay(self.config.bus.reconnect_delay())
    }

    fn build_scheduler(&self, bus: MqttBus, channel: Arc<SensorChannel>) -> Result<AgentScheduler> {
        let config = &self.config;

        std::fs::create_dir_all(&config.camera.capture_dir)
            .map_err(|e| CliError::startup("capture directory", e))?;

        let store = ConfiguredStore::from_config(&config.upload)
            .map_err(|e| CliError::startup("upload store", e))?;

        let handshake = LedHandshake::from_config(
            bus,
            Arc::clone(&channel),
            &config.bus,
            config.schedule.settle(),
        );
        let capturer = Capturer::new(
            ConfiguredCamera::from_config(&config.camera),
            config.camera.resolution(),
            &config.camera.capture_dir,
        );
        let tagger = MetadataTagger::from_config(channel, &config.tagging);
        let uploader = Uploader::from_config(store, &config.upload);

        Ok(CycleScheduler::new(
            handshake,
            capturer,
            tagger,
            uploader,
            &config.schedule,
        ))
    }
}

/// Run the scheduler and the subscriber until `shutdown` fires
///
/// The subscriber has its own token and is stopped only after the scheduler
/// has been joined: LED commands ride on the subscriber's connection, so the
/// restore of an in-flight cycle must go out before the disconnect.
async fn supervise<P, C, S, B>(
    scheduler: CycleScheduler<P, C, S>,
    subscriber: BusSubscriber,
    mut connection: B,
    shutdown: CancellationToken,
    grace: Duration,
) -> Result<(Option<SubscriberStats>, Option<CycleMetricsAggregator>)>
where
    P: BusPublisher + Sync + 'static,
    C: Camera + Sync + 'static,
    S: ObjectStore + Sync + 'static,
    B: BusConnection + 'static,
{
    let bus_shutdown = CancellationToken::new();
    let subscriber = tokio::spawn({
        let token = bus_shutdown.clone();
        async move { subscriber.run(&mut connection, token).await }
    });
    let cycles = tokio::spawn({
        let token = shutdown.clone();
        async move { scheduler.run(token).await }
    });

    shutdown.cancelled().await;
    info!(grace_secs = grace.as_secs(), "Stopping tasks");

    let cycle_stats = join_with_grace("scheduler", cycles, grace).await;
    bus_shutdown.cancel();
    let subscriber_stats = join_with_grace("subscriber", subscriber, grace).await;

    Ok((subscriber_stats?, cycle_stats?))
}

/// Poll the channel until it holds a reading or `wait` elapses
async fn wait_for_reading(channel: &SensorChannel, wait: Duration) -> bool {
    let poll = async {
        while channel.update_count() == 0 {
            tokio::time::sleep(FIRST_READING_POLL).await;
        }
    };
    let arrived = tokio::time::timeout(wait, poll).await.is_ok();
    debug!(arrived, "First sensor reading wait finished");
    arrived
}

/// Await a task for at most `grace`
///
/// Returns `Ok(None)` when the task had to be aborted.
async fn join_with_grace<T>(
    task: &str,
    mut handle: JoinHandle<T>,
    grace: Duration,
) -> Result<Option<T>> {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(e)) => Err(CliError::task(task, e).into()),
        Err(_) => {
            warn!(task, grace_secs = grace.as_secs(), "Task did not stop in time, aborting");
            handle.abort();
            Ok(None)
        }
    }
}
