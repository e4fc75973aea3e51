//! # Integration Tests
//!
//! End-to-end scenarios across crates, without broker, camera or cloud:
//! - config file -> components
//! - bus messages -> SensorChannel -> tagged photo -> store
//! - subscriber and scheduler running side by side until shutdown

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{CameraDriver, DeliveryGuarantee, StoreKind};

    const AGENT_TOML: &str = r#"
[bus]
host = "broker.example.com"
port = 8883
username = "agent"
password = "secret"
sensor_topic = "sensors/greenhouse"
control_qos = "at_least_once"

[camera]
driver = "synthetic"
width = 640
height = 480
capture_dir = "/var/lib/capture-agent"

[upload]
store = "local"
folder_id = "greenhouse"
local_root = "/srv/photos"
max_attempts = 5

[schedule]
period_secs = 1800
retry_backlog = true
"#;

    #[test]
    fn test_full_config_round_trip() {
        let config = ConfigLoader::load_from_str(AGENT_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.bus.control_qos, DeliveryGuarantee::AtLeastOnce);
        assert_eq!(config.camera.driver, CameraDriver::Synthetic);
        assert_eq!(config.upload.store, StoreKind::Local);
        assert_eq!(config.upload.max_attempts, 5);
        assert!(config.schedule.retry_backlog);

        let json = ConfigLoader::to_json(&config).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(again.bus.sensor_topic, "sensors/greenhouse");
        assert_eq!(again.camera.resolution(), config.camera.resolution());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use capture::{read_embedded_tag, Capturer, LedHandshake, MetadataTagger, MockCamera};
    use chrono::NaiveDate;
    use contracts::{FixedClock, Resolution, ScheduleConfig};
    use ingestion::{
        BusEvent, BusSubscriber, RecordingBus, ScriptedConnection, SensorChannel,
    };
    use scheduler::CycleScheduler;
    use tokio_util::sync::CancellationToken;
    use uploader::{LocalDirStore, Uploader};

    const SENSOR_TOPIC: &str = "sensors/box1";
    const READING: &str = r#"{"ledOn":true,"temperature":21.5,"humidity":40}"#;

    type Agent = CycleScheduler<RecordingBus, MockCamera, LocalDirStore>;

    fn agent(
        channel: &Arc<SensorChannel>,
        capture_dir: &Path,
        upload_root: &Path,
        schedule: &ScheduleConfig,
    ) -> Agent {
        let noon = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        CycleScheduler::new(
            LedHandshake::new(
                RecordingBus::new(),
                Arc::clone(channel),
                "input_led",
                schedule.settle(),
            ),
            Capturer::new(MockCamera::new(), Resolution::new(64, 48), capture_dir)
                .with_clock(Arc::new(FixedClock(noon))),
            MetadataTagger::new(Arc::clone(channel), "exif", 42036),
            Uploader::new(LocalDirStore::new(upload_root), "greenhouse"),
            schedule,
        )
    }

    fn message(payload: &str) -> Result<BusEvent, contracts::BusError> {
        Ok(BusEvent::Message {
            topic: SENSOR_TOPIC.to_string(),
            payload: Bytes::copy_from_slice(payload.as_bytes()),
        })
    }

    /// Bus reading -> LED handshake -> tagged copy -> store -> local cleanup
    #[tokio::test(start_paused = true)]
    async fn test_reading_travels_into_uploaded_photo() {
        let capture_dir = tempfile::tempdir().unwrap();
        let upload_root = tempfile::tempdir().unwrap();
        let channel = Arc::new(SensorChannel::new());

        let mut connection = ScriptedConnection::new(vec![
            Ok(BusEvent::Connected),
            message("not json"),
            message(READING),
        ]);
        let subscriber = BusSubscriber::new(SENSOR_TOPIC, Arc::clone(&channel));
        let token = CancellationToken::new();
        let sub_task = tokio::spawn({
            let token = token.clone();
            async move {
                let stats = subscriber.run(&mut connection, token).await;
                (stats, connection)
            }
        });

        while channel.update_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let scheduler = agent(
            &channel,
            capture_dir.path(),
            upload_root.path(),
            &ScheduleConfig::default(),
        );
        let record = scheduler.run_cycle().await;

        token.cancel();
        let (stats, connection) = sub_task.await.unwrap();
        assert_eq!(stats.messages_applied, 1);
        assert_eq!(stats.messages_rejected, 1);
        assert_eq!(connection.subscriptions(), vec![SENSOR_TOPIC]);
        assert!(connection.is_disconnected());

        assert_eq!(scheduler.handshake().bus().payloads(), vec!["1", "true"]);
        assert!(record.uploaded());

        let uploaded = upload_root
            .path()
            .join("greenhouse")
            .join("exif_20240101120000.jpeg");
        assert!(uploaded.exists());
        assert_eq!(
            read_embedded_tag(&uploaded, 42036).await.unwrap().as_deref(),
            Some(READING)
        );

        assert!(!capture_dir.path().join("20240101120000.jpeg").exists());
        assert!(!capture_dir.path().join("exif_20240101120000.jpeg").exists());
        assert_eq!(record.sleep, Duration::from_secs(3600 - 21));
    }

    /// Without any reading the photo is still taken, tagged and uploaded
    #[tokio::test(start_paused = true)]
    async fn test_cycle_without_reading() {
        let capture_dir = tempfile::tempdir().unwrap();
        let upload_root = tempfile::tempdir().unwrap();
        let channel = Arc::new(SensorChannel::new());

        let scheduler = agent(
            &channel,
            capture_dir.path(),
            upload_root.path(),
            &ScheduleConfig::default(),
        );
        let record = scheduler.run_cycle().await;

        assert!(record.uploaded());
        assert_eq!(scheduler.handshake().bus().payloads(), vec!["1", "false"]);
        let uploaded = upload_root
            .path()
            .join("greenhouse")
            .join("exif_20240101120000.jpeg");
        assert_eq!(read_embedded_tag(&uploaded, 42036).await.unwrap(), None);
    }

    /// Both tasks share one token and stop together
    #[tokio::test(start_paused = true)]
    async fn test_tasks_stop_on_shutdown() {
        let capture_dir = tempfile::tempdir().unwrap();
        let upload_root = tempfile::tempdir().unwrap();
        let channel = Arc::new(SensorChannel::new());
        let schedule = ScheduleConfig {
            period_secs: 120,
            settle_secs: 2,
            fs_pause_secs: 1,
            retry_backlog: false,
        };

        let mut connection =
            ScriptedConnection::new(vec![Ok(BusEvent::Connected), message(READING)]);
        let subscriber = BusSubscriber::new(SENSOR_TOPIC, Arc::clone(&channel));
        let scheduler = agent(&channel, capture_dir.path(), upload_root.path(), &schedule);

        let token = CancellationToken::new();
        let sub_task = tokio::spawn({
            let token = token.clone();
            async move { subscriber.run(&mut connection, token).await }
        });
        let sched_task = tokio::spawn({
            let token = token.clone();
            async move { scheduler.run(token).await }
        });

        // Cycles start at 0 s, 120 s and 240 s
        tokio::time::sleep(Duration::from_secs(300)).await;
        token.cancel();

        let sub_stats = sub_task.await.unwrap();
        let cycles = sched_task.await.unwrap();

        assert_eq!(sub_stats.connects, 1);
        assert_eq!(sub_stats.messages_applied, 1);
        assert_eq!(cycles.total_cycles, 3);
        assert_eq!(cycles.uploads_succeeded, 3);
        assert_eq!(cycles.overruns, 0);
    }
}
