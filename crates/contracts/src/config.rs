//! AgentConfig - Config Loader output
//!
//! Describes the whole agent: bus connection, camera, tagging, upload target
//! and cadence. Loaded once at startup and read-only afterwards.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DeliveryGuarantee, Resolution};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Message bus connection
    pub bus: BusConfig,

    /// Camera settings
    #[serde(default)]
    pub camera: CameraConfig,

    /// Metadata tagging
    #[serde(default)]
    pub tagging: TaggingConfig,

    /// Cloud upload
    pub upload: UploadConfig,

    /// Cycle cadence
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl AgentConfig {
    /// Copy with secrets replaced, for printing
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.bus.password.is_some() {
            copy.bus.password = Some(REDACTED.to_string());
        }
        copy
    }
}

const REDACTED: &str = "***";

/// MQTT broker connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Broker host name
    pub host: String,

    /// Broker port (8883 for TLS)
    #[serde(default = "default_bus_port")]
    pub port: u16,

    /// Use a TLS transport
    #[serde(default = "default_true")]
    pub tls: bool,

    /// MQTT client identifier
    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Topic carrying JSON sensor readings
    pub sensor_topic: String,

    /// Topic the LED actuator listens on
    #[serde(default = "default_control_topic")]
    pub control_topic: String,

    /// Delivery guarantee for LED commands
    #[serde(default)]
    pub control_qos: DeliveryGuarantee,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Pause between polls after a connection error
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl BusConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

fn default_bus_port() -> u16 {
    8883
}

fn default_true() -> bool {
    true
}

fn default_client_id() -> String {
    "capture-agent".to_string()
}

fn default_control_topic() -> String {
    "input_led".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

/// Camera driver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraDriver {
    /// External still-capture command
    #[default]
    Command,
    /// Generated frames, no hardware
    Synthetic,
}

/// Camera settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub driver: CameraDriver,

    /// Capture command for the `command` driver
    #[serde(default = "default_camera_command")]
    pub command: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Directory holding captured and tagged photos
    #[serde(default = "default_capture_dir")]
    pub capture_dir: PathBuf,
}

impl CameraConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            driver: CameraDriver::default(),
            command: default_camera_command(),
            width: default_width(),
            height: default_height(),
            capture_dir: default_capture_dir(),
        }
    }
}

fn default_camera_command() -> String {
    "rpicam-still".to_string()
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_capture_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Metadata tagging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// File name prefix of the tagged copy
    #[serde(default = "default_tag_prefix")]
    pub prefix: String,

    /// Exif IFD tag id holding the sensor reading
    #[serde(default = "default_tag_id")]
    pub tag_id: u16,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            prefix: default_tag_prefix(),
            tag_id: default_tag_id(),
        }
    }
}

fn default_tag_prefix() -> String {
    "exif".to_string()
}

fn default_tag_id() -> u16 {
    42036
}

/// Upload target selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Google Drive folder
    #[default]
    Drive,
    /// Local directory
    Local,
}

/// Cloud upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub store: StoreKind,

    /// Service-account key file (drive store)
    #[serde(default)]
    pub credential_path: Option<PathBuf>,

    /// Destination folder id, or sub-directory for the local store
    pub folder_id: String,

    /// Directory the local store copies into
    #[serde(default)]
    pub local_root: Option<PathBuf>,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between failed attempts
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl UploadConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    10
}

/// Cycle cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Target start-to-start interval
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// LED settle time before and after the exposure
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    /// Pause between capture and tagging
    #[serde(default = "default_fs_pause_secs")]
    pub fs_pause_secs: u64,

    /// Re-upload tagged files left over from earlier failed cycles
    #[serde(default)]
    pub retry_backlog: bool,
}

impl ScheduleConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn fs_pause(&self) -> Duration {
        Duration::from_secs(self.fs_pause_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period_secs(),
            settle_secs: default_settle_secs(),
            fs_pause_secs: default_fs_pause_secs(),
            retry_backlog: false,
        }
    }
}

fn default_period_secs() -> u64 {
    3600
}

fn default_settle_secs() -> u64 {
    10
}

fn default_fs_pause_secs() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[bus]
host = "broker.local"
sensor_topic = "sensors/box1"

[upload]
folder_id = "abc123"
"#;

    #[test]
    fn test_defaults_applied() {
        let config: AgentConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.bus.port, 8883);
        assert!(config.bus.tls);
        assert_eq!(config.bus.control_topic, "input_led");
        assert_eq!(config.bus.control_qos, DeliveryGuarantee::ExactlyOnce);
        assert_eq!(config.camera.resolution(), Resolution::new(1920, 1080));
        assert_eq!(config.tagging.tag_id, 42036);
        assert_eq!(config.tagging.prefix, "exif");
        assert_eq!(config.upload.max_attempts, 3);
        assert_eq!(config.upload.backoff(), Duration::from_secs(10));
        assert_eq!(config.schedule.period(), Duration::from_secs(3600));
        assert_eq!(config.schedule.settle(), Duration::from_secs(10));
        assert_eq!(config.schedule.fs_pause(), Duration::from_secs(1));
        assert!(!config.schedule.retry_backlog);
    }

    #[test]
    fn test_redacted_hides_password() {
        let mut config: AgentConfig = toml::from_str(MINIMAL).unwrap();
        config.bus.password = Some("hunter2".to_string());
        let redacted = config.redacted();
        assert_eq!(redacted.bus.password.as_deref(), Some("***"));
        assert_eq!(config.bus.password.as_deref(), Some("hunter2"));
    }
}
