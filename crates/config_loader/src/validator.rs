//! Config validation
//!
//! Rules:
//! - bus host and topics are non-empty, port > 0
//! - sensor topic differs from the control topic
//! - LED commands are published at least once
//! - resolution > 0
//! - tag id is not one of the structural TIFF/Exif tags
//! - drive store has a credential path, local store has a root,
//!   every store has a folder id
//! - max_attempts >= 1, period > 0

use contracts::{AgentConfig, ContractError, DeliveryGuarantee, StoreKind};

/// Tags whose values are synthesized when the Exif block is rewritten
const STRUCTURAL_TAGS: &[u16] = &[
    273,   // StripOffsets
    279,   // StripByteCounts
    324,   // TileOffsets
    325,   // TileByteCounts
    513,   // JPEGInterchangeFormat
    514,   // JPEGInterchangeFormatLength
    34665, // ExifIFDPointer
    34853, // GPSInfoIFDPointer
    40965, // InteropIFDPointer
];

/// Validate an [`AgentConfig`]
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &AgentConfig) -> Result<(), ContractError> {
    validate_bus(config)?;
    validate_camera(config)?;
    validate_tagging(config)?;
    validate_upload(config)?;
    validate_schedule(config)?;
    Ok(())
}

fn validate_bus(config: &AgentConfig) -> Result<(), ContractError> {
    let bus = &config.bus;
    require_non_empty("bus.host", &bus.host)?;
    require_non_empty("bus.sensor_topic", &bus.sensor_topic)?;
    require_non_empty("bus.control_topic", &bus.control_topic)?;
    require_non_empty("bus.client_id", &bus.client_id)?;

    if bus.port == 0 {
        return Err(ContractError::config_validation(
            "bus.port",
            "port must be > 0",
        ));
    }

    if bus.sensor_topic == bus.control_topic {
        return Err(ContractError::config_validation(
            "bus.control_topic",
            format!(
                "control topic '{}' must differ from the sensor topic",
                bus.control_topic
            ),
        ));
    }

    if bus.control_qos == DeliveryGuarantee::AtMostOnce {
        return Err(ContractError::config_validation(
            "bus.control_qos",
            "LED commands need at_least_once or exactly_once delivery",
        ));
    }

    if bus.password.is_some() && bus.username.is_none() {
        return Err(ContractError::config_validation(
            "bus.username",
            "password given without username",
        ));
    }

    Ok(())
}

fn validate_camera(config: &AgentConfig) -> Result<(), ContractError> {
    let camera = &config.camera;
    if camera.width == 0 || camera.height == 0 {
        return Err(ContractError::config_validation(
            "camera.width / camera.height",
            format!(
                "resolution must be > 0, got {}x{}",
                camera.width, camera.height
            ),
        ));
    }
    require_non_empty("camera.command", &camera.command)
}

fn validate_tagging(config: &AgentConfig) -> Result<(), ContractError> {
    let tagging = &config.tagging;
    require_non_empty("tagging.prefix", &tagging.prefix)?;

    if tagging.tag_id == 0 || STRUCTURAL_TAGS.contains(&tagging.tag_id) {
        return Err(ContractError::config_validation(
            "tagging.tag_id",
            format!("tag id {} is reserved", tagging.tag_id),
        ));
    }
    Ok(())
}

fn validate_upload(config: &AgentConfig) -> Result<(), ContractError> {
    let upload = &config.upload;
    require_non_empty("upload.folder_id", &upload.folder_id)?;

    if upload.store == StoreKind::Drive && upload.credential_path.is_none() {
        return Err(ContractError::config_validation(
            "upload.credential_path",
            "drive store requires a service-account key path",
        ));
    }

    if upload.store == StoreKind::Local && upload.local_root.is_none() {
        return Err(ContractError::config_validation(
            "upload.local_root",
            "local store requires a target directory",
        ));
    }

    if upload.max_attempts == 0 {
        return Err(ContractError::config_validation(
            "upload.max_attempts",
            "max_attempts must be >= 1",
        ));
    }
    Ok(())
}

fn validate_schedule(config: &AgentConfig) -> Result<(), ContractError> {
    if config.schedule.period_secs == 0 {
        return Err(ContractError::config_validation(
            "schedule.period_secs",
            "period must be > 0",
        ));
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Err(ContractError::config_validation(
            field,
            "value cannot be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_toml;

    fn base() -> AgentConfig {
        parse_toml(
            r#"
[bus]
host = "broker"
sensor_topic = "sensors"

[upload]
credential_path = "/etc/key.json"
folder_id = "folder"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_base_is_valid() {
        assert!(validate(&base()).is_ok());
    }

    #[test]
    fn test_same_topics_rejected() {
        let mut config = base();
        config.bus.control_topic = "sensors".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("bus.control_topic"));
    }

    #[test]
    fn test_fire_and_forget_control_rejected() {
        let config = parse_toml(
            r#"
[bus]
host = "broker"
sensor_topic = "sensors"
control_qos = "at_most_once"

[upload]
credential_path = "/etc/key.json"
folder_id = "folder"
"#,
        )
        .unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("bus.control_qos"));

        let mut config = config;
        config.bus.control_qos = DeliveryGuarantee::AtLeastOnce;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = base();
        config.upload.max_attempts = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_drive_requires_credentials() {
        let mut config = base();
        config.upload.credential_path = None;
        assert!(validate(&config).is_err());

        config.upload.store = StoreKind::Local;
        config.upload.local_root = Some("/srv/photos".into());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_local_requires_root() {
        let mut config = base();
        config.upload.store = StoreKind::Local;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("upload.local_root"));
    }

    #[test]
    fn test_reserved_tag_rejected() {
        let mut config = base();
        config.tagging.tag_id = 34665;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let mut config = base();
        config.camera.height = 0;
        assert!(validate(&config).is_err());
    }
}
