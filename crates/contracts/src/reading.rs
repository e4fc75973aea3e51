//! SensorReading - latest payload received from the bus
//!
//! The raw text is kept verbatim because it is what gets embedded in the
//! photo; the LED flag is decoded once on arrival.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// JSON field carrying the LED desired state
pub const LED_FIELD: &str = "ledOn";

/// Reasons a bus payload is rejected
#[derive(Debug, Error)]
pub enum ReadingError {
    /// Payload is not valid UTF-8
    #[error("payload is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Payload is not valid JSON
    #[error("payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is JSON but not an object
    #[error("payload is not a json object")]
    NotAnObject,
}

/// One decoded sensor message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    raw: Arc<str>,
    led_on: Option<bool>,
}

impl SensorReading {
    pub fn new(raw: impl Into<Arc<str>>, led_on: Option<bool>) -> Self {
        Self {
            raw: raw.into(),
            led_on,
        }
    }

    /// Decode a bus payload
    ///
    /// A missing or non-boolean `ledOn` field is not an error; the LED state
    /// is simply unset.
    pub fn parse(payload: &[u8]) -> Result<Self, ReadingError> {
        let text = std::str::from_utf8(payload)?;
        let value: Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or(ReadingError::NotAnObject)?;
        let led_on = object.get(LED_FIELD).and_then(Value::as_bool);
        Ok(Self::new(text, led_on))
    }

    /// Raw payload text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Shared handle to the raw payload text
    pub fn raw_shared(&self) -> Arc<str> {
        Arc::clone(&self.raw)
    }

    /// LED desired state carried by this reading
    pub fn led_on(&self) -> Option<bool> {
        self.led_on
    }
}
