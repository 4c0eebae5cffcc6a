//! Status and location reports published to the broker.
//!
//! A publish is two stages on the link: `AT+QMTPUBEX` announcing the topic and
//! the exact payload length, then the payload bytes after the modem's `>`
//! prompt. The length is taken from the serialized payload.
use heapless::String;
use serde::Serialize;

use crate::command::{mqtt, Command};
use crate::config::TrackerConfig;
use crate::coordinate::GpsFix;
use crate::error::Error;

pub const MAX_PAYLOAD_LEN: usize = 128;

pub type Payload = String<MAX_PAYLOAD_LEN>;

/// Status value announced once the session is up and on request.
pub const STATUS_ACTIVE: &str = "ACTIVE";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PublishEnvelope {
    Status,
    Location(GpsFix),
}

#[derive(Serialize)]
struct StatusBody<'a> {
    #[serde(rename = "DEVICE_ID")]
    device_id: &'a str,
    #[serde(rename = "STATUS")]
    status: &'a str,
}

#[derive(Serialize)]
struct LocationBody<'a> {
    #[serde(rename = "DEVICE_ID")]
    device_id: &'a str,
    #[serde(rename = "LAT")]
    latitude: f64,
    #[serde(rename = "LONG")]
    longitude: f64,
}

impl PublishEnvelope {
    pub fn topic<C: TrackerConfig>(&self) -> &'static str {
        match self {
            Self::Status => C::STATUS_TOPIC,
            Self::Location(_) => C::INFO_TOPIC,
        }
    }

    pub fn serialize<C: TrackerConfig>(&self) -> Result<Payload, Error> {
        let payload = match self {
            Self::Status => serde_json_core::to_string(&StatusBody {
                device_id: C::DEVICE_ID,
                status: STATUS_ACTIVE,
            })?,
            Self::Location(fix) => serde_json_core::to_string(&LocationBody {
                device_id: C::DEVICE_ID,
                latitude: fix.latitude,
                longitude: fix.longitude,
            })?,
        };
        Ok(payload)
    }
}

/// Both stages of one publish.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub announce: Command,
    pub payload: Payload,
}

pub fn prepare<C: TrackerConfig>(envelope: &PublishEnvelope) -> Result<PublishRequest, Error> {
    let payload = envelope.serialize::<C>()?;
    let announce = mqtt::publish_announce::<C>(envelope.topic::<C>(), payload.len())?;
    Ok(PublishRequest { announce, payload })
}
