// Wire messages exchanged with the telemetry relay (JSON text frames).

use serde::{Deserialize, Serialize};

use super::RawSample;

/// Outbound message. Serializes as `{"type": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Sent once after the connection opens.
    RequestData { esp32_ids: Vec<String> },
}

impl ClientMessage {
    pub fn subscribe(device_ids: &[String]) -> Self {
        ClientMessage::RequestData {
            esp32_ids: device_ids.to_vec(),
        }
    }
}

/// One device's slice of a `device_data` push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBatch {
    pub esp32_id: String,
    /// The relay sends `null` for devices with no samples yet.
    #[serde(default)]
    pub data: Option<Vec<RawSample>>,
}

impl DeviceBatch {
    pub fn samples(&self) -> &[RawSample] {
        self.data.as_deref().unwrap_or_default()
    }
}

/// Inbound message after envelope decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    DeviceData(Vec<DeviceBatch>),
    /// Relay acknowledgement or error reply (`{"status": "...", "message": "..."}`).
    Status { status: String, message: String },
    /// Any other `type`; ignored by the engine.
    Other(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ServerMessage {
    /// Decode a text frame. Fails on non-JSON input or a `device_data` message whose
    /// `data` is not a list of device batches.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let env: Envelope = serde_json::from_str(text)?;
        match env.kind.as_deref() {
            Some("device_data") => Ok(ServerMessage::DeviceData(serde_json::from_value(
                env.data,
            )?)),
            Some(other) => Ok(ServerMessage::Other(other.to_string())),
            None => match env.status {
                Some(status) => Ok(ServerMessage::Status {
                    status,
                    message: env.message.unwrap_or_default(),
                }),
                None => Ok(ServerMessage::Other(String::new())),
            },
        }
    }
}
