//! Inbound message types.
//!
//! Every frame from the server is a JSON object with a string `type` tag and
//! arbitrary other fields:
//!
//! ```json
//! { "type": "capture_complete", "camera_id": "cam-1", "filename": "IMG_0001.CR3" }
//! ```
//!
//! [`Message`] keeps the tag and the raw payload. [`Message::parse`] turns it
//! into a [`ParsedMessage`] for pattern matching. Unrecognized tags land in
//! [`ParsedMessage::Unknown`].

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::events::Severity;

// ============================================================================
// Constants
// ============================================================================

/// Tag of heartbeat acknowledgements.
pub const PONG: &str = "pong";

/// Tag of the synthetic acknowledgement returned for fire-and-forget commands.
pub const ACK: &str = "ack";

/// Field carrying the tag on the wire.
const TYPE_FIELD: &str = "type";

// ============================================================================
// Message
// ============================================================================

/// A tagged message received from the camera server.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Value of the `type` field.
    tag: String,

    /// The whole JSON object, tag included.
    payload: Value,
}

impl Message {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] if the frame is not a JSON object
    /// with a string `type` field.
    pub fn from_frame(text: &str) -> Result<Self> {
        let payload: Value = serde_json::from_str(text)
            .map_err(|e| Error::malformed(format!("invalid JSON: {e}")))?;
        Self::from_value(payload)
    }

    /// Wraps an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] if the value has no string `type`.
    pub fn from_value(payload: Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(Error::malformed("frame is not a JSON object"));
        }

        let tag = payload
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::malformed("missing string 'type' field"))?
            .to_string();

        Ok(Self { tag, payload })
    }

    /// Builds the acknowledgement returned for commands with no reply tag.
    #[must_use]
    pub fn ack(command: &str) -> Self {
        Self {
            tag: ACK.to_string(),
            payload: json!({ "type": ACK, "command": command, "success": true }),
        }
    }

    /// Returns the message tag.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the raw payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the message, returning the raw payload.
    #[inline]
    #[must_use]
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Returns `true` for heartbeat acknowledgements.
    #[inline]
    #[must_use]
    pub fn is_pong(&self) -> bool {
        self.tag == PONG
    }

    /// Parses the message into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedMessage {
        self.parse_internal()
    }

    /// Gets a string field.
    ///
    /// Numbers are rendered as text; returns an empty string if missing.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.get_optional_string(key).unwrap_or_default()
    }

    /// Gets an optional string field.
    #[must_use]
    pub fn get_optional_string(&self, key: &str) -> Option<String> {
        match self.payload.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Gets a boolean field, accepting `true` or `"true"`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        match self.payload.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Gets an unsigned integer field, accepting numbers or numeric text.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.payload.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Gets an array field, empty if missing.
    #[must_use]
    pub fn get_array(&self, key: &str) -> Vec<Value> {
        self.payload
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// ParsedMessage
// ============================================================================

/// Parsed message types for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    /// Greeting sent by the server after the socket opens.
    Welcome {
        /// Server-provided greeting.
        message: Option<String>,
    },

    /// Heartbeat acknowledgement.
    Pong,

    /// Local acknowledgement of a fire-and-forget command.
    Ack {
        /// Command that was sent.
        command: String,
    },

    /// Reply to `status`.
    Status {
        /// Cameras known to the server.
        cameras: Vec<Value>,
    },

    /// Reply to `discover`.
    DiscoveryResult {
        /// Cameras found by the scan.
        cameras: Vec<Value>,
    },

    /// Reply to `connect`.
    ConnectResult {
        /// Camera ID.
        camera_id: String,
        /// Whether the session was opened.
        success: bool,
        /// Failure description.
        error: Option<String>,
    },

    /// Reply to `single_shot`.
    ShotResult {
        /// Camera ID.
        camera_id: String,
        /// Whether the shutter fired.
        success: bool,
        /// Name of the captured file.
        filename: Option<String>,
        /// Failure description.
        error: Option<String>,
    },

    /// A camera was attached.
    CameraConnected {
        /// Camera ID.
        camera_id: String,
        /// Human-readable model name.
        name: Option<String>,
    },

    /// A camera went away.
    CameraDisconnected {
        /// Camera ID.
        camera_id: String,
    },

    /// A capture finished and the file was transferred.
    CaptureComplete {
        /// Camera ID.
        camera_id: String,
        /// File name.
        filename: String,
        /// Destination path.
        path: Option<String>,
    },

    /// A camera reported a failure.
    CameraError {
        /// Camera ID, if the error is camera-specific.
        camera_id: Option<String>,
        /// Error text.
        error: String,
    },

    /// Settings were copied across cameras.
    SettingsSynced {
        /// Source camera.
        camera_id: Option<String>,
        /// Number of cameras updated.
        count: Option<u64>,
    },

    /// A single setting changed on a camera.
    SettingChanged {
        /// Camera ID.
        camera_id: Option<String>,
        /// Setting name.
        setting: String,
        /// New value.
        value: String,
    },

    /// Unknown tag.
    Unknown {
        /// Message tag.
        tag: String,
        /// Raw payload.
        payload: Value,
    },
}

// ============================================================================
// Parsing Implementation
// ============================================================================

impl Message {
    /// Internal parsing implementation.
    fn parse_internal(&self) -> ParsedMessage {
        match self.tag.as_str() {
            "welcome" => ParsedMessage::Welcome {
                message: self.get_optional_string("message"),
            },

            PONG => ParsedMessage::Pong,

            ACK => ParsedMessage::Ack {
                command: self.get_string("command"),
            },

            "status" => ParsedMessage::Status {
                cameras: self.get_array("cameras"),
            },

            "discovery_result" => ParsedMessage::DiscoveryResult {
                cameras: self.get_array("cameras"),
            },

            "connect_result" => ParsedMessage::ConnectResult {
                camera_id: self.get_string("camera_id"),
                success: self.get_bool("success"),
                error: self.get_optional_string("error"),
            },

            "shot_result" => ParsedMessage::ShotResult {
                camera_id: self.get_string("camera_id"),
                success: self.get_bool("success"),
                filename: self.get_optional_string("filename"),
                error: self.get_optional_string("error"),
            },

            "camera_connected" => ParsedMessage::CameraConnected {
                camera_id: self.get_string("camera_id"),
                name: self.get_optional_string("name"),
            },

            "camera_disconnected" => ParsedMessage::CameraDisconnected {
                camera_id: self.get_string("camera_id"),
            },

            "capture_complete" => ParsedMessage::CaptureComplete {
                camera_id: self.get_string("camera_id"),
                filename: self.get_string("filename"),
                path: self.get_optional_string("path"),
            },

            "camera_error" => ParsedMessage::CameraError {
                camera_id: self.get_optional_string("camera_id"),
                error: self
                    .get_optional_string("error")
                    .or_else(|| self.get_optional_string("message"))
                    .unwrap_or_else(|| "unknown error".to_string()),
            },

            "settings_synced" => ParsedMessage::SettingsSynced {
                camera_id: self.get_optional_string("camera_id"),
                count: self.get_u64("count"),
            },

            "setting_changed" => ParsedMessage::SettingChanged {
                camera_id: self.get_optional_string("camera_id"),
                setting: self.get_string("setting"),
                value: self.get_string("value"),
            },

            _ => ParsedMessage::Unknown {
                tag: self.tag.clone(),
                payload: self.payload.clone(),
            },
        }
    }
}

// ============================================================================
// LogSummary
// ============================================================================

/// Human-readable summary of a well-known server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSummary {
    /// Entry severity.
    pub severity: Severity,
    /// Entry text.
    pub message: String,
    /// Camera the entry is about.
    pub device_id: Option<String>,
}

impl LogSummary {
    fn new(severity: Severity, message: impl Into<String>, device_id: Option<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            device_id: device_id.filter(|id| !id.is_empty()),
        }
    }
}

impl ParsedMessage {
    /// Returns the log entry this event produces, if it is a well-known event.
    ///
    /// Command replies, pongs and unknown tags produce nothing.
    #[must_use]
    pub fn log_summary(&self) -> Option<LogSummary> {
        let summary = match self {
            Self::Welcome { message } => LogSummary::new(
                Severity::Info,
                message
                    .clone()
                    .unwrap_or_else(|| "Connected to camera server".to_string()),
                None,
            ),

            Self::CameraConnected { camera_id, name } => LogSummary::new(
                Severity::Success,
                format!("Camera {} connected", name.as_deref().unwrap_or(camera_id)),
                Some(camera_id.clone()),
            ),

            Self::CameraDisconnected { camera_id } => LogSummary::new(
                Severity::Warning,
                format!("Camera {camera_id} disconnected"),
                Some(camera_id.clone()),
            ),

            Self::CaptureComplete {
                camera_id,
                filename,
                ..
            } => LogSummary::new(
                Severity::Success,
                format!("Captured {filename}"),
                Some(camera_id.clone()),
            ),

            Self::CameraError { camera_id, error } => LogSummary::new(
                Severity::Error,
                format!("Camera error: {error}"),
                camera_id.clone(),
            ),

            Self::SettingsSynced { camera_id, count } => LogSummary::new(
                Severity::Success,
                match count {
                    Some(n) => format!("Settings synchronized to {n} cameras"),
                    None => "Settings synchronized".to_string(),
                },
                camera_id.clone(),
            ),

            Self::SettingChanged {
                camera_id,
                setting,
                value,
            } => LogSummary::new(
                Severity::Info,
                format!("{setting} set to {value}"),
                camera_id.clone(),
            ),

            _ => return None,
        };

        Some(summary)
    }
}

/// Builds a JSON object frame from a tag and fields. Test helper.
#[cfg(test)]
pub(crate) fn frame(tag: &str, fields: Value) -> String {
    let mut object = match fields {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    object.insert(TYPE_FIELD.to_string(), Value::String(tag.to_string()));
    Value::Object(object).to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        let text = r#"{"type":"status","cameras":[{"id":"cam-1"},{"id":"cam-2"}]}"#;
        let message = Message::from_frame(text).expect("parse");

        assert_eq!(message.tag(), "status");
        match message.parse() {
            ParsedMessage::Status { cameras } => assert_eq!(cameras.len(), 2),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = Message::from_frame("{not json").unwrap_err();
        assert!(matches!(err, Error::MalformedMessage { .. }));
    }

    #[test]
    fn test_missing_type_is_malformed() {
        let err = Message::from_frame(r#"{"command":"status"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage { .. }));

        let err = Message::from_frame(r#"{"type":42}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage { .. }));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = Message::from_frame(r#"["type","status"]"#).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage { .. }));
    }

    #[test]
    fn test_pong_detection() {
        let message = Message::from_frame(r#"{"type":"pong"}"#).expect("parse");
        assert!(message.is_pong());
        assert_eq!(message.parse(), ParsedMessage::Pong);
    }

    #[test]
    fn test_shot_result_accepts_text_booleans() {
        let message = Message::from_frame(
            r#"{"type":"shot_result","camera_id":"cam-1","success":"true","filename":"IMG_1.CR3"}"#,
        )
        .expect("parse");

        match message.parse() {
            ParsedMessage::ShotResult {
                camera_id,
                success,
                filename,
                error,
            } => {
                assert_eq!(camera_id, "cam-1");
                assert!(success);
                assert_eq!(filename.as_deref(), Some("IMG_1.CR3"));
                assert!(error.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_keeps_payload() {
        let message = Message::from_frame(r#"{"type":"battery_level","level":"80"}"#)
            .expect("parse");

        match message.parse() {
            ParsedMessage::Unknown { tag, payload } => {
                assert_eq!(tag, "battery_level");
                assert_eq!(payload["level"], "80");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_ack_message() {
        let ack = Message::ack("ping");
        assert_eq!(ack.tag(), ACK);
        assert!(ack.get_bool("success"));
        assert_eq!(
            ack.parse(),
            ParsedMessage::Ack {
                command: "ping".to_string()
            }
        );
    }

    #[test]
    fn test_summary_camera_connected_prefers_name() {
        let message = Message::from_frame(&frame(
            "camera_connected",
            json!({"camera_id": "cam-1", "name": "Canon EOS R5"}),
        ))
        .expect("parse");

        let summary = message.parse().log_summary().expect("well-known");
        assert_eq!(summary.severity, Severity::Success);
        assert_eq!(summary.message, "Camera Canon EOS R5 connected");
        assert_eq!(summary.device_id.as_deref(), Some("cam-1"));
    }

    #[test]
    fn test_summary_camera_error() {
        let message = Message::from_frame(&frame(
            "camera_error",
            json!({"camera_id": "cam-2", "error": "card full"}),
        ))
        .expect("parse");

        let summary = message.parse().log_summary().expect("well-known");
        assert_eq!(summary.severity, Severity::Error);
        assert_eq!(summary.message, "Camera error: card full");
    }

    #[test]
    fn test_summary_setting_changed() {
        let message = Message::from_frame(&frame(
            "setting_changed",
            json!({"setting": "iso", "value": "800"}),
        ))
        .expect("parse");

        let summary = message.parse().log_summary().expect("well-known");
        assert_eq!(summary.severity, Severity::Info);
        assert_eq!(summary.message, "iso set to 800");
        assert!(summary.device_id.is_none());
    }

    #[test]
    fn test_summary_settings_synced_count() {
        let message = Message::from_frame(&frame("settings_synced", json!({"count": 3})))
            .expect("parse");
        let summary = message.parse().log_summary().expect("well-known");
        assert_eq!(summary.message, "Settings synchronized to 3 cameras");
    }

    #[test]
    fn test_replies_have_no_summary() {
        for text in [
            r#"{"type":"status","cameras":[]}"#,
            r#"{"type":"shot_result","success":true}"#,
            r#"{"type":"pong"}"#,
            r#"{"type":"whatever"}"#,
        ] {
            let message = Message::from_frame(text).expect("parse");
            assert!(message.parse().log_summary().is_none(), "{text}");
        }
    }

    #[test]
    fn test_capture_complete_summary() -> anyhow::Result<()> {
        let text = frame(
            "capture_complete",
            json!({"camera_id": "cam2", "filename": "IMG_0007.CR3", "path": "/photos"}),
        );
        let message = Message::from_frame(&text)?;

        let ParsedMessage::CaptureComplete { path, .. } = message.parse() else {
            anyhow::bail!("expected capture_complete, got {:?}", message.parse());
        };
        assert_eq!(path.as_deref(), Some("/photos"));

        let summary = message
            .parse()
            .log_summary()
            .ok_or_else(|| anyhow::anyhow!("capture_complete must be logged"))?;
        assert_eq!(summary.severity, Severity::Success);
        assert_eq!(summary.message, "Captured IMG_0007.CR3");
        assert_eq!(summary.device_id.as_deref(), Some("cam2"));
        Ok(())
    }
}
