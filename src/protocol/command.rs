//! Outbound commands and the reply-tag table.
//!
//! A command is a name plus flat string parameters. On the wire it is a JSON
//! object whose `command` field carries the name:
//!
//! ```json
//! { "command": "set_setting", "camera_id": "cam-1", "setting": "iso", "value": "400" }
//! ```
//!
//! Every parameter value is sent as text. Numbers and booleans are
//! stringified when they are added.
//!
//! # Reply Tags
//!
//! | Command | Reply tag |
//! |---------|-----------|
//! | `discover` | `discovery_result` |
//! | `connect` | `connect_result` |
//! | `disconnect` | `disconnect_result` |
//! | `status` | `status` |
//! | `single_shot` | `shot_result` |
//! | `get_settings` | `settings` |
//! | `set_setting` | `setting_result` |
//! | `sync_settings` | `sync_result` |
//! | `set_transfer_path` | `transfer_path_result` |
//!
//! Anything else, including the heartbeat `ping`, is fire-and-forget.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// Constants
// ============================================================================

/// Name of the heartbeat command.
pub const PING: &str = "ping";

/// Field carrying the command name on the wire.
const COMMAND_FIELD: &str = "command";

// ============================================================================
// Reply Table
// ============================================================================

/// Returns the inbound tag a command expects as its reply.
///
/// `None` means the command is fire-and-forget.
#[must_use]
pub fn expected_reply(command: &str) -> Option<&'static str> {
    match command {
        "discover" => Some("discovery_result"),
        "connect" => Some("connect_result"),
        "disconnect" => Some("disconnect_result"),
        "status" => Some("status"),
        "single_shot" => Some("shot_result"),
        "get_settings" => Some("settings"),
        "set_setting" => Some("setting_result"),
        "sync_settings" => Some("sync_result"),
        "set_transfer_path" => Some("transfer_path_result"),
        _ => None,
    }
}

// ============================================================================
// Command
// ============================================================================

/// A command sent from the client to the camera server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command name.
    command: String,

    /// Parameters, all stringified.
    #[serde(flatten)]
    params: BTreeMap<String, String>,
}

impl Command {
    /// Creates a command with no parameters.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            command: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter, converting the value to text.
    ///
    /// The `command` key is reserved for the name and is ignored here.
    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        if key == COMMAND_FIELD {
            warn!(command = %self.command, "Ignoring reserved parameter name 'command'");
            return self;
        }
        self.params.insert(key, value.to_string());
        self
    }

    /// Returns the command name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.command
    }

    /// Returns a parameter value.
    #[inline]
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the reply tag this command waits for, if any.
    #[inline]
    #[must_use]
    pub fn expected_reply(&self) -> Option<&'static str> {
        expected_reply(&self.command)
    }

    /// Serializes the command to a wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_frame(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

// ============================================================================
// Known Commands
// ============================================================================

impl Command {
    /// Scans for cameras reachable by the server.
    #[inline]
    #[must_use]
    pub fn discover() -> Self {
        Self::new("discover")
    }

    /// Opens a session with a camera.
    #[inline]
    #[must_use]
    pub fn connect_camera(camera_id: impl ToString) -> Self {
        Self::new("connect").arg("camera_id", camera_id)
    }

    /// Closes the session with a camera.
    #[inline]
    #[must_use]
    pub fn disconnect_camera(camera_id: impl ToString) -> Self {
        Self::new("disconnect").arg("camera_id", camera_id)
    }

    /// Requests the server status, including the camera list.
    #[inline]
    #[must_use]
    pub fn status() -> Self {
        Self::new("status")
    }

    /// Triggers a single capture.
    #[inline]
    #[must_use]
    pub fn single_shot(camera_id: impl ToString) -> Self {
        Self::new("single_shot").arg("camera_id", camera_id)
    }

    /// Reads all settings of a camera.
    #[inline]
    #[must_use]
    pub fn get_settings(camera_id: impl ToString) -> Self {
        Self::new("get_settings").arg("camera_id", camera_id)
    }

    /// Changes one setting of a camera.
    #[inline]
    #[must_use]
    pub fn set_setting(
        camera_id: impl ToString,
        setting: impl ToString,
        value: impl ToString,
    ) -> Self {
        Self::new("set_setting")
            .arg("camera_id", camera_id)
            .arg("setting", setting)
            .arg("value", value)
    }

    /// Copies the settings of one camera to the others.
    #[inline]
    #[must_use]
    pub fn sync_settings(camera_id: impl ToString) -> Self {
        Self::new("sync_settings").arg("camera_id", camera_id)
    }

    /// Sets where captured files are transferred.
    #[inline]
    #[must_use]
    pub fn set_transfer_path(path: impl ToString) -> Self {
        Self::new("set_transfer_path").arg("path", path)
    }

    /// Heartbeat keepalive.
    #[inline]
    #[must_use]
    pub fn ping() -> Self {
        Self::new(PING)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::{Value, json};

    #[test]
    fn test_status_serialization() {
        let frame = Command::status().to_frame().expect("serialize");
        assert_eq!(frame, r#"{"command":"status"}"#);
    }

    #[test]
    fn test_params_are_stringified() {
        let command = Command::set_setting("cam-1", "iso", 400).arg("bulb", true);
        let value: Value = serde_json::from_str(&command.to_frame().expect("serialize"))
            .expect("valid json");

        assert_eq!(
            value,
            json!({
                "command": "set_setting",
                "camera_id": "cam-1",
                "setting": "iso",
                "value": "400",
                "bulb": "true"
            })
        );
    }

    #[test]
    fn test_reserved_key_ignored() {
        let command = Command::status().arg("command", "single_shot");
        assert_eq!(command.name(), "status");
        assert_eq!(command.param("command"), None);
    }

    #[test]
    fn test_reply_table() {
        assert_eq!(Command::discover().expected_reply(), Some("discovery_result"));
        assert_eq!(Command::connect_camera(1).expected_reply(), Some("connect_result"));
        assert_eq!(Command::status().expected_reply(), Some("status"));
        assert_eq!(Command::single_shot("a").expected_reply(), Some("shot_result"));
        assert_eq!(
            Command::set_transfer_path("/tmp").expected_reply(),
            Some("transfer_path_result")
        );
    }

    #[test]
    fn test_fire_and_forget() {
        assert_eq!(Command::ping().expected_reply(), None);
        assert_eq!(Command::new("custom_thing").expected_reply(), None);
    }

    #[test]
    fn test_display_is_name() {
        assert_eq!(Command::single_shot("cam").to_string(), "single_shot");
    }

    proptest! {
        #[test]
        fn prop_numeric_params_travel_as_text(n in any::<i64>(), f in any::<bool>()) {
            let command = Command::new("x").arg("n", n).arg("f", f);
            let value: Value = serde_json::from_str(&command.to_frame().unwrap()).unwrap();
            let n_text = n.to_string();
            let f_text = f.to_string();
            prop_assert_eq!(value["n"].as_str(), Some(n_text.as_str()));
            prop_assert_eq!(value["f"].as_str(), Some(f_text.as_str()));
        }
    }
}
