//! # Simulator Link Module
//!
//! Bidirectional event channel between the panel and the remote simulator,
//! carried over MQTT. The simulator publishes machine-state snapshots and
//! operational notices; the panel publishes transport commands, controller
//! state and speed updates. Delivery is in-order per direction but not
//! exactly-once, which the rest of the application is built around: every
//! outbound payload carries the full current state of its concern, so a lost
//! or duplicated message is healed by the next one.
//!
//! ## Module Layout
//!
//! ```text
//! link/
//! ├── config.rs        - Broker address, client id, topic prefix
//! ├── mod.rs           - Event vocabulary and wire encoding
//! └── link_handler.rs  - Session task and connection lifecycle
//! ```
//!
//! ## Topics
//!
//! All topics share one configurable prefix:
//!
//! | direction | suffix       | payload                          |
//! |-----------|--------------|----------------------------------|
//! | out       | `command`    | `{"command": "<name>"}`          |
//! | out       | `controller` | `{"controller": {"UP": 0, ...}}` |
//! | out       | `speed`      | `{"speed": <int>}`               |
//! | out       | `program`    | `{"program": "<source text>"}`   |
//! | in        | `state`      | full snapshot JSON               |
//! | in        | `error`      | `{"message": "<text>"}`          |
//! | in        | `generated`  | empty                            |

pub mod config;
pub mod link_handler;

use serde::{Deserialize, Serialize};

use crate::input::PadSnapshot;
use crate::snapshot::SimSnapshot;

pub use config::LinkConfig;
pub use link_handler::{ConnectionState, LinkHandle, LinkStatus};

// Link errors
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Failed to encode payload: {0}")]
    EncodeError(String),

    #[error("Failed to decode payload: {0}")]
    DecodeError(String),

    #[error("Failed to forward inbound event: {0}")]
    ForwardError(String),
}

/// Everything the panel can send to the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    Reset,
    Step,
    Stop,
    Continue,
    Generate,
    RequestUpdate,
    Controller(PadSnapshot),
    Speed(u32),
    Program(String),
}

impl UpstreamEvent {
    /// Topic suffix this event is published under.
    pub fn topic_suffix(&self) -> &'static str {
        match self {
            UpstreamEvent::Controller(_) => "controller",
            UpstreamEvent::Speed(_) => "speed",
            UpstreamEvent::Program(_) => "program",
            _ => "command",
        }
    }

    /// JSON payload for the wire.
    pub fn encode(&self) -> Result<Vec<u8>, LinkError> {
        let encoded = match self {
            UpstreamEvent::Controller(pad) => serde_json::to_vec(&ControllerFrame { controller: *pad }),
            UpstreamEvent::Speed(speed) => serde_json::to_vec(&SpeedFrame { speed: *speed }),
            UpstreamEvent::Program(text) => serde_json::to_vec(&ProgramFrame { program: text }),
            command => serde_json::to_vec(&CommandFrame {
                command: command.command_name(),
            }),
        };
        encoded.map_err(|e| LinkError::EncodeError(e.to_string()))
    }

    fn command_name(&self) -> &'static str {
        match self {
            UpstreamEvent::Reset => "reset",
            UpstreamEvent::Step => "step",
            UpstreamEvent::Stop => "stop",
            UpstreamEvent::Continue => "continue",
            UpstreamEvent::Generate => "generate",
            UpstreamEvent::RequestUpdate => "request_update",
            // Payload-bearing events never reach this path.
            UpstreamEvent::Controller(_) | UpstreamEvent::Speed(_) | UpstreamEvent::Program(_) => {
                "invalid"
            }
        }
    }
}

/// Inbound notices that bypass the frame scheduler and go straight to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkNotice {
    /// Transient simulator-side error, shown briefly in the status line
    Error(String),

    /// The simulator finished a generate run
    Generated,

    /// Connection lifecycle change, shown in the status bar
    Connection(ConnectionState),
}

#[derive(Serialize)]
struct CommandFrame<'a> {
    command: &'a str,
}

#[derive(Serialize)]
struct ControllerFrame {
    controller: PadSnapshot,
}

#[derive(Serialize)]
struct SpeedFrame {
    speed: u32,
}

#[derive(Serialize)]
struct ProgramFrame<'a> {
    program: &'a str,
}

#[derive(Deserialize)]
struct ErrorFrame {
    message: String,
}

/// Decode a snapshot payload from the state topic.
pub fn decode_snapshot(payload: &[u8]) -> Result<SimSnapshot, LinkError> {
    serde_json::from_slice(payload).map_err(|e| LinkError::DecodeError(e.to_string()))
}

/// Decode an error notice payload.
pub fn decode_error_message(payload: &[u8]) -> Result<String, LinkError> {
    let frame: ErrorFrame =
        serde_json::from_slice(payload).map_err(|e| LinkError::DecodeError(e.to_string()))?;
    Ok(frame.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_share_the_command_topic() {
        for event in [
            UpstreamEvent::Reset,
            UpstreamEvent::Step,
            UpstreamEvent::Stop,
            UpstreamEvent::Continue,
            UpstreamEvent::Generate,
            UpstreamEvent::RequestUpdate,
        ] {
            assert_eq!(event.topic_suffix(), "command");
        }
        assert_eq!(
            UpstreamEvent::Controller(PadSnapshot::default()).topic_suffix(),
            "controller"
        );
        assert_eq!(UpstreamEvent::Speed(1).topic_suffix(), "speed");
    }

    #[test]
    fn command_payload_carries_the_name() {
        let payload = UpstreamEvent::Step.encode().unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"command":"step"}"#
        );
    }

    #[test]
    fn controller_payload_uses_wire_names() {
        let pad = PadSnapshot {
            up: 1,
            start: 1,
            ..PadSnapshot::default()
        };
        let payload = UpstreamEvent::Controller(pad).encode().unwrap();
        let text = String::from_utf8(payload).unwrap();

        assert!(text.contains(r#""UP":1"#));
        assert!(text.contains(r#""START":1"#));
        assert!(text.contains(r#""DOWN":0"#));
    }

    #[test]
    fn error_notice_decodes_to_its_message() {
        let message =
            decode_error_message(br#"{"message": "No halt at the end of the program"}"#).unwrap();
        assert_eq!(message, "No halt at the end of the program");
    }

    #[test]
    fn malformed_inbound_payload_is_an_error_not_a_panic() {
        assert!(decode_snapshot(b"not json").is_err());
        assert!(decode_error_message(b"{}").is_err());
    }
}
