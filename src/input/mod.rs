//! Input edge collection and aggregation.
//!
//! Physical input reaches the panel from several independent sources: the
//! keyboard, the pointer (mouse or touch) pressing the on-screen pad, and an
//! optional physical gamepad. Every source produces bare press/release edges
//! for the eight logical pad buttons; the aggregator merges them into one
//! canonical pad state and pushes it upstream on every genuine edge.

pub mod aggregator;
pub mod gamepad;

use serde::{Deserialize, Serialize};

pub use aggregator::{AggregatorHandle, PadAggregator};
pub use gamepad::{GamepadError, GamepadHandle};

/// The logical pad buttons understood by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PadButton {
    Up,
    Down,
    Left,
    Right,
    Start,
    Select,
    X,
    Y,
}

/// Where an edge physically came from.
///
/// A button stays pressed until every source that pressed it released it, so
/// the origin has to travel with the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeSource {
    Keyboard,
    Pointer,
    Touch,
    Gamepad,
}

/// One press or release edge from one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadEdge {
    pub source: EdgeSource,
    pub button: PadButton,
    pub pressed: bool,
}

/// Full pad state as sent upstream; field names match the wire format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadSnapshot {
    #[serde(rename = "UP")]
    pub up: u8,
    #[serde(rename = "RIGHT")]
    pub right: u8,
    #[serde(rename = "DOWN")]
    pub down: u8,
    #[serde(rename = "LEFT")]
    pub left: u8,
    #[serde(rename = "START")]
    pub start: u8,
    #[serde(rename = "SELECT")]
    pub select: u8,
    #[serde(rename = "Y")]
    pub y: u8,
    #[serde(rename = "X")]
    pub x: u8,
}

// Aggregator errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to forward pad state: {0}")]
    ForwardError(String),
}
