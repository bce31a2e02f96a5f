use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Edge length of the lamp screen grid
pub const SCREEN_SIZE: usize = 31;

/// One point-in-time machine state as published by the simulator.
///
/// Snapshots are opaque to the pacing layer: only "newest wins" matters there.
/// All fields default on deserialization so a partial payload still parses;
/// absent sections stay empty and are simply not painted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimSnapshot {
    /// Program counter in its display form (zero-padded decimal)
    #[serde(default)]
    pub pc: String,

    /// Register file, keyed by display name (R00..R31)
    #[serde(default)]
    pub registers: BTreeMap<String, String>,

    /// Read-only ports (P0..P7)
    #[serde(default)]
    pub ps: BTreeMap<String, String>,

    /// Write-only ports (P0..P7)
    #[serde(default)]
    pub pd: BTreeMap<String, String>,

    /// Data memory cells (D000..D255)
    #[serde(default)]
    pub data_memory: BTreeMap<String, String>,

    /// Branch condition flags (BEQ, BNE, BLT, BGT)
    #[serde(default)]
    pub alu_flags: BTreeMap<String, bool>,

    /// Call stack slots, keyed by depth (00..15)
    #[serde(default)]
    pub call_stack: BTreeMap<String, String>,

    /// Letter display content
    #[serde(default)]
    pub letters: String,

    /// Small number display ("___" while disabled)
    #[serde(default)]
    pub number: String,

    /// 16-bit number display
    #[serde(default)]
    pub big_number: String,

    /// Lamp screen, row-major, one byte per pixel (0 = off)
    #[serde(default)]
    pub screen: Vec<Vec<u8>>,

    /// Preprocessed source listing, one instruction per line
    #[serde(default)]
    pub listing: Vec<String>,

    /// Index into `listing` of the instruction the pc points at
    #[serde(default)]
    pub current_line: usize,

    /// Whether the simulator clock is currently free-running
    #[serde(default)]
    pub running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_payload_parses_with_defaults() {
        let raw = r#"{"pc": "0004", "current_line": 4}"#;
        let snapshot: SimSnapshot = serde_json::from_str(raw).unwrap();

        assert_eq!(snapshot.pc, "0004");
        assert_eq!(snapshot.current_line, 4);
        assert!(snapshot.registers.is_empty());
        assert!(snapshot.screen.is_empty());
        assert!(!snapshot.running);
    }

    #[test]
    fn full_payload_round_trips() {
        let mut snapshot = SimSnapshot::default();
        snapshot.pc = "0012".to_string();
        snapshot
            .registers
            .insert("R01".to_string(), "00042".to_string());
        snapshot.alu_flags.insert("BEQ".to_string(), true);
        snapshot.screen = vec![vec![0; SCREEN_SIZE]; SCREEN_SIZE];
        snapshot.listing = vec!["ADI R1 R0 1".to_string(), "HLT".to_string()];
        snapshot.current_line = 1;

        let encoded = serde_json::to_string(&snapshot).unwrap();
        let decoded: SimSnapshot = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, snapshot);
    }
}
