//! Durable log line encoding
//!
//! Records are written as newline-delimited JSON. A snapshot line is flat:
//!
//! ```text
//! {"sequence":12,"realtime":2.4,"level_name":"Forge","px":1.5,"py":-3.0,
//!  "vx":0.0,"vy":0.0,"health":3.0,"max_health":4.0,"looking_angle":90.0,
//!  "blanks":2,"money":15,"keys":1}
//! ```
//!
//! A marker line is tagged with `"type":"mark"`. Absent values use the `-1`
//! sentinel and an unknown location is written as the `"unknown"` label, so
//! every line carries the same field set.

use crate::error::Result;
use crate::types::{Marker, Record, Snapshot, Vec2, ABSENT};
use serde::Serialize;

#[derive(Serialize)]
struct SnapshotLine<'a> {
    sequence: u64,
    realtime: f64,
    level_name: &'a str,
    px: f64,
    py: f64,
    vx: f64,
    vy: f64,
    health: f64,
    max_health: f64,
    looking_angle: f64,
    blanks: i64,
    money: i64,
    keys: i64,
}

/// serde_json writes non-finite floats as `null`
fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

impl<'a> From<&'a Snapshot> for SnapshotLine<'a> {
    fn from(s: &'a Snapshot) -> Self {
        let p = &s.player;
        let pos = p.position.unwrap_or(Vec2::ZERO);
        let vel = p.velocity.unwrap_or(Vec2::ZERO);
        Self {
            sequence: s.sequence,
            realtime: s.realtime,
            level_name: &s.location,
            px: finite_or(pos.x, 0.0),
            py: finite_or(pos.y, 0.0),
            vx: finite_or(vel.x, 0.0),
            vy: finite_or(vel.y, 0.0),
            health: finite_or(p.health, ABSENT),
            max_health: finite_or(p.max_health, ABSENT),
            looking_angle: finite_or(p.looking_angle, ABSENT),
            blanks: p.blanks,
            money: p.money,
            keys: p.keys,
        }
    }
}

#[derive(Serialize)]
struct MarkerLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    sequence: u64,
    realtime: f64,
    label: &'a str,
}

/// Encode a snapshot as one log line (without the trailing newline)
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string(&SnapshotLine::from(snapshot))?)
}

/// Encode a marker as one log line (without the trailing newline)
pub fn encode_marker(marker: &Marker) -> Result<String> {
    Ok(serde_json::to_string(&MarkerLine {
        kind: "mark",
        sequence: marker.sequence,
        realtime: marker.realtime,
        label: &marker.label,
    })?)
}

/// Encode any record as one log line
pub fn encode_record(record: &Record) -> Result<String> {
    match record {
        Record::Snapshot(s) => encode_snapshot(s),
        Record::Marker(m) => encode_marker(m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_empty_snapshot_uses_sentinels() {
        let line = encode_snapshot(&Snapshot::empty(1, 0.5)).unwrap();
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["sequence"], json!(1));
        assert_eq!(v["realtime"], json!(0.5));
        assert_eq!(v["level_name"], json!("unknown"));
        assert_eq!(v["px"], json!(0.0));
        assert_eq!(v["health"], json!(-1.0));
        assert_eq!(v["keys"], json!(-1));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_non_finite_values_keep_the_schema() {
        let mut snap = Snapshot::empty(1, 0.2);
        snap.player.health = f64::NAN;
        snap.player.max_health = f64::INFINITY;
        snap.player.position = Some(Vec2::new(f64::NAN, 3.0));

        let line = encode_snapshot(&snap).unwrap();
        assert!(!line.contains("null"));
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["health"], json!(-1.0));
        assert_eq!(v["max_health"], json!(-1.0));
        assert_eq!(v["px"], json!(0.0));
        assert_eq!(v["py"], json!(3.0));
    }

    #[test]
    fn test_field_order_is_stable() {
        let line = encode_snapshot(&Snapshot::empty(3, 1.0)).unwrap();
        let keys = [
            "sequence", "realtime", "level_name", "px", "py", "vx", "vy", "health",
            "max_health", "looking_angle", "blanks", "money", "keys",
        ];
        let mut last = 0;
        for k in keys {
            let pos = line.find(&format!("\"{k}\"")).unwrap();
            assert!(pos >= last, "{k} out of order");
            last = pos;
        }
    }

    #[test]
    fn test_realtime_round_trips() {
        let t = 1234.567_890_123_4;
        let line = encode_snapshot(&Snapshot::empty(1, t)).unwrap();
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["realtime"].as_f64(), Some(t));
    }

    #[test]
    fn test_marker_escapes_label() {
        let m = Marker {
            sequence: 9,
            realtime: 2.0,
            label: "boss \"phase\"\n2".to_string(),
        };
        let line = encode_record(&Record::Marker(m)).unwrap();
        assert!(!line.contains('\n'));
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["type"], json!("mark"));
        assert_eq!(v["sequence"], json!(9));
        assert_eq!(v["label"], json!("boss \"phase\"\n2"));
    }
}
