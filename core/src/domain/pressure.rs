// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Pressure scoring primitives.
//!
//! Pressure is a normalized 0-100 integer: how urgently a sector needs
//! operational attention. Probes compute it with an additive rule set:
//! every violated threshold contributes a fixed point value, and the sum
//! is clamped to 100.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_PRESSURE: u8 = 100;

/// Direction of a sector's pressure relative to the previously stored value
/// at the exact same group/sector key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "STABLE")]
    Stable,
}

impl Trend {
    /// Compare a new pressure against the prior one. `None` prior (first
    /// ever write at the key) is Stable. The threshold comparison is strict:
    /// a delta of exactly `threshold` is Stable.
    pub fn from_delta(previous: Option<u8>, current: u8, threshold: u8) -> Self {
        let Some(previous) = previous else {
            return Trend::Stable;
        };
        let delta = i16::from(current) - i16::from(previous);
        if delta > i16::from(threshold) {
            Trend::Up
        } else if delta < -i16::from(threshold) {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Up => "UP",
            Trend::Down => "DOWN",
            Trend::Stable => "STABLE",
        };
        write!(f, "{s}")
    }
}

/// Additive rule tally. Rules that fire are recorded by name so the matrix
/// keeps an explanation of the score alongside the number.
#[derive(Debug, Clone, Default)]
pub struct PressureTally {
    total: u32,
    fired: Vec<(String, u8)>,
}

impl PressureTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violated rule worth `points`.
    pub fn add(&mut self, rule: impl Into<String>, points: u8) {
        self.total += u32::from(points);
        self.fired.push((rule.into(), points));
    }

    /// Record the rule only when `violated` holds.
    pub fn add_if(&mut self, violated: bool, rule: impl Into<String>, points: u8) {
        if violated {
            self.add(rule, points);
        }
    }

    /// Final score, clamped to [0, 100] no matter how many rules fired.
    pub fn score(&self) -> u8 {
        self.total.min(u32::from(MAX_PRESSURE)) as u8
    }

    pub fn fired_rules(&self) -> &[(String, u8)] {
        &self.fired
    }

    /// JSON view of the fired rules for `sensor_data`.
    pub fn to_sensor_rules(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.fired
                .iter()
                .map(|(name, points)| {
                    serde_json::json!({ "rule": name, "points": points })
                })
                .collect(),
        )
    }
}

/// What a probe produces from one `check()` pass, before the store assigns
/// the trend against the prior stored value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureSample {
    pub label: String,
    pub pressure: u8,
    #[serde(default)]
    pub sensor_data: serde_json::Value,
}

impl PressureSample {
    pub fn new(label: impl Into<String>, pressure: u8, sensor_data: serde_json::Value) -> Self {
        Self {
            label: label.into(),
            pressure: pressure.min(MAX_PRESSURE),
            sensor_data,
        }
    }
}

/// The stored per-sector reading, persisted in the pressure matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureReading {
    pub label: String,
    pub pressure: u8,
    pub trend: Trend,
    pub last_check: DateTime<Utc>,
    pub sensor_data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_is_stable() {
        assert_eq!(Trend::from_delta(None, 90, 5), Trend::Stable);
    }

    #[test]
    fn trend_threshold_is_strict() {
        assert_eq!(Trend::from_delta(Some(50), 55, 5), Trend::Stable);
        assert_eq!(Trend::from_delta(Some(50), 56, 5), Trend::Up);
        assert_eq!(Trend::from_delta(Some(50), 45, 5), Trend::Stable);
        assert_eq!(Trend::from_delta(Some(50), 44, 5), Trend::Down);
    }

    #[test]
    fn unchanged_pressure_is_stable() {
        assert_eq!(Trend::from_delta(Some(30), 30, 5), Trend::Stable);
    }

    #[test]
    fn tally_clamps_at_one_hundred() {
        let mut tally = PressureTally::new();
        for i in 0..15 {
            tally.add(format!("rule_{i}"), 30);
        }
        assert_eq!(tally.score(), 100);
        assert_eq!(tally.fired_rules().len(), 15);
    }

    #[test]
    fn tally_sums_below_the_clamp() {
        let mut tally = PressureTally::new();
        tally.add_if(true, "order_backlog", 20);
        tally.add_if(false, "error_rate", 30);
        tally.add_if(true, "stale_orders", 25);
        assert_eq!(tally.score(), 45);
    }

    #[test]
    fn trend_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Trend::Up).unwrap(), "\"UP\"");
        assert_eq!(serde_json::to_string(&Trend::Stable).unwrap(), "\"STABLE\"");
    }
}
