// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! The pressure matrix document.
//!
//! A single durable nested map, group to sector to [`PressureReading`], plus a
//! document-level `last_updated` timestamp. Applying a sample merges only
//! the addressed sector leaf; sibling sectors are never touched.

use crate::domain::pressure::{PressureReading, PressureSample, Trend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureMatrixDocument {
    #[serde(default)]
    pub sectors: BTreeMap<String, BTreeMap<String, PressureReading>>,
    pub last_updated: DateTime<Utc>,
}

impl PressureMatrixDocument {
    pub fn empty() -> Self {
        Self {
            sectors: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn get(&self, group: &str, sector: &str) -> Option<&PressureReading> {
        self.sectors.get(group).and_then(|g| g.get(sector))
    }

    /// Merge a sample into the addressed sector and return the stored
    /// reading. Trend compares the new pressure to the prior value at this
    /// exact key; a first-ever write is Stable.
    pub fn apply(
        &mut self,
        group: &str,
        sector: &str,
        sample: PressureSample,
        trend_threshold: u8,
        now: DateTime<Utc>,
    ) -> PressureReading {
        let previous = self.get(group, sector).map(|r| r.pressure);
        let reading = PressureReading {
            label: sample.label,
            pressure: sample.pressure,
            trend: Trend::from_delta(previous, sample.pressure, trend_threshold),
            last_check: now,
            sensor_data: sample.sensor_data,
        };
        self.sectors
            .entry(group.to_string())
            .or_default()
            .insert(sector.to_string(), reading.clone());
        self.last_updated = now;
        reading
    }

    pub fn sector_count(&self) -> usize {
        self.sectors.values().map(BTreeMap::len).sum()
    }
}
