//! Data contracts shared by the save inspector core and its front ends.
//!
//! Everything here is plain data: grids in map orientation, the weather
//! summary, the six tunable weather durations, and the timestamped snapshot
//! records kept in the history store. Field names of [`Snapshot`] and
//! [`WeatherInfo`] match the legacy `historical_data.json` layout so old
//! entries decode without a translation step.

mod grid;
mod settings;

use serde::{Deserialize, Serialize};

pub use grid::{Grid, ShapeError};
pub use settings::{SettingName, SettingsRecord, UnknownSettingName};

/// Weather cycle fields projected from the hazardous-weather and weather services.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherInfo {
    pub hazardous_weather_duration: i64,
    pub is_drought: bool,
    pub cycle: i64,
    pub cycle_day: i64,
    pub temperate_weather_duration: i64,
}

impl WeatherInfo {
    /// Label used on history timelines, e.g. `[3|7]` for cycle 3 day 7.
    pub fn cycle_label(&self) -> String {
        format!("[{}|{}]", self.cycle, self.cycle_day)
    }
}

/// One timestamped capture of derived metrics and grids.
///
/// Snapshots are keyed by `timestamp`; the history store never holds two
/// records with the same key and never rewrites a stored record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub timestamp: String,
    pub clean_water_total: f64,
    pub water_levels_matrix: Grid,
    pub contamination_matrix: Grid,
    pub moisture_levels_matrix: Grid,
    pub soil_contamination_matrix: Grid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaporation_modifiers_matrix: Option<Grid>,
    pub weather_info: WeatherInfo,
    pub map_width: u32,
    pub map_height: u32,
}

impl Snapshot {
    pub fn timeline_point(&self) -> TimelinePoint {
        TimelinePoint {
            label: self.weather_info.cycle_label(),
            timestamp: self.timestamp.clone(),
            clean_water_total: self.clean_water_total,
        }
    }
}

/// Clean-water reading at one point of the stored history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelinePoint {
    pub label: String,
    pub timestamp: String,
    pub clean_water_total: f64,
}

pub fn encode_snapshot_json(snapshot: &Snapshot) -> serde_json::Result<String> {
    serde_json::to_string(snapshot)
}

pub fn decode_snapshot_json(data: &str) -> serde_json::Result<Snapshot> {
    serde_json::from_str(data)
}

/// Decode a whole-file JSON array of snapshots (the legacy history layout).
pub fn decode_snapshot_list_json(data: &str) -> serde_json::Result<Vec<Snapshot>> {
    serde_json::from_str(data)
}

pub fn encode_snapshot_list_json(snapshots: &[Snapshot]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshots)
}
