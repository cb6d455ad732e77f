use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the six tunable weather durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingName {
    TemperateMin,
    TemperateMax,
    DroughtMin,
    DroughtMax,
    BadtideMin,
    BadtideMax,
}

impl SettingName {
    pub const ALL: [SettingName; 6] = [
        SettingName::TemperateMin,
        SettingName::TemperateMax,
        SettingName::DroughtMin,
        SettingName::DroughtMax,
        SettingName::BadtideMin,
        SettingName::BadtideMax,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingName::TemperateMin => "temperate_min",
            SettingName::TemperateMax => "temperate_max",
            SettingName::DroughtMin => "drought_min",
            SettingName::DroughtMax => "drought_max",
            SettingName::BadtideMin => "badtide_min",
            SettingName::BadtideMax => "badtide_max",
        }
    }
}

impl fmt::Display for SettingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown setting '{0}'")]
pub struct UnknownSettingName(pub String);

impl FromStr for SettingName {
    type Err = UnknownSettingName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownSettingName(s.to_string()))
    }
}

/// Current values of the six weather durations, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub temperate_min: i64,
    pub temperate_max: i64,
    pub drought_min: i64,
    pub drought_max: i64,
    pub badtide_min: i64,
    pub badtide_max: i64,
}

impl SettingsRecord {
    pub fn get(&self, name: SettingName) -> i64 {
        match name {
            SettingName::TemperateMin => self.temperate_min,
            SettingName::TemperateMax => self.temperate_max,
            SettingName::DroughtMin => self.drought_min,
            SettingName::DroughtMax => self.drought_max,
            SettingName::BadtideMin => self.badtide_min,
            SettingName::BadtideMax => self.badtide_max,
        }
    }

    pub fn set(&mut self, name: SettingName, value: i64) {
        let slot = match name {
            SettingName::TemperateMin => &mut self.temperate_min,
            SettingName::TemperateMax => &mut self.temperate_max,
            SettingName::DroughtMin => &mut self.drought_min,
            SettingName::DroughtMax => &mut self.drought_max,
            SettingName::BadtideMin => &mut self.badtide_min,
            SettingName::BadtideMax => &mut self.badtide_max,
        };
        *slot = value;
    }

    /// `(min, max)` pairs whose minimum exceeds the maximum.
    pub fn inverted_ranges(&self) -> Vec<(SettingName, SettingName)> {
        [
            (SettingName::TemperateMin, SettingName::TemperateMax),
            (SettingName::DroughtMin, SettingName::DroughtMax),
            (SettingName::BadtideMin, SettingName::BadtideMax),
        ]
        .into_iter()
        .filter(|(min, max)| self.get(*min) > self.get(*max))
        .collect()
    }
}
