//! Typed view over a parsed `world.json` document.
//!
//! The document is kept as a JSON tree so that a rewrite reproduces every
//! field the inspector does not understand. Reads and writes go through
//! named accessors; a missing or mistyped field is reported at the accessor
//! with its dotted path instead of surfacing later as a bad number.

use std::fmt;

use save_proto::{Grid, SettingName};
use serde::{Deserialize, Serialize};
use serde_json::{ser::PrettyFormatter, Map, Value};
use thiserror::Error;

use crate::grid::{parse_packed_grid, GridError};

const SINGLETONS: &str = "Singletons";
const TIMESTAMP: &str = "Timestamp";

/// Location of a field inside one singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLocator {
    pub singleton: &'static str,
    pub path: &'static [&'static str],
}

impl FieldLocator {
    pub const fn new(singleton: &'static str, path: &'static [&'static str]) -> Self {
        Self { singleton, path }
    }
}

impl fmt::Display for FieldLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", SINGLETONS, self.singleton)?;
        for segment in self.path {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

/// Per-tile arrays tracked by the inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridField {
    WaterDepth,
    Contamination,
    SoilMoisture,
    SoilContamination,
    EvaporationModifier,
}

impl GridField {
    pub const ALL: [GridField; 5] = [
        GridField::WaterDepth,
        GridField::Contamination,
        GridField::SoilMoisture,
        GridField::SoilContamination,
        GridField::EvaporationModifier,
    ];

    pub const fn locator(self) -> FieldLocator {
        match self {
            GridField::WaterDepth => FieldLocator::new("WaterMap", &["WaterDepths", "Array"]),
            GridField::Contamination => {
                FieldLocator::new("ContaminationMap", &["Contaminations", "Array"])
            }
            GridField::SoilMoisture => {
                FieldLocator::new("SoilMoistureSimulator", &["MoistureLevels", "Array"])
            }
            GridField::SoilContamination => FieldLocator::new(
                "SoilContaminationSimulator",
                &["ContaminationLevels", "Array"],
            ),
            GridField::EvaporationModifier => {
                FieldLocator::new("WaterEvaporationMap", &["EvaporationModifiers", "Array"])
            }
        }
    }
}

/// Where each tunable weather duration lives.
pub const fn setting_locator(name: SettingName) -> FieldLocator {
    match name {
        SettingName::TemperateMin => FieldLocator::new(
            "TemperateWeatherDurationService",
            &["MinTemperateWeatherDuration"],
        ),
        SettingName::TemperateMax => FieldLocator::new(
            "TemperateWeatherDurationService",
            &["MaxTemperateWeatherDuration"],
        ),
        SettingName::DroughtMin => FieldLocator::new("DroughtWeather", &["MinDroughtDuration"]),
        SettingName::DroughtMax => FieldLocator::new("DroughtWeather", &["MaxDroughtDuration"]),
        SettingName::BadtideMin => {
            FieldLocator::new("BadtideWeather", &["MinBadtideWeatherDuration"])
        }
        SettingName::BadtideMax => {
            FieldLocator::new("BadtideWeather", &["MaxBadtideWeatherDuration"])
        }
    }
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("world document is not a JSON object")]
    NotAnObject,
    #[error("missing field {0}")]
    MissingField(String),
    #[error("field {path} is not {expected}")]
    WrongType { path: String, expected: &'static str },
    #[error("malformed record {path}: {source}")]
    Record {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("array {path}: {source}")]
    Grid {
        path: String,
        #[source]
        source: GridError,
    },
}

impl WorldError {
    /// True when an array length disagrees with the declared map size.
    pub fn is_shape(&self) -> bool {
        matches!(
            self,
            WorldError::Grid {
                source: GridError::Shape(_),
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: u32,
    pub height: u32,
}

impl MapSize {
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HazardousWeatherState {
    pub hazardous_weather_duration: i64,
    pub is_drought: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherServiceState {
    pub cycle: i64,
    pub cycle_day: i64,
    pub temperate_weather_duration: i64,
}

/// A parsed world document, owned by one read/modify/write cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldDocument {
    root: Value,
}

impl WorldDocument {
    pub fn from_value(root: Value) -> Result<Self, WorldError> {
        if root.is_object() {
            Ok(Self { root })
        } else {
            Err(WorldError::NotAnObject)
        }
    }

    /// Parse raw document bytes. A leading UTF-8 byte order mark is ignored.
    pub fn from_slice(bytes: &[u8]) -> Result<Value, serde_json::Error> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        serde_json::from_slice(bytes)
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Serialize as indented JSON; an indent of zero writes compact JSON.
    pub fn to_json_bytes(&self, indent: usize) -> serde_json::Result<Vec<u8>> {
        if indent == 0 {
            return serde_json::to_vec(&self.root);
        }
        let indent = vec![b' '; indent];
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(&indent);
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.root.serialize(&mut serializer)?;
        Ok(out)
    }

    /// The save instant, used as the history key.
    pub fn timestamp(&self) -> Option<String> {
        match self.root.get(TIMESTAMP)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn map_size(&self) -> Result<MapSize, WorldError> {
        const WIDTH: FieldLocator = FieldLocator::new("MapSize", &["Size", "X"]);
        const HEIGHT: FieldLocator = FieldLocator::new("MapSize", &["Size", "Y"]);
        Ok(MapSize {
            width: self.dimension(WIDTH)?,
            height: self.dimension(HEIGHT)?,
        })
    }

    pub fn has_singleton(&self, name: &str) -> bool {
        self.root
            .get(SINGLETONS)
            .and_then(|singletons| singletons.get(name))
            .is_some()
    }

    /// Read one tracked array, reshaped and transposed to `(width, height)`.
    pub fn grid(&self, field: GridField) -> Result<Grid, WorldError> {
        let size = self.map_size()?;
        self.grid_with_size(field, size)
    }

    pub(crate) fn grid_with_size(&self, field: GridField, size: MapSize) -> Result<Grid, WorldError> {
        let locator = field.locator();
        let packed = self.field(locator)?.as_str().ok_or_else(|| WorldError::WrongType {
            path: locator.to_string(),
            expected: "a string",
        })?;
        parse_packed_grid(packed, size.width, size.height).map_err(|source| WorldError::Grid {
            path: locator.to_string(),
            source,
        })
    }

    pub fn hazardous_weather(&self) -> Result<HazardousWeatherState, WorldError> {
        self.record("HazardousWeatherService")
    }

    pub fn weather_service(&self) -> Result<WeatherServiceState, WorldError> {
        self.record("WeatherService")
    }

    pub fn setting(&self, name: SettingName) -> Result<i64, WorldError> {
        let locator = setting_locator(name);
        let value = self.field(locator)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            .ok_or_else(|| WorldError::WrongType {
                path: locator.to_string(),
                expected: "a number",
            })
    }

    pub fn set_setting(&mut self, name: SettingName, value: i64) -> Result<(), WorldError> {
        let locator = setting_locator(name);
        let slot = self.field_mut(locator)?;
        *slot = Value::from(value);
        Ok(())
    }

    pub fn field(&self, locator: FieldLocator) -> Result<&Value, WorldError> {
        let mut current = self.singleton(locator.singleton)?;
        for segment in locator.path {
            current = current
                .get(segment)
                .ok_or_else(|| WorldError::MissingField(locator.to_string()))?;
        }
        Ok(current)
    }

    fn field_mut(&mut self, locator: FieldLocator) -> Result<&mut Value, WorldError> {
        let missing = || WorldError::MissingField(locator.to_string());
        let mut current = self
            .singletons_mut()?
            .get_mut(locator.singleton)
            .ok_or_else(missing)?;
        for segment in locator.path {
            current = current.get_mut(segment).ok_or_else(missing)?;
        }
        Ok(current)
    }

    fn singleton(&self, name: &str) -> Result<&Value, WorldError> {
        self.root
            .get(SINGLETONS)
            .ok_or_else(|| WorldError::MissingField(SINGLETONS.to_string()))?
            .get(name)
            .ok_or_else(|| WorldError::MissingField(format!("{SINGLETONS}.{name}")))
    }

    fn singletons_mut(&mut self) -> Result<&mut Map<String, Value>, WorldError> {
        match self.root.get_mut(SINGLETONS) {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(WorldError::WrongType {
                path: SINGLETONS.to_string(),
                expected: "an object",
            }),
            None => Err(WorldError::MissingField(SINGLETONS.to_string())),
        }
    }

    fn record<'a, T: Deserialize<'a>>(&'a self, name: &str) -> Result<T, WorldError> {
        let value = self.singleton(name)?;
        T::deserialize(value).map_err(|source| WorldError::Record {
            path: format!("{SINGLETONS}.{name}"),
            source,
        })
    }

    fn dimension(&self, locator: FieldLocator) -> Result<u32, WorldError> {
        self.field(locator)?
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| WorldError::WrongType {
                path: locator.to_string(),
                expected: "a non-negative integer",
            })
    }
}
