//! Inspection and editing of the six weather-duration settings.

use std::collections::BTreeMap;

use save_proto::{SettingName, SettingsRecord};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::world::{WorldDocument, WorldError};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value {value} for {name}: {reason}")]
    InvalidValue {
        name: SettingName,
        value: String,
        reason: &'static str,
    },
    #[error(transparent)]
    World(#[from] WorldError),
}

/// A partial set of new setting values, as supplied by a user.
///
/// Values stay untyped until [`SettingsEditor::update_all`] coerces them, so
/// strings and floats are accepted the same way the game's own fields are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    values: BTreeMap<SettingName, Value>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: SettingName, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: SettingName, value: impl Into<Value>) {
        self.values.insert(name, value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SettingName, &Value)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }
}

impl From<SettingsRecord> for SettingsUpdate {
    fn from(record: SettingsRecord) -> Self {
        SettingName::ALL
            .into_iter()
            .fold(SettingsUpdate::new(), |update, name| {
                update.with(name, record.get(name))
            })
    }
}

/// Convert a supplied value to the integer the game stores.
///
/// Integers pass through, finite floats truncate toward zero, and strings are
/// parsed as an integer or else as a finite float.
pub fn coerce_setting(name: SettingName, value: &Value) -> Result<i64, SettingsError> {
    let invalid = |reason| SettingsError::InvalidValue {
        name,
        value: value.to_string(),
        reason,
    };
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(int)
            } else {
                number
                    .as_f64()
                    .and_then(truncate_finite)
                    .ok_or_else(|| invalid("out of integer range"))
            }
        }
        Value::String(text) => {
            let text = text.trim();
            if let Ok(int) = text.parse::<i64>() {
                return Ok(int);
            }
            text.parse::<f64>()
                .ok()
                .and_then(truncate_finite)
                .ok_or_else(|| invalid("not a number"))
        }
        Value::Null => Err(invalid("no value supplied")),
        _ => Err(invalid("not a number")),
    }
}

fn truncate_finite(value: f64) -> Option<i64> {
    if value.is_finite() && value.abs() < i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

/// Current values of all six settings.
pub fn current_settings(world: &WorldDocument) -> Result<SettingsRecord, WorldError> {
    let mut record = SettingsRecord::default();
    for name in SettingName::ALL {
        record.set(name, world.setting(name)?);
    }
    Ok(record)
}

/// Façade over the world document's setting accessors.
pub struct SettingsEditor<'a> {
    world: &'a mut WorldDocument,
}

impl<'a> SettingsEditor<'a> {
    pub fn new(world: &'a mut WorldDocument) -> Self {
        Self { world }
    }

    pub fn get_all(&self) -> Result<SettingsRecord, SettingsError> {
        Ok(current_settings(&*self.world)?)
    }

    /// Apply every value in `update`, or none of them.
    ///
    /// All values are coerced and every target field is resolved before the
    /// first write. Returns the full record after the update.
    pub fn update_all(&mut self, update: &SettingsUpdate) -> Result<SettingsRecord, SettingsError> {
        let coerced = update
            .iter()
            .map(|(name, value)| coerce_setting(name, value).map(|int| (name, int)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut next = self.get_all()?;
        for (name, value) in &coerced {
            next.set(*name, *value);
        }

        for (name, value) in coerced {
            self.world.set_setting(name, value)?;
        }

        for (min, max) in next.inverted_ranges() {
            warn!(
                target: "save_inspector::settings",
                %min,
                %max,
                min_value = next.get(min),
                max_value = next.get(max),
                "settings.range_inverted"
            );
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn world() -> WorldDocument {
        WorldDocument::from_value(json!({
            "Singletons": {
                "TemperateWeatherDurationService": {
                    "MinTemperateWeatherDuration": 5,
                    "MaxTemperateWeatherDuration": 10
                },
                "DroughtWeather": { "MinDroughtDuration": 2, "MaxDroughtDuration": 4 },
                "BadtideWeather": {
                    "MinBadtideWeatherDuration": 1,
                    "MaxBadtideWeatherDuration": 3
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn coercion_accepts_floats_and_strings() {
        let name = SettingName::DroughtMax;
        assert_eq!(coerce_setting(name, &json!(7)).unwrap(), 7);
        assert_eq!(coerce_setting(name, &json!(7.9)).unwrap(), 7);
        assert_eq!(coerce_setting(name, &json!("12")).unwrap(), 12);
        assert_eq!(coerce_setting(name, &json!(" 12.0 ")).unwrap(), 12);
        assert_eq!(coerce_setting(name, &json!(-3.5)).unwrap(), -3);
    }

    #[test]
    fn coercion_rejects_non_numbers() {
        let name = SettingName::DroughtMax;
        for value in [json!("soon"), json!(null), json!(true), json!([1]), json!("inf")] {
            assert!(
                matches!(
                    coerce_setting(name, &value),
                    Err(SettingsError::InvalidValue { .. })
                ),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn get_all_reads_every_field() {
        let mut world = world();
        let record = SettingsEditor::new(&mut world).get_all().unwrap();
        assert_eq!(
            record,
            SettingsRecord {
                temperate_min: 5,
                temperate_max: 10,
                drought_min: 2,
                drought_max: 4,
                badtide_min: 1,
                badtide_max: 3,
            }
        );
    }

    #[test]
    fn partial_update_writes_integers() {
        let mut world = world();
        let update = SettingsUpdate::new()
            .with(SettingName::TemperateMin, "6")
            .with(SettingName::BadtideMax, 4.0);
        let record = SettingsEditor::new(&mut world).update_all(&update).unwrap();
        assert_eq!(record.temperate_min, 6);
        assert_eq!(record.badtide_max, 4);
        assert_eq!(record.drought_min, 2);
        let singletons = &world.as_value()["Singletons"];
        assert_eq!(
            singletons["TemperateWeatherDurationService"]["MinTemperateWeatherDuration"],
            json!(6)
        );
        assert_eq!(
            singletons["BadtideWeather"]["MaxBadtideWeatherDuration"],
            json!(4)
        );
    }

    #[test]
    fn one_invalid_value_writes_nothing() {
        let mut world = world();
        let before = world.clone();
        let update = SettingsUpdate::from(SettingsRecord {
            temperate_min: 9,
            temperate_max: 19,
            drought_min: 9,
            drought_max: 19,
            badtide_min: 9,
            badtide_max: 19,
        })
        .with(SettingName::DroughtMax, "lots");
        let err = SettingsEditor::new(&mut world)
            .update_all(&update)
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidValue {
                name: SettingName::DroughtMax,
                ..
            }
        ));
        assert_eq!(world, before);
    }

    #[test]
    fn missing_target_writes_nothing() {
        let mut value = world().into_value();
        value["Singletons"]
            .as_object_mut()
            .unwrap()
            .remove("BadtideWeather");
        let mut world = WorldDocument::from_value(value).unwrap();
        let before = world.clone();
        let update = SettingsUpdate::new()
            .with(SettingName::TemperateMin, 1)
            .with(SettingName::BadtideMin, 2);
        let err = SettingsEditor::new(&mut world)
            .update_all(&update)
            .unwrap_err();
        assert!(matches!(err, SettingsError::World(WorldError::MissingField(_))));
        assert_eq!(world, before);
    }
}
