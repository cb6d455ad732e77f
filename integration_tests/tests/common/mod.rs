#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde_json::{json, Value};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Bytes of the preview image stored beside every fixture world.
pub const PREVIEW: &[u8] = b"\x89PNG\r\n\x1a\nfixture-preview";

/// A minimal 2 x 2 world with every singleton the inspector reads.
pub fn world(timestamp: &str, cycle: i64, day: i64) -> Value {
    json!({
        "GameVersion": "0.6.9.1",
        "Timestamp": timestamp,
        "Singletons": {
            "MapSize": { "Size": { "X": 2, "Y": 2 } },
            "WaterMap": { "WaterDepths": { "Array": "10 5 0 1" } },
            "ContaminationMap": { "Contaminations": { "Array": "0.1 0.2 0 1" } },
            "SoilMoistureSimulator": { "MoistureLevels": { "Array": "0.5 0.5 1 0" } },
            "SoilContaminationSimulator": { "ContaminationLevels": { "Array": "0 0 0.25 0" } },
            "WaterEvaporationMap": { "EvaporationModifiers": { "Array": "1. 0.87. 1 1." } },
            "HazardousWeatherService": { "HazardousWeatherDuration": 5, "IsDrought": true },
            "WeatherService": { "Cycle": cycle, "CycleDay": day, "TemperateWeatherDuration": 12 },
            "TemperateWeatherDurationService": {
                "MinTemperateWeatherDuration": 5,
                "MaxTemperateWeatherDuration": 10
            },
            "DroughtWeather": { "MinDroughtDuration": 2, "MaxDroughtDuration": 4 },
            "BadtideWeather": {
                "MinBadtideWeatherDuration": 1,
                "MaxBadtideWeatherDuration": 3
            }
        },
        "Entities": [{ "Id": "a1", "Template": "Path" }]
    })
}

/// Clean water of [`world`]: 9 + 4 + 0 + 0.
pub const WORLD_CLEAN_WATER: f64 = 13.0;

/// Write a save archive holding a preview, `world` and an entities blob.
pub fn write_save(dir: &Path, name: &str, world: &Value) -> PathBuf {
    let bytes = serde_json::to_vec(world).expect("fixture world serializes");
    write_archive(dir, name, &[("preview.png", PREVIEW), ("world.json", bytes.as_slice())])
}

pub fn write_archive(dir: &Path, name: &str, members: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).expect("create fixture archive");
    let mut writer = ZipWriter::new(file);
    for (member, bytes) in members {
        let method = if member.ends_with(".png") {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        writer
            .start_file(*member, FileOptions::default().compression_method(method))
            .expect("start member");
        writer.write_all(bytes).expect("write member");
    }
    writer.finish().expect("finish fixture archive");
    path
}

/// Pin a file's modification time to `seconds` after the epoch.
pub fn set_age(path: &Path, seconds: u64) {
    let file = File::options()
        .write(true)
        .open(path)
        .expect("open for mtime");
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + seconds))
        .expect("set mtime");
}
