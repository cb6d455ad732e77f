use std::fmt::Write;

use save_core::{ArchiveMember, IngestReport, MigrationOutcome, ProcessedSave, SettingsChange};
use save_proto::{SettingName, SettingsRecord, Snapshot, TimelinePoint};
use serde_json::{json, Value};

pub fn ingest_summary(report: &IngestReport) -> String {
    let mut out = String::new();
    if report.files.is_empty() {
        out.push_str("No save archives found.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "Processed {} of {} archive(s), {} new snapshot(s).",
        report.processed.len(),
        report.files.len(),
        report.appended()
    );
    match &report.migration {
        Some(MigrationOutcome::Migrated { entries, stored }) => {
            let _ = writeln!(out, "Migrated {entries} legacy entries ({stored} stored).");
        }
        Some(MigrationOutcome::Failed { reason }) => {
            let _ = writeln!(out, "Legacy history not imported, file kept: {reason}");
        }
        _ => {}
    }

    if let Some(save) = report.latest() {
        out.push('\n');
        out.push_str(&save_summary(save));
    }

    if !report.skipped.is_empty() {
        out.push_str("\nSkipped:\n");
        for skipped in &report.skipped {
            let _ = writeln!(
                out,
                "  {} [{}] {}",
                skipped.path.display(),
                skipped.kind,
                skipped.reason
            );
        }
    }
    out
}

fn save_summary(save: &ProcessedSave) -> String {
    let snapshot = &save.snapshot;
    let weather = &snapshot.weather_info;
    let mut out = String::new();
    let _ = writeln!(out, "Save:        {}", save.path.display());
    let _ = writeln!(out, "Timestamp:   {}", snapshot.timestamp);
    let _ = writeln!(out, "Map:         {} x {}", snapshot.map_width, snapshot.map_height);
    let _ = writeln!(out, "Clean water: {:.2}", snapshot.clean_water_total);
    let _ = writeln!(
        out,
        "Weather:     cycle {} day {}, drought: {} (hazard {} days, temperate {} days)",
        weather.cycle,
        weather.cycle_day,
        if weather.is_drought { "yes" } else { "no" },
        weather.hazardous_weather_duration,
        weather.temperate_weather_duration
    );
    match &save.settings {
        Some(settings) => {
            out.push_str("Settings:\n");
            out.push_str(&settings_table(settings));
        }
        None => out.push_str("Settings:    unavailable\n"),
    }
    out
}

/// `grids` swaps the per-save summary for the full snapshot record.
pub fn ingest_json(report: &IngestReport, grids: bool) -> Value {
    let processed: Vec<Value> = report
        .processed
        .iter()
        .map(|save| {
            if grids {
                return json!({
                    "path": save.path,
                    "snapshot": save.snapshot,
                    "settings": save.settings,
                    "appended": save.appended,
                });
            }
            json!({
                "path": save.path,
                "timestamp": save.snapshot.timestamp,
                "clean_water_total": save.snapshot.clean_water_total,
                "map_width": save.snapshot.map_width,
                "map_height": save.snapshot.map_height,
                "weather_info": save.snapshot.weather_info,
                "settings": save.settings,
                "appended": save.appended,
            })
        })
        .collect();
    json!({
        "files": report.files,
        "processed": processed,
        "skipped": report.skipped,
    })
}

/// Stored snapshots with their timeline labels.
pub fn history_json(snapshots: &[Snapshot]) -> Value {
    Value::Array(
        snapshots
            .iter()
            .map(|snapshot| {
                json!({
                    "label": snapshot.weather_info.cycle_label(),
                    "snapshot": snapshot,
                })
            })
            .collect(),
    )
}

pub fn settings_table(record: &SettingsRecord) -> String {
    let mut out = String::new();
    for name in SettingName::ALL {
        let _ = writeln!(out, "  {:<14} {}", name.as_str(), record.get(name));
    }
    out
}

pub fn settings_change(change: &SettingsChange) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Updated {}", change.path.display());
    for name in SettingName::ALL {
        let before = change.before.get(name);
        let after = change.after.get(name);
        if before == after {
            let _ = writeln!(out, "  {:<14} {}", name.as_str(), after);
        } else {
            let _ = writeln!(out, "  {:<14} {} -> {}", name.as_str(), before, after);
        }
    }
    for (min, max) in change.after.inverted_ranges() {
        let _ = writeln!(out, "Warning: {min} is greater than {max}");
    }
    out
}

pub fn timeline(points: &[TimelinePoint]) -> String {
    if points.is_empty() {
        return "No snapshots recorded.\n".to_string();
    }
    let mut out = String::new();
    for point in points {
        let _ = writeln!(
            out,
            "{:<10} {:<22} {:>12.2}",
            point.label, point.timestamp, point.clean_water_total
        );
    }
    out
}

pub fn members(members: &[ArchiveMember]) -> String {
    let mut out = String::new();
    for member in members {
        let _ = writeln!(
            out,
            "{:016x} {:>10} {}",
            member.digest, member.size, member.name
        );
    }
    out
}

pub fn migration(outcome: &MigrationOutcome) -> String {
    match outcome {
        MigrationOutcome::NoLegacyFile => "No legacy history file found.\n".to_string(),
        MigrationOutcome::Migrated { entries, stored } => {
            format!("Migrated {entries} legacy entries; {stored} snapshots stored.\n")
        }
        MigrationOutcome::Retained { reason, stored } => {
            format!("Legacy history kept ({reason}); {stored} snapshots stored.\n")
        }
        MigrationOutcome::Failed { reason } => {
            format!("Legacy history not imported, file kept: {reason}\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record() -> SettingsRecord {
        SettingsRecord {
            temperate_min: 5,
            temperate_max: 10,
            drought_min: 2,
            drought_max: 4,
            badtide_min: 1,
            badtide_max: 3,
        }
    }

    #[test]
    fn settings_change_marks_edits_and_inversions() {
        let mut after = record();
        after.drought_min = 6;
        let change = SettingsChange {
            path: PathBuf::from("Colony.timber"),
            before: record(),
            after,
        };
        insta::assert_snapshot!(settings_change(&change), @r###"
        Updated Colony.timber
          temperate_min  5
          temperate_max  10
          drought_min    2 -> 6
          drought_max    4
          badtide_min    1
          badtide_max    3
        Warning: drought_min is greater than drought_max
        "###);
    }

    #[test]
    fn empty_report_says_so() {
        assert_eq!(
            ingest_summary(&IngestReport::default()),
            "No save archives found.\n"
        );
    }

    fn processed(is_drought: bool) -> IngestReport {
        let grid = save_proto::Grid::from_stored(2, 1, vec![0.5, 1.5]).unwrap();
        let snapshot = Snapshot {
            timestamp: "2024-06-01 18:22:10".to_string(),
            clean_water_total: 2.0,
            water_levels_matrix: grid.clone(),
            contamination_matrix: grid.clone(),
            moisture_levels_matrix: grid.clone(),
            soil_contamination_matrix: grid,
            evaporation_modifiers_matrix: None,
            weather_info: save_proto::WeatherInfo {
                hazardous_weather_duration: 3,
                is_drought,
                cycle: 2,
                cycle_day: 4,
                temperate_weather_duration: 8,
            },
            map_width: 2,
            map_height: 1,
        };
        IngestReport {
            files: vec![PathBuf::from("Colony.timber")],
            processed: vec![ProcessedSave {
                path: PathBuf::from("Colony.timber"),
                snapshot,
                settings: None,
                appended: true,
            }],
            skipped: Vec::new(),
            migration: Some(MigrationOutcome::Failed {
                reason: "legacy history is malformed".to_string(),
            }),
        }
    }

    #[test]
    fn summary_states_drought_flag_and_failed_migration() {
        let summary = ingest_summary(&processed(false));
        assert!(summary.contains("cycle 2 day 4, drought: no"), "{summary}");
        assert!(summary.contains("Legacy history not imported, file kept"), "{summary}");
        assert!(ingest_summary(&processed(true)).contains("drought: yes"));
    }

    #[test]
    fn json_includes_grids_only_on_request() {
        let report = processed(true);
        let plain = ingest_json(&report, false);
        assert!(plain["processed"][0].get("snapshot").is_none());
        assert_eq!(plain["processed"][0]["clean_water_total"], json!(2.0));

        let full = ingest_json(&report, true);
        let snapshot = &full["processed"][0]["snapshot"];
        assert_eq!(snapshot["water_levels_matrix"], json!([[0.5], [1.5]]));
        assert_eq!(snapshot["timestamp"], json!("2024-06-01 18:22:10"));

        let history = history_json(&[report.processed[0].snapshot.clone()]);
        assert_eq!(history[0]["label"], json!("[2|4]"));
        assert_eq!(history[0]["snapshot"]["moisture_levels_matrix"], json!([[0.5], [1.5]]));
    }

    #[test]
    fn members_render_hex_digests() {
        let rendered = members(&[ArchiveMember {
            name: "world.json".to_string(),
            size: 42,
            digest: 0xaf63dc4c8601ec8c,
        }]);
        assert_eq!(rendered, "af63dc4c8601ec8c         42 world.json\n");
    }
}
