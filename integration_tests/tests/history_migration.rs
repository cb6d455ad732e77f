mod common;

use std::fs;

use save_core::{
    capture_snapshot, HistoryError, IngestScope, MigrationOutcome, SaveInspector, WorldDocument,
};
use save_proto::{encode_snapshot_list_json, Snapshot};

fn snapshot(timestamp: &str, day: i64) -> Snapshot {
    let world = WorldDocument::from_value(common::world(timestamp, 3, day)).expect("object");
    capture_snapshot(&world).expect("fixture snapshot")
}

#[test]
fn legacy_entries_with_duplicates_migrate_once() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let legacy = dir.path().join("historical_data.json");
    let entries = vec![
        snapshot("t1", 1),
        snapshot("t2", 2),
        snapshot("t1", 9),
        snapshot("t3", 3),
    ];
    fs::write(&legacy, encode_snapshot_list_json(&entries)?)?;

    let inspector = SaveInspector::default();
    let (history, outcome) = inspector.open_history(dir.path())?;
    assert_eq!(
        outcome,
        MigrationOutcome::Migrated {
            entries: 4,
            stored: 3
        }
    );
    assert!(!legacy.exists());

    let labels: Vec<_> = history.timeline()?.into_iter().map(|p| p.label).collect();
    assert_eq!(labels, vec!["[3|1]", "[3|2]", "[3|3]"]);
    drop(history);

    let (_, again) = inspector.open_history(dir.path())?;
    assert_eq!(again, MigrationOutcome::NoLegacyFile);
    Ok(())
}

#[test]
fn legacy_entries_without_evaporation_are_accepted() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut value = serde_json::to_value(vec![snapshot("t1", 1)])?;
    value[0]
        .as_object_mut()
        .expect("snapshot object")
        .remove("evaporation_modifiers_matrix");
    fs::write(dir.path().join("historical_data.json"), value.to_string())?;

    let (history, outcome) = SaveInspector::default().open_history(dir.path())?;
    assert!(matches!(outcome, MigrationOutcome::Migrated { stored: 1, .. }));
    let all = history.all()?;
    assert!(all[0].evaporation_modifiers_matrix.is_none());
    Ok(())
}

#[test]
fn unparsable_legacy_file_is_kept_and_ingest_continues() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let legacy = dir.path().join("historical_data.json");
    fs::write(&legacy, "[]garbage")?;
    common::write_save(dir.path(), "Colony.timber", &common::world("t1", 1, 1));

    let inspector = SaveInspector::default();
    let report = inspector.ingest(dir.path(), IngestScope::Latest)?;
    match &report.migration {
        Some(MigrationOutcome::Failed { reason }) => {
            assert!(reason.contains("historical_data.json"), "{reason}");
        }
        other => panic!("unexpected migration outcome {other:?}"),
    }
    assert_eq!(report.processed.len(), 1);
    assert!(report.processed[0].appended);
    assert!(legacy.exists());
    assert_eq!(fs::read_to_string(&legacy)?, "[]garbage");

    let err = match inspector.open_history(dir.path()) {
        Ok(_) => panic!("explicit open should report the malformed legacy file"),
        Err(err) => err,
    };
    assert!(matches!(
        err,
        save_core::SessionError::History(HistoryError::LegacyFormat { .. })
    ));
    Ok(())
}

#[test]
fn migration_runs_before_new_snapshots_are_recorded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("historical_data.json"),
        encode_snapshot_list_json(&[snapshot("t0", 1)])?,
    )?;
    common::write_save(dir.path(), "Colony.timber", &common::world("t1", 3, 2));

    let inspector = SaveInspector::default();
    let report = inspector.ingest(dir.path(), IngestScope::Latest)?;
    assert!(matches!(report.migration, Some(MigrationOutcome::Migrated { .. })));

    let (history, _) = inspector.open_history(dir.path())?;
    let stamps: Vec<_> = history.all()?.into_iter().map(|s| s.timestamp).collect();
    assert_eq!(stamps, vec!["t0", "t1"]);
    Ok(())
}
