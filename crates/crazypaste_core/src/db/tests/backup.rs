//! Directory export and import.

use super::*;
use crate::db::backup::{export, import, read_export_file, write_export_file, DirectoryExport};
use tempfile::TempDir;

#[test]
fn export_import_round_trip_through_a_file() {
    let source = memory_db();
    let alice = register(&source, "alice");
    let bob = register(&source, "bob");
    source.stats.follow(&bob.id, &alice.id).expect("follow");

    let snapshot = export(&source).expect("export");
    assert_eq!(snapshot.users.len(), 2);
    assert_eq!(snapshot.stats[&alice.id].followers, 1);

    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("users.json");
    write_export_file(&path, &snapshot).expect("write");
    let raw = std::fs::read_to_string(&path).expect("read raw");
    assert!(raw.contains("\"exportedAt\""));

    let target = memory_db();
    let loaded = read_export_file(&path).expect("read");
    assert_eq!(import(&target, &loaded).expect("import"), 2);
    assert!(target.users.login("alice@example.com", "secret").is_ok());
    assert_eq!(target.stats.get(&alice.id).expect("stats").followers, 1);
    assert_eq!(target.stats.get(&bob.id).expect("stats").following, 1);
}

#[test]
fn import_skips_stats_for_unknown_users() {
    let db = memory_db();
    let mut snapshot = export(&db).expect("export");
    snapshot
        .stats
        .insert("ghost".to_string(), Default::default());

    assert_eq!(import(&db, &snapshot).expect("import"), 0);
    assert!(db.stats.stored("ghost").expect("stored").is_none());
}

#[test]
fn malformed_export_is_rejected() {
    assert!(matches!(
        DirectoryExport::from_json("{\"users\": 3}"),
        Err(AppError::Serialization(_))
    ));
}
