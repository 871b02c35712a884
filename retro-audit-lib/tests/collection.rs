use std::path::{Path, PathBuf};
use std::sync::mpsc;

use retro_audit_lib::{
    AuditError, AuditEvent, AuditJob, AuditOutcome, AuditStatus, AuditWarning, CancelToken,
    ChannelProgress, CollectionState, DisplayMode, JsonRomSetStore, LocalRomRecord, MatchOptions,
    PcloneStatus, RomCollection, RomId, RomSetStore, StatusFilter,
};

const GAME_A_DAT: &str = r#"<?xml version="1.0"?>
<datafile>
  <header>
    <name>Test System</name>
    <description>Test System DAT</description>
    <version>20240101</version>
  </header>
  <game name="Game A">
    <rom name="gameA.zip" size="1024" crc="11111111"/>
  </game>
  <game name="Game A (Rev 1)" cloneof="Game A">
    <rom name="gameA_rev1.zip" size="1024" crc="22222222"/>
  </game>
  <game name="Game B">
    <rom name="gameB.zip" size="2048" crc="33333333"/>
  </game>
</datafile>
"#;

const OTHER_DAT: &str = r#"clrmamepro (
	name "Other System"
	description "Other System DAT"
)

game (
	name "Game C"
	rom ( name gameC.bin size 512 crc 44444444 )
)
"#;

fn write_dat(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn game_a_collection() -> RomCollection {
    RomCollection::new(
        vec![LocalRomRecord::new("1", "gameA.zip")],
        MatchOptions::default(),
    )
}

#[test]
fn attach_classifies_and_groups() {
    let tmp = tempfile::tempdir().unwrap();
    let dat = write_dat(tmp.path(), "test.dat", GAME_A_DAT);
    let collection = game_a_collection();

    let snapshot = collection.attach_catalog(&dat, &AuditJob::silent()).unwrap();
    assert_eq!(snapshot.state, CollectionState::Audited);
    assert_eq!(snapshot.catalog_path.as_deref(), Some(dat.as_path()));

    let summary = snapshot.summary();
    assert_eq!(summary.have_count, 1);
    assert_eq!(summary.miss_count, 2);
    assert_eq!(summary.unknown_count, 0);

    let grouping = &snapshot.audit.grouping;
    assert_eq!(
        grouping.clones_of(&RomId::new("1")),
        [RomId::placeholder("Game A (Rev 1)")]
    );
    assert!(grouping.clones_of(&RomId::placeholder("Game B")).is_empty());

    let rows = collection.project(
        DisplayMode::OneGameOneRom,
        "have,miss".parse::<StatusFilter>().unwrap(),
    );
    let picked: Vec<(&str, AuditStatus)> = rows
        .iter()
        .map(|r| (r.game_name.as_deref().unwrap(), r.audit_status))
        .collect();
    assert_eq!(
        picked,
        [("Game B", AuditStatus::Miss), ("Game A", AuditStatus::Have)]
    );
}

#[test]
fn detach_removes_placeholders() {
    let tmp = tempfile::tempdir().unwrap();
    let dat = write_dat(tmp.path(), "test.dat", GAME_A_DAT);
    let collection = game_a_collection();
    collection.attach_catalog(&dat, &AuditJob::silent()).unwrap();

    let snapshot = collection.detach_catalog();
    assert_eq!(snapshot.state, CollectionState::NoCatalog);
    assert!(snapshot.catalog.is_none());
    assert_eq!(snapshot.audit.len(), 1);

    let rom = &snapshot.audit.roms[0];
    assert_eq!(rom.id, RomId::new("1"));
    assert_eq!(rom.filename, "gameA.zip");
    assert_eq!(rom.audit_status, AuditStatus::None);
    assert_eq!(rom.pclone_status, PcloneStatus::None);
    assert!(rom.clone_of.is_none());

    let summary = snapshot.summary();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.have_count + summary.miss_count + summary.unknown_count, 0);
    assert_eq!(summary.parent_count + summary.clone_count, 0);
}

#[test]
fn detach_then_reattach_matches_fresh_attach() {
    let tmp = tempfile::tempdir().unwrap();
    let dat = write_dat(tmp.path(), "test.dat", GAME_A_DAT);

    let fresh = game_a_collection();
    let expected = fresh.attach_catalog(&dat, &AuditJob::silent()).unwrap();

    let cycled = game_a_collection();
    cycled.attach_catalog(&dat, &AuditJob::silent()).unwrap();
    cycled.detach_catalog();
    let actual = cycled.attach_catalog(&dat, &AuditJob::silent()).unwrap();

    assert_eq!(actual.audit, expected.audit);
}

#[test]
fn parse_failure_leaves_state_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let dat = write_dat(tmp.path(), "test.dat", GAME_A_DAT);
    let broken = write_dat(tmp.path(), "broken.dat", "clrmamepro (\n\tname \"Broken\"\n");
    let collection = game_a_collection();
    let before = collection.attach_catalog(&dat, &AuditJob::silent()).unwrap();

    let result = collection.attach_catalog(&broken, &AuditJob::silent());
    assert!(matches!(result, Err(AuditError::CatalogParse(_))));
    let result = collection.replace_catalog(&tmp.path().join("missing.dat"), &AuditJob::silent());
    assert!(matches!(result, Err(AuditError::CatalogParse(_))));

    let after = collection.snapshot();
    assert_eq!(after.state, CollectionState::Audited);
    assert_eq!(after.catalog_path, before.catalog_path);
    assert_eq!(after.audit, before.audit);
}

#[test]
fn parse_failure_without_catalog_stays_unaudited() {
    let tmp = tempfile::tempdir().unwrap();
    let empty = write_dat(tmp.path(), "empty.dat", "   \n");
    let collection = game_a_collection();
    assert!(collection.attach_catalog(&empty, &AuditJob::silent()).is_err());
    assert_eq!(collection.state(), CollectionState::NoCatalog);
    assert_eq!(collection.snapshot().audit.len(), 1);
}

#[test]
fn cancelled_attach_commits_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let dat = write_dat(tmp.path(), "test.dat", GAME_A_DAT);
    let collection = game_a_collection();

    let (tx, rx) = mpsc::channel();
    let progress = ChannelProgress::new(tx);
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = collection.attach_catalog(&dat, &AuditJob::new(&progress, cancel));
    drop(progress);

    assert!(matches!(result, Err(AuditError::Cancelled)));
    assert_eq!(collection.state(), CollectionState::NoCatalog);
    let events: Vec<AuditEvent> = rx.iter().collect();
    assert_eq!(events, [AuditEvent::Finished(AuditOutcome::Cancelled)]);
}

#[test]
fn replace_catalog_swaps_in_one_commit() {
    let tmp = tempfile::tempdir().unwrap();
    let first = write_dat(tmp.path(), "first.dat", GAME_A_DAT);
    let second = write_dat(tmp.path(), "second.dat", OTHER_DAT);
    let collection = RomCollection::new(
        vec![
            LocalRomRecord::new("1", "gameA.zip"),
            LocalRomRecord::new("2", "gameC.bin"),
        ],
        MatchOptions::default(),
    );
    collection.attach_catalog(&first, &AuditJob::silent()).unwrap();

    let snapshot = collection.replace_catalog(&second, &AuditJob::silent()).unwrap();
    assert_eq!(snapshot.catalog.as_ref().unwrap().name, "Other System");
    let status = |id: &str| snapshot.audit.get(&RomId::new(id)).unwrap().audit_status;
    assert_eq!(status("1"), AuditStatus::Unknown);
    assert_eq!(status("2"), AuditStatus::Have);
    assert!(snapshot.audit.get(&RomId::placeholder("Game B")).is_none());
}

#[test]
fn rom_set_changed_reaudits() {
    let tmp = tempfile::tempdir().unwrap();
    let dat = write_dat(tmp.path(), "test.dat", GAME_A_DAT);
    let collection = game_a_collection();
    collection.attach_catalog(&dat, &AuditJob::silent()).unwrap();

    let snapshot = collection
        .rom_set_changed(
            vec![
                LocalRomRecord::new("1", "gameA.zip"),
                LocalRomRecord::new("2", "GAMEB.ZIP"),
                LocalRomRecord::new("2", "duplicate.zip"),
            ],
            &AuditJob::silent(),
        )
        .unwrap();
    assert_eq!(snapshot.summary().have_count, 2);
    assert_eq!(snapshot.summary().miss_count, 1);
    assert_eq!(snapshot.local_roms.len(), 2);
    assert!(matches!(
        snapshot.warnings.as_slice(),
        [AuditWarning::DuplicateRomId { .. }]
    ));
}

#[test]
fn rom_set_changed_without_catalog() {
    let collection = game_a_collection();
    let snapshot = collection
        .rom_set_changed(
            vec![LocalRomRecord::new("5", "x.zip"), LocalRomRecord::new("6", "y.zip")],
            &AuditJob::silent(),
        )
        .unwrap();
    assert_eq!(snapshot.state, CollectionState::NoCatalog);
    assert!(snapshot.audit.roms.iter().all(|r| r.audit_status == AuditStatus::None));
    assert_eq!(snapshot.summary().total, 2);
}

#[test]
fn progress_events_end_with_commit() {
    let tmp = tempfile::tempdir().unwrap();
    let dat = write_dat(tmp.path(), "test.dat", GAME_A_DAT);
    let collection = game_a_collection();

    let (tx, rx) = mpsc::channel();
    let progress = ChannelProgress::new(tx);
    collection
        .attach_catalog(&dat, &AuditJob::new(&progress, CancelToken::new()))
        .unwrap();
    drop(progress);

    let events: Vec<AuditEvent> = rx.iter().collect();
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            AuditEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last(), Some(&100));
    assert_eq!(
        events.last(),
        Some(&AuditEvent::Finished(AuditOutcome::Committed))
    );
}

#[test]
fn catalog_warnings_are_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let dat = write_dat(
        tmp.path(),
        "dupes.dat",
        r#"<datafile>
  <game name="Game A"><rom name="gameA.zip"/></game>
  <game name="Game A"><rom name="other.zip"/></game>
  <game name="Nameless"></game>
</datafile>"#,
    );
    let collection = game_a_collection();
    let (tx, rx) = mpsc::channel();
    let progress = ChannelProgress::new(tx);
    let snapshot = collection
        .attach_catalog(&dat, &AuditJob::new(&progress, CancelToken::new()))
        .unwrap();
    drop(progress);

    assert_eq!(snapshot.catalog_warnings.len(), 2);
    let warnings = rx
        .iter()
        .filter(|e| matches!(e, AuditEvent::Warning(AuditWarning::Catalog(_))))
        .count();
    assert_eq!(warnings, 2);
    assert_eq!(snapshot.summary().have_count, 1);
}

#[test]
fn persist_writes_both_files() {
    let tmp = tempfile::tempdir().unwrap();
    let dat = write_dat(tmp.path(), "test.dat", GAME_A_DAT);
    let collection = game_a_collection();
    collection.attach_catalog(&dat, &AuditJob::silent()).unwrap();

    let store = JsonRomSetStore::new(tmp.path().join("sets"), "test");
    collection.persist(&store).unwrap();

    assert_eq!(store.load_roms().unwrap(), *collection.snapshot().local_roms);
    let audit: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.audit_path()).unwrap()).unwrap();
    assert_eq!(audit["summary"]["miss_count"], 2);
    assert_eq!(audit["roms"].as_array().unwrap().len(), 3);
}

#[test]
fn persist_failure_keeps_committed_state() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let collection = game_a_collection();
    let before = collection.snapshot();

    let store = JsonRomSetStore::new(blocker.join("sets"), "test");
    assert!(matches!(collection.persist(&store), Err(AuditError::CommitIo(_))));
    assert_eq!(collection.snapshot().audit, before.audit);
}
