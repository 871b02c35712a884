use super::*;
use crate::progress::{CancelToken, SilentProgress};
use retro_audit_dat::{CatalogId, DatFile, DatGame, DatRom, MatchMethod};

fn game(name: &str, rom: &str, clone_of: Option<&str>) -> DatGame {
    DatGame {
        name: name.into(),
        clone_of: clone_of.map(Into::into),
        roms: vec![DatRom {
            name: rom.into(),
            ..Default::default()
        }],
    }
}

fn game_a_catalog() -> Catalog {
    let dat = DatFile {
        name: "Test System".into(),
        games: vec![
            game("Game A", "gameA.zip", None),
            game("Game A (Rev 1)", "gameA_rev1.zip", Some("Game A")),
            game("Game B", "gameB.zip", None),
        ],
        ..Default::default()
    };
    Catalog::from_dat(dat).0
}

fn local(id: &str, filename: &str) -> LocalRomRecord {
    LocalRomRecord::new(id, filename)
}

fn audit(catalog: &Catalog, locals: &[LocalRomRecord]) -> AuditReport {
    run_audit(catalog, locals, MatchOptions::default(), &AuditJob::silent()).unwrap()
}

#[test]
fn test_classify_rows_in_catalog_then_local_order() {
    let catalog = game_a_catalog();
    let locals = vec![
        local("10", "homebrew.zip"),
        local("11", "gameB.zip"),
        local("12", "demo.zip"),
    ];
    let matches = match_roms(&catalog, &locals, MatchOptions::default());
    let result = classify(&catalog, &locals, &matches);

    let rows: Vec<(&str, AuditStatus)> = result
        .roms
        .iter()
        .map(|r| (r.id.as_str(), r.audit_status))
        .collect();
    assert_eq!(
        rows,
        [
            ("dat:Game A", AuditStatus::Miss),
            ("dat:Game A (Rev 1)", AuditStatus::Miss),
            ("11", AuditStatus::Have),
            ("10", AuditStatus::Unknown),
            ("12", AuditStatus::Unknown),
        ]
    );
}

#[test]
fn test_have_row_keeps_local_record() {
    let catalog = game_a_catalog();
    let locals = vec![
        local("7", "GAMEB.ZIP")
            .with_display_name("My Game B")
            .with_extra(serde_json::json!({"playcount": 3})),
    ];
    let matches = match_roms(&catalog, &locals, MatchOptions::default());
    let result = classify(&catalog, &locals, &matches);

    let have = &result.roms[2];
    assert_eq!(have.id, RomId::new("7"));
    assert_eq!(have.display_name, "My Game B");
    assert_eq!(have.extra["playcount"], 3);
    assert_eq!(have.catalog_id, Some(CatalogId(2)));
    assert_eq!(have.game_name.as_deref(), Some("Game B"));
    assert_eq!(have.match_method, Some(MatchMethod::Filename));
    assert!(!have.placeholder);
}

#[test]
fn test_missing_placeholder_fields() {
    let catalog = game_a_catalog();
    let matches = match_roms::<LocalRomRecord>(&catalog, &[], MatchOptions::default());
    let result = classify(&catalog, &[], &matches);
    let miss = &result.roms[1];
    assert_eq!(miss.id, RomId::placeholder("Game A (Rev 1)"));
    assert_eq!(miss.filename, "gameA_rev1.zip");
    assert_eq!(miss.display_name, "Game A (Rev 1)");
    assert_eq!(miss.audit_status, AuditStatus::Miss);
    assert!(miss.placeholder);
    assert_eq!(result.summary.miss_count, 3);
}

#[test]
fn test_tally_counts_statuses() {
    let catalog = game_a_catalog();
    let locals = vec![local("1", "gameA.zip"), local("2", "other.zip")];
    let matches = match_roms(&catalog, &locals, MatchOptions::default());
    let result = classify(&catalog, &locals, &matches);
    assert_eq!(
        result.summary,
        AuditSummary {
            total: 4,
            have_count: 1,
            miss_count: 2,
            unknown_count: 1,
            parent_count: 0,
            clone_count: 0,
        }
    );
    assert_eq!(result.summary.audited_count(), result.summary.total);
}

#[test]
fn test_classify_without_catalog() {
    let locals = vec![local("1", "gameA.zip"), local("2", "other.zip")];
    let result = classify_without_catalog(&locals);
    assert!(result.roms.iter().all(|r| r.audit_status == AuditStatus::None));
    assert!(result.roms.iter().all(|r| r.pclone_status == PcloneStatus::None));
    assert_eq!(
        result.summary,
        AuditSummary {
            total: 2,
            ..Default::default()
        }
    );
}

#[test]
fn test_dedupe_drops_repeated_and_reserved_ids() {
    let (kept, warnings) = dedupe_local_roms(vec![
        local("1", "a.zip"),
        local("1", "b.zip"),
        local("dat:Game A", "c.zip"),
        local("2", "d.zip"),
    ]);
    let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["1", "2"]);
    assert_eq!(
        warnings,
        vec![
            AuditWarning::DuplicateRomId {
                id: RomId::new("1"),
                filename: "b.zip".into(),
            },
            AuditWarning::ReservedRomId {
                id: RomId::new("dat:Game A"),
                filename: "c.zip".into(),
            },
        ]
    );
}

#[test]
fn test_run_audit_groups_and_counts() {
    let catalog = game_a_catalog();
    let locals = vec![local("1", "gameA.zip")];
    let report = audit(&catalog, &locals);
    let set = report.set;

    assert_eq!(set.summary.have_count, 1);
    assert_eq!(set.summary.miss_count, 2);
    assert_eq!(set.summary.parent_count, 2);
    assert_eq!(set.summary.clone_count, 1);

    let rev1 = set.get(&RomId::placeholder("Game A (Rev 1)")).unwrap();
    assert_eq!(rev1.pclone_status, PcloneStatus::Clone);
    assert_eq!(rev1.clone_of, Some(RomId::new("1")));
    assert_eq!(set.position_of(&RomId::new("1")), Some(0));
    assert!(report.warnings.is_empty());
}

#[test]
fn test_run_audit_is_deterministic() {
    let catalog = game_a_catalog();
    let locals = vec![local("1", "gameA.zip"), local("2", "extra.zip")];
    let first = audit(&catalog, &locals);
    let second = audit(&catalog, &locals);
    assert_eq!(first.set, second.set);
    assert_eq!(
        serde_json::to_string(&first.set).unwrap(),
        serde_json::to_string(&second.set).unwrap()
    );
}

#[test]
fn test_run_audit_reports_ambiguous_match() {
    let catalog = game_a_catalog();
    let locals = vec![local("1", "a/gameB.zip"), local("2", "b/gameB.zip")];
    let report = audit(&catalog, &locals);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        &report.warnings[0],
        AuditWarning::AmbiguousMatch(c) if c.rejected == "b/gameB.zip"
    ));
    assert_eq!(
        report.set.get(&RomId::new("2")).map(|r| r.audit_status),
        Some(AuditStatus::Unknown)
    );
}

#[test]
fn test_run_audit_honours_cancellation() {
    let catalog = game_a_catalog();
    let cancel = CancelToken::new();
    cancel.cancel();
    let job = AuditJob::new(&SilentProgress, cancel);
    let result = run_audit(&catalog, &[local("1", "gameA.zip")], MatchOptions::default(), &job);
    assert!(matches!(result, Err(AuditError::Cancelled)));
}

fn disc_catalog() -> Catalog {
    let rom = |name: &str| DatRom {
        name: name.into(),
        ..Default::default()
    };
    let dat = DatFile {
        name: "Discs".into(),
        games: vec![DatGame {
            name: "Disc Game".into(),
            clone_of: None,
            roms: vec![
                rom("Disc Game.cue"),
                rom("Disc Game (Track 1).bin"),
                rom("Disc Game (Track 2).bin"),
            ],
        }],
        ..Default::default()
    };
    Catalog::from_dat(dat).0
}

#[test]
fn test_complete_multi_rom_game_is_one_have_row() {
    let catalog = disc_catalog();
    let locals = vec![
        local("1", "Disc Game.cue"),
        local("2", "Disc Game (Track 1).bin"),
        local("3", "Disc Game (Track 2).bin"),
    ];
    let report = audit(&catalog, &locals);

    assert!(report.warnings.is_empty());
    assert_eq!(report.set.summary.have_count, 1);
    assert_eq!(report.set.summary.unknown_count, 0);
    assert_eq!(report.set.summary.total, 1);

    let row = &report.set.roms[0];
    assert_eq!(row.id, RomId::new("1"));
    assert_eq!(row.audit_status, AuditStatus::Have);
    assert_eq!(row.companions, [RomId::new("2"), RomId::new("3")]);
}

#[test]
fn test_partial_multi_rom_game_is_have_without_cue() {
    let catalog = disc_catalog();
    let locals = vec![local("2", "Disc Game (Track 1).bin"), local("9", "extra.bin")];
    let report = audit(&catalog, &locals);

    let row = &report.set.roms[0];
    assert_eq!(row.id, RomId::new("2"));
    assert_eq!(row.audit_status, AuditStatus::Have);
    assert!(row.companions.is_empty());
    assert_eq!(
        report.set.get(&RomId::new("9")).map(|r| r.audit_status),
        Some(AuditStatus::Unknown)
    );
}

#[test]
fn test_classification_summary_is_pre_grouping() {
    let catalog = game_a_catalog();
    let locals = vec![local("1", "gameA.zip"), local("2", "gameA_rev1.zip")];
    let matches = match_roms(&catalog, &locals, MatchOptions::default());
    let result = classify(&catalog, &locals, &matches);
    assert_eq!(result.summary.have_count, 2);
    assert_eq!(result.summary.parent_count, 0);
    assert_eq!(result.summary.clone_count, 0);

    let report = audit(&catalog, &locals);
    assert_eq!(report.set.summary.parent_count, 2);
    assert_eq!(report.set.summary.clone_count, 1);
}
