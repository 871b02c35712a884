use retro_audit_dat::{Catalog, DatFile, DatGame, DatRom};
use retro_audit_lib::{
    AuditJob, AuditStatus, AuditedRomSet, DisplayMode, LocalRomRecord, MatchOptions, StatusFilter,
    project, run_audit,
};

/// A catalog of `families` parents, each followed by `clones` clones.
fn family_catalog(families: usize, clones: usize) -> Catalog {
    let mut games = Vec::new();
    for f in 0..families {
        let parent = format!("Game {f:04}");
        for c in 0..=clones {
            let name = if c == 0 {
                parent.clone()
            } else {
                format!("{parent} (Rev {c})")
            };
            games.push(DatGame {
                name: name.clone(),
                clone_of: (c > 0).then(|| parent.clone()),
                roms: vec![DatRom {
                    name: format!("{name}.zip"),
                    size: Some(1024),
                    crc: Some(format!("{:08x}", f * 16 + c)),
                    ..Default::default()
                }],
            });
        }
    }
    Catalog::from_dat(DatFile {
        name: "Generated".into(),
        games,
        ..Default::default()
    })
    .0
}

fn audit(catalog: &Catalog, locals: &[LocalRomRecord]) -> AuditedRomSet {
    run_audit(catalog, locals, MatchOptions::default(), &AuditJob::silent())
        .unwrap()
        .set
}

/// Every third catalog entry present, plus a few files the catalog lacks.
fn partial_locals(catalog: &Catalog) -> Vec<LocalRomRecord> {
    let mut locals: Vec<LocalRomRecord> = catalog
        .entries()
        .iter()
        .step_by(3)
        .map(|e| LocalRomRecord::new(format!("local-{}", e.id.0), e.rom_filename.clone()))
        .collect();
    for i in 0..5 {
        locals.push(LocalRomRecord::new(format!("extra-{i}"), format!("homebrew {i}.zip")));
    }
    locals
}

fn assert_invariants(set: &AuditedRomSet) {
    let s = set.summary;
    let audited = set
        .roms
        .iter()
        .filter(|r| r.audit_status != AuditStatus::None)
        .count();
    assert_eq!(s.have_count + s.miss_count + s.unknown_count, audited);

    let clones: usize = set.grouping.groups().iter().map(|g| g.clones.len()).sum();
    assert_eq!(clones + s.parent_count, set.len());
    assert_eq!(s.parent_count + s.clone_count, s.total);

    for rom in &set.roms {
        let parent = set.grouping.is_parent(&rom.id);
        let clone = set.grouping.parent_of(&rom.id);
        assert!(parent != clone.is_some());
        if let Some(p) = clone {
            assert!(set.grouping.clones_of(p).contains(&rom.id));
            assert_eq!(rom.clone_of.as_ref(), Some(p));
        }
    }
}

#[test]
fn full_collection_has_everything() {
    let catalog = family_catalog(50, 3);
    let locals: Vec<LocalRomRecord> = catalog
        .entries()
        .iter()
        .map(|e| LocalRomRecord::new(format!("r{}", e.id.0), e.rom_filename.to_uppercase()))
        .collect();
    let set = audit(&catalog, &locals);
    assert_eq!(set.summary.have_count, catalog.len());
    assert_eq!(set.summary.miss_count, 0);
    assert_eq!(set.summary.unknown_count, 0);
    assert_invariants(&set);
}

#[test]
fn full_collection_by_checksum() {
    let catalog = family_catalog(20, 2);
    let locals: Vec<LocalRomRecord> = catalog
        .entries()
        .iter()
        .map(|e| {
            LocalRomRecord::new(format!("r{}", e.id.0), format!("renamed {}.bin", e.id.0))
                .with_checksum(e.checksum.clone().unwrap())
                .with_size(1024)
        })
        .collect();
    let set = audit(&catalog, &locals);
    assert_eq!(set.summary.have_count, catalog.len());
    assert_eq!(set.summary.miss_count, 0);
}

#[test]
fn counts_and_grouping_invariants_hold() {
    // Large enough to span several progress batches.
    let catalog = family_catalog(400, 3);
    let set = audit(&catalog, &partial_locals(&catalog));
    assert_eq!(set.summary.unknown_count, 5);
    assert_eq!(set.summary.have_count + set.summary.miss_count, catalog.len());
    assert_invariants(&set);
}

#[test]
fn one_game_one_rom_one_row_per_group() {
    let catalog = family_catalog(30, 2);
    let set = audit(&catalog, &partial_locals(&catalog));
    let statuses = [AuditStatus::Have, AuditStatus::Miss, AuditStatus::Unknown];

    for mask in 0..8u8 {
        let filter = statuses
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .fold(StatusFilter::none(), |f, (_, s)| f.with(*s));
        let surviving = set
            .grouping
            .groups()
            .iter()
            .filter(|g| {
                std::iter::once(&g.parent)
                    .chain(&g.clones)
                    .filter_map(|id| set.get(id))
                    .any(|r| filter.contains(r.audit_status))
            })
            .count();
        let rows = project(&set, DisplayMode::OneGameOneRom, filter);
        assert_eq!(rows.len(), surviving, "mask {mask:03b}");

        let mut parents: Vec<_> = rows
            .iter()
            .map(|r| set.grouping.parent_of(&r.id).unwrap_or(&r.id))
            .collect();
        parents.sort();
        parents.dedup();
        assert_eq!(parents.len(), rows.len());
    }
}

#[test]
fn audit_is_idempotent() {
    let catalog = family_catalog(100, 2);
    let locals = partial_locals(&catalog);
    let first = audit(&catalog, &locals);
    let second = audit(&catalog, &locals);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}
