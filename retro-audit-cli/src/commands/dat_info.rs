use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use retro_audit_dat::{Catalog, parse_dat_file};
use retro_audit_lib::{
    AuditJob, AuditReport, AuditWarning, LocalRomRecord, MatchOptions, run_audit,
};

use crate::error::CliError;

pub(crate) fn run_dat_info(dat: &Path) -> Result<(), CliError> {
    let dat = parse_dat_file(dat)?;
    let roms = dat.games.iter().flat_map(|g| &g.roms);
    let with_sha1 = roms.clone().filter(|r| r.sha1.is_some()).count();
    let with_md5 = roms.clone().filter(|r| r.md5.is_some()).count();
    let rom_count = roms.count();

    let (catalog, catalog_warnings) = Catalog::from_dat(dat);

    log::info!("{}", catalog.name.if_supports_color(Stdout, |t| t.bold()));
    if !catalog.description.is_empty() && catalog.description != catalog.name {
        log::info!("  {}", catalog.description);
    }
    if !catalog.version.is_empty() {
        log::info!(
            "  Version: {}",
            catalog.version.if_supports_color(Stdout, |t| t.dimmed())
        );
    }

    // Warnings are logged as they go through the job.
    let job = AuditJob::silent();
    for w in &catalog_warnings {
        job.warn(&AuditWarning::from(w.clone()));
    }
    // Auditing an empty collection gives one placeholder per entry, grouped.
    let no_roms: [LocalRomRecord; 0] = [];
    let AuditReport { set, warnings } =
        run_audit(&catalog, &no_roms, MatchOptions::default(), &job)?;

    let multi_rom = catalog
        .entries()
        .iter()
        .filter(|e| !e.alt_roms.is_empty())
        .count();

    log::info!("");
    log::info!("  {:<16} {:>8}", "Games", catalog.len());
    log::info!("  {:<16} {:>8}", "Multi-ROM games", multi_rom);
    log::info!("  {:<16} {:>8}", "ROMs", rom_count);
    log::info!("  {:<16} {:>8}", "  with SHA1", with_sha1);
    log::info!("  {:<16} {:>8}", "  with MD5", with_md5);
    log::info!("  {:<16} {:>8}", "Parents", set.summary.parent_count);
    log::info!("  {:<16} {:>8}", "Clones", set.summary.clone_count);

    let largest = set
        .grouping
        .groups()
        .iter()
        .filter(|g| !g.clones.is_empty())
        .max_by_key(|g| g.clones.len());
    if let Some(g) = largest {
        let name = set
            .get(&g.parent)
            .map(|r| r.display_name.as_str())
            .unwrap_or_default();
        log::info!("  {:<16} {} ({} clones)", "Largest family", name, g.clones.len());
    }

    let problems = catalog_warnings.len() + warnings.len();
    if problems > 0 {
        log::info!("");
        log::warn!(
            "  {} {} problems found (see above)",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            problems
        );
    }

    Ok(())
}
