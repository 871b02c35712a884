use std::path::Path;
use std::sync::mpsc;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use retro_audit_lib::{
    AuditConfig, AuditEvent, AuditJob, AuditStatus, AuditSummary, CancelToken, ChannelProgress,
    JsonRomSetStore, LocalRomRecord, PcloneStatus, ProjectedRow, RomCollection, RomSetStore,
};

use crate::cli_types::{AuditArgs, RomSourceArgs};
use crate::error::CliError;
use crate::scan::scan_rom_folder;

pub(crate) fn run_audit(
    args: AuditArgs,
    mut config: AuditConfig,
    quiet: bool,
) -> Result<(), CliError> {
    if let Some(mode) = args.mode {
        config.display_mode = mode;
    }
    if let Some(filter) = args.filter {
        config.status_filter = filter;
    }
    if args.no_ext {
        config.matching.compare_extension = false;
    }
    if args.no_checksums {
        config.matching.use_checksums = false;
    }

    let local_roms = load_local_roms(&args.source, args.hash, quiet)?;
    log::info!(
        "Auditing {} ROM files against {}",
        local_roms.len(),
        args.dat.display().if_supports_color(Stdout, |t| t.cyan()),
    );

    let collection = RomCollection::new(local_roms, config.matching);
    let pb = progress_bar(quiet);
    let (tx, rx) = mpsc::channel();

    // Warnings are logged by the audit itself; the bar only counts them.
    let (result, warned) = std::thread::scope(|s| {
        let pb = &pb;
        let watcher = s.spawn(move || {
            let mut warned = 0usize;
            // Ends when the sender is dropped after the audit returns.
            for event in rx {
                match event {
                    AuditEvent::Progress { phase, percent } => {
                        pb.set_position(u64::from(percent));
                        pb.set_message(phase.to_string());
                    }
                    AuditEvent::Warning(_) => warned += 1,
                    AuditEvent::Finished(outcome) => log::debug!("Audit finished: {outcome:?}"),
                }
            }
            warned
        });
        let result = {
            let progress = ChannelProgress::new(tx);
            let job = AuditJob::new(&progress, CancelToken::new());
            collection.attach_catalog(&args.dat, &job)
        };
        (result, watcher.join().unwrap_or_default())
    });
    pb.finish_and_clear();
    let snapshot = result?;

    if let Some(catalog) = &snapshot.catalog {
        log::info!(
            "DAT: {} {}",
            catalog.name.if_supports_color(Stdout, |t| t.bold()),
            catalog.version.if_supports_color(Stdout, |t| t.dimmed()),
        );
    }

    if !args.summary {
        let rows = collection.project(config.display_mode, config.status_filter);
        log::info!("");
        for row in &rows {
            print_row(row);
        }
        log::info!("");
        log::info!("{} rows shown ({} mode)", rows.len(), config.display_mode);
    }
    print_summary(&snapshot.summary());
    if warned > 0 {
        log::warn!(
            "  {} {} warnings (see above)",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            warned
        );
    }

    if let Some(dir) = &args.save {
        let store = JsonRomSetStore::new(dir, args.set_name.as_str());
        collection.persist(&store)?;
        log::info!(
            "Saved {} and {}",
            store.roms_path().display(),
            store.audit_path().display(),
        );
    }

    Ok(())
}

fn load_local_roms(
    source: &RomSourceArgs,
    hash: bool,
    quiet: bool,
) -> Result<Vec<LocalRomRecord>, CliError> {
    if let Some(json) = &source.roms_json {
        let dir = json.parent().unwrap_or(Path::new("."));
        let base = json
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CliError::other(format!("Invalid ROM set path: {}", json.display())))?;
        return Ok(JsonRomSetStore::new(dir, base).load_roms()?);
    }

    let Some(folder) = &source.roms else {
        return Err(CliError::other("No ROM source given"));
    };
    if !folder.is_dir() {
        return Err(CliError::other(format!("Not a directory: {}", folder.display())));
    }

    let pb = if quiet || !hash {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                .map_err(|e| CliError::other(e.to_string()))?
                .tick_chars("/-\\|"),
        );
        pb
    };
    let records = scan_rom_folder(folder, hash, |i, total, path| {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        pb.set_message(format!("[{}/{}] Hashing {}", i + 1, total, name));
        pb.tick();
    })?;
    pb.finish_and_clear();
    Ok(records)
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("  [{bar:30.cyan/blue}] {pos:>3}% {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn print_row(row: &ProjectedRow) {
    let status = format!("{:<7}", row.audit_status.label());
    let status = match row.audit_status {
        AuditStatus::Have => status.if_supports_color(Stdout, |t| t.green()).to_string(),
        AuditStatus::Miss => status.if_supports_color(Stdout, |t| t.red()).to_string(),
        AuditStatus::Unknown => status.if_supports_color(Stdout, |t| t.yellow()).to_string(),
        AuditStatus::None => status.if_supports_color(Stdout, |t| t.dimmed()).to_string(),
    };
    let marker = match row.pclone_status {
        PcloneStatus::Clone => "  \u{2514} ",
        _ => "",
    };
    let clones = match row.clone_count {
        Some(n) if n > 0 => format!(" (+{n} clones)")
            .if_supports_color(Stdout, |t| t.dimmed())
            .to_string(),
        _ => String::new(),
    };
    log::info!("  {} {}{}{}", status, marker, row.display_name, clones);
}

fn print_summary(summary: &AuditSummary) {
    log::info!("");
    log::info!("{}", "Summary".if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  {:<10} {:>6}",
        "Have".if_supports_color(Stdout, |t| t.green()),
        summary.have_count
    );
    log::info!(
        "  {:<10} {:>6}",
        "Miss".if_supports_color(Stdout, |t| t.red()),
        summary.miss_count
    );
    log::info!(
        "  {:<10} {:>6}",
        "Unknown".if_supports_color(Stdout, |t| t.yellow()),
        summary.unknown_count
    );
    log::info!("  {:<10} {:>6}", "Parents", summary.parent_count);
    log::info!("  {:<10} {:>6}", "Clones", summary.clone_count);
    log::info!("  {:<10} {:>6}", "Total", summary.total);
}
