//! A ROM collection and its committed audit state.
//!
//! [`RomCollection`] owns the one mutable piece of the engine: the committed
//! [`AuditSnapshot`]. Every transition builds a complete new snapshot off to
//! the side and swaps it in only when the whole pipeline succeeded, so a
//! failed or cancelled operation leaves the previous snapshot in place.
//! Readers clone the current `Arc` and never wait for a running audit.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use retro_audit_dat::{Catalog, CatalogWarning, DatFile, MatchOptions, parse_dat_file};

use crate::audit::{
    AuditReport, AuditSummary, AuditedRomSet, audit_without_catalog, dedupe_local_roms, run_audit,
};
use crate::display::{DisplayMode, ProjectedRow, StatusFilter, project};
use crate::error::{AuditError, AuditWarning};
use crate::progress::{AuditJob, AuditOutcome, AuditPhase};
use crate::rom::LocalRomRecord;
use crate::store::RomSetStore;

/// Whether a catalog is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    NoCatalog,
    Audited,
}

/// Immutable committed state of a collection.
#[derive(Debug, Clone)]
pub struct AuditSnapshot {
    pub state: CollectionState,
    pub catalog: Option<Arc<Catalog>>,
    /// Where the attached catalog was loaded from, if it came from disk.
    pub catalog_path: Option<PathBuf>,
    pub catalog_warnings: Arc<Vec<CatalogWarning>>,
    pub local_roms: Arc<Vec<LocalRomRecord>>,
    pub audit: Arc<AuditedRomSet>,
    /// Warnings from the run that produced this snapshot.
    pub warnings: Vec<AuditWarning>,
}

impl AuditSnapshot {
    fn without_catalog(
        local_roms: Arc<Vec<LocalRomRecord>>,
        warnings: Vec<AuditWarning>,
    ) -> Self {
        let audit = Arc::new(audit_without_catalog(&local_roms));
        Self {
            state: CollectionState::NoCatalog,
            catalog: None,
            catalog_path: None,
            catalog_warnings: Arc::new(Vec::new()),
            local_roms,
            audit,
            warnings,
        }
    }

    pub fn summary(&self) -> AuditSummary {
        self.audit.summary
    }
}

/// A catalog waiting to be installed, with where it came from.
struct PendingCatalog {
    catalog: Arc<Catalog>,
    path: Option<PathBuf>,
    warnings: Arc<Vec<CatalogWarning>>,
}

/// A set of local ROMs, optionally audited against a catalog.
pub struct RomCollection {
    options: MatchOptions,
    committed: RwLock<Arc<AuditSnapshot>>,
    /// Serializes transitions.
    writer: Mutex<()>,
}

impl RomCollection {
    /// Create an unaudited collection. Records with a repeated or reserved
    /// id are dropped with a warning.
    pub fn new(local_roms: Vec<LocalRomRecord>, options: MatchOptions) -> Self {
        let (local_roms, warnings) = dedupe_local_roms(local_roms);
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        let snapshot = AuditSnapshot::without_catalog(Arc::new(local_roms), warnings);
        Self {
            options,
            committed: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        }
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// The current committed state.
    pub fn snapshot(&self) -> Arc<AuditSnapshot> {
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> CollectionState {
        self.snapshot().state
    }

    /// Project the committed audit for display.
    pub fn project(&self, mode: DisplayMode, filter: StatusFilter) -> Vec<ProjectedRow> {
        project(&self.snapshot().audit, mode, filter)
    }

    /// Parse the DAT at `path`, audit against it and commit.
    ///
    /// If a catalog is already attached it is replaced in the same commit.
    pub fn attach_catalog(
        &self,
        path: &Path,
        job: &AuditJob<'_>,
    ) -> Result<Arc<AuditSnapshot>, AuditError> {
        let result = self.attach_catalog_inner(path, job);
        finish(job, result)
    }

    /// Swap the attached catalog for the DAT at `path` as one commit. On
    /// failure the old catalog and its audit stay in place.
    pub fn replace_catalog(
        &self,
        path: &Path,
        job: &AuditJob<'_>,
    ) -> Result<Arc<AuditSnapshot>, AuditError> {
        if let Some(old) = self.snapshot().catalog.as_deref() {
            log::info!("Replacing catalog \"{}\" with {}", old.name, path.display());
        }
        self.attach_catalog(path, job)
    }

    /// Audit against an already-parsed DAT and commit.
    pub fn attach_dat(
        &self,
        dat: DatFile,
        job: &AuditJob<'_>,
    ) -> Result<Arc<AuditSnapshot>, AuditError> {
        let result = self.attach_dat_inner(dat, None, job);
        finish(job, result)
    }

    /// Drop the catalog and its placeholders; every local record goes back
    /// to status `None`.
    pub fn detach_catalog(&self) -> Arc<AuditSnapshot> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        if let Some(catalog) = &current.catalog {
            log::info!("Detaching catalog \"{}\"", catalog.name);
        }
        self.commit(AuditSnapshot::without_catalog(
            current.local_roms.clone(),
            Vec::new(),
        ))
    }

    /// Replace the local records. With a catalog attached the audit is re-run
    /// against it; otherwise the records are committed with status `None`.
    pub fn rom_set_changed(
        &self,
        local_roms: Vec<LocalRomRecord>,
        job: &AuditJob<'_>,
    ) -> Result<Arc<AuditSnapshot>, AuditError> {
        let result = self.rom_set_changed_inner(local_roms, job);
        finish(job, result)
    }

    /// Save the committed local records and audit through `store`. The
    /// committed state is not affected by a failed save.
    pub fn persist(&self, store: &dyn RomSetStore) -> Result<(), AuditError> {
        let snapshot = self.snapshot();
        store.save_roms(&snapshot.local_roms)?;
        store.save_audit(&snapshot.audit)?;
        log::info!("Saved {} ROM records", snapshot.local_roms.len());
        Ok(())
    }

    fn attach_catalog_inner(
        &self,
        path: &Path,
        job: &AuditJob<'_>,
    ) -> Result<Arc<AuditSnapshot>, AuditError> {
        job.check_cancelled()?;
        let parsing = job.phase(AuditPhase::Parsing, 1);
        let dat = parse_dat_file(path)?;
        parsing.finish()?;
        log::info!("Parsed DAT \"{}\" with {} games", dat.name, dat.games.len());
        self.attach_dat_inner(dat, Some(path.to_path_buf()), job)
    }

    fn attach_dat_inner(
        &self,
        dat: DatFile,
        path: Option<PathBuf>,
        job: &AuditJob<'_>,
    ) -> Result<Arc<AuditSnapshot>, AuditError> {
        let (catalog, catalog_warnings) = Catalog::from_dat(dat);
        for warning in &catalog_warnings {
            job.warn(&AuditWarning::from(warning.clone()));
        }
        let pending = PendingCatalog {
            catalog: Arc::new(catalog),
            path,
            warnings: Arc::new(catalog_warnings),
        };

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        let snapshot = self.audit_snapshot(pending, current.local_roms.clone(), Vec::new(), job)?;
        Ok(self.commit(snapshot))
    }

    fn rom_set_changed_inner(
        &self,
        local_roms: Vec<LocalRomRecord>,
        job: &AuditJob<'_>,
    ) -> Result<Arc<AuditSnapshot>, AuditError> {
        job.check_cancelled()?;
        let (local_roms, dedupe_warnings) = dedupe_local_roms(local_roms);
        for warning in &dedupe_warnings {
            job.warn(warning);
        }
        let local_roms = Arc::new(local_roms);

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        let snapshot = match &current.catalog {
            Some(catalog) => {
                let pending = PendingCatalog {
                    catalog: catalog.clone(),
                    path: current.catalog_path.clone(),
                    warnings: current.catalog_warnings.clone(),
                };
                self.audit_snapshot(pending, local_roms, dedupe_warnings, job)?
            }
            None => AuditSnapshot::without_catalog(local_roms, dedupe_warnings),
        };
        Ok(self.commit(snapshot))
    }

    /// Run the pipeline into a new, uncommitted snapshot.
    fn audit_snapshot(
        &self,
        pending: PendingCatalog,
        local_roms: Arc<Vec<LocalRomRecord>>,
        mut warnings: Vec<AuditWarning>,
        job: &AuditJob<'_>,
    ) -> Result<AuditSnapshot, AuditError> {
        let AuditReport {
            set,
            warnings: audit_warnings,
        } = run_audit(&pending.catalog, &local_roms, self.options, job)?;
        warnings.extend(audit_warnings);
        Ok(AuditSnapshot {
            state: CollectionState::Audited,
            catalog: Some(pending.catalog),
            catalog_path: pending.path,
            catalog_warnings: pending.warnings,
            local_roms,
            audit: Arc::new(set),
            warnings,
        })
    }

    fn commit(&self, snapshot: AuditSnapshot) -> Arc<AuditSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        snapshot
    }
}

/// Report how an operation ended and pass its result through.
fn finish<T>(job: &AuditJob<'_>, result: Result<T, AuditError>) -> Result<T, AuditError> {
    job.progress.on_finish(&AuditOutcome::from_result(&result));
    result
}
