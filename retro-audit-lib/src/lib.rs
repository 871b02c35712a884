pub mod audit;
pub mod collection;
pub mod display;
pub mod error;
pub mod pclone;
pub mod progress;
pub mod rom;
pub mod settings;
pub mod store;

pub use audit::{
    AuditReport, AuditSummary, AuditedRomSet, Classification, audit_without_catalog, classify,
    classify_without_catalog, dedupe_local_roms, run_audit,
};
pub use collection::{AuditSnapshot, CollectionState, RomCollection};
pub use display::{DisplayMode, ProjectedRow, StatusFilter, project};
pub use error::{AuditError, AuditWarning};
pub use pclone::{GroupingIndex, PcloneGroup, group};
pub use progress::{
    AuditEvent, AuditJob, AuditOutcome, AuditPhase, AuditProgress, CancelToken, ChannelProgress,
    LogProgress, PROGRESS_BATCH, SilentProgress,
};
pub use rom::{AuditStatus, AuditedRom, LocalRomRecord, PcloneStatus, RomId};
pub use settings::{AuditConfig, ConfigError, load_config, settings_path};
pub use store::{JsonRomSetStore, RomSetStore, StoreError};

pub use retro_audit_dat::{Catalog, CatalogEntry, CatalogId, DatFile, MatchMethod, MatchOptions};
