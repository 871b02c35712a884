//! ROM records: what the caller hands in and what an audit hands back.

use std::fmt;

use serde::{Deserialize, Serialize};

use retro_audit_dat::{CatalogEntry, CatalogId, LocalFile, MatchMethod};

/// Prefix reserved for ids of synthesized Miss placeholders.
pub const PLACEHOLDER_ID_PREFIX: &str = "dat:";

/// Identifier of a ROM row. Caller-assigned for local records, derived from
/// the catalog game name for placeholders.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RomId(String);

impl RomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic id for the placeholder of a catalog game.
    pub fn placeholder(game_name: &str) -> Self {
        Self(format!("{PLACEHOLDER_ID_PREFIX}{game_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_ID_PREFIX)
    }
}

impl fmt::Display for RomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A ROM file known to the surrounding system.
///
/// Only `filename`, `checksum` and `size` are inspected by the audit; `extra`
/// is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRomRecord {
    pub id: RomId,
    pub filename: String,
    pub display_name: String,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl LocalRomRecord {
    /// Create a record whose display name is the filename without extension.
    pub fn new(id: impl Into<RomId>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let display_name = default_display_name(&filename);
        Self {
            id: id.into(),
            filename,
            display_name,
            checksum: None,
            size: None,
            extra: serde_json::Value::Null,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }
}

impl LocalFile for LocalRomRecord {
    fn file_name(&self) -> &str {
        &self.filename
    }

    fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

fn default_display_name(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

/// Audit classification of a ROM row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// No catalog attached
    #[default]
    None,
    /// In the catalog and present locally
    Have,
    /// In the catalog but not present locally
    Miss,
    /// Present locally but not in the catalog
    Unknown,
}

impl AuditStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AuditStatus::None => "-",
            AuditStatus::Have => "Have",
            AuditStatus::Miss => "Miss",
            AuditStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "have" => Ok(AuditStatus::Have),
            "miss" | "missing" => Ok(AuditStatus::Miss),
            "unknown" => Ok(AuditStatus::Unknown),
            "none" => Ok(AuditStatus::None),
            other => Err(format!("unknown audit status: {other}")),
        }
    }
}

/// Position of a ROM row within its parent/clone family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PcloneStatus {
    #[default]
    None,
    Parent,
    Clone,
}

/// A row of an audited set: a local record or a synthesized placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditedRom {
    pub id: RomId,
    pub filename: String,
    pub display_name: String,
    pub checksum: Option<String>,
    pub size: Option<u64>,
    pub extra: serde_json::Value,
    pub audit_status: AuditStatus,
    pub pclone_status: PcloneStatus,
    /// Parent row id when this row is a clone.
    pub clone_of: Option<RomId>,
    /// Catalog entry this row was classified against.
    pub catalog_id: Option<CatalogId>,
    pub game_name: Option<String>,
    pub match_method: Option<MatchMethod>,
    /// `true` when no local file backs this row.
    pub placeholder: bool,
    /// Local files holding the entry's other ROMs, such as the tracks of a
    /// cue sheet. They get no row of their own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companions: Vec<RomId>,
}

impl AuditedRom {
    /// Wrap a local record with the given status.
    pub fn from_local(record: &LocalRomRecord, audit_status: AuditStatus) -> Self {
        Self {
            id: record.id.clone(),
            filename: record.filename.clone(),
            display_name: record.display_name.clone(),
            checksum: record.checksum.clone(),
            size: record.size,
            extra: record.extra.clone(),
            audit_status,
            pclone_status: PcloneStatus::None,
            clone_of: None,
            catalog_id: None,
            game_name: None,
            match_method: None,
            placeholder: false,
            companions: Vec::new(),
        }
    }

    /// A local record found in the catalog.
    pub fn have(record: &LocalRomRecord, entry: &CatalogEntry, method: MatchMethod) -> Self {
        Self {
            catalog_id: Some(entry.id),
            game_name: Some(entry.game_name.clone()),
            match_method: Some(method),
            ..Self::from_local(record, AuditStatus::Have)
        }
    }

    /// Placeholder for a catalog entry without a local file.
    pub fn missing(entry: &CatalogEntry) -> Self {
        Self {
            id: RomId::placeholder(&entry.game_name),
            filename: entry.rom_filename.clone(),
            display_name: entry.game_name.clone(),
            checksum: entry.checksum.clone(),
            size: entry.size,
            extra: serde_json::Value::Null,
            audit_status: AuditStatus::Miss,
            pclone_status: PcloneStatus::None,
            clone_of: None,
            catalog_id: Some(entry.id),
            game_name: Some(entry.game_name.clone()),
            match_method: None,
            placeholder: true,
            companions: Vec::new(),
        }
    }
}
