//! Display projections over an audited set.
//!
//! A projection never changes the audit; it picks which rows a list view
//! should show for a given [`DisplayMode`] and [`StatusFilter`], and sorts
//! them by display name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audit::AuditedRomSet;
use crate::rom::{AuditStatus, AuditedRom, PcloneStatus, RomId};

// ---------------------------------------------------------------------------
// Display mode
// ---------------------------------------------------------------------------

/// How rows are grouped for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Every row.
    #[default]
    Flat,
    /// One row per parent, with the number of visible clones.
    ParentClone,
    /// One best row per parent/clone group ("1G1R").
    OneGameOneRom,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplayMode::Flat => "flat",
            DisplayMode::ParentClone => "parent-clone",
            DisplayMode::OneGameOneRom => "1g1r",
        };
        f.write_str(name)
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(DisplayMode::Flat),
            "pclone" | "parent-clone" | "parent_clone" => Ok(DisplayMode::ParentClone),
            "1g1r" | "one-game-one-rom" | "one_game_one_rom" => Ok(DisplayMode::OneGameOneRom),
            other => Err(format!(
                "unknown display mode '{other}' (expected flat, pclone or 1g1r)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Status filter
// ---------------------------------------------------------------------------

/// Set of audit statuses a view shows. Rows with status `None` always pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AuditStatus>", into = "Vec<AuditStatus>")]
pub struct StatusFilter {
    pub have: bool,
    pub miss: bool,
    pub unknown: bool,
}

impl StatusFilter {
    pub fn all() -> Self {
        Self {
            have: true,
            miss: true,
            unknown: true,
        }
    }

    pub fn none() -> Self {
        Self {
            have: false,
            miss: false,
            unknown: false,
        }
    }

    pub fn with(mut self, status: AuditStatus) -> Self {
        match status {
            AuditStatus::Have => self.have = true,
            AuditStatus::Miss => self.miss = true,
            AuditStatus::Unknown => self.unknown = true,
            AuditStatus::None => {}
        }
        self
    }

    pub fn contains(&self, status: AuditStatus) -> bool {
        match status {
            AuditStatus::None => true,
            AuditStatus::Have => self.have,
            AuditStatus::Miss => self.miss,
            AuditStatus::Unknown => self.unknown,
        }
    }

    fn passes(&self, rom: &AuditedRom) -> bool {
        self.contains(rom.audit_status)
    }
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl From<Vec<AuditStatus>> for StatusFilter {
    fn from(statuses: Vec<AuditStatus>) -> Self {
        statuses.into_iter().fold(Self::none(), Self::with)
    }
}

impl From<StatusFilter> for Vec<AuditStatus> {
    fn from(filter: StatusFilter) -> Self {
        [AuditStatus::Have, AuditStatus::Miss, AuditStatus::Unknown]
            .into_iter()
            .filter(|s| filter.contains(*s))
            .collect()
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    /// Parse a comma-separated list such as `have,miss`, or `all`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .try_fold(Self::none(), |filter, part| {
                Ok(filter.with(part.parse::<AuditStatus>()?))
            })
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// One row of a display projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedRow {
    pub id: RomId,
    pub display_name: String,
    pub filename: String,
    pub audit_status: AuditStatus,
    pub pclone_status: PcloneStatus,
    /// Visible clones of this parent; only set in [`DisplayMode::ParentClone`].
    pub clone_count: Option<usize>,
    pub game_name: Option<String>,
}

impl ProjectedRow {
    fn from_rom(rom: &AuditedRom, clone_count: Option<usize>) -> Self {
        Self {
            id: rom.id.clone(),
            display_name: rom.display_name.clone(),
            filename: rom.filename.clone(),
            audit_status: rom.audit_status,
            pclone_status: rom.pclone_status,
            clone_count,
            game_name: rom.game_name.clone(),
        }
    }
}

/// Project an audited set for display.
///
/// Rows are sorted by display name (case-insensitive); ties keep the order of
/// the audited list, which is catalog order.
pub fn project(set: &AuditedRomSet, mode: DisplayMode, filter: StatusFilter) -> Vec<ProjectedRow> {
    // (position in the audited list, row, clone count)
    let mut picked: Vec<(usize, &AuditedRom, Option<usize>)> = match mode {
        DisplayMode::Flat => set
            .roms
            .iter()
            .enumerate()
            .filter(|(_, rom)| filter.passes(rom))
            .map(|(i, rom)| (i, rom, None))
            .collect(),
        DisplayMode::ParentClone => heads(set)
            .filter_map(|(i, head)| {
                let clones = clone_rows(set, head);
                let visible = clones.iter().filter(|c| filter.passes(c)).count();
                (filter.passes(head) || visible > 0).then_some((i, head, Some(visible)))
            })
            .collect(),
        DisplayMode::OneGameOneRom => heads(set)
            .filter_map(|(i, head)| {
                let clones = clone_rows(set, head);
                best_of_group(set, i, head, &clones, filter).map(|(pos, rom)| (pos, rom, None))
            })
            .collect(),
    };

    picked.sort_by_cached_key(|(pos, rom, _)| (rom.display_name.to_lowercase(), *pos));
    picked
        .into_iter()
        .map(|(_, rom, clone_count)| ProjectedRow::from_rom(rom, clone_count))
        .collect()
}

/// Rows that head a group. Without a catalog every row is its own group.
fn heads(set: &AuditedRomSet) -> impl Iterator<Item = (usize, &AuditedRom)> {
    set.roms
        .iter()
        .enumerate()
        .filter(|(_, rom)| rom.pclone_status != PcloneStatus::Clone)
}

fn clone_rows<'a>(set: &'a AuditedRomSet, head: &AuditedRom) -> Vec<&'a AuditedRom> {
    set.grouping
        .clones_of(&head.id)
        .iter()
        .filter_map(|id| set.get(id))
        .collect()
}

/// The 1G1R pick for a group, or `None` when no member passes the filter.
fn best_of_group<'a>(
    set: &'a AuditedRomSet,
    head_pos: usize,
    head: &'a AuditedRom,
    clones: &[&'a AuditedRom],
    filter: StatusFilter,
) -> Option<(usize, &'a AuditedRom)> {
    if !filter.passes(head) && !clones.iter().any(|c| filter.passes(c)) {
        return None;
    }
    if filter.passes(head) && head.audit_status == AuditStatus::Have {
        return Some((head_pos, head));
    }
    let have_clone = clones
        .iter()
        .find(|c| c.audit_status == AuditStatus::Have && filter.passes(c));
    match have_clone {
        Some(clone) => Some((set.position_of(&clone.id).unwrap_or(head_pos), *clone)),
        None => Some((head_pos, head)),
    }
}

#[cfg(test)]
#[path = "tests/display_tests.rs"]
mod tests;
