//! Parent/clone grouping of audited rows.
//!
//! Every catalog entry resolves to a root parent by following `clone_of`
//! links, so the resulting index is always two levels deep. Rows without a
//! catalog entry (Unknown rows) are standalone parents.

use std::collections::HashMap;
use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use retro_audit_dat::Catalog;

use crate::error::AuditWarning;
use crate::rom::{AuditedRom, PcloneStatus, RomId};

/// A parent row and its clones in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcloneGroup {
    pub parent: RomId,
    pub clones: Vec<RomId>,
}

/// Parent to clones, clone to parent. Every row id is either exactly one
/// group's parent or a member of exactly one group's clone list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingIndex {
    groups: Vec<PcloneGroup>,
    #[serde(skip)]
    group_of_parent: HashMap<RomId, usize>,
    #[serde(skip)]
    clone_to_parent: HashMap<RomId, RomId>,
}

impl GroupingIndex {
    /// Groups in the order their parents appear in the audited list.
    pub fn groups(&self) -> &[PcloneGroup] {
        &self.groups
    }

    pub fn group_of(&self, parent: &RomId) -> Option<&PcloneGroup> {
        self.group_of_parent.get(parent).map(|&i| &self.groups[i])
    }

    /// Clones of `parent`, empty when it has none or is not a parent.
    pub fn clones_of(&self, parent: &RomId) -> &[RomId] {
        self.group_of(parent)
            .map(|g| g.clones.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, clone: &RomId) -> Option<&RomId> {
        self.clone_to_parent.get(clone)
    }

    pub fn is_parent(&self, id: &RomId) -> bool {
        self.group_of_parent.contains_key(id)
    }

    pub fn parent_count(&self) -> usize {
        self.groups.len()
    }

    pub fn clone_count(&self) -> usize {
        self.clone_to_parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Write `pclone_status` and `clone_of` onto each row.
    pub fn annotate(&self, roms: &mut [AuditedRom]) {
        for rom in roms {
            if let Some(parent) = self.clone_to_parent.get(&rom.id) {
                rom.pclone_status = PcloneStatus::Clone;
                rom.clone_of = Some(parent.clone());
            } else if self.group_of_parent.contains_key(&rom.id) {
                rom.pclone_status = PcloneStatus::Parent;
                rom.clone_of = None;
            } else {
                rom.pclone_status = PcloneStatus::None;
                rom.clone_of = None;
            }
        }
    }

    fn add_parent(&mut self, id: &RomId) {
        self.group_of_parent.insert(id.clone(), self.groups.len());
        self.groups.push(PcloneGroup {
            parent: id.clone(),
            clones: Vec::new(),
        });
    }

    fn add_clone(&mut self, parent: &RomId, clone: &RomId) -> bool {
        let Some(&group) = self.group_of_parent.get(parent) else {
            return false;
        };
        self.groups[group].clones.push(clone.clone());
        self.clone_to_parent.insert(clone.clone(), parent.clone());
        true
    }
}

/// Group classified rows by the catalog's parent/clone relations.
///
/// Orphans (a `clone_of` naming no catalog entry) and members of reference
/// cycles are promoted to parents and reported as warnings.
pub fn group(roms: &[AuditedRom], catalog: &Catalog) -> (GroupingIndex, Vec<AuditWarning>) {
    match group_with(roms, catalog, |_| Ok::<(), Infallible>(())) {
        Ok(grouped) => grouped,
        Err(never) => match never {},
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    OnPath,
    Done,
}

/// Root entry index for every catalog entry.
fn resolve_roots(catalog: &Catalog, warnings: &mut Vec<AuditWarning>) -> Vec<usize> {
    let entries = catalog.entries();
    let mut root = vec![0; entries.len()];
    let mut visit = vec![Visit::Unseen; entries.len()];
    let mut path: Vec<usize> = Vec::new();

    for start in 0..entries.len() {
        if visit[start] == Visit::Done {
            continue;
        }
        path.clear();
        let mut cur = start;
        let path_root = loop {
            match visit[cur] {
                Visit::Done => break root[cur],
                Visit::OnPath => {
                    let pos = path.iter().position(|&i| i == cur).unwrap_or(0);
                    let cycle = path.split_off(pos);
                    let lowest = cycle.iter().copied().min().unwrap_or(cur);
                    warnings.push(AuditWarning::CloneCycle {
                        games: cycle
                            .iter()
                            .map(|&i| entries[i].game_name.clone())
                            .collect(),
                    });
                    for &member in &cycle {
                        root[member] = lowest;
                        visit[member] = Visit::Done;
                    }
                    break lowest;
                }
                Visit::Unseen => {}
            }

            visit[cur] = Visit::OnPath;
            path.push(cur);
            let entry = &entries[cur];
            let Some(parent_name) = entry.clone_of.as_deref() else {
                break cur;
            };
            match catalog.find_by_name(parent_name) {
                Some(parent) => cur = parent.id.0,
                None => {
                    warnings.push(AuditWarning::OrphanClone {
                        game_name: entry.game_name.clone(),
                        missing_parent: parent_name.to_string(),
                    });
                    break cur;
                }
            }
        };

        for &i in &path {
            root[i] = path_root;
            visit[i] = Visit::Done;
        }
    }
    root
}

pub(crate) fn group_with<E>(
    roms: &[AuditedRom],
    catalog: &Catalog,
    mut tick: impl FnMut(usize) -> Result<(), E>,
) -> Result<(GroupingIndex, Vec<AuditWarning>), E> {
    let mut warnings = Vec::new();
    let roots = resolve_roots(catalog, &mut warnings);

    let mut row_of_entry: Vec<Option<usize>> = vec![None; catalog.len()];
    for (i, rom) in roms.iter().enumerate() {
        if let Some(slot) = rom.catalog_id.and_then(|id| row_of_entry.get_mut(id.0)) {
            slot.get_or_insert(i);
        }
    }

    // Parent row of every row, or None when the row heads its own group.
    let mut parent_row: Vec<Option<usize>> = Vec::with_capacity(roms.len());
    for (i, rom) in roms.iter().enumerate() {
        let parent = rom
            .catalog_id
            .and_then(|id| roots.get(id.0).copied().filter(|&root| root != id.0))
            .and_then(|root| row_of_entry[root])
            .filter(|&row| row != i);
        parent_row.push(parent);
        tick(i + 1)?;
    }

    let mut index = GroupingIndex::default();
    for (rom, parent) in roms.iter().zip(&parent_row) {
        if parent.is_none() {
            index.add_parent(&rom.id);
        }
    }
    for (rom, parent) in roms.iter().zip(&parent_row) {
        if let Some(p) = *parent {
            if !index.add_clone(&roms[p].id, &rom.id) {
                index.add_parent(&rom.id);
            }
        }
    }

    Ok((index, warnings))
}

#[cfg(test)]
#[path = "tests/pclone_tests.rs"]
mod tests;
