//! Audit classification and the full audit pipeline.
//!
//! [`classify`] turns a catalog, the local records and their matches into
//! Have/Miss/Unknown rows. [`run_audit`] chains matching, classification and
//! parent/clone grouping into a finished [`AuditedRomSet`].

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use serde::Serialize;

use retro_audit_dat::{Catalog, MatchOptions, MatchSet, match_roms};

use crate::error::{AuditError, AuditWarning};
use crate::pclone::{self, GroupingIndex};
use crate::progress::{AuditJob, AuditPhase};
use crate::rom::{AuditStatus, AuditedRom, LocalRomRecord, PcloneStatus, RomId};

/// Counts over an audited set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub have_count: usize,
    pub miss_count: usize,
    pub unknown_count: usize,
    pub parent_count: usize,
    pub clone_count: usize,
}

impl AuditSummary {
    /// Count statuses in a single pass. This is the only place counts are
    /// derived, so they always agree with the rows they describe.
    pub fn tally(roms: &[AuditedRom]) -> Self {
        let mut summary = Self {
            total: roms.len(),
            ..Default::default()
        };
        for rom in roms {
            match rom.audit_status {
                AuditStatus::Have => summary.have_count += 1,
                AuditStatus::Miss => summary.miss_count += 1,
                AuditStatus::Unknown => summary.unknown_count += 1,
                AuditStatus::None => {}
            }
            match rom.pclone_status {
                PcloneStatus::Parent => summary.parent_count += 1,
                PcloneStatus::Clone => summary.clone_count += 1,
                PcloneStatus::None => {}
            }
        }
        summary
    }

    /// Rows with a catalog classification.
    pub fn audited_count(&self) -> usize {
        self.have_count + self.miss_count + self.unknown_count
    }
}

/// A finished audit: rows, counts and the parent/clone index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditedRomSet {
    pub roms: Vec<AuditedRom>,
    pub summary: AuditSummary,
    pub grouping: GroupingIndex,
    #[serde(skip)]
    position: HashMap<RomId, usize>,
}

impl AuditedRomSet {
    /// Assemble a set from finished rows. Counts are tallied here.
    pub fn new(roms: Vec<AuditedRom>, grouping: GroupingIndex) -> Self {
        let summary = AuditSummary::tally(&roms);
        let position = roms
            .iter()
            .enumerate()
            .map(|(i, rom)| (rom.id.clone(), i))
            .collect();
        Self {
            roms,
            summary,
            grouping,
            position,
        }
    }

    pub fn get(&self, id: &RomId) -> Option<&AuditedRom> {
        self.position.get(id).map(|&i| &self.roms[i])
    }

    /// Position of a row in `roms`, which is also its tie-break order.
    pub fn position_of(&self, id: &RomId) -> Option<usize> {
        self.position.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.roms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roms.is_empty()
    }
}

/// Output of [`classify`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub roms: Vec<AuditedRom>,
    /// Status counts of `roms`. Tallied before grouping, so `parent_count`
    /// and `clone_count` are always 0; [`AuditedRomSet::summary`] carries the
    /// counts of a finished audit.
    pub summary: AuditSummary,
}

/// Classify every catalog entry and every local record.
///
/// Rows come out in catalog order (Have or Miss per entry), followed by the
/// Unknown local records in their original order. A multi-ROM entry gets one
/// row; the files matching its other ROMs are listed in its `companions`.
pub fn classify(
    catalog: &Catalog,
    local_roms: &[LocalRomRecord],
    matches: &MatchSet,
) -> Classification {
    match classify_with(catalog, local_roms, matches, |_| Ok::<(), Infallible>(())) {
        Ok(classification) => classification,
        Err(never) => match never {},
    }
}

pub(crate) fn classify_with<E>(
    catalog: &Catalog,
    local_roms: &[LocalRomRecord],
    matches: &MatchSet,
    mut tick: impl FnMut(usize) -> Result<(), E>,
) -> Result<Classification, E> {
    let mut roms = Vec::with_capacity(catalog.len() + local_roms.len());
    let mut done = 0;

    for entry in catalog.entries() {
        let row = match matches.for_entry(entry.id) {
            Some(m) => AuditedRom {
                companions: matches
                    .companions_of(entry.id)
                    .iter()
                    .map(|c| local_roms[c.local_index].id.clone())
                    .collect(),
                ..AuditedRom::have(&local_roms[m.local_index], entry, m.method)
            },
            None => AuditedRom::missing(entry),
        };
        roms.push(row);
        done += 1;
        tick(done)?;
    }

    for (i, local) in local_roms.iter().enumerate() {
        if !matches.is_claimed(i) {
            roms.push(AuditedRom::from_local(local, AuditStatus::Unknown));
        }
        done += 1;
        tick(done)?;
    }

    let summary = AuditSummary::tally(&roms);
    Ok(Classification { roms, summary })
}

/// Wrap every local record with status `None`; no grouping is done.
pub fn classify_without_catalog(local_roms: &[LocalRomRecord]) -> Classification {
    let roms: Vec<AuditedRom> = local_roms
        .iter()
        .map(|r| AuditedRom::from_local(r, AuditStatus::None))
        .collect();
    let summary = AuditSummary::tally(&roms);
    Classification { roms, summary }
}

/// Drop local records whose id was already used by an earlier record or
/// falls in the placeholder namespace.
pub fn dedupe_local_roms(
    local_roms: Vec<LocalRomRecord>,
) -> (Vec<LocalRomRecord>, Vec<AuditWarning>) {
    let mut seen = HashSet::with_capacity(local_roms.len());
    let mut warnings = Vec::new();
    let mut kept = Vec::with_capacity(local_roms.len());
    for rom in local_roms {
        if rom.id.is_placeholder() {
            warnings.push(AuditWarning::ReservedRomId {
                id: rom.id,
                filename: rom.filename,
            });
        } else if seen.insert(rom.id.clone()) {
            kept.push(rom);
        } else {
            warnings.push(AuditWarning::DuplicateRomId {
                id: rom.id,
                filename: rom.filename,
            });
        }
    }
    (kept, warnings)
}

/// Result of a pipeline run: the new set plus everything worth warning about.
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub set: AuditedRomSet,
    pub warnings: Vec<AuditWarning>,
}

/// Run matcher, classifier and grouper against a catalog.
///
/// Inputs are read-only; the returned set is complete. Warnings are passed to
/// the job's progress sink as they are found and also returned. Cancellation
/// is checked between phases and every batch of rows.
pub fn run_audit(
    catalog: &Catalog,
    local_roms: &[LocalRomRecord],
    options: MatchOptions,
    job: &AuditJob<'_>,
) -> Result<AuditReport, AuditError> {
    let mut warnings = Vec::new();

    job.check_cancelled()?;
    let matching = job.phase(AuditPhase::Matching, local_roms.len());
    let matches = match_roms(catalog, local_roms, options);
    for collision in &matches.collisions {
        let warning = AuditWarning::from(collision.clone());
        job.warn(&warning);
        warnings.push(warning);
    }
    matching.finish()?;

    let classifying = job.phase(AuditPhase::Classifying, catalog.len() + local_roms.len());
    let Classification { mut roms, .. } =
        classify_with(catalog, local_roms, &matches, |done| classifying.tick(done))?;
    classifying.finish()?;

    let grouping_phase = job.phase(AuditPhase::Grouping, roms.len());
    let (grouping, group_warnings) =
        pclone::group_with(&roms, catalog, |done| grouping_phase.tick(done))?;
    for warning in group_warnings {
        job.warn(&warning);
        warnings.push(warning);
    }
    grouping.annotate(&mut roms);
    grouping_phase.finish()?;

    let set = AuditedRomSet::new(roms, grouping);
    log::info!(
        "Audit of \"{}\": {} have, {} miss, {} unknown ({} parents, {} clones)",
        catalog.name,
        set.summary.have_count,
        set.summary.miss_count,
        set.summary.unknown_count,
        set.summary.parent_count,
        set.summary.clone_count,
    );
    Ok(AuditReport { set, warnings })
}

/// The set shown when no catalog is attached.
pub fn audit_without_catalog(local_roms: &[LocalRomRecord]) -> AuditedRomSet {
    let Classification { roms, .. } = classify_without_catalog(local_roms);
    AuditedRomSet::new(roms, GroupingIndex::default())
}

#[cfg(test)]
#[path = "tests/audit_tests.rs"]
mod tests;
