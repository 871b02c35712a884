use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogId};

/// The parts of a local ROM record the matcher looks at.
///
/// Implemented by the caller's record type so this crate never needs to know
/// about the rest of its fields.
pub trait LocalFile {
    /// Filename as stored by the caller. Directory components are ignored.
    fn file_name(&self) -> &str;

    /// CRC32 checksum, if the caller hashed the file.
    fn checksum(&self) -> Option<&str>;

    /// File size in bytes, if known.
    fn size(&self) -> Option<u64>;
}

/// Options controlling how local files are paired with catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Include the file extension in filename comparison.
    pub compare_extension: bool,
    /// Accept a checksum match when the filename does not match.
    pub use_checksums: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            compare_extension: true,
            use_checksums: true,
        }
    }
}

/// How a match was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMethod {
    /// Same filename, compared case-insensitively
    Filename,
    /// Same CRC32 (and same size when both sides know it)
    Checksum,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::Filename => f.write_str("filename"),
            MatchMethod::Checksum => f.write_str("checksum"),
        }
    }
}

/// One ROM descriptor of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RomKey {
    pub entry: CatalogId,
    /// Position in [`CatalogEntry::all_roms`](crate::CatalogEntry::all_roms); 0 is the primary ROM
    pub rom_index: usize,
}

/// A local file paired with one ROM descriptor of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomMatch {
    /// Index into the local file slice passed to [`match_roms`]
    pub local_index: usize,
    pub method: MatchMethod,
    pub rom_index: usize,
}

/// Two local files competing for the same ROM descriptor. The first one
/// encountered keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCollision {
    pub catalog_id: CatalogId,
    pub game_name: String,
    pub kept: String,
    pub rejected: String,
    pub method: MatchMethod,
}

impl fmt::Display for MatchCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ambiguous {} match for \"{}\": keeping \"{}\", ignoring \"{}\"",
            self.method, self.game_name, self.kept, self.rejected
        )
    }
}

/// Result of matching a set of local files against a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    /// Indexed by `CatalogId`; claims sorted by `rom_index`
    by_entry: Vec<Vec<RomMatch>>,
    /// Indexed by local file position
    claimed: Vec<bool>,
    pub collisions: Vec<MatchCollision>,
}

impl MatchSet {
    /// The local file standing for a catalog entry: the one holding its
    /// lowest claimed descriptor, so the primary ROM when it is present.
    pub fn for_entry(&self, id: CatalogId) -> Option<RomMatch> {
        self.by_entry.get(id.0).and_then(|claims| claims.first()).copied()
    }

    /// Local files holding the entry's other descriptors, in descriptor order.
    pub fn companions_of(&self, id: CatalogId) -> &[RomMatch] {
        self.by_entry
            .get(id.0)
            .and_then(|claims| claims.get(1..))
            .unwrap_or_default()
    }

    /// Whether the local file at `local_index` was paired with any entry.
    pub fn is_claimed(&self, local_index: usize) -> bool {
        self.claimed.get(local_index).copied().unwrap_or(false)
    }

    /// Number of catalog entries that found at least one local file.
    pub fn matched_count(&self) -> usize {
        self.by_entry.iter().filter(|c| !c.is_empty()).count()
    }

    fn claim_of(&self, key: RomKey) -> Option<RomMatch> {
        self.by_entry[key.entry.0]
            .iter()
            .find(|m| m.rom_index == key.rom_index)
            .copied()
    }

    fn claim(&mut self, key: RomKey, local_index: usize, method: MatchMethod) {
        let claims = &mut self.by_entry[key.entry.0];
        let at = claims.partition_point(|m| m.rom_index < key.rom_index);
        claims.insert(
            at,
            RomMatch {
                local_index,
                method,
                rom_index: key.rom_index,
            },
        );
        self.claimed[local_index] = true;
    }
}

/// Lookup tables over a catalog's ROM descriptors.
pub struct MatchIndex {
    options: MatchOptions,
    /// Normalized filename → descriptor (first one wins)
    by_filename: HashMap<String, RomKey>,
    /// Normalized CRC32 → descriptors carrying it, with their sizes
    by_checksum: HashMap<String, Vec<(RomKey, Option<u64>)>>,
}

impl MatchIndex {
    /// Build an index over every ROM descriptor of every catalog entry.
    pub fn from_catalog(catalog: &Catalog, options: MatchOptions) -> Self {
        let mut by_filename = HashMap::with_capacity(catalog.len());
        let mut by_checksum: HashMap<String, Vec<(RomKey, Option<u64>)>> = HashMap::new();

        for entry in catalog.entries() {
            for (rom_index, rom) in entry.all_roms().enumerate() {
                let key = RomKey {
                    entry: entry.id,
                    rom_index,
                };
                by_filename
                    .entry(normalize_filename(&rom.filename, options.compare_extension))
                    .or_insert(key);
                if let Some(crc) = rom.checksum.as_deref().and_then(normalize_checksum) {
                    by_checksum.entry(crc).or_default().push((key, rom.size));
                }
            }
        }

        Self {
            options,
            by_filename,
            by_checksum,
        }
    }

    pub fn match_by_filename(&self, file_name: &str) -> Option<RomKey> {
        let key = normalize_filename(file_name, self.options.compare_extension);
        self.by_filename.get(&key).copied()
    }

    /// Descriptors carrying this checksum whose size does not contradict `size`.
    pub fn match_by_checksum(&self, checksum: &str, size: Option<u64>) -> Vec<RomKey> {
        let Some(crc) = normalize_checksum(checksum) else {
            return Vec::new();
        };
        self.by_checksum
            .get(&crc)
            .map(|candidates| {
                candidates
                    .iter()
                    .filter(|(_, rom_size)| sizes_agree(*rom_size, size))
                    .map(|(key, _)| *key)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Pair local files with the ROM descriptors of catalog entries.
///
/// Filename matching runs first over every local file, so a filename match
/// always wins over a checksum match for the same descriptor. Checksum
/// matching then fills descriptors that are still free. Each descriptor is
/// held by one local file; when a second file wants it the first one keeps
/// it and a [`MatchCollision`] is recorded. Files holding different
/// descriptors of one entry (a cue sheet and its tracks) all count as
/// matched.
pub fn match_roms<L: LocalFile>(
    catalog: &Catalog,
    local_roms: &[L],
    options: MatchOptions,
) -> MatchSet {
    let index = MatchIndex::from_catalog(catalog, options);
    let mut set = MatchSet {
        by_entry: vec![Vec::new(); catalog.len()],
        claimed: vec![false; local_roms.len()],
        collisions: Vec::new(),
    };

    for (local_index, local) in local_roms.iter().enumerate() {
        let Some(key) = index.match_by_filename(local.file_name()) else {
            continue;
        };
        match set.claim_of(key) {
            None => set.claim(key, local_index, MatchMethod::Filename),
            Some(existing) => set.collisions.push(collision(
                catalog,
                key.entry,
                local_roms[existing.local_index].file_name(),
                local.file_name(),
                MatchMethod::Filename,
            )),
        }
    }

    if options.use_checksums {
        for (local_index, local) in local_roms.iter().enumerate() {
            if set.claimed[local_index] {
                continue;
            }
            let Some(checksum) = local.checksum() else {
                continue;
            };
            let candidates = index.match_by_checksum(checksum, local.size());
            if candidates.is_empty() {
                continue;
            }
            match candidates.iter().find(|key| set.claim_of(**key).is_none()) {
                Some(&key) => set.claim(key, local_index, MatchMethod::Checksum),
                None => {
                    let key = candidates[0];
                    if let Some(existing) = set.claim_of(key) {
                        set.collisions.push(collision(
                            catalog,
                            key.entry,
                            local_roms[existing.local_index].file_name(),
                            local.file_name(),
                            MatchMethod::Checksum,
                        ));
                    }
                }
            }
        }
    }

    log::debug!(
        "Matched {} of {} catalog entries ({} local files, {} collisions)",
        set.matched_count(),
        catalog.len(),
        local_roms.len(),
        set.collisions.len()
    );

    set
}

fn collision(
    catalog: &Catalog,
    id: CatalogId,
    kept: &str,
    rejected: &str,
    method: MatchMethod,
) -> MatchCollision {
    MatchCollision {
        catalog_id: id,
        game_name: catalog
            .get(id)
            .map(|e| e.game_name.clone())
            .unwrap_or_default(),
        kept: kept.to_string(),
        rejected: rejected.to_string(),
        method,
    }
}

/// Normalize a filename for matching: last path component, lowercased, and
/// optionally without its extension.
pub fn normalize_filename(file_name: &str, compare_extension: bool) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    let base = if compare_extension {
        base
    } else {
        match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => base,
        }
    };
    base.to_lowercase()
}

/// Normalize a CRC32 string: lowercase hex without a `0x` prefix.
/// Returns `None` for empty input.
pub fn normalize_checksum(checksum: &str) -> Option<String> {
    let trimmed = checksum.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex.is_empty() {
        None
    } else {
        Some(hex.to_lowercase())
    }
}

fn sizes_agree(a: Option<u64>, b: Option<u64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

#[cfg(test)]
#[path = "tests/matcher_tests.rs"]
mod tests;
