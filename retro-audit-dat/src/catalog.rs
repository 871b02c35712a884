//! Flattened, ordered view of a parsed DAT.
//!
//! Every usable game record becomes one [`CatalogEntry`]. Entries keep the
//! order in which they appear in the source file; later stages rely on that
//! order to break ties deterministically.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dat::{DatFile, DatRom};
use crate::error::DatError;

/// Position of an entry in the catalog's parse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(pub usize);

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single known-good release from the reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: CatalogId,
    pub game_name: String,
    /// Filename of the game's first ROM descriptor.
    pub rom_filename: String,
    /// CRC32 of the first ROM descriptor (lowercase hex).
    pub checksum: Option<String>,
    pub size: Option<u64>,
    /// `game_name` of the parent entry when this entry is a clone.
    pub clone_of: Option<String>,
    /// Remaining ROM descriptors of multi-file games (tracks, cue/bin pairs).
    #[serde(default)]
    pub alt_roms: Vec<CatalogRom>,
}

/// An additional ROM descriptor belonging to a [`CatalogEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRom {
    pub filename: String,
    pub checksum: Option<String>,
    pub size: Option<u64>,
}

impl From<&DatRom> for CatalogRom {
    fn from(rom: &DatRom) -> Self {
        Self {
            filename: rom.name.clone(),
            checksum: rom.crc.clone(),
            size: rom.size,
        }
    }
}

impl CatalogEntry {
    /// Every ROM descriptor of this entry, primary first.
    pub fn all_roms(&self) -> impl Iterator<Item = CatalogRom> + '_ {
        std::iter::once(CatalogRom {
            filename: self.rom_filename.clone(),
            checksum: self.checksum.clone(),
            size: self.size,
        })
        .chain(self.alt_roms.iter().cloned())
    }
}

/// Non-fatal problems found while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogWarning {
    /// A record was dropped because it lacked a name or a usable ROM.
    SkippedRecord { game_name: String, reason: String },
    /// A record reused a ROM filename already claimed by an earlier record.
    DuplicateRomFilename {
        rom_filename: String,
        kept: String,
        skipped: String,
    },
    /// A record reused a game name already claimed by an earlier record.
    DuplicateGameName { game_name: String },
}

impl fmt::Display for CatalogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogWarning::SkippedRecord { game_name, reason } => {
                write!(f, "Skipped DAT record \"{game_name}\": {reason}")
            }
            CatalogWarning::DuplicateRomFilename {
                rom_filename,
                kept,
                skipped,
            } => write!(
                f,
                "Duplicate ROM filename \"{rom_filename}\": keeping \"{kept}\", skipping \"{skipped}\""
            ),
            CatalogWarning::DuplicateGameName { game_name } => {
                write!(f, "Duplicate game name \"{game_name}\": keeping first record")
            }
        }
    }
}

/// An attached reference catalog: ordered entries plus lookup indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub name: String,
    pub description: String,
    pub version: String,
    entries: Vec<CatalogEntry>,
    by_game_name: HashMap<String, CatalogId>,
}

impl Catalog {
    /// Build a catalog from a parsed DAT.
    ///
    /// Records without a name or without any named ROM are skipped. Duplicate
    /// ROM filenames (compared case-insensitively) and duplicate game names
    /// keep the first record. Each problem is returned for the caller to report.
    pub fn from_dat(dat: DatFile) -> (Self, Vec<CatalogWarning>) {
        let mut warnings = Vec::new();
        let mut entries: Vec<CatalogEntry> = Vec::with_capacity(dat.games.len());
        let mut by_game_name = HashMap::with_capacity(dat.games.len());
        let mut rom_owner: HashMap<String, usize> = HashMap::new();

        for game in dat.games {
            let name = game.name.trim().to_string();
            if name.is_empty() {
                warnings.push(CatalogWarning::SkippedRecord {
                    game_name: String::new(),
                    reason: "record has no name".into(),
                });
                continue;
            }

            let roms: Vec<&DatRom> = game.roms.iter().filter(|r| !r.name.is_empty()).collect();
            let Some(primary) = roms.first() else {
                warnings.push(CatalogWarning::SkippedRecord {
                    game_name: name,
                    reason: "record has no ROM descriptors".into(),
                });
                continue;
            };

            if by_game_name.contains_key(&name) {
                warnings.push(CatalogWarning::DuplicateGameName { game_name: name });
                continue;
            }

            let key = primary.name.to_lowercase();
            if let Some(&owner) = rom_owner.get(&key) {
                warnings.push(CatalogWarning::DuplicateRomFilename {
                    rom_filename: primary.name.clone(),
                    kept: entries[owner].game_name.clone(),
                    skipped: name,
                });
                continue;
            }

            let id = CatalogId(entries.len());
            for rom in &roms {
                rom_owner.entry(rom.name.to_lowercase()).or_insert(id.0);
            }
            by_game_name.insert(name.clone(), id);
            entries.push(CatalogEntry {
                id,
                game_name: name,
                rom_filename: primary.name.clone(),
                checksum: primary.crc.clone(),
                size: primary.size,
                clone_of: game
                    .clone_of
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
                alt_roms: roms[1..].iter().map(|r| CatalogRom::from(*r)).collect(),
            });
        }

        log::debug!(
            "Built catalog \"{}\": {} entries, {} warnings",
            dat.name,
            entries.len(),
            warnings.len()
        );

        let catalog = Self {
            name: dat.name,
            description: dat.description,
            version: dat.version,
            entries,
            by_game_name,
        };
        (catalog, warnings)
    }

    /// Parse a DAT file from disk and build a catalog from it.
    pub fn load(path: &std::path::Path) -> Result<(Self, Vec<CatalogWarning>), DatError> {
        let dat = crate::dat::parse_dat_file(path)?;
        Ok(Self::from_dat(dat))
    }

    /// Entries in parse order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, id: CatalogId) -> Option<&CatalogEntry> {
        self.entries.get(id.0)
    }

    /// Look up an entry by its exact game name.
    pub fn find_by_name(&self, game_name: &str) -> Option<&CatalogEntry> {
        self.by_game_name
            .get(game_name)
            .and_then(|id| self.entries.get(id.0))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
