//! Reference catalog (DAT) parsing and local-file matching.
//!
//! Parses Logiqx XML and ClrMamePro DAT files into an ordered [`Catalog`]
//! and pairs caller-supplied local files with catalog entries.

pub mod catalog;
pub mod dat;
pub mod error;
pub mod matcher;

pub use catalog::{Catalog, CatalogEntry, CatalogId, CatalogRom, CatalogWarning};
pub use dat::{DatFile, DatGame, DatRom, parse_dat, parse_dat_file};
pub use error::DatError;
pub use matcher::{
    LocalFile, MatchCollision, MatchIndex, MatchMethod, MatchOptions, MatchSet, RomKey,
    RomMatch, match_roms,
};
