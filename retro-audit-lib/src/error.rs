use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use retro_audit_dat::{CatalogWarning, DatError, MatchCollision};

use crate::rom::{PLACEHOLDER_ID_PREFIX, RomId};
use crate::store::StoreError;

/// Errors that abort an audit operation. The committed state of the
/// collection is never touched when one of these is returned.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The catalog file could not be read or parsed
    #[error("Catalog parse error: {0}")]
    CatalogParse(#[from] DatError),

    /// The operation was cancelled through its [`CancelToken`](crate::CancelToken)
    #[error("Audit cancelled")]
    Cancelled,

    /// Saving the committed set failed; the in-memory state is still valid
    #[error("Failed to save audited ROM set: {0}")]
    CommitIo(#[from] StoreError),
}

/// Non-fatal problems reported while auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditWarning {
    /// Two local files matched the same catalog entry; the first one kept it.
    AmbiguousMatch(MatchCollision),
    /// A clone names a parent that is not in the catalog; it became a parent.
    OrphanClone {
        game_name: String,
        missing_parent: String,
    },
    /// Clone references form a loop; the first member became the parent.
    CloneCycle { games: Vec<String> },
    /// Problem found while building the catalog.
    Catalog(CatalogWarning),
    /// A local record reused an id; the later record was dropped.
    DuplicateRomId { id: RomId, filename: String },
    /// A local record used an id from the placeholder namespace; it was dropped.
    ReservedRomId { id: RomId, filename: String },
}

impl fmt::Display for AuditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditWarning::AmbiguousMatch(c) => write!(f, "{c}"),
            AuditWarning::OrphanClone {
                game_name,
                missing_parent,
            } => write!(
                f,
                "Parent \"{missing_parent}\" of \"{game_name}\" is not in the catalog; treating it as a parent"
            ),
            AuditWarning::CloneCycle { games } => {
                write!(f, "Clone references form a cycle: {}", games.join(" -> "))
            }
            AuditWarning::Catalog(w) => write!(f, "{w}"),
            AuditWarning::DuplicateRomId { id, filename } => {
                write!(f, "Duplicate ROM id \"{id}\" for \"{filename}\"; ignoring it")
            }
            AuditWarning::ReservedRomId { id, filename } => write!(
                f,
                "ROM id \"{id}\" for \"{filename}\" uses the reserved \"{PLACEHOLDER_ID_PREFIX}\" prefix; ignoring it"
            ),
        }
    }
}

impl From<MatchCollision> for AuditWarning {
    fn from(c: MatchCollision) -> Self {
        Self::AmbiguousMatch(c)
    }
}

impl From<CatalogWarning> for AuditWarning {
    fn from(w: CatalogWarning) -> Self {
        Self::Catalog(w)
    }
}
