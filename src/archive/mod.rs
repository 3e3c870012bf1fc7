//! Whole-archive operations: streaming build, open, verify and repack.
//!
//! ## Lifecycle
//! ```text
//! ArchiveWriter::begin ──add_entry*──▶ ArchiveWriter::finalize ──▶ (sink, FinalizeReport)
//!                                                                      │
//!                     Archive::open ◀──────────────────────────────────┘
//!                          │
//!                 entries / read_entry_data / verify ──▶ into_inner
//! ```
//!
//! `finalize` consumes the writer, so nothing can be added to a finalized
//! archive. An opened [`Archive`] is read-only; producing a modified archive
//! means writing a new one, e.g. with [`repack`].

use std::fmt;

pub mod reader;
pub mod repack;
pub mod verify;
pub mod writer;

pub use reader::Archive;
pub use repack::{extract_all, repack};
pub use verify::{DigestStatus, RegionCheck, RegionId, VerifyReport, verify};
pub use writer::{
    ArchiveWriter, DEFAULT_BUFFER_SIZE, EntryInput, FinalizeReport, HashPolicy, WriterOptions,
    build_archive,
};

/// Top-level container kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Root partition at offset 0.
    Nsp,
    /// Card header wrapping a root HFS0.
    Xci,
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveKind::Nsp => f.write_str("NSP"),
            ArchiveKind::Xci => f.write_str("XCI"),
        }
    }
}
