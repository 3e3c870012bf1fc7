//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout nspkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Structural errors abort an open or a write immediately. Digest mismatches
/// are normally reported as data by [`crate::archive::verify`]; the
/// [`Error::DigestMismatch`] variant only appears when a caller asks for a
/// fail-fast result via [`crate::archive::VerifyReport::into_result`].
#[derive(Debug, Error)]
pub enum Error {
    /// The magic/format marker did not match any supported container.
    #[error("not a PFS0, HFS0 or XCI container")]
    NotAnArchive,

    /// The source ended before the region its header declares.
    #[error("archive truncated: need {needed} bytes, source has {available}")]
    TruncatedArchive {
        /// Bytes the header says must exist.
        needed: u64,
        /// Bytes actually available.
        available: u64,
    },

    /// Table geometry is inconsistent (message describes which constraint).
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A streamed payload did not match its declared length.
    #[error("size mismatch for '{name}': declared {declared} bytes, got {actual}")]
    SizeMismatch {
        /// Entry name.
        name: String,
        /// Length announced by the caller.
        declared: u64,
        /// Length actually produced by the source (capped at `declared + 1`).
        actual: u64,
    },

    /// The final header length differs from the reserved placeholder.
    ///
    /// This is an internal invariant violation; the output must be discarded.
    #[error("header size changed after reservation: reserved {reserved}, encoded {actual}")]
    HeaderSizeMismatch {
        /// Bytes reserved at `begin`.
        reserved: u64,
        /// Bytes produced by the final encode.
        actual: u64,
    },

    /// The sink cannot seek, so the header cannot be patched back.
    #[error("destination does not support seeking")]
    SeekNotSupported,

    /// A stored digest does not match the recomputed one.
    #[error("digest mismatch in {region}: expected {}, got {}", hex::encode(expected), hex::encode(actual))]
    DigestMismatch {
        /// Human-readable region identifier.
        region: String,
        /// Digest stored in the archive.
        expected: [u8; 32],
        /// Digest recomputed from the data.
        actual: [u8; 32],
    },

    /// An entry name is empty, contains NUL, or is duplicated.
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),

    /// Entries were added out of the announced order.
    #[error("unexpected entry '{found}', expected '{expected}'")]
    UnexpectedEntry {
        /// Next announced name (empty when all entries were already added).
        expected: String,
        /// Name passed by the caller.
        found: String,
    },

    /// `finalize` was called before every announced entry was added.
    #[error("{0} announced entries were never added")]
    MissingEntries(usize),

    /// The entry does not belong to this archive's table.
    #[error("entry '{0}' is not part of this archive")]
    UnknownEntry(String),

    /// Writer options are inconsistent.
    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),

    /// An earlier failure aborted the write; the output is incomplete.
    #[error("writer aborted by an earlier error")]
    WriterPoisoned,

    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Zstandard encoding or decoding failed.
    #[cfg(feature = "compression")]
    #[error("zstd stream failed: {0}")]
    Zstd(io::Error),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedHeader(reason.into())
    }

    /// True for errors that describe a broken or foreign input file rather
    /// than an I/O or usage failure.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::NotAnArchive | Self::TruncatedArchive { .. } | Self::MalformedHeader(_)
        )
    }
}
