//! On-disk layouts of the Nintendo Switch package containers.
//!
//! Each submodule targets one layout. They share the same conventions:
//!
//! * **Pure codecs** - everything here turns bytes into typed metadata and
//!   back. Streaming payloads, patch-back and verification live in
//!   [`crate::archive`].
//! * **Little endian**, fixed-size records, names in a NUL-terminated string
//!   table.
//! * **Contents are opaque** - file bodies (NCAs, tickets, nested
//!   partitions) are never interpreted.
//!
//! ## Format overview
//!
//! | Module        | Format | Description |
//! |---------------|--------|-------------|
//! | [`partition`] | PFS0 / HFS0 | Shared table model and header codec |
//! | [`pfs0`]      | PFS0   | Record layout of plain NSP partitions |
//! | [`hfs0`]      | HFS0   | Record layout of SHA-256 hashed partitions |
//! | [`xci`]       | XCI    | Game card header wrapping a root HFS0 |

pub mod hfs0;
pub mod partition;
pub mod pfs0;
pub mod xci;

pub use partition::{EntryHash, HeaderPrefix, PartitionEntry, PartitionFormat, PartitionTable};
pub use xci::{CartridgeHeader, CartridgeOptions, CartridgeSize};
