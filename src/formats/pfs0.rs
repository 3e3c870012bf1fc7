//! PFS0 (PartitionFS) - flat archive record layout.
//!
//! PFS0 is the root container of a plain NSP. It carries no per-file hashes
//! (contrast with [`super::hfs0`]).
//!
//! ## Layout
//! ```text
//! [0x00] Magic "PFS0"              (4 bytes)
//! [0x04] FileCount                 (u32 LE)
//! [0x08] StringTableSize           (u32 LE)
//! [0x0C] Reserved (always 0)       (4 bytes)
//! [0x10] EntryTable                (FileCount × 0x18 bytes)
//! [0x10 + FileCount×0x18]
//!        StringTable               (StringTableSize bytes)
//! [0x10 + FileCount×0x18 + StringTableSize]
//!        FileData                  (remaining bytes)
//! ```
//!
//! ## File Entry (0x18 bytes)
//! ```text
//! [0x00] Offset  - relative to the data section start (u64 LE)
//! [0x08] Size    - in bytes (u64 LE)
//! [0x10] NameOffset - byte offset into the string table (u32 LE)
//! [0x14] Reserved   (u32)
//! ```
//!
//! Headers written by nspkit are zero-padded to a multiple of 0x20 bytes.

use std::io::Read;

use super::partition::{PartitionEntry, RawRecord};
use crate::Result;
use crate::utils::{le_u32, le_u64, put_u32, put_u64};

/// Container magic.
pub const MAGIC: &[u8; 4] = b"PFS0";
/// Size of one entry record.
pub const ENTRY_SIZE: u64 = 0x18;
/// Header alignment used when encoding.
pub const ALIGNMENT: u64 = 0x20;

pub(crate) fn write_record(out: &mut Vec<u8>, entry: &PartitionEntry, name_offset: u32) {
    put_u64(out, entry.offset);
    put_u64(out, entry.size);
    put_u32(out, name_offset);
    put_u32(out, 0);
}

pub(crate) fn read_record<R: Read>(r: &mut R) -> Result<RawRecord> {
    let offset = le_u64(r)?;
    let size = le_u64(r)?;
    let name_offset = le_u32(r)?;
    let _reserved = le_u32(r)?;
    Ok(RawRecord {
        offset,
        size,
        name_offset,
        hash: None,
    })
}
