//! HFS0 (SHA-256 FileSystem) - hashed archive record layout.
//!
//! Used as the partition embedded in XCI game cards, and by nspkit for NSPs
//! written with entry hashing enabled.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "HFS0"              (4 bytes)
//! [0x04] FileCount                 (u32 LE)
//! [0x08] StringTableSize           (u32 LE)
//! [0x0C] Reserved                  (4 bytes)
//! [0x10] EntryTable                (FileCount × 0x40 bytes)
//! [0x10 + FileCount×0x40]
//!        StringTable               (StringTableSize bytes)
//! [(after StringTable)]
//!        FileData                  (remaining bytes)
//! ```
//!
//! ## File Entry (0x40 bytes)
//! ```text
//! [0x00] DataOffset - relative to the data section start (u64 LE)
//! [0x08] DataSize   - in bytes (u64 LE)
//! [0x10] NameOffset - byte offset into the string table (u32 LE)
//! [0x14] HashedRegionSize - number of leading bytes covered by the hash (u32 LE)
//! [0x18] Reserved   (u64)
//! [0x20] SHA-256 hash of the first HashedRegionSize bytes (32 bytes)
//! ```
//!
//! A record with `HashedRegionSize == 0` and an all-zero digest is treated
//! as unhashed. Headers written by nspkit are zero-padded to a multiple of
//! 0x200 bytes (one media unit).

use std::io::Read;

use super::partition::{EntryHash, PartitionEntry, RawRecord};
use crate::Result;
use crate::utils::{bytesa, le_u32, le_u64, put_u32, put_u64};

/// Container magic.
pub const MAGIC: &[u8; 4] = b"HFS0";
/// Size of one entry record.
pub const ENTRY_SIZE: u64 = 0x40;
/// Header alignment used when encoding.
pub const ALIGNMENT: u64 = 0x200;

pub(crate) fn write_record(out: &mut Vec<u8>, entry: &PartitionEntry, name_offset: u32) {
    put_u64(out, entry.offset);
    put_u64(out, entry.size);
    put_u32(out, name_offset);
    match &entry.hash {
        Some(h) => {
            put_u32(out, h.hashed_region_size);
            put_u64(out, 0);
            out.extend_from_slice(&h.sha256);
        }
        None => {
            put_u32(out, 0);
            put_u64(out, 0);
            out.extend_from_slice(&[0u8; 32]);
        }
    }
}

pub(crate) fn read_record<R: Read>(r: &mut R) -> Result<RawRecord> {
    let offset = le_u64(r)?;
    let size = le_u64(r)?;
    let name_offset = le_u32(r)?;
    let hashed_region_size = le_u32(r)?;
    let _reserved = le_u64(r)?;
    let sha256 = bytesa::<32>(r)?;

    let hash = if hashed_region_size == 0 && sha256 == [0u8; 32] {
        None
    } else {
        Some(EntryHash {
            hashed_region_size,
            sha256,
        })
    };

    Ok(RawRecord {
        offset,
        size,
        name_offset,
        hash,
    })
}
