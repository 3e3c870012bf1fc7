//! Partition table model and codec shared by PFS0 and HFS0.
//!
//! Both formats use the same header shape - a 0x10-byte prefix, one
//! fixed-size record per entry, then a string table of NUL-terminated names -
//! and differ only in record size, hashing and alignment. The per-format
//! record layout lives in [`super::pfs0`] and [`super::hfs0`]; this module is
//! the single place that assembles and parses whole headers.
//!
//! [`PartitionTable::header_size`] depends only on the format and the entry
//! names, never on sizes, offsets or hashes. A writer can therefore reserve
//! the exact header slot before any payload has been streamed.

use std::io::{Cursor, Read};

use super::{hfs0, pfs0};
use crate::utils::{align_up, le_u32, null_string, put_u32};
use crate::{Error, Result};

/// Size of the `magic | count | string table size | reserved` prefix.
pub const FIXED_HEADER_SIZE: u64 = 0x10;

/// On-disk partition flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionFormat {
    /// Plain PartitionFS, no per-entry hashes.
    Pfs0,
    /// SHA-256 FileSystem, one digest per entry.
    Hfs0,
}

impl PartitionFormat {
    /// The four magic bytes opening a header of this format.
    pub fn magic(self) -> &'static [u8; 4] {
        match self {
            Self::Pfs0 => pfs0::MAGIC,
            Self::Hfs0 => hfs0::MAGIC,
        }
    }

    /// Identify a format from its magic.
    pub fn from_magic(magic: &[u8; 4]) -> Option<Self> {
        match magic {
            m if m == pfs0::MAGIC => Some(Self::Pfs0),
            m if m == hfs0::MAGIC => Some(Self::Hfs0),
            _ => None,
        }
    }

    /// Size in bytes of one entry record.
    pub fn entry_size(self) -> u64 {
        match self {
            Self::Pfs0 => pfs0::ENTRY_SIZE,
            Self::Hfs0 => hfs0::ENTRY_SIZE,
        }
    }

    /// Alignment the encoded header is padded to.
    pub fn alignment(self) -> u64 {
        match self {
            Self::Pfs0 => pfs0::ALIGNMENT,
            Self::Hfs0 => hfs0::ALIGNMENT,
        }
    }

    /// Whether records carry a content hash.
    pub fn is_hashed(self) -> bool {
        matches!(self, Self::Hfs0)
    }
}

/// SHA-256 over the leading `hashed_region_size` bytes of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryHash {
    /// Number of leading bytes covered by `sha256`.
    pub hashed_region_size: u32,
    /// Digest of those bytes.
    pub sha256: [u8; 32],
}

/// One file inside a partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionEntry {
    /// File name decoded from the string table.
    pub name: String,
    /// Offset relative to the partition's data region.
    pub offset: u64,
    /// File size in bytes.
    pub size: u64,
    /// Content hash (HFS0 only).
    pub hash: Option<EntryHash>,
}

impl PartitionEntry {
    /// Unhashed entry.
    pub fn new(name: impl Into<String>, offset: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            hash: None,
        }
    }

    /// Attach a content hash.
    pub fn with_hash(mut self, hash: EntryHash) -> Self {
        self.hash = Some(hash);
        self
    }

    /// First byte past this entry, relative to the data region.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// A decoded entry record before its name has been resolved.
#[derive(Debug)]
pub(crate) struct RawRecord {
    pub offset: u64,
    pub size: u64,
    pub name_offset: u32,
    pub hash: Option<EntryHash>,
}

/// Geometry read from the 0x10-byte header prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPrefix {
    /// Format identified by the magic.
    pub format: PartitionFormat,
    /// Declared number of entries.
    pub entry_count: u32,
    /// Declared string table length, padding included.
    pub string_table_size: u32,
}

impl HeaderPrefix {
    /// Parse the fixed prefix. Fails with [`Error::NotAnArchive`] on an
    /// unknown magic.
    pub fn parse(prefix: &[u8; FIXED_HEADER_SIZE as usize]) -> Result<Self> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&prefix[..4]);
        let format = PartitionFormat::from_magic(&magic).ok_or(Error::NotAnArchive)?;
        let mut r = Cursor::new(&prefix[4..]);
        let entry_count = le_u32(&mut r)?;
        let string_table_size = le_u32(&mut r)?;
        Ok(Self {
            format,
            entry_count,
            string_table_size,
        })
    }

    /// Total header length this prefix declares.
    pub fn header_size(&self) -> u64 {
        FIXED_HEADER_SIZE
            + u64::from(self.entry_count) * self.format.entry_size()
            + u64::from(self.string_table_size)
    }
}

/// Ordered file table of one PFS0/HFS0 partition.
///
/// Entries keep insertion order; every mutation goes through the same
/// validation, whether the table is being built or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTable {
    format: PartitionFormat,
    entries: Vec<PartitionEntry>,
}

impl PartitionTable {
    /// Empty table.
    pub fn new(format: PartitionFormat) -> Self {
        Self {
            format,
            entries: Vec::new(),
        }
    }

    /// Build a table from entries, validating each one.
    pub fn from_entries<I>(format: PartitionFormat, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = PartitionEntry>,
    {
        let mut table = Self::new(format);
        for entry in entries {
            table.push(entry)?;
        }
        Ok(table)
    }

    /// Append an entry.
    ///
    /// Rejects empty or NUL-containing names, duplicates, ranges that
    /// overlap or precede the previous entry, hashed regions larger than the
    /// entry, and hashes on a PFS0 table.
    pub fn push(&mut self, entry: PartitionEntry) -> Result<()> {
        if entry.name.is_empty() {
            return Err(Error::malformed("empty entry name"));
        }
        if entry.name.contains('\0') {
            return Err(Error::malformed(format!("entry name {:?} contains NUL", entry.name)));
        }
        if self.get(&entry.name).is_some() {
            return Err(Error::malformed(format!("duplicate entry name {:?}", entry.name)));
        }
        if entry.offset.checked_add(entry.size).is_none() {
            return Err(Error::malformed(format!("range of {:?} overflows", entry.name)));
        }
        if let Some(prev) = self.entries.last()
            && entry.offset < prev.end()
        {
            return Err(Error::malformed(format!(
                "{:?} at {:#x} overlaps {:?} ending at {:#x}",
                entry.name,
                entry.offset,
                prev.name,
                prev.end()
            )));
        }
        if let Some(hash) = &entry.hash {
            if !self.format.is_hashed() {
                return Err(Error::malformed("PFS0 entries cannot carry hashes"));
            }
            if u64::from(hash.hashed_region_size) > entry.size {
                return Err(Error::malformed(format!(
                    "hashed region of {:?} exceeds its size",
                    entry.name
                )));
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Partition flavour.
    pub fn format(&self) -> PartitionFormat {
        self.format
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[PartitionEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry by name.
    pub fn get(&self, name: &str) -> Option<&PartitionEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Length of the data region covered by the entries.
    pub fn data_size(&self) -> u64 {
        self.entries.last().map_or(0, PartitionEntry::end)
    }

    /// Header length for `format` holding entries with the given names.
    ///
    /// This is the reservation used by the streaming writer.
    pub fn header_size_for<'a, I>(format: PartitionFormat, names: I) -> u64
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (count, names_len) = names
            .into_iter()
            .fold((0u64, 0u64), |(n, len), name| (n + 1, len + name.len() as u64 + 1));
        align_up(
            FIXED_HEADER_SIZE + count * format.entry_size() + names_len,
            format.alignment(),
        )
    }

    /// Encoded header length.
    pub fn header_size(&self) -> u64 {
        Self::header_size_for(self.format, self.entries.iter().map(|e| e.name.as_str()))
    }

    fn records_size(&self) -> u64 {
        self.entries.len() as u64 * self.format.entry_size()
    }

    /// String table bytes as written, padding included.
    pub fn string_table(&self) -> Vec<u8> {
        let len = (self.header_size() - FIXED_HEADER_SIZE - self.records_size()) as usize;
        let mut table = Vec::with_capacity(len);
        for entry in &self.entries {
            table.extend_from_slice(entry.name.as_bytes());
            table.push(0);
        }
        table.resize(len, 0);
        table
    }

    /// Serialize the complete header.
    pub fn encode(&self) -> Vec<u8> {
        let string_table = self.string_table();
        let mut out = Vec::with_capacity(self.header_size() as usize);

        out.extend_from_slice(self.format.magic());
        put_u32(&mut out, self.entries.len() as u32);
        put_u32(&mut out, string_table.len() as u32);
        put_u32(&mut out, 0);

        let mut name_offset = 0u32;
        for entry in &self.entries {
            match self.format {
                PartitionFormat::Pfs0 => pfs0::write_record(&mut out, entry, name_offset),
                PartitionFormat::Hfs0 => hfs0::write_record(&mut out, entry, name_offset),
            }
            name_offset += entry.name.len() as u32 + 1;
        }

        out.extend_from_slice(&string_table);
        debug_assert_eq!(out.len() as u64, self.header_size());
        out
    }

    /// Parse a complete header from `buf`.
    ///
    /// Bytes after the declared header are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let prefix: &[u8; FIXED_HEADER_SIZE as usize] = buf
            .get(..FIXED_HEADER_SIZE as usize)
            .and_then(|p| p.try_into().ok())
            .ok_or_else(|| Error::malformed("buffer shorter than the fixed header"))?;
        let prefix = HeaderPrefix::parse(prefix)?;

        let header_size = prefix.header_size();
        if header_size > buf.len() as u64 {
            return Err(Error::malformed(format!(
                "{} entries need a {header_size:#x}-byte header, buffer has {:#x}",
                prefix.entry_count,
                buf.len()
            )));
        }

        let records_end =
            (FIXED_HEADER_SIZE + u64::from(prefix.entry_count) * prefix.format.entry_size()) as usize;
        let mut r = Cursor::new(&buf[FIXED_HEADER_SIZE as usize..records_end]);
        let string_table = &buf[records_end..header_size as usize];

        let mut table = Self::new(prefix.format);
        for _ in 0..prefix.entry_count {
            let raw = match prefix.format {
                PartitionFormat::Pfs0 => pfs0::read_record(&mut r)?,
                PartitionFormat::Hfs0 => hfs0::read_record(&mut r)?,
            };
            let name = null_string(string_table, raw.name_offset as usize)?;
            table.push(PartitionEntry {
                name,
                offset: raw.offset,
                size: raw.size,
                hash: raw.hash,
            })?;
        }
        Ok(table)
    }

    /// Read and decode a header from `r`, positioned at its first byte.
    ///
    /// Consumes exactly the declared header length and returns it alongside
    /// the table. A source ending early yields [`Error::TruncatedArchive`]
    /// with both lengths counted from the header start.
    pub fn read_from<R: Read>(r: &mut R) -> Result<(Self, u64)> {
        let mut buf = Vec::with_capacity(FIXED_HEADER_SIZE as usize);
        r.by_ref().take(FIXED_HEADER_SIZE).read_to_end(&mut buf)?;
        let prefix: &[u8; FIXED_HEADER_SIZE as usize] =
            buf.as_slice().try_into().map_err(|_| Error::TruncatedArchive {
                needed: FIXED_HEADER_SIZE,
                available: buf.len() as u64,
            })?;
        let header_size = HeaderPrefix::parse(prefix)?.header_size();

        // grows with the bytes actually present, not the declared size
        r.by_ref()
            .take(header_size - FIXED_HEADER_SIZE)
            .read_to_end(&mut buf)?;
        if (buf.len() as u64) < header_size {
            return Err(Error::TruncatedArchive {
                needed: header_size,
                available: buf.len() as u64,
            });
        }
        Ok((Self::decode(&buf)?, header_size))
    }
}
