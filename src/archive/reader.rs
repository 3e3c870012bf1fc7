//! Opening existing archives.
//!
//! [`Archive::open`] validates the whole geometry up front: the card header
//! (XCI), the partition header and the extent of the data region. Once open,
//! listing entries never touches the source again and entry data is exposed
//! through [`Take`] readers bounded to the entry's size.

use std::io::{Read, Seek, SeekFrom, Take};
use std::ops::Index;

use tracing::{debug, info};

use super::ArchiveKind;
use crate::formats::partition::{
    FIXED_HEADER_SIZE, HeaderPrefix, PartitionEntry, PartitionFormat, PartitionTable,
};
use crate::formats::xci::{self, CartridgeHeader};
use crate::utils::{bytesa, stream_len};
use crate::{Error, Result};

/// Read-only view of a finalized NSP or XCI.
#[derive(Debug)]
pub struct Archive<R> {
    inner: R,
    kind: ArchiveKind,
    cartridge: Option<CartridgeHeader>,
    /// Position of the card header (0, or 0x1000 for key-area dumps).
    cartridge_offset: u64,
    table: PartitionTable,
    partition_offset: u64,
    header_size: u64,
    source_len: u64,
}

impl<R: Read + Seek> Archive<R> {
    /// Open and validate an archive, detecting its kind from the magic.
    pub fn open(mut reader: R) -> Result<Self> {
        let source_len = stream_len(&mut reader)?;
        if source_len < 4 {
            return Err(Error::NotAnArchive);
        }
        reader.seek(SeekFrom::Start(0))?;
        let magic = bytesa::<4>(&mut reader)?;

        let (kind, cartridge, cartridge_offset, partition_offset) =
            if PartitionFormat::from_magic(&magic).is_some() {
                (ArchiveKind::Nsp, None, 0, 0)
            } else if let Some((base, card)) = CartridgeHeader::locate(&mut reader, source_len)? {
                if card.hfs0_offset < base + xci::HEADER_SIZE {
                    return Err(Error::malformed(format!(
                        "HFS0 offset {:#x} overlaps the card header",
                        card.hfs0_offset
                    )));
                }
                let offset = card.hfs0_offset;
                (ArchiveKind::Xci, Some(card), base, offset)
            } else {
                return Err(Error::NotAnArchive);
            };

        let (table, header_size) = match read_partition(&mut reader, partition_offset, source_len) {
            Err(Error::NotAnArchive) if kind == ArchiveKind::Xci => {
                return Err(Error::malformed("card header does not point at an HFS0"));
            }
            other => other?,
        };

        if let Some(card) = &cartridge {
            if table.format() != PartitionFormat::Hfs0 {
                return Err(Error::malformed("XCI root partition is not HFS0"));
            }
            if card.hfs0_header_size != header_size {
                return Err(Error::malformed(format!(
                    "card header declares a {:#x}-byte HFS0 header, found {header_size:#x}",
                    card.hfs0_header_size
                )));
            }
        }

        let data_end = end_of(partition_offset + header_size, table.data_size())?;
        if data_end > source_len {
            return Err(Error::TruncatedArchive {
                needed: data_end,
                available: source_len,
            });
        }

        info!(
            %kind,
            format = ?table.format(),
            entries = table.len(),
            "archive opened"
        );

        Ok(Self {
            inner: reader,
            kind,
            cartridge,
            cartridge_offset,
            table,
            partition_offset,
            header_size,
            source_len,
        })
    }

    /// Open a bounded reader over an entry's bytes.
    ///
    /// Seeks to the entry's start and returns a [`Take`] limited to its byte
    /// range. The borrow ends when the [`Take`] is dropped.
    pub fn read_entry_data(&mut self, entry: &PartitionEntry) -> Result<Take<&mut R>> {
        if !self.table.entries().contains(entry) {
            return Err(Error::UnknownEntry(entry.name.clone()));
        }
        debug!(entry = %entry.name, offset = entry.offset, size = entry.size, "reading entry");
        self.inner
            .seek(SeekFrom::Start(self.data_offset() + entry.offset))?;
        Ok(self.inner.by_ref().take(entry.size))
    }

    /// Read an entry fully into memory.
    pub fn read_entry_to_vec(&mut self, entry: &PartitionEntry) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(entry.size as usize);
        self.read_entry_data(entry)?.read_to_end(&mut out)?;
        Ok(out)
    }
}

impl<R> Archive<R> {
    /// Container kind detected at open.
    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// Card header, for XCI.
    pub fn cartridge_header(&self) -> Option<&CartridgeHeader> {
        self.cartridge.as_ref()
    }

    /// Position of the card header within the source.
    pub fn cartridge_offset(&self) -> u64 {
        self.cartridge_offset
    }

    /// Parsed partition table.
    pub fn table(&self) -> &PartitionTable {
        &self.table
    }

    /// Iterate over all entries in table order.
    ///
    /// Served from the parsed table; calling it again restarts from the first
    /// entry without reading the source.
    pub fn entries(&self) -> std::slice::Iter<'_, PartitionEntry> {
        self.table.entries().iter()
    }

    /// All entries in table order.
    pub fn list_entries(&self) -> &[PartitionEntry] {
        self.table.entries()
    }

    /// Find an entry by name. Returns [`None`] if not found.
    pub fn get_entry_by_name(&self, name: &str) -> Option<&PartitionEntry> {
        self.table.get(name)
    }

    /// Absolute offset of the partition header.
    pub fn partition_offset(&self) -> u64 {
        self.partition_offset
    }

    /// Length of the partition header as stored.
    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    /// Absolute offset of the data region.
    pub fn data_offset(&self) -> u64 {
        self.partition_offset + self.header_size
    }

    /// Length of the underlying source.
    pub fn source_len(&self) -> u64 {
        self.source_len
    }

    /// Split borrow used by the verifier.
    pub(crate) fn parts_mut(&mut self) -> (&PartitionTable, &mut R) {
        (&self.table, &mut self.inner)
    }

    /// Close the archive, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> Index<&str> for Archive<R> {
    type Output = PartitionEntry;

    /// Index by entry name.
    ///
    /// # Panics
    /// Panics if the name does not exist in the archive.
    fn index(&self, index: &str) -> &Self::Output {
        self.get_entry_by_name(index)
            .unwrap_or_else(|| panic!("no entry '{index}' in archive"))
    }
}

fn end_of(offset: u64, len: u64) -> Result<u64> {
    offset
        .checked_add(len)
        .ok_or_else(|| Error::malformed("region end overflows"))
}

/// Read and decode the partition header at `offset`. Returns the table and
/// the header length as declared on disk.
fn read_partition<R: Read + Seek>(
    r: &mut R,
    offset: u64,
    source_len: u64,
) -> Result<(PartitionTable, u64)> {
    let prefix_end = end_of(offset, FIXED_HEADER_SIZE)?;
    if prefix_end > source_len {
        return Err(Error::TruncatedArchive {
            needed: prefix_end,
            available: source_len,
        });
    }
    r.seek(SeekFrom::Start(offset))?;
    let prefix = bytesa::<{ FIXED_HEADER_SIZE as usize }>(r)?;
    let header_end = end_of(offset, HeaderPrefix::parse(&prefix)?.header_size())?;
    if header_end > source_len {
        return Err(Error::TruncatedArchive {
            needed: header_end,
            available: source_len,
        });
    }

    r.seek(SeekFrom::Start(offset))?;
    PartitionTable::read_from(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::writer::{EntryInput, WriterOptions, build_archive};
    use crate::formats::xci::CartridgeOptions;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn nsp_bytes() -> Vec<u8> {
        let (sink, _) = build_archive(
            Cursor::new(Vec::new()),
            WriterOptions::nsp(),
            [
                EntryInput::new("a.nca", Cursor::new(vec![1u8; 100]), 100),
                EntryInput::new("b.nca", Cursor::new(vec![2u8; 4096]), 4096),
            ],
        )
        .unwrap();
        sink.into_inner()
    }

    #[test]
    fn opens_nsp_and_lists_in_order() {
        let archive = Archive::open(Cursor::new(nsp_bytes())).unwrap();
        assert_eq!(archive.kind(), ArchiveKind::Nsp);
        let names: Vec<_> = archive.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.nca", "b.nca"]);
        // restartable
        assert_eq!(archive.entries().count(), 2);
        assert_eq!(archive["b.nca"].size, 4096);
        assert_eq!(archive.data_offset(), 0x60);
    }

    #[test]
    fn entry_reader_is_bounded() {
        let mut archive = Archive::open(Cursor::new(nsp_bytes())).unwrap();
        let a = archive["a.nca"].clone();
        let mut data = Vec::new();
        archive.read_entry_data(&a).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, vec![1u8; 100]);
    }

    #[test]
    fn foreign_entry_is_rejected() {
        let mut archive = Archive::open(Cursor::new(nsp_bytes())).unwrap();
        let fake = PartitionEntry::new("a.nca", 0, 101);
        assert!(matches!(
            archive.read_entry_data(&fake),
            Err(Error::UnknownEntry(_))
        ));
    }

    #[test]
    fn garbage_is_not_an_archive() {
        for bytes in [vec![], vec![0u8; 3], vec![0xFFu8; 0x4000]] {
            assert!(matches!(
                Archive::open(Cursor::new(bytes)),
                Err(Error::NotAnArchive)
            ));
        }
    }

    #[test]
    fn header_cut_short_is_truncated() {
        let bytes = nsp_bytes();
        assert!(matches!(
            Archive::open(Cursor::new(bytes[..0x20].to_vec())),
            Err(Error::TruncatedArchive { needed: 0x60, .. })
        ));
        assert!(matches!(
            Archive::open(Cursor::new(bytes[..8].to_vec())),
            Err(Error::TruncatedArchive { needed: 0x10, .. })
        ));
    }

    #[test]
    fn xci_cut_inside_card_header_is_truncated() {
        let (sink, _) = build_archive(
            Cursor::new(Vec::new()),
            WriterOptions::xci(CartridgeOptions::default()),
            [EntryInput::new("secure", Cursor::new(vec![3u8; 10]), 10)],
        )
        .unwrap();
        let bytes = sink.into_inner();
        for cut in [0x150, 0x1FF] {
            assert!(matches!(
                Archive::open(Cursor::new(bytes[..cut].to_vec())),
                Err(Error::TruncatedArchive { needed: 0x200, .. })
            ));
        }

        let mut image = vec![0u8; xci::KEY_AREA_SIZE as usize];
        image.extend_from_slice(&bytes);
        image.truncate(0x1180);
        assert!(matches!(
            Archive::open(Cursor::new(image)),
            Err(Error::TruncatedArchive {
                needed: 0x1200,
                available: 0x1180
            })
        ));
    }

    #[test]
    fn xci_with_mismatched_header_size_is_malformed() {
        let (sink, _) = build_archive(
            Cursor::new(Vec::new()),
            WriterOptions::xci(CartridgeOptions::default()),
            [EntryInput::new("secure", Cursor::new(vec![3u8; 10]), 10)],
        )
        .unwrap();
        let mut bytes = sink.into_inner();
        bytes[0x138..0x140].copy_from_slice(&0x400u64.to_le_bytes());
        assert!(matches!(
            Archive::open(Cursor::new(bytes)),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn xci_pointing_at_garbage_is_malformed() {
        let (sink, _) = build_archive(
            Cursor::new(Vec::new()),
            WriterOptions::xci(CartridgeOptions::default()),
            [EntryInput::new("secure", Cursor::new(vec![3u8; 10]), 10)],
        )
        .unwrap();
        let mut bytes = sink.into_inner();
        bytes[0x130..0x138].copy_from_slice(&0x400u64.to_le_bytes());
        assert!(matches!(
            Archive::open(Cursor::new(bytes)),
            Err(Error::MalformedHeader(_))
        ));
    }
}
