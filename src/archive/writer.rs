//! Streaming archive writer.
//!
//! Writing happens in three steps over a seekable sink:
//!
//! 1. [`ArchiveWriter::begin`] reserves the header slot. Its length only
//!    depends on the entry names, so the slot is exact. The slot is filled
//!    with zeros, which leaves an unfinished archive without any magic.
//! 2. [`ArchiveWriter::add_entry`] streams each payload through a bounded
//!    buffer straight into the data region, hashing as it goes.
//! 3. [`ArchiveWriter::finalize`] encodes the final table, seeks back and
//!    overwrites the slot. For XCI the card header is written last because it
//!    carries digests of the partition header and of the leading data window.
//!
//! The payload region never moves.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::ArchiveKind;
use crate::formats::partition::{EntryHash, PartitionEntry, PartitionFormat, PartitionTable};
use crate::formats::xci::{self, CartridgeHeader, CartridgeOptions};
use crate::utils::sha256;
use crate::{Error, Result};

/// Default size of the intermediate copy buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 20;

/// How much of each entry an HFS0 hash covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashPolicy {
    /// The whole entry, clamped to the 32-bit `HashedRegionSize` field.
    #[default]
    Full,
    /// At most the first `n` bytes (retail cards use 0x200).
    Prefix(u32),
}

impl HashPolicy {
    fn region_size(self, size: u64) -> u32 {
        let limit = match self {
            HashPolicy::Full => u64::from(u32::MAX),
            HashPolicy::Prefix(n) => u64::from(n),
        };
        size.min(limit) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    Nsp(PartitionFormat),
    Xci(CartridgeOptions),
}

/// Writer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    layout: Layout,
    /// Coverage of HFS0 entry hashes. Ignored for PFS0.
    pub hash_policy: HashPolicy,
    /// Size of the copy buffer; bounds memory use per writer.
    pub buffer_size: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self::nsp()
    }
}

impl WriterOptions {
    fn with_layout(layout: Layout) -> Self {
        Self {
            layout,
            hash_policy: HashPolicy::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Plain NSP with a PFS0 root.
    pub fn nsp() -> Self {
        Self::with_layout(Layout::Nsp(PartitionFormat::Pfs0))
    }

    /// NSP with an HFS0 root, so every entry carries a SHA-256.
    pub fn hashed_nsp() -> Self {
        Self::with_layout(Layout::Nsp(PartitionFormat::Hfs0))
    }

    /// XCI: card header plus root HFS0.
    pub fn xci(cartridge: CartridgeOptions) -> Self {
        Self::with_layout(Layout::Xci(cartridge))
    }

    /// Set how much of each HFS0 entry is hashed.
    pub fn with_hash_policy(mut self, policy: HashPolicy) -> Self {
        self.hash_policy = policy;
        self
    }

    /// Set the copy buffer size. Must be non-zero.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Container kind this configuration produces.
    pub fn kind(&self) -> ArchiveKind {
        match self.layout {
            Layout::Nsp(_) => ArchiveKind::Nsp,
            Layout::Xci(_) => ArchiveKind::Xci,
        }
    }

    /// Format of the root partition: HFS0 for XCI and hashed NSP, PFS0 otherwise.
    pub fn partition_format(&self) -> PartitionFormat {
        match self.layout {
            Layout::Nsp(format) => format,
            Layout::Xci(_) => PartitionFormat::Hfs0,
        }
    }

    /// Card metadata, for XCI.
    pub fn cartridge(&self) -> Option<&CartridgeOptions> {
        match &self.layout {
            Layout::Nsp(_) => None,
            Layout::Xci(c) => Some(c),
        }
    }

    fn partition_offset(&self) -> u64 {
        self.cartridge().map_or(0, |c| c.hfs0_offset)
    }

    fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidOptions("buffer size must be non-zero"));
        }
        if let Some(c) = self.cartridge()
            && c.hfs0_offset < xci::HEADER_SIZE
        {
            return Err(Error::InvalidOptions("HFS0 offset overlaps the card header"));
        }
        Ok(())
    }
}

/// One input of [`build_archive`].
#[derive(Debug)]
pub struct EntryInput<R> {
    pub name: String,
    pub source: R,
    /// Exact number of bytes `source` produces.
    pub size: u64,
}

impl<R: Read> EntryInput<R> {
    pub fn new(name: impl Into<String>, source: R, size: u64) -> Self {
        Self {
            name: name.into(),
            source,
            size,
        }
    }
}

/// What `finalize` wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeReport {
    pub kind: ArchiveKind,
    /// Final partition table.
    pub table: PartitionTable,
    /// Offset of the partition header from the archive start.
    pub partition_offset: u64,
    /// Length of the partition header.
    pub header_size: u64,
    /// Bytes from the archive start to its end.
    pub total_size: u64,
    /// Final card header, for XCI.
    pub cartridge: Option<CartridgeHeader>,
}

impl fmt::Display for FinalizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({:?}), {} entries, header {:#x} bytes, total {:#x} bytes",
            self.kind,
            self.table.format(),
            self.table.len(),
            self.header_size,
            self.total_size
        )?;
        for entry in self.table.entries() {
            write!(f, "  {:#012x} {:>12} {}", entry.offset, entry.size, entry.name)?;
            if let Some(hash) = &entry.hash {
                write!(f, " sha256:{}", hex::encode(hash.sha256))?;
            }
            writeln!(f)?;
        }
        if let Some(c) = &self.cartridge {
            writeln!(f, "  header hash       {}", hex::encode(c.hfs0_header_hash))?;
            writeln!(f, "  initial data hash {}", hex::encode(c.initial_data_hash))?;
        }
        Ok(())
    }
}

/// Running digest over the first [`xci::INITIAL_DATA_WINDOW`] data bytes.
struct InitialWindow {
    hasher: Sha256,
    remaining: u64,
}

impl InitialWindow {
    fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            remaining: xci::INITIAL_DATA_WINDOW,
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        let take = self.remaining.min(chunk.len() as u64) as usize;
        if take > 0 {
            self.hasher.update(&chunk[..take]);
            self.remaining -= take as u64;
        }
    }

    fn finish(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}

/// Archive under construction.
///
/// Owns the sink until [`finalize`](Self::finalize) hands it back. Entries
/// must be added in the order announced to [`begin`](Self::begin). Any
/// failure while streaming poisons the writer; the partial output is left in
/// place for the caller to discard.
pub struct ArchiveWriter<W: Write + Seek> {
    sink: Option<W>,
    options: WriterOptions,
    /// Sink position of the archive's first byte.
    start: u64,
    pending: VecDeque<String>,
    table: PartitionTable,
    reserved_header: u64,
    /// Bytes streamed into the data region so far.
    written: u64,
    initial: Option<InitialWindow>,
    buf: Vec<u8>,
    poisoned: bool,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    /// Start an archive at the sink's current position.
    ///
    /// `names` announces every entry, in order. Fails with
    /// [`Error::SeekNotSupported`] before writing anything if the sink cannot
    /// seek back.
    pub fn begin<I, S>(mut sink: W, options: WriterOptions, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        options.validate()?;

        let start = sink
            .stream_position()
            .and_then(|pos| sink.seek(SeekFrom::Start(pos)))
            .map_err(|e| {
                debug!(error = %e, "sink rejected seek probe");
                Error::SeekNotSupported
            })?;

        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.is_empty() || name.contains('\0') || !seen.insert(name.as_str()) {
                return Err(Error::InvalidName(name.clone()));
            }
        }

        let format = options.partition_format();
        let reserved_header =
            PartitionTable::header_size_for(format, names.iter().map(String::as_str));
        let placeholder = options.partition_offset() + reserved_header;
        write_zeros(&mut sink, placeholder)?;

        info!(
            kind = %options.kind(),
            entries = names.len(),
            header_size = reserved_header,
            "archive started"
        );

        let initial = matches!(options.layout, Layout::Xci(_)).then(InitialWindow::new);
        let buf = vec![0u8; options.buffer_size];
        Ok(Self {
            sink: Some(sink),
            options,
            start,
            pending: names.into(),
            table: PartitionTable::new(format),
            reserved_header,
            written: 0,
            initial,
            buf,
            poisoned: false,
        })
    }

    /// Stream the next announced entry.
    ///
    /// `source` must produce exactly `declared_size` bytes, otherwise
    /// [`Error::SizeMismatch`] is returned and the writer is poisoned. At most
    /// `declared_size + 1` bytes are pulled from `source`.
    pub fn add_entry<R: Read>(
        &mut self,
        name: &str,
        source: R,
        declared_size: u64,
    ) -> Result<PartitionEntry> {
        if self.poisoned {
            return Err(Error::WriterPoisoned);
        }
        match self.pending.front() {
            Some(next) if next == name => {}
            next => {
                return Err(Error::UnexpectedEntry {
                    expected: next.cloned().unwrap_or_default(),
                    found: name.to_owned(),
                });
            }
        }

        let entry = match self.stream_entry(name, source, declared_size) {
            Ok(entry) => entry,
            Err(e) => {
                self.poisoned = true;
                warn!(entry = name, error = %e, "aborting archive write");
                return Err(e);
            }
        };

        debug!(
            entry = name,
            offset = entry.offset,
            size = entry.size,
            "entry streamed"
        );
        self.pending.pop_front();
        self.table.push(entry.clone())?;
        Ok(entry)
    }

    fn stream_entry<R: Read>(
        &mut self,
        name: &str,
        source: R,
        declared_size: u64,
    ) -> Result<PartitionEntry> {
        let sink = self.sink.as_mut().ok_or(Error::WriterPoisoned)?;
        let hash_limit = self
            .table
            .format()
            .is_hashed()
            .then(|| self.options.hash_policy.region_size(declared_size));
        let mut hasher = Sha256::new();
        let mut hashed = 0u64;
        let mut copied = 0u64;

        let mut source = source.take(declared_size.saturating_add(1));
        loop {
            let n = match source.read(&mut self.buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if copied + n as u64 > declared_size {
                return Err(Error::SizeMismatch {
                    name: name.to_owned(),
                    declared: declared_size,
                    actual: copied + n as u64,
                });
            }
            let chunk = &self.buf[..n];
            if let Some(limit) = hash_limit {
                let take = (u64::from(limit) - hashed).min(n as u64) as usize;
                hasher.update(&chunk[..take]);
                hashed += take as u64;
            }
            if let Some(window) = self.initial.as_mut() {
                window.update(chunk);
            }
            sink.write_all(chunk)?;
            copied += n as u64;
        }

        if copied != declared_size {
            return Err(Error::SizeMismatch {
                name: name.to_owned(),
                declared: declared_size,
                actual: copied,
            });
        }

        let mut entry = PartitionEntry::new(name, self.written, copied);
        if let Some(limit) = hash_limit {
            entry = entry.with_hash(EntryHash {
                hashed_region_size: limit,
                sha256: hasher.finalize().into(),
            });
        }
        self.written += copied;
        Ok(entry)
    }

    /// Names announced but not yet added.
    pub fn remaining(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    /// Entries added so far.
    pub fn table(&self) -> &PartitionTable {
        &self.table
    }

    /// Patch the headers back and return the sink, positioned at the end of
    /// the archive and flushed.
    pub fn finalize(mut self) -> Result<(W, FinalizeReport)> {
        if self.poisoned {
            return Err(Error::WriterPoisoned);
        }
        if !self.pending.is_empty() {
            return Err(Error::MissingEntries(self.pending.len()));
        }

        let header = self.table.encode();
        if header.len() as u64 != self.reserved_header {
            return Err(Error::HeaderSizeMismatch {
                reserved: self.reserved_header,
                actual: header.len() as u64,
            });
        }

        let mut sink = self.sink.take().ok_or(Error::WriterPoisoned)?;
        let partition_offset = self.options.partition_offset();
        let total_size = partition_offset + self.reserved_header + self.written;

        sink.seek(SeekFrom::Start(self.start + partition_offset))?;
        sink.write_all(&header)?;

        let cartridge = match &self.options.layout {
            Layout::Nsp(_) => None,
            Layout::Xci(opts) => {
                let mut card = CartridgeHeader::from_options(opts);
                card.hfs0_header_size = self.reserved_header;
                card.hfs0_header_hash = sha256(&header);
                card.initial_data_hash = self
                    .initial
                    .take()
                    .map_or_else(|| sha256(&[]), InitialWindow::finish);
                card.valid_data_end_page = xci::valid_data_end_page(total_size);
                sink.seek(SeekFrom::Start(self.start))?;
                sink.write_all(&card.encode())?;
                Some(card)
            }
        };

        sink.seek(SeekFrom::Start(self.start + total_size))?;
        sink.flush()?;

        let format = self.options.partition_format();
        let table = std::mem::replace(&mut self.table, PartitionTable::new(format));
        info!(
            kind = %self.options.kind(),
            entries = table.len(),
            total_size,
            "archive finalized"
        );

        Ok((
            sink,
            FinalizeReport {
                kind: self.options.kind(),
                table,
                partition_offset,
                header_size: self.reserved_header,
                total_size,
                cartridge,
            },
        ))
    }
}

impl<W: Write + Seek> Drop for ArchiveWriter<W> {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.flush() {
                warn!(error = %e, "flushing abandoned archive failed");
            }
            warn!(
                entries = self.table.len(),
                "archive writer dropped before finalize; output has no valid header"
            );
        }
    }
}

fn write_zeros<W: Write>(w: &mut W, len: u64) -> io::Result<()> {
    let zeros = [0u8; 0x1000];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(zeros.len() as u64) as usize;
        w.write_all(&zeros[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Build a complete archive from an ordered list of inputs.
pub fn build_archive<W, R, I>(
    sink: W,
    options: WriterOptions,
    inputs: I,
) -> Result<(W, FinalizeReport)>
where
    W: Write + Seek,
    R: Read,
    I: IntoIterator<Item = EntryInput<R>>,
{
    let inputs: Vec<EntryInput<R>> = inputs.into_iter().collect();
    let mut writer = ArchiveWriter::begin(sink, options, inputs.iter().map(|i| i.name.clone()))?;
    for input in inputs {
        writer.add_entry(&input.name, input.source, input.size)?;
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    /// Sink that refuses to seek, like a pipe.
    struct AppendOnly(Vec<u8>);

    impl Write for AppendOnly {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for AppendOnly {
        fn seek(&mut self, _: SeekFrom) -> io::Result<u64> {
            Err(io::Error::new(ErrorKind::Unsupported, "append only"))
        }
    }

    /// Source that fails after `ok` bytes.
    struct Flaky {
        ok: usize,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.ok == 0 {
                return Err(io::Error::other("disk went away"));
            }
            let n = self.ok.min(buf.len());
            buf[..n].fill(0x5A);
            self.ok -= n;
            Ok(n)
        }
    }

    #[test]
    fn rejects_sink_without_seek() {
        let err = ArchiveWriter::begin(AppendOnly(Vec::new()), WriterOptions::nsp(), ["a"])
            .err()
            .unwrap();
        assert!(matches!(err, Error::SeekNotSupported));
    }

    #[test]
    fn rejects_bad_names() {
        for names in [vec!["a", "a"], vec![""], vec!["a\0b"]] {
            let err = ArchiveWriter::begin(Cursor::new(Vec::new()), WriterOptions::nsp(), names)
                .err()
                .unwrap();
            assert!(matches!(err, Error::InvalidName(_)));
        }
    }

    #[test]
    fn rejects_hfs0_offset_inside_card_header() {
        let options = WriterOptions::xci(CartridgeOptions {
            hfs0_offset: 0x100,
            ..CartridgeOptions::default()
        });
        let err = ArchiveWriter::begin(Cursor::new(Vec::new()), options, ["a"])
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidOptions(_)));
    }

    #[test]
    fn placeholder_reserves_exact_header() {
        let writer =
            ArchiveWriter::begin(Cursor::new(Vec::new()), WriterOptions::nsp(), ["a.nca", "b.nca"])
                .unwrap();
        assert_eq!(writer.reserved_header, 0x60);
        let sink = writer.sink.as_ref().unwrap();
        assert_eq!(sink.get_ref().len(), 0x60);
        assert!(sink.get_ref().iter().all(|&b| b == 0));
    }

    #[test]
    fn short_source_is_size_mismatch_and_poisons() {
        let mut writer =
            ArchiveWriter::begin(Cursor::new(Vec::new()), WriterOptions::nsp(), ["a", "b"]).unwrap();
        let err = writer.add_entry("a", Cursor::new(vec![0u8; 10]), 11).unwrap_err();
        assert!(matches!(
            err,
            Error::SizeMismatch {
                declared: 11,
                actual: 10,
                ..
            }
        ));
        assert!(matches!(
            writer.add_entry("b", Cursor::new(vec![]), 0),
            Err(Error::WriterPoisoned)
        ));
        assert!(matches!(writer.finalize(), Err(Error::WriterPoisoned)));
    }

    #[test]
    fn long_source_is_size_mismatch() {
        let mut writer =
            ArchiveWriter::begin(Cursor::new(Vec::new()), WriterOptions::nsp(), ["a"]).unwrap();
        let err = writer.add_entry("a", Cursor::new(vec![0u8; 100]), 50).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { declared: 50, .. }));
    }

    #[test]
    fn failing_source_aborts_write() {
        let options = WriterOptions::nsp().with_buffer_size(16);
        let mut writer = ArchiveWriter::begin(Cursor::new(Vec::new()), options, ["a"]).unwrap();
        let err = writer.add_entry("a", Flaky { ok: 40 }, 100).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(matches!(writer.finalize(), Err(Error::WriterPoisoned)));
    }

    #[test]
    fn out_of_order_entry_is_rejected_without_poisoning() {
        let mut writer =
            ArchiveWriter::begin(Cursor::new(Vec::new()), WriterOptions::nsp(), ["a", "b"]).unwrap();
        let err = writer.add_entry("b", Cursor::new(vec![1]), 1).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEntry { .. }));
        writer.add_entry("a", Cursor::new(vec![1]), 1).unwrap();
        writer.add_entry("b", Cursor::new(vec![2]), 1).unwrap();
        assert!(matches!(
            writer.add_entry("c", Cursor::new(vec![3]), 1),
            Err(Error::UnexpectedEntry { .. })
        ));
        writer.finalize().unwrap();
    }

    #[test]
    fn finalize_requires_every_announced_entry() {
        let mut writer =
            ArchiveWriter::begin(Cursor::new(Vec::new()), WriterOptions::nsp(), ["a", "b"]).unwrap();
        writer.add_entry("a", Cursor::new(vec![1]), 1).unwrap();
        assert_eq!(writer.remaining().collect::<Vec<_>>(), ["b"]);
        assert!(matches!(writer.finalize(), Err(Error::MissingEntries(1))));
    }

    #[test]
    fn entries_are_contiguous_after_header() {
        let (sink, report) = build_archive(
            Cursor::new(Vec::new()),
            WriterOptions::nsp(),
            [
                EntryInput::new("a.nca", Cursor::new(vec![0xAA; 100]), 100),
                EntryInput::new("b.nca", Cursor::new(vec![0xBB; 4096]), 4096),
            ],
        )
        .unwrap();
        let bytes = sink.into_inner();
        assert_eq!(report.total_size, bytes.len() as u64);
        assert_eq!(report.header_size, 0x60);
        assert_eq!(&bytes[..4], b"PFS0");
        assert_eq!(bytes[0x60], 0xAA);
        assert_eq!(bytes[0x60 + 100], 0xBB);
        assert_eq!(report.table.entries()[1].offset, 100);
        assert_eq!(PartitionTable::decode(&bytes).unwrap(), report.table);
    }

    #[test]
    fn archive_may_start_mid_sink() {
        let mut sink = Cursor::new(vec![0xEE; 7]);
        sink.set_position(7);
        let (sink, report) = build_archive(
            sink,
            WriterOptions::nsp(),
            [EntryInput::new("x", Cursor::new(vec![1, 2, 3]), 3)],
        )
        .unwrap();
        let bytes = sink.into_inner();
        assert_eq!(&bytes[..7], &[0xEE; 7]);
        assert_eq!(&bytes[7..11], b"PFS0");
        assert_eq!(bytes.len() as u64, 7 + report.total_size);
    }

    #[test]
    fn prefix_policy_limits_hashed_region() {
        let data: Vec<u8> = (0..0x1000u32).map(|i| i as u8).collect();
        let options = WriterOptions::hashed_nsp().with_hash_policy(HashPolicy::Prefix(0x200));
        let (_, report) = build_archive(
            Cursor::new(Vec::new()),
            options,
            [
                EntryInput::new("big", Cursor::new(data.clone()), 0x1000),
                EntryInput::new("tiny", Cursor::new(data[..16].to_vec()), 16),
            ],
        )
        .unwrap();
        let big = report.table.get("big").unwrap().hash.clone().unwrap();
        assert_eq!(big.hashed_region_size, 0x200);
        assert_eq!(big.sha256, sha256(&data[..0x200]));
        let tiny = report.table.get("tiny").unwrap().hash.clone().unwrap();
        assert_eq!(tiny.hashed_region_size, 16);
    }

    #[test]
    fn xci_header_carries_both_digests() {
        let payload = vec![0x42u8; 0x9000];
        let (sink, report) = build_archive(
            Cursor::new(Vec::new()),
            WriterOptions::xci(CartridgeOptions::default()).with_buffer_size(0x1234),
            [EntryInput::new("secure", Cursor::new(payload.clone()), 0x9000)],
        )
        .unwrap();
        let bytes = sink.into_inner();
        let card = report.cartridge.unwrap();
        let hfs0 = xci::DEFAULT_HFS0_OFFSET as usize;
        let header_end = hfs0 + report.header_size as usize;

        assert_eq!(&bytes[0x100..0x104], b"HEAD");
        assert_eq!(&bytes[hfs0..hfs0 + 4], b"HFS0");
        assert_eq!(card.hfs0_header_hash, sha256(&bytes[hfs0..header_end]));
        assert_eq!(card.initial_data_hash, sha256(&payload[..0x8000]));
        assert_eq!(card.hfs0_header_size, report.header_size);
        assert_eq!(&bytes[..0x200], &card.encode()[..]);
    }
}
