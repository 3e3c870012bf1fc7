//! Zstandard producer and consumer for archive entries (requires the
//! `compression` feature).
//!
//! The writer needs each entry's exact length before streaming it, which a
//! compressor cannot know up front. [`compress_to_spool`] solves this by
//! compressing into a caller-provided seekable spool (typically a temporary
//! file), so memory stays bounded by the zstd window rather than the payload:
//!
//! ```no_run
//! # #[cfg(feature = "compression")]
//! # fn main() -> nspkit::Result<()> {
//! use std::fs::File;
//! use nspkit::archive::{ArchiveWriter, WriterOptions};
//! use nspkit::compression::zstd::compress_to_spool;
//!
//! let spool = File::options().read(true).write(true).create(true).truncate(true).open("a.ncz.tmp")?;
//! let (spool, len) = compress_to_spool(File::open("a.nca")?, spool, 18)?;
//! let mut writer = ArchiveWriter::begin(File::create("out.nsz")?, WriterOptions::nsp(), ["a.ncz"])?;
//! writer.add_entry("a.ncz", spool, len)?;
//! writer.finalize()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "compression"))]
//! # fn main() {}
//! ```
//!
//! On the read side, [`decoder`] wraps the bounded entry reader returned by
//! [`crate::archive::Archive::read_entry_data`].

#![cfg(feature = "compression")]

use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};

use tracing::debug;
use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder;

use crate::{Error, Result};

/// Compress `source` into `spool` and rewind it.
///
/// Returns the spool positioned at the first compressed byte together with
/// the compressed length. `spool` should be empty; anything after the
/// compressed stream would be read as payload.
pub fn compress_to_spool<R, S>(mut source: R, mut spool: S, level: i32) -> Result<(S, u64)>
where
    R: Read,
    S: Read + Write + Seek,
{
    let start = spool.stream_position()?;
    let consumed = {
        let mut encoder = Encoder::new(&mut spool, level).map_err(Error::Zstd)?;
        let consumed = io::copy(&mut source, &mut encoder)?;
        encoder.finish().map_err(Error::Zstd)?;
        consumed
    };
    let end = spool.stream_position()?;
    spool.flush()?;
    spool.seek(SeekFrom::Start(start))?;

    debug!(raw = consumed, compressed = end - start, level, "payload compressed");
    Ok((spool, end - start))
}

/// Streaming decoder over a compressed entry.
pub fn decoder<R: Read>(compressed: R) -> Result<Decoder<'static, BufReader<R>>> {
    Decoder::new(compressed).map_err(Error::Zstd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{Archive, ArchiveWriter, WriterOptions, verify};
    use std::io::Cursor;

    #[test]
    fn compressed_entry_round_trips_through_archive() {
        let raw: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let (spool, len) = compress_to_spool(Cursor::new(&raw), Cursor::new(Vec::new()), 3).unwrap();
        assert!(len < raw.len() as u64);

        let mut writer =
            ArchiveWriter::begin(Cursor::new(Vec::new()), WriterOptions::hashed_nsp(), ["a.ncz"])
                .unwrap();
        writer.add_entry("a.ncz", spool, len).unwrap();
        let (sink, _) = writer.finalize().unwrap();

        let mut archive = Archive::open(sink).unwrap();
        assert!(verify(&mut archive).unwrap().is_ok());
        let entry = archive["a.ncz"].clone();
        assert_eq!(entry.size, len);

        let mut out = Vec::new();
        decoder(archive.read_entry_data(&entry).unwrap())
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, raw);
    }
}
