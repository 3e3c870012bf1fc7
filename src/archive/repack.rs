//! Moving entries out of, and between, archives.
//!
//! Both helpers stream through bounded readers, so multi-gigabyte entries
//! never have to fit in memory.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use super::Archive;
use super::writer::{ArchiveWriter, FinalizeReport, WriterOptions};
use crate::{Error, Result};

/// Write every entry to `dir/<name>`, creating `dir` if needed.
///
/// Entry names must be a single plain path component; anything that could
/// escape `dir` is rejected with [`Error::InvalidName`] before any file is
/// created.
pub fn extract_all<R: Read + Seek>(
    archive: &mut Archive<R>,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = archive.list_entries().to_vec();
    for entry in &entries {
        let mut components = Path::new(&entry.name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(Error::InvalidName(entry.name.clone()));
        }
    }

    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(entries.len());
    for entry in &entries {
        let path = dir.join(&entry.name);
        let mut out = BufWriter::new(File::create(&path)?);
        let copied = io::copy(&mut archive.read_entry_data(entry)?, &mut out)?;
        out.flush()?;
        if copied != entry.size {
            return Err(Error::TruncatedArchive {
                needed: entry.size,
                available: copied,
            });
        }
        debug!(entry = %entry.name, path = %path.display(), "extracted");
        written.push(path);
    }
    info!(entries = written.len(), dir = %dir.display(), "archive extracted");
    Ok(written)
}

/// Stream every entry of `archive`, in order, into a new archive.
///
/// Converts between layouts, e.g. NSP to XCI, or re-hashes a PFS0 package
/// into an HFS0 one.
pub fn repack<R, W>(
    archive: &mut Archive<R>,
    sink: W,
    options: WriterOptions,
) -> Result<(W, FinalizeReport)>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let entries = archive.list_entries().to_vec();
    let mut writer = ArchiveWriter::begin(sink, options, entries.iter().map(|e| e.name.clone()))?;
    for entry in &entries {
        let source = archive.read_entry_data(entry)?;
        writer.add_entry(&entry.name, source, entry.size)?;
    }
    writer.finalize()
}
