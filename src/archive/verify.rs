//! Digest verification.
//!
//! Every digest is recomputed from bytes re-read from the source; cached
//! values are never trusted. A failing region does not stop the remaining
//! checks, so the report always shows the full picture. Only I/O errors
//! abort verification.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use tracing::{info, warn};

use super::Archive;
use crate::formats::xci;
use crate::utils::sha256_stream;
use crate::{Error, Result};

const VERIFY_BUFFER_SIZE: usize = 1 << 20;

/// Region covered by one digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegionId {
    /// XCI: the root HFS0 header bytes.
    PartitionHeader,
    /// XCI: the leading window of the root HFS0 data region.
    InitialData,
    /// One hashed partition entry.
    Entry { index: usize, name: String },
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionId::PartitionHeader => f.write_str("partition header"),
            RegionId::InitialData => f.write_str("initial data"),
            RegionId::Entry { index, name } => write!(f, "entry #{index} '{name}'"),
        }
    }
}

/// Outcome of one digest check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestStatus {
    Pass,
    Fail {
        expected: [u8; 32],
        actual: [u8; 32],
    },
}

impl DigestStatus {
    fn compare(expected: [u8; 32], actual: [u8; 32]) -> Self {
        if expected == actual {
            Self::Pass
        } else {
            Self::Fail { expected, actual }
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCheck {
    pub region: RegionId,
    pub status: DigestStatus,
}

/// All checks performed on one archive, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub checks: Vec<RegionCheck>,
}

impl VerifyReport {
    /// True when every check passed.
    pub fn is_ok(&self) -> bool {
        self.checks.iter().all(|c| c.status.is_pass())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RegionCheck> {
        self.checks.iter().filter(|c| !c.status.is_pass())
    }

    /// Status of a given region, if it was checked.
    pub fn status(&self, region: &RegionId) -> Option<&DigestStatus> {
        self.checks
            .iter()
            .find(|c| &c.region == region)
            .map(|c| &c.status)
    }

    /// Turn the first failure into [`Error::DigestMismatch`].
    pub fn into_result(self) -> Result<Self> {
        if let Some(check) = self.failures().next()
            && let DigestStatus::Fail { expected, actual } = check.status
        {
            return Err(Error::DigestMismatch {
                region: check.region.to_string(),
                expected,
                actual,
            });
        }
        Ok(self)
    }
}

/// Recompute every digest the archive stores.
///
/// XCI: partition header hash and initial data hash from the card header.
/// HFS0 partitions: one check per hashed entry. A PFS0 NSP stores no
/// digests and yields an empty report.
pub fn verify<R: Read + Seek>(archive: &mut Archive<R>) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let partition_offset = archive.partition_offset();
    let header_size = archive.header_size();
    let data_offset = archive.data_offset();
    let cartridge = archive.cartridge_header().cloned();
    let (table, r) = archive.parts_mut();

    if let Some(card) = cartridge {
        r.seek(SeekFrom::Start(partition_offset))?;
        let actual = sha256_stream(r, header_size, VERIFY_BUFFER_SIZE)?;
        report.checks.push(RegionCheck {
            region: RegionId::PartitionHeader,
            status: DigestStatus::compare(card.hfs0_header_hash, actual),
        });

        let window = table.data_size().min(xci::INITIAL_DATA_WINDOW);
        r.seek(SeekFrom::Start(data_offset))?;
        let actual = sha256_stream(r, window, VERIFY_BUFFER_SIZE)?;
        report.checks.push(RegionCheck {
            region: RegionId::InitialData,
            status: DigestStatus::compare(card.initial_data_hash, actual),
        });
    }

    for (index, entry) in table.entries().iter().enumerate() {
        let Some(hash) = &entry.hash else {
            continue;
        };
        r.seek(SeekFrom::Start(data_offset + entry.offset))?;
        let actual = sha256_stream(r, u64::from(hash.hashed_region_size), VERIFY_BUFFER_SIZE)?;
        report.checks.push(RegionCheck {
            region: RegionId::Entry {
                index,
                name: entry.name.clone(),
            },
            status: DigestStatus::compare(hash.sha256, actual),
        });
    }

    for check in report.failures() {
        warn!(region = %check.region, "digest mismatch");
    }
    info!(
        checks = report.checks.len(),
        failed = report.failures().count(),
        "verification finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::writer::{EntryInput, WriterOptions, build_archive};
    use crate::formats::xci::CartridgeOptions;
    use std::io::Cursor;

    fn hashed_nsp() -> Vec<u8> {
        let (sink, _) = build_archive(
            Cursor::new(Vec::new()),
            WriterOptions::hashed_nsp(),
            [
                EntryInput::new("one", Cursor::new(vec![1u8; 300]), 300),
                EntryInput::new("two", Cursor::new(vec![2u8; 300]), 300),
            ],
        )
        .unwrap();
        sink.into_inner()
    }

    #[test]
    fn fresh_hashed_nsp_passes() {
        let mut archive = Archive::open(Cursor::new(hashed_nsp())).unwrap();
        let report = verify(&mut archive).unwrap();
        assert_eq!(report.checks.len(), 2);
        assert!(report.is_ok());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn plain_nsp_has_nothing_to_check() {
        let (sink, _) = build_archive(
            Cursor::new(Vec::new()),
            WriterOptions::nsp(),
            [EntryInput::new("one", Cursor::new(vec![1u8; 3]), 3)],
        )
        .unwrap();
        let mut archive = Archive::open(sink).unwrap();
        assert!(verify(&mut archive).unwrap().checks.is_empty());
    }

    #[test]
    fn every_region_is_checked_despite_failures() {
        let mut bytes = hashed_nsp();
        // header is 0x200 bytes; corrupt the first byte of both entries
        bytes[0x200] ^= 0xFF;
        bytes[0x200 + 300] ^= 0xFF;
        let mut archive = Archive::open(Cursor::new(bytes)).unwrap();
        let report = verify(&mut archive).unwrap();
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.failures().count(), 2);
        assert!(matches!(
            report.into_result(),
            Err(Error::DigestMismatch { region, .. }) if region == "entry #0 'one'"
        ));
    }

    #[test]
    fn xci_card_digest_tamper_is_reported() {
        let (sink, _) = build_archive(
            Cursor::new(Vec::new()),
            WriterOptions::xci(CartridgeOptions::default()),
            [EntryInput::new("secure", Cursor::new(vec![9u8; 64]), 64)],
        )
        .unwrap();
        let mut bytes = sink.into_inner();
        bytes[0x140] ^= 0x01;
        let mut archive = Archive::open(Cursor::new(bytes)).unwrap();
        let report = verify(&mut archive).unwrap();
        assert!(!report.status(&RegionId::PartitionHeader).unwrap().is_pass());
        assert!(report.status(&RegionId::InitialData).unwrap().is_pass());
        assert!(
            report
                .status(&RegionId::Entry {
                    index: 0,
                    name: "secure".into()
                })
                .unwrap()
                .is_pass()
        );
    }
}
