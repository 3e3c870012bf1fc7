//! XCI (NX Card Image) - cartridge header model.
//!
//! ## Overall Layout
//! ```text
//! [0x0000–0x01FF] CardHeader       (0x200 bytes; see below)
//! [0x0200–hfs0]   Reserved / cert area (zero when built by nspkit)
//! [hfs0]          Root HFS0 partition (default 0xF000)
//! ```
//!
//! Some dumps are prefixed with the 0x1000-byte CardKeyArea, which moves the
//! CardHeader to 0x1000. All offsets stored in the header, including
//! `PartitionFsHeaderAddress`, stay relative to the start of the image.
//!
//! ## CardHeader (0x200 bytes total)
//! ```text
//! [+0x000] RSA-2048 signature over [+0x100..+0x200]     (0x100 bytes)
//! [+0x100] Magic "HEAD"                                  (4 bytes)
//! [+0x104] RomAreaStartPageAddress  (page × 0x200)       (u32 LE)
//! [+0x108] BackupAreaStartPageAddress (always 0xFFFFFFFF)(u32 LE)
//! [+0x10C] TitleKeyDecIndex | KekIndex                   (1 byte each nibble)
//! [+0x10D] RomSize                                       (1 byte)
//! [+0x10E] Version                                       (1 byte)
//! [+0x10F] Flags                                         (1 byte)
//! [+0x110] PackageId                                     (u64 LE)
//! [+0x118] ValidDataEndAddress (page units)              (u32 LE)
//! [+0x11C] Reserved                                      (4 bytes)
//! [+0x120] IV (reversed for AES-CBC)                     (16 bytes)
//! [+0x130] PartitionFsHeaderAddress (absolute byte offs) (u64 LE)
//! [+0x138] PartitionFsHeaderSize                         (u64 LE)
//! [+0x140] PartitionFsHeaderHash (SHA-256)               (32 bytes)
//! [+0x160] InitialDataHash (SHA-256)                     (32 bytes)
//! [+0x180] SelSec (1=T1, 2=T2)                           (u32 LE)
//! [+0x184] SelT1Key (always 2)                           (u32 LE)
//! [+0x188] SelKey   (always 0)                           (u32 LE)
//! [+0x18C] LimArea (page units)                          (u32 LE)
//! [+0x190] CardHeaderEncryptedData (AES-128-CBC)         (0x70 bytes)
//! ```
//!
//! `InitialDataHash` covers the first [`INITIAL_DATA_WINDOW`] bytes of the
//! root partition's data region (all of it when shorter). Both digests can
//! only be computed once the whole partition has been written.
//!
//! ## RomSize byte values
//! | Value | Capacity |
//! |-------|----------|
//! | 0xFA  | 1 GB     |
//! | 0xF8  | 2 GB     |
//! | 0xF0  | 4 GB     |
//! | 0xE0  | 8 GB     |
//! | 0xE1  | 16 GB    |
//! | 0xE2  | 32 GB    |

use std::io::{Read, Seek, SeekFrom};

use crate::utils::{bytesa, le_u32, le_u64, magic, put_u32, put_u64, u8};
use crate::{Error, Result};

/// Card header magic.
pub const MAGIC: &[u8; 4] = b"HEAD";
/// Size of the card header.
pub const HEADER_SIZE: u64 = 0x200;
/// Offset of the magic inside the card header.
pub const MAGIC_OFFSET: u64 = 0x100;
/// Size of the optional CardKeyArea prefix.
pub const KEY_AREA_SIZE: u64 = 0x1000;
/// Media unit used by the page-addressed fields.
pub const PAGE_SIZE: u64 = 0x200;
/// Bytes of the data region covered by `InitialDataHash`.
pub const INITIAL_DATA_WINDOW: u64 = 0x8000;
/// Root HFS0 position used by retail images.
pub const DEFAULT_HFS0_OFFSET: u64 = 0xF000;

/// Game card capacity class stored in the RomSize byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CartridgeSize {
    Gb1 = 0xFA,
    Gb2 = 0xF8,
    Gb4 = 0xF0,
    Gb8 = 0xE0,
    Gb16 = 0xE1,
    Gb32 = 0xE2,
}

impl CartridgeSize {
    /// Decode a RomSize byte.
    pub fn from_byte(v: u8) -> Option<Self> {
        Some(match v {
            0xFA => Self::Gb1,
            0xF8 => Self::Gb2,
            0xF0 => Self::Gb4,
            0xE0 => Self::Gb8,
            0xE1 => Self::Gb16,
            0xE2 => Self::Gb32,
            _ => return None,
        })
    }

    /// Human-readable capacity.
    pub fn capacity(self) -> &'static str {
        match self {
            Self::Gb1 => "1 GB",
            Self::Gb2 => "2 GB",
            Self::Gb4 => "4 GB",
            Self::Gb8 => "8 GB",
            Self::Gb16 => "16 GB",
            Self::Gb32 => "32 GB",
        }
    }
}

/// Caller-supplied card metadata used when building an XCI.
///
/// The partition offset, header size, valid-data end and both digests are
/// computed by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeOptions {
    /// RomAreaStartPageAddress (+0x104), in pages.
    pub secure_area_start_page: u32,
    /// BackupAreaStartPageAddress (+0x108), `0xFFFFFFFF` on retail cards.
    pub backup_area_start_page: u32,
    /// TitleKeyDecIndex / KekIndex byte (+0x10C).
    pub key_index: u8,
    /// Capacity class written to RomSize (+0x10D).
    pub rom_size: CartridgeSize,
    /// Header version (+0x10E).
    pub version: u8,
    /// Card flags (+0x10F).
    pub flags: u8,
    /// PackageId (+0x110).
    pub package_id: u64,
    /// IV for the encrypted trailer (+0x120).
    pub iv: [u8; 16],
    /// Where the root HFS0 starts (+0x130). Must be at least [`HEADER_SIZE`].
    pub hfs0_offset: u64,
    /// SelSec (+0x180): 1 for T1, 2 for T2.
    pub sel_sec: u32,
    /// SelT1Key (+0x184).
    pub sel_t1_key: u32,
    /// SelKey (+0x188).
    pub sel_key: u32,
    /// LimArea (+0x18C), in pages.
    pub lim_area: u32,
}

impl Default for CartridgeOptions {
    fn default() -> Self {
        Self {
            secure_area_start_page: 0,
            backup_area_start_page: 0xFFFF_FFFF,
            key_index: 0,
            rom_size: CartridgeSize::Gb8,
            version: 0,
            flags: 0,
            package_id: 0,
            iv: [0; 16],
            hfs0_offset: DEFAULT_HFS0_OFFSET,
            sel_sec: 1,
            sel_t1_key: 2,
            sel_key: 0,
            lim_area: 0,
        }
    }
}

/// Parsed or to-be-written card header.
///
/// The encrypted trailer and the signature are carried as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    /// RSA-2048 signature over `[+0x100..+0x200]` (+0x000).
    pub signature: [u8; 0x100],
    /// RomAreaStartPageAddress (+0x104), in pages.
    pub secure_area_start_page: u32,
    /// BackupAreaStartPageAddress (+0x108).
    pub backup_area_start_page: u32,
    /// TitleKeyDecIndex / KekIndex byte (+0x10C).
    pub key_index: u8,
    /// RomSize byte (+0x10D, see table in module docs).
    pub rom_size: u8,
    /// Header version (+0x10E).
    pub version: u8,
    /// Card flags (+0x10F).
    pub flags: u8,
    /// PackageId (+0x110).
    pub package_id: u64,
    /// ValidDataEndAddress (+0x118): last used page of the image.
    pub valid_data_end_page: u32,
    /// IV for the encrypted trailer (+0x120).
    pub iv: [u8; 16],
    /// Image offset of the root HFS0 header (+0x130).
    pub hfs0_offset: u64,
    /// Length of the root HFS0 header (+0x138).
    pub hfs0_header_size: u64,
    /// SHA-256 of the root HFS0 header bytes (+0x140).
    pub hfs0_header_hash: [u8; 32],
    /// SHA-256 of the leading data window of the root HFS0 (+0x160).
    pub initial_data_hash: [u8; 32],
    /// SelSec (+0x180).
    pub sel_sec: u32,
    /// SelT1Key (+0x184).
    pub sel_t1_key: u32,
    /// SelKey (+0x188).
    pub sel_key: u32,
    /// LimArea (+0x18C), in pages.
    pub lim_area: u32,
    /// CardHeaderEncryptedData (+0x190), kept opaque.
    pub encrypted_data: [u8; 0x70],
}

impl CartridgeHeader {
    /// Header with the caller's fields and zeroed computed fields.
    pub fn from_options(opts: &CartridgeOptions) -> Self {
        Self {
            signature: [0; 0x100],
            secure_area_start_page: opts.secure_area_start_page,
            backup_area_start_page: opts.backup_area_start_page,
            key_index: opts.key_index,
            rom_size: opts.rom_size as u8,
            version: opts.version,
            flags: opts.flags,
            package_id: opts.package_id,
            valid_data_end_page: 0,
            iv: opts.iv,
            hfs0_offset: opts.hfs0_offset,
            hfs0_header_size: 0,
            hfs0_header_hash: [0; 32],
            initial_data_hash: [0; 32],
            sel_sec: opts.sel_sec,
            sel_t1_key: opts.sel_t1_key,
            sel_key: opts.sel_key,
            lim_area: opts.lim_area,
            encrypted_data: [0; 0x70],
        }
    }

    /// Capacity class, if the RomSize byte is a known value.
    pub fn cartridge_size(&self) -> Option<CartridgeSize> {
        CartridgeSize::from_byte(self.rom_size)
    }

    /// Return the ROM capacity as a human-readable string.
    pub fn rom_capacity(&self) -> &'static str {
        self.cartridge_size().map_or("unknown", CartridgeSize::capacity)
    }

    /// Serialize to the fixed 0x200-byte layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE as usize);
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(MAGIC);
        put_u32(&mut out, self.secure_area_start_page);
        put_u32(&mut out, self.backup_area_start_page);
        out.extend_from_slice(&[self.key_index, self.rom_size, self.version, self.flags]);
        put_u64(&mut out, self.package_id);
        put_u32(&mut out, self.valid_data_end_page);
        put_u32(&mut out, 0);
        out.extend_from_slice(&self.iv);
        put_u64(&mut out, self.hfs0_offset);
        put_u64(&mut out, self.hfs0_header_size);
        out.extend_from_slice(&self.hfs0_header_hash);
        out.extend_from_slice(&self.initial_data_hash);
        put_u32(&mut out, self.sel_sec);
        put_u32(&mut out, self.sel_t1_key);
        put_u32(&mut out, self.sel_key);
        put_u32(&mut out, self.lim_area);
        out.extend_from_slice(&self.encrypted_data);
        debug_assert_eq!(out.len() as u64, HEADER_SIZE);
        out
    }

    /// Parse a card header from a reader positioned at its first byte.
    ///
    /// Returns [`crate::Error::NotAnArchive`] if the magic is missing.
    pub fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let signature = bytesa::<0x100>(r)?;
        magic(r, MAGIC)?;
        let secure_area_start_page = le_u32(r)?;
        let backup_area_start_page = le_u32(r)?;
        let key_index = u8(r)?;
        let rom_size = u8(r)?;
        let version = u8(r)?;
        let flags = u8(r)?;
        let package_id = le_u64(r)?;
        let valid_data_end_page = le_u32(r)?;
        let _reserved = le_u32(r)?;
        let iv = bytesa::<16>(r)?;
        let hfs0_offset = le_u64(r)?;
        let hfs0_header_size = le_u64(r)?;
        let hfs0_header_hash = bytesa::<32>(r)?;
        let initial_data_hash = bytesa::<32>(r)?;
        let sel_sec = le_u32(r)?;
        let sel_t1_key = le_u32(r)?;
        let sel_key = le_u32(r)?;
        let lim_area = le_u32(r)?;
        let encrypted_data = bytesa::<0x70>(r)?;

        Ok(Self {
            signature,
            secure_area_start_page,
            backup_area_start_page,
            key_index,
            rom_size,
            version,
            flags,
            package_id,
            valid_data_end_page,
            iv,
            hfs0_offset,
            hfs0_header_size,
            hfs0_header_hash,
            initial_data_hash,
            sel_sec,
            sel_t1_key,
            sel_key,
            lim_area,
            encrypted_data,
        })
    }

    /// Find the card header in an image of `len` bytes.
    ///
    /// Probes the plain layout (header at 0) and then the key-area-prefixed
    /// layout (header at 0x1000). Returns the header's position together with
    /// the parsed header, or `None` if neither carries the magic. A magic
    /// followed by less than a full header is [`Error::TruncatedArchive`].
    pub fn locate<R: Read + Seek>(r: &mut R, len: u64) -> Result<Option<(u64, Self)>> {
        for base in [0, KEY_AREA_SIZE] {
            if base + MAGIC_OFFSET + MAGIC.len() as u64 > len {
                break;
            }
            r.seek(SeekFrom::Start(base + MAGIC_OFFSET))?;
            if &bytesa::<4>(r)? != MAGIC {
                continue;
            }
            if base + HEADER_SIZE > len {
                return Err(Error::TruncatedArchive {
                    needed: base + HEADER_SIZE,
                    available: len,
                });
            }
            r.seek(SeekFrom::Start(base))?;
            return Ok(Some((base, Self::parse(r)?)));
        }
        Ok(None)
    }
}

/// Last valid page of an image `total_size` bytes long.
pub(crate) fn valid_data_end_page(total_size: u64) -> u32 {
    total_size
        .div_ceil(PAGE_SIZE)
        .saturating_sub(1)
        .min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn sample() -> CartridgeHeader {
        let mut header = CartridgeHeader::from_options(&CartridgeOptions {
            secure_area_start_page: 0x4000,
            rom_size: CartridgeSize::Gb8,
            version: 2,
            flags: 3,
            package_id: 0x0123_4567_89AB_CDEF,
            ..CartridgeOptions::default()
        });
        header.hfs0_header_size = 0x200;
        header.hfs0_header_hash = [0x11; 32];
        header.initial_data_hash = [0x22; 32];
        header
    }

    #[test]
    fn encode_places_fields_at_documented_offsets() {
        let bytes = sample().encode();
        assert_eq!(bytes.len() as u64, HEADER_SIZE);
        assert_eq!(&bytes[0x100..0x104], b"HEAD");
        assert_eq!(&bytes[0x104..0x108], &0x4000u32.to_le_bytes());
        assert_eq!(&bytes[0x108..0x10C], &0xFFFF_FFFFu32.to_le_bytes());
        assert_eq!(bytes[0x10D], 0xE0);
        assert_eq!(&bytes[0x130..0x138], &DEFAULT_HFS0_OFFSET.to_le_bytes());
        assert_eq!(&bytes[0x138..0x140], &0x200u64.to_le_bytes());
        assert_eq!(&bytes[0x140..0x160], &[0x11; 32]);
        assert_eq!(&bytes[0x160..0x180], &[0x22; 32]);
        assert_eq!(&bytes[0x184..0x188], &2u32.to_le_bytes());
    }

    #[test]
    fn parse_reads_back_encode() {
        let header = sample();
        let parsed = CartridgeHeader::parse(&mut Cursor::new(header.encode())).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.rom_capacity(), "8 GB");
    }

    #[test]
    fn locate_finds_key_area_prefixed_header() {
        let mut image = vec![0u8; KEY_AREA_SIZE as usize];
        image.extend_from_slice(&sample().encode());
        let len = image.len() as u64;
        let (base, header) = CartridgeHeader::locate(&mut Cursor::new(image), len)
            .unwrap()
            .unwrap();
        assert_eq!(base, KEY_AREA_SIZE);
        assert_eq!(header, sample());
    }

    #[test]
    fn locate_reports_header_cut_after_magic() {
        let bytes = sample().encode();
        for cut in [0x104, 0x150, 0x1FF] {
            let err = CartridgeHeader::locate(&mut Cursor::new(&bytes[..cut]), cut as u64)
                .unwrap_err();
            assert!(
                matches!(err, Error::TruncatedArchive { needed: 0x200, available } if available == cut as u64),
                "{cut:#x}: {err}"
            );
        }
        // magic itself incomplete: nothing to recognise
        assert!(
            CartridgeHeader::locate(&mut Cursor::new(&bytes[..0x102]), 0x102)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn locate_without_magic_is_none() {
        let image = vec![0u8; 0x2000];
        assert!(
            CartridgeHeader::locate(&mut Cursor::new(image), 0x2000)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn valid_data_end_counts_pages() {
        assert_eq!(valid_data_end_page(0), 0);
        assert_eq!(valid_data_end_page(0x200), 0);
        assert_eq!(valid_data_end_page(0x201), 1);
        assert_eq!(valid_data_end_page(0x10000), 0x7F);
    }

    #[test]
    fn unknown_rom_size_has_no_capacity() {
        let mut header = sample();
        header.rom_size = 0x12;
        assert_eq!(header.rom_capacity(), "unknown");
    }
}
