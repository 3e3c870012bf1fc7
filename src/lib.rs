//! **nspkit** - streaming builder and verifying reader for Nintendo Switch
//! package containers.
//!
//! # Supported containers
//! | Module | Format |
//! |--------|--------|
//! | [`formats::pfs0`] | PFS0 / NSP - PartitionFS flat archive |
//! | [`formats::hfs0`] | HFS0 - SHA-256-hashed archive (XCI, hashed NSP) |
//! | [`formats::xci`]  | XCI - game card image wrapping a root HFS0 |
//!
//! # Building and reading
//! ```no_run
//! use std::fs::File;
//! use std::io::Cursor;
//!
//! use nspkit::archive::{Archive, ArchiveWriter, WriterOptions, verify};
//!
//! # fn main() -> nspkit::Result<()> {
//! let names = ["a.nca", "b.nca"];
//! let mut writer = ArchiveWriter::begin(File::create("out.nsp")?, WriterOptions::nsp(), names)?;
//! writer.add_entry("a.nca", Cursor::new(vec![1u8; 100]), 100)?;
//! writer.add_entry("b.nca", Cursor::new(vec![2u8; 4096]), 4096)?;
//! let (_file, report) = writer.finalize()?;
//! println!("{report}");
//!
//! let mut archive = Archive::open(File::open("out.nsp")?)?;
//! for entry in archive.entries() {
//!     println!("{} {}", entry.name, entry.size);
//! }
//! let report = verify(&mut archive)?;
//! assert!(report.is_ok());
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod compression;
pub mod error;
pub mod formats;
pub(crate) mod utils;

pub use error::{Error, Result};
