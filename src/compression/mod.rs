//! Payload transcoding around the container engine (requires the
//! `compression` feature).
//!
//! The archive writer and reader treat entry bodies as opaque byte streams.
//! Compression therefore sits outside them: a compressed payload is produced
//! before [`crate::archive::ArchiveWriter::add_entry`] and decoded after
//! [`crate::archive::Archive::read_entry_data`]. Entry hashes always cover
//! the bytes actually stored, compressed or not.
//!
//! All submodules are gated behind the `compression` Cargo feature so that
//! the core library only depends on its hashing and logging crates:
//!
//! ```toml
//! [dependencies]
//! nspkit = { version = "0.1", features = ["compression"] }
//! ```
//!
//! | Module | Algorithm | Typical use |
//! |--------|-----------|-------------|
//! | [`zstd`] | Zstandard | NSZ/XCZ-style compressed entries |

#[cfg(feature = "compression")]
pub mod zstd;
