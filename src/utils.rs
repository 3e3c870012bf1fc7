//! Low-level I/O primitives shared by the codecs, the reader and the writer.
//!
//! Each read function reads exactly the bytes it promises or returns an
//! error - there is no partial-read ambiguity.

use std::io::{self, Read, Seek, SeekFrom};

use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Read one byte.
#[inline]
pub(crate) fn u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

/// Read a little-endian `u64`.
#[inline]
pub(crate) fn le_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Verify that the next `N` bytes in the stream match `expected`.
///
/// Returns [`Error::NotAnArchive`] on mismatch.
#[inline]
pub(crate) fn magic<R: Read, const N: usize>(r: &mut R, expected: &[u8; N]) -> Result<()> {
    let got = bytesa::<N>(r)?;
    if &got != expected {
        return Err(Error::NotAnArchive);
    }
    Ok(())
}

/// Extract a null-terminated UTF-8 string from a byte slice at `offset`.
///
/// Returns [`Error::MalformedHeader`] if `offset` is out of bounds or no
/// null byte follows it.
#[inline]
pub(crate) fn null_string(buf: &[u8], offset: usize) -> Result<String> {
    let slice = buf
        .get(offset..)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::malformed(format!("name offset {offset:#x} outside string table")))?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::malformed(format!("unterminated name at {offset:#x}")))?;
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}

/// Append a little-endian `u32`.
#[inline]
pub(crate) fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Append a little-endian `u64`.
#[inline]
pub(crate) fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Round `v` up to the next multiple of `align` (a power of two).
#[inline]
pub(crate) fn align_up(v: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    (v + align - 1) & !(align - 1)
}

/// SHA-256 of a byte slice.
#[inline]
pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Total length of a seekable stream. The stream position is restored.
pub(crate) fn stream_len<S: Seek>(s: &mut S) -> io::Result<u64> {
    let pos = s.stream_position()?;
    let len = s.seek(SeekFrom::End(0))?;
    if pos != len {
        s.seek(SeekFrom::Start(pos))?;
    }
    Ok(len)
}

/// Hash the next `len` bytes of `r` through a buffer of `buf_size` bytes.
///
/// Fails with `UnexpectedEof` if fewer than `len` bytes are available.
pub(crate) fn sha256_stream<R: Read>(r: &mut R, len: u64, buf_size: usize) -> Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; buf_size.max(1)];
    let mut remaining = len;
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        r.read_exact(&mut buf[..want])?;
        hasher.update(&buf[..want]);
        remaining -= want as u64;
    }
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn null_string_rejects_out_of_range_and_unterminated() {
        let table = b"a.nca\0b";
        assert_eq!(null_string(table, 0).unwrap(), "a.nca");
        assert!(matches!(null_string(table, 6), Err(Error::MalformedHeader(_))));
        assert!(matches!(null_string(table, 7), Err(Error::MalformedHeader(_))));
        assert!(matches!(null_string(table, 100), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn align_up_rounds_to_boundary() {
        assert_eq!(align_up(0, 0x20), 0);
        assert_eq!(align_up(1, 0x20), 0x20);
        assert_eq!(align_up(0x20, 0x20), 0x20);
        assert_eq!(align_up(0x201, 0x200), 0x400);
    }

    #[test]
    fn stream_hash_matches_slice_hash() {
        let data: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let mut cur = Cursor::new(&data);
        assert_eq!(sha256_stream(&mut cur, 10_000, 7).unwrap(), sha256(&data));
        assert_eq!(cur.position(), 10_000);
    }

    #[test]
    fn stream_len_restores_position() {
        let mut cur = Cursor::new(vec![0u8; 64]);
        cur.set_position(10);
        assert_eq!(stream_len(&mut cur).unwrap(), 64);
        assert_eq!(cur.position(), 10);
    }
}
