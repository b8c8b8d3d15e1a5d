//! CRC-32 fingerprinting primitives.
//!
//! # Overview
//!
//! Two streaming operations back every [`FileIdentity`](super::FileIdentity):
//!
//! - [`partial_checksum`]: CRC-32 over at most the first [`PARTIAL_SIZE`] bytes
//! - [`full_checksum`]: CRC-32 over the whole stream, read in
//!   [`BLOCK_SIZE`] chunks
//!
//! CRC-32 (IEEE polynomial) is the checksum ZIP stores for every entry, which
//! is what lets a loose file and an archived copy share a fingerprint without
//! decompressing the archive.
//!
//! # Example
//!
//! ```
//! use deldup::scanner::fingerprint::{full_checksum, partial_checksum};
//!
//! let data = b"hello";
//! let (crc, len) = full_checksum(&data[..]).unwrap();
//! assert_eq!(len, 5);
//! assert_eq!(partial_checksum(&data[..]).unwrap(), crc);
//! ```

use std::io::{self, Read};

use crc32fast::Hasher;

/// Number of leading bytes covered by the partial fingerprint (64 KiB).
pub const PARTIAL_SIZE: usize = 64 * 1024;

/// Read block size for full fingerprints (100 KiB).
pub const BLOCK_SIZE: usize = 100 * 1024;

/// Compute the CRC-32 of at most the first [`PARTIAL_SIZE`] bytes of `reader`.
///
/// Short reads are retried until either 64 KiB have been consumed or the
/// stream reports end-of-file, so the result never depends on how the
/// underlying reader chunks its data. An empty stream yields `0`.
///
/// # Errors
///
/// Returns any I/O error other than [`io::ErrorKind::Interrupted`].
pub fn partial_checksum<R: Read>(reader: R) -> io::Result<u32> {
    let mut hasher = Hasher::new();
    let mut limited = reader.take(PARTIAL_SIZE as u64);
    let mut buffer = vec![0u8; PARTIAL_SIZE];

    loop {
        match limited.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(hasher.finalize())
}

/// Compute the CRC-32 of the entire stream.
///
/// Returns the checksum together with the number of bytes consumed, which
/// callers record as the content size.
///
/// # Errors
///
/// Returns any I/O error other than [`io::ErrorKind::Interrupted`].
pub fn full_checksum<R: Read>(mut reader: R) -> io::Result<(u32, u64)> {
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];
    let mut total: u64 = 0;

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
                total += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok((hasher.finalize(), total))
}

/// Format a checksum the way it appears in composite keys and CSV exports.
#[must_use]
pub fn checksum_to_string(crc: u32) -> String {
    crc.to_string()
}
