//! Content identity via BLAKE3.
//!
//! The fingerprint exists for exactly one comparison — "is the deployed
//! copy byte-identical to the running binary" — and is never persisted.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::Result;

/// Streaming block size; bounds memory for arbitrarily large binaries.
const BLOCK_SIZE: usize = 64 * 1024;

/// Fixed-length digest of a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFingerprint([u8; 32]);

impl ContentFingerprint {
    /// Hex rendering for logs.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Compute the fingerprint of the file at `path`.
///
/// The file is streamed in fixed-size blocks, never loaded whole. Any
/// read failure surfaces as an error; the caller decides whether that
/// means "needs install" or "cannot compare".
pub fn fingerprint(path: &Path) -> Result<ContentFingerprint> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ContentFingerprint(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payload");
        fs::write(&path, b"supervisor bytes").unwrap();

        let a = fingerprint(&path).unwrap();
        let b = fingerprint(&path).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_differs_on_single_byte_mutation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payload");
        fs::write(&path, b"supervisor bytes").unwrap();
        let before = fingerprint(&path).unwrap();

        fs::write(&path, b"supervisor byteZ").unwrap();
        let after = fingerprint(&path).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_fingerprint_streams_across_block_boundary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big");
        let data = vec![0xabu8; BLOCK_SIZE * 2 + 17];
        fs::write(&path, &data).unwrap();

        let streamed = fingerprint(&path).unwrap();
        assert_eq!(streamed.to_hex(), blake3::hash(&data).to_hex().to_string());
    }

    #[test]
    fn test_fingerprint_missing_file_is_error() {
        assert!(fingerprint(Path::new("/nonexistent/binary")).is_err());
    }
}
