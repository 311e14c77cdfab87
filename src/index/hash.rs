//! Streaming MD5 content hashing
//!
//! MD5 is used (rather than a stronger digest) because the hash must be
//! comparable with the ETag-style hashes object stores report for
//! non-chunked uploads. It is a change detector here, not a security
//! boundary.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use md5::{Digest, Md5};

/// Content hasher producing lowercase hex MD5 digests
pub struct ContentHasher;

impl ContentHasher {
    /// Compute the MD5 of a file by streaming its contents
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn file(path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::reader(&mut reader)
    }

    /// Compute the MD5 of everything readable from `reader`
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub fn reader(reader: &mut dyn Read) -> io::Result<String> {
        let mut hasher = Md5::new();
        let mut buffer = [0; 8192]; // 8KB buffer for streaming

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_known_value() {
        // md5("hello world") is a well-known digest
        let mut bytes: &[u8] = b"hello world";
        let hash = ContentHasher::reader(&mut bytes).unwrap();
        assert_eq!(hash, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_hash_identical_files() {
        let tmp = TempDir::new().unwrap();
        let file1 = tmp.path().join("file1.txt");
        let file2 = tmp.path().join("file2.txt");

        fs::write(&file1, "same content").unwrap();
        fs::write(&file2, "same content").unwrap();

        assert_eq!(
            ContentHasher::file(&file1).unwrap(),
            ContentHasher::file(&file2).unwrap()
        );
    }

    #[test]
    fn test_hash_different_files() {
        let tmp = TempDir::new().unwrap();
        let file1 = tmp.path().join("file1.txt");
        let file2 = tmp.path().join("file2.txt");

        fs::write(&file1, "content 1").unwrap();
        fs::write(&file2, "content 2").unwrap();

        assert_ne!(
            ContentHasher::file(&file1).unwrap(),
            ContentHasher::file(&file2).unwrap()
        );
    }

    #[test]
    fn test_hash_large_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("large.bin");

        // Larger than the streaming buffer
        let content = vec![0u8; 1024 * 1024];
        fs::write(&file, &content).unwrap();

        assert!(ContentHasher::file(&file).is_ok());
    }

    #[test]
    fn test_hash_empty_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("empty.txt");
        fs::write(&file, "").unwrap();

        let hash = ContentHasher::file(&file).unwrap();
        assert_eq!(hash, "d41d8cd98f00b204e9800998ecf8427e");
    }
}
