//! ZIP archive reading.
//!
//! The payload format is standard ZIP, consumed central-directory-first:
//! [`structures`] holds the format records, [`parser`] decodes them from a
//! random-access source, and [`archive`] is the handle the pipeline uses
//! to enumerate and extract entries.
//!
//! STORED and DEFLATE entries are supported; encrypted and multi-disk
//! archives are not.

mod archive;
mod parser;
mod structures;

pub use archive::Archive;
pub use structures::{ArchiveEntry, CompressionMethod};

/// Builds minimal but structurally complete archives for tests: local
/// headers, central directory, EOCD, optional archive comment.
#[cfg(test)]
pub(crate) mod testzip {
    use std::io::Write;

    use byteorder::{LittleEndian, WriteBytesExt};
    use flate2::Compression;
    use flate2::write::DeflateEncoder;

    pub(crate) struct TestEntry {
        pub name: String,
        /// None marks a directory entry.
        pub body: Option<TestBody>,
    }

    pub(crate) struct TestBody {
        pub method: u16,
        /// Bytes as stored in the archive (post-compression).
        pub stored: Vec<u8>,
        pub crc: u32,
        pub unpacked_len: u32,
    }

    impl TestEntry {
        pub fn dir(name: &str) -> Self {
            Self {
                name: name.to_string(),
                body: None,
            }
        }

        pub fn stored(name: &str, data: &[u8]) -> Self {
            Self::with_method(name, data, 0)
        }

        pub fn deflated(name: &str, data: &[u8]) -> Self {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).unwrap();
            let stored = encoder.finish().unwrap();
            Self {
                name: name.to_string(),
                body: Some(TestBody {
                    method: 8,
                    stored,
                    crc: crc32(data),
                    unpacked_len: data.len() as u32,
                }),
            }
        }

        /// Entry claiming an arbitrary compression method for its raw data.
        pub fn with_method(name: &str, data: &[u8], method: u16) -> Self {
            Self {
                name: name.to_string(),
                body: Some(TestBody {
                    method,
                    stored: data.to_vec(),
                    crc: crc32(data),
                    unpacked_len: data.len() as u32,
                }),
            }
        }
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = flate2::Crc::new();
        crc.update(data);
        crc.sum()
    }

    pub(crate) fn build_archive(entries: &[TestEntry], comment: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut headers = Vec::new();

        for entry in entries {
            let offset = out.len() as u32;
            let (method, stored, crc, unpacked): (u16, &[u8], u32, u32) = match &entry.body {
                Some(body) => (body.method, &body.stored, body.crc, body.unpacked_len),
                None => (0, &[], 0, 0),
            };

            out.extend_from_slice(b"PK\x03\x04");
            out.write_u16::<LittleEndian>(20).unwrap(); // version needed
            out.write_u16::<LittleEndian>(0).unwrap(); // flags
            out.write_u16::<LittleEndian>(method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap(); // mod time
            out.write_u16::<LittleEndian>(0).unwrap(); // mod date
            out.write_u32::<LittleEndian>(crc).unwrap();
            out.write_u32::<LittleEndian>(stored.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(unpacked).unwrap();
            out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap(); // extra len
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(stored);

            headers.push((entry, offset, method, stored.len() as u32, crc, unpacked));
        }

        let cd_offset = out.len() as u32;
        for (entry, offset, method, stored_len, crc, unpacked) in &headers {
            out.extend_from_slice(b"PK\x01\x02");
            out.write_u16::<LittleEndian>(20).unwrap(); // version made by
            out.write_u16::<LittleEndian>(20).unwrap(); // version needed
            out.write_u16::<LittleEndian>(0).unwrap(); // flags
            out.write_u16::<LittleEndian>(*method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap(); // mod time
            out.write_u16::<LittleEndian>(0).unwrap(); // mod date
            out.write_u32::<LittleEndian>(*crc).unwrap();
            out.write_u32::<LittleEndian>(*stored_len).unwrap();
            out.write_u32::<LittleEndian>(*unpacked).unwrap();
            out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap(); // extra len
            out.write_u16::<LittleEndian>(0).unwrap(); // comment len
            out.write_u16::<LittleEndian>(0).unwrap(); // disk number
            out.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
            out.write_u32::<LittleEndian>(0).unwrap(); // external attrs
            out.write_u32::<LittleEndian>(*offset).unwrap();
            out.extend_from_slice(entry.name.as_bytes());
        }
        let cd_size = out.len() as u32 - cd_offset;

        out.extend_from_slice(b"PK\x05\x06");
        out.write_u16::<LittleEndian>(0).unwrap(); // disk number
        out.write_u16::<LittleEndian>(0).unwrap(); // disk with cd
        out.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(cd_size).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(comment.len() as u16).unwrap();
        out.extend_from_slice(comment);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::testzip::{TestEntry, build_archive};
    use super::*;
    use crate::error::InstallError;

    fn sample_entries() -> Vec<TestEntry> {
        vec![
            TestEntry::dir("dirA/"),
            TestEntry::stored("dirA/file1", b"first file"),
            TestEntry::deflated("dirA/file2", b"second file, deflated"),
            TestEntry::dir("dirB/"),
        ]
    }

    #[tokio::test]
    async fn lists_entries_in_archival_order() {
        let archive = Archive::open_buffer(build_archive(&sample_entries(), b""))
            .await
            .unwrap();

        assert_eq!(archive.entry_count(), 4);
        let names: Vec<_> = archive.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["dirA/", "dirA/file1", "dirA/file2", "dirB/"]);

        assert!(archive.entry(0).is_directory);
        assert!(!archive.entry(1).is_directory);
        assert_eq!(archive.entry(1).method, CompressionMethod::Stored);
        assert_eq!(archive.entry(1).uncompressed_size, 10);
        assert_eq!(archive.entry(2).method, CompressionMethod::Deflate);
        assert!(archive.entry(3).is_directory);
    }

    #[tokio::test]
    async fn reads_stored_and_deflated_entries() {
        let archive = Archive::open_buffer(build_archive(&sample_entries(), b""))
            .await
            .unwrap();

        assert_eq!(archive.read_entry(1).await.unwrap(), b"first file");
        assert_eq!(
            archive.read_entry(2).await.unwrap(),
            b"second file, deflated"
        );
    }

    #[tokio::test]
    async fn eocd_is_found_behind_a_comment() {
        let data = build_archive(&sample_entries(), b"archive comment, 28 bytes ..");
        let archive = Archive::open_buffer(data).await.unwrap();
        assert_eq!(archive.entry_count(), 4);
    }

    #[tokio::test]
    async fn garbage_is_not_an_archive() {
        let result = Archive::open_buffer(vec![0x42; 1024]).await;
        assert!(matches!(result, Err(InstallError::ArchiveOpenFailed(_))));

        let result = Archive::open_buffer(Vec::new()).await;
        assert!(matches!(result, Err(InstallError::ArchiveOpenFailed(_))));
    }

    #[tokio::test]
    async fn truncated_archive_fails_to_open() {
        let mut data = build_archive(&sample_entries(), b"");
        data.truncate(data.len() - 5);
        let result = Archive::open_buffer(data).await;
        assert!(matches!(result, Err(InstallError::ArchiveOpenFailed(_))));
    }

    #[tokio::test]
    async fn unknown_method_fails_extraction_not_open() {
        let entries = vec![TestEntry::with_method("odd.bin", b"data", 99)];
        let archive = Archive::open_buffer(build_archive(&entries, b"")).await.unwrap();

        assert_eq!(archive.entry(0).method, CompressionMethod::Unknown(99));
        assert!(matches!(
            archive.read_entry(0).await,
            Err(InstallError::FileExtractFailed { .. })
        ));
    }

    #[tokio::test]
    async fn extracts_to_a_path_creating_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = Archive::open_buffer(build_archive(&sample_entries(), b""))
            .await
            .unwrap();

        let dest = dir.path().join("nested/deeper/file1");
        archive.extract_entry_to_path(1, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"first file");

        // Re-extracting truncates rather than appending.
        archive.extract_entry_to_path(1, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"first file");
    }
}
