use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use flate2::read::DeflateDecoder;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{InstallError, Result};
use crate::io::{LocalFileReader, MemoryReader, ReadAt};

use super::parser::ZipParser;
use super::structures::{ArchiveEntry, CompressionMethod};

/// An opened archive with its central directory decoded.
///
/// Owns its reader and decoder state; dropping the handle releases
/// everything on every exit path, including mid-walk failures.
pub struct Archive<R: ReadAt> {
    parser: ZipParser<R>,
    entries: Vec<ArchiveEntry>,
}

impl Archive<LocalFileReader> {
    /// Open an archive stored as a file.
    pub async fn open_path(path: &Path) -> Result<Self> {
        let reader = LocalFileReader::new(path)
            .map_err(|e| InstallError::ArchiveOpenFailed(e.to_string()))?;
        Self::open(Arc::new(reader)).await
    }
}

impl Archive<MemoryReader> {
    /// Open an archive held in memory.
    pub async fn open_buffer(data: Vec<u8>) -> Result<Self> {
        Self::open(Arc::new(MemoryReader::new(data))).await
    }
}

impl<R: ReadAt> Archive<R> {
    /// Open an archive over any random-access source.
    ///
    /// Malformed or truncated archive structure is [`ArchiveOpenFailed`];
    /// no handle exists on failure.
    ///
    /// [`ArchiveOpenFailed`]: InstallError::ArchiveOpenFailed
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser
            .read_central_directory()
            .await
            .map_err(|e| InstallError::ArchiveOpenFailed(e.to_string()))?;
        Ok(Self { parser, entries })
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entry metadata by archival index.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of `[0, entry_count)`; walkers iterate
    /// the count and never construct an out-of-range index.
    pub fn entry(&self, index: usize) -> &ArchiveEntry {
        &self.entries[index]
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Decode one entry's data into memory.
    pub async fn read_entry(&self, index: usize) -> Result<Vec<u8>> {
        let entry = self.entry(index);
        let fail = |reason: String| InstallError::FileExtractFailed {
            path: entry.name.clone().into(),
            reason,
        };

        let data_offset = self
            .parser
            .data_offset(entry)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let mut data = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut data)
            .await
            .map_err(|e| fail(e.to_string()))?;

        match entry.method {
            CompressionMethod::Stored => Ok(data),
            CompressionMethod::Deflate => {
                let mut decoded = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(&data[..])
                    .read_to_end(&mut decoded)
                    .map_err(|e| fail(e.to_string()))?;
                Ok(decoded)
            }
            CompressionMethod::Unknown(method) => {
                Err(fail(format!("unsupported compression method {method}")))
            }
        }
    }

    /// Write one entry's decoded data to `dest`.
    ///
    /// Missing parent directories are created. An existing destination is
    /// truncated before writing, so a re-run converges instead of
    /// appending to a previous partial file. A failure can still leave a
    /// partial file behind; there is no atomic-write guarantee.
    pub async fn extract_entry_to_path(&self, index: usize, dest: &Path) -> Result<()> {
        let fail = |e: std::io::Error| InstallError::FileExtractFailed {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        };

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(fail)?;
            }
        }

        let data = self.read_entry(index).await?;

        let mut file = fs::File::create(dest).await.map_err(fail)?;
        file.write_all(&data).await.map_err(fail)?;
        file.flush().await.map_err(fail)?;

        Ok(())
    }
}
