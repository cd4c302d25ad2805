use std::path::Path;

use crate::error::{InstallError, Result};

/// Raw bytes of the frontend's persistent configuration file.
///
/// Loaded whole in a single read and never mutated afterwards; lookups hand
/// out slices borrowing this buffer. The blob contains embedded null bytes,
/// so it is kept as bytes rather than a string.
pub struct ConfigBlob {
    data: Vec<u8>,
}

impl ConfigBlob {
    /// Read the configuration file at `path` into memory in one operation.
    ///
    /// Any failure to open, size, or fully read the file is reported as
    /// [`InstallError::ConfigUnavailable`] and yields no partial data.
    /// Loading again simply replaces the previous blob; the pipeline does
    /// this once at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(InstallError::ConfigUnavailable)?;
        Ok(Self { data })
    }

    /// Wrap an already-loaded buffer.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
