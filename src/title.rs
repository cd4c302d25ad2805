//! Staged titles on the internal-flash layout.
//!
//! A payload can be pre-staged as the single content of a title instead of
//! being fetched over the network. The title's descriptor records the
//! content's id, size, and integrity hash; after the payload is installed
//! the descriptor is patched and the backing file emptied so the staged
//! copy stops consuming space without a full uninstall.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{InstallError, Result};

/// Title that launches the installer and regains control when it exits.
pub const CALLER_TITLE: TitleId = TitleId(0x0001_0002_4841_4241);

/// Exact byte length of a staged title descriptor: a fixed header followed
/// by a single content record.
pub const DESCRIPTOR_LEN: usize = 520;

/// Offset of the content record within the descriptor.
const CONTENT_RECORD_OFFSET: usize = 484;

/// SHA-1 of zero bytes, written into a nullified content record.
pub const EMPTY_CONTENT_HASH: [u8; 20] = [
    0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95, 0x60, 0x18,
    0x90, 0xaf, 0xd8, 0x07, 0x09,
];

/// 64-bit title identifier.
///
/// The upper half names the title kind, the lower half is the product code.
/// Zero is never a valid identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TitleId(u64);

impl TitleId {
    /// Wrap a raw identifier, rejecting zero.
    pub fn new(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn upper(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn lower(self) -> u32 {
        self.0 as u32
    }
}

impl FromStr for TitleId {
    type Err = InstallError;

    /// Parse a hexadecimal title identifier.
    ///
    /// Zero is rejected along with unparseable input: no real title has id
    /// zero, and a zero cannot be told apart from a failed conversion.
    fn from_str(s: &str) -> Result<Self> {
        u64::from_str_radix(s, 16)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InstallError::InvalidIdentifier(s.to_string()))
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One content record as stored in the descriptor tail.
#[derive(Debug, Clone, Copy)]
pub struct ContentRecord {
    pub id: u32,
    pub index: u16,
    pub kind: u16,
    pub size: u64,
    pub hash: [u8; 20],
}

impl ContentRecord {
    /// Decode the record at the head of `buf`. Fields are big-endian.
    fn read(buf: &[u8]) -> Self {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&buf[16..36]);
        Self {
            id: BigEndian::read_u32(&buf[0..4]),
            index: BigEndian::read_u16(&buf[4..6]),
            kind: BigEndian::read_u16(&buf[6..8]),
            size: BigEndian::read_u64(&buf[8..16]),
            hash,
        }
    }

    fn write(&self, buf: &mut [u8]) {
        BigEndian::write_u32(&mut buf[0..4], self.id);
        BigEndian::write_u16(&mut buf[4..6], self.index);
        BigEndian::write_u16(&mut buf[6..8], self.kind);
        BigEndian::write_u64(&mut buf[8..16], self.size);
        buf[16..36].copy_from_slice(&self.hash);
    }
}

/// Internal-flash title layout rooted at a directory.
///
/// All paths follow the `title/<upper>/<lower>/...` schema; the store never
/// touches anything outside its root.
pub struct NandStore {
    root: PathBuf,
}

impl NandStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn title_dir(&self, title: TitleId) -> PathBuf {
        self.root
            .join("title")
            .join(format!("{:08x}", title.upper()))
            .join(format!("{:08x}", title.lower()))
    }

    /// Path of a file inside the title's private data directory.
    pub fn data_file(&self, title: TitleId, name: &str) -> PathBuf {
        self.title_dir(title).join("data").join(name)
    }

    pub fn descriptor_path(&self, title: TitleId) -> PathBuf {
        self.title_dir(title).join("content").join("title.tmd")
    }

    pub fn content_path(&self, title: TitleId, id: u32) -> PathBuf {
        self.title_dir(title)
            .join("content")
            .join(format!("{id:08x}.app"))
    }

    /// Locate the content file holding a staged payload.
    ///
    /// The descriptor must be exactly [`DESCRIPTOR_LEN`] bytes; anything
    /// else indicates a structure this code does not understand, and
    /// guessing a layout would corrupt the title. A record whose index does
    /// not match, or whose size is already zero, means there is nothing
    /// staged to install.
    pub fn staged_content(&self, title: TitleId, content_index: u16) -> Result<PathBuf> {
        let descriptor = self.read_descriptor(title)?;
        let record = ContentRecord::read(&descriptor[CONTENT_RECORD_OFFSET..]);

        if record.index != content_index || record.size == 0 {
            return Err(InstallError::ContentNotStaged {
                title: title.to_string(),
                index: content_index,
            });
        }

        Ok(self.content_path(title, record.id))
    }

    /// Reclaim the space held by a consumed payload.
    ///
    /// The descriptor keeps its shape, but the content record reports zero
    /// bytes with the empty-content hash, and the backing file is deleted
    /// and recreated with no data. Each step fails with its own code so
    /// a failed read can be told apart from a failed rewrite.
    pub fn nullify(&self, title: TitleId, content_index: u16) -> Result<()> {
        let mut descriptor = self.read_descriptor(title)?;
        let mut record = ContentRecord::read(&descriptor[CONTENT_RECORD_OFFSET..]);

        if record.index != content_index {
            return Err(InstallError::ContentNotStaged {
                title: title.to_string(),
                index: content_index,
            });
        }

        record.size = 0;
        record.hash = EMPTY_CONTENT_HASH;
        record.write(&mut descriptor[CONTENT_RECORD_OFFSET..]);

        fs::write(self.descriptor_path(title), &descriptor)
            .map_err(InstallError::DescriptorWriteFailed)?;

        self.recreate_content(self.content_path(title, record.id))
    }

    fn read_descriptor(&self, title: TitleId) -> Result<Vec<u8>> {
        let descriptor = fs::read(self.descriptor_path(title))
            .map_err(InstallError::DescriptorReadFailed)?;

        if descriptor.len() != DESCRIPTOR_LEN {
            return Err(InstallError::UnexpectedDescriptorSize(descriptor.len()));
        }

        Ok(descriptor)
    }

    /// Delete and recreate a content file empty, keeping its permissions.
    fn recreate_content(&self, path: PathBuf) -> Result<()> {
        let recreate_failed = |source: std::io::Error| InstallError::ContentRecreateFailed {
            path: path.clone(),
            source,
        };

        let permissions = fs::metadata(&path).map(|m| m.permissions()).ok();

        fs::remove_file(&path).map_err(recreate_failed)?;
        fs::File::create(&path).map_err(recreate_failed)?;

        if let Some(permissions) = permissions {
            fs::set_permissions(&path, permissions).map_err(recreate_failed)?;
        }

        Ok(())
    }
}
