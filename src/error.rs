use std::path::PathBuf;

use thiserror::Error;

/// Failure raised by any stage of the install pipeline.
///
/// Each variant carries a stable symbolic code (see [`InstallError::code`])
/// that is handed back to the caller through the return protocol, so the
/// frontend can tell "couldn't read the descriptor" apart from "couldn't
/// rewrite the content" without parsing prose.
///
/// The first failure aborts the whole run; nothing in the pipeline retries.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The configuration blob could not be opened, sized, or fully read.
    #[error("could not load configuration: {0}")]
    ConfigUnavailable(#[source] std::io::Error),

    /// A required configuration key is absent.
    #[error("configuration key `{0}` is not present")]
    KeyNotFound(String),

    /// A key was found but the record following it is not a value.
    #[error("configuration value for `{0}` is missing or corrupt")]
    CorruptPairing(String),

    /// Neither a download URL nor a staged title is configured.
    #[error("no download URL or staged title configured")]
    NoPayloadConfigured,

    /// A title identifier was present but zero or unparseable.
    #[error("invalid title identifier `{0}`")]
    InvalidIdentifier(String),

    /// The payload is not a readable ZIP archive.
    #[error("could not open archive: {0}")]
    ArchiveOpenFailed(String),

    /// A directory entry could not be materialized for a reason other
    /// than it already existing.
    #[error("could not create directory `{path}`: {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file entry could not be decoded or written.
    #[error("could not extract `{path}`: {reason}")]
    FileExtractFailed { path: PathBuf, reason: String },

    /// The title descriptor has an unexpected byte length.
    #[error("title descriptor is {0} bytes where 520 was expected")]
    UnexpectedDescriptorSize(usize),

    /// The descriptor's content record does not match the requested
    /// content, or the content was already reclaimed.
    #[error("title {title} has no staged content at index {index}")]
    ContentNotStaged { title: String, index: u16 },

    /// The title descriptor could not be read.
    #[error("could not read title descriptor: {0}")]
    DescriptorReadFailed(#[source] std::io::Error),

    /// The patched descriptor could not be written back.
    #[error("could not rewrite title descriptor: {0}")]
    DescriptorWriteFailed(#[source] std::io::Error),

    /// The consumed content file could not be deleted and recreated.
    #[error("could not recreate content file `{path}`: {source}")]
    ContentRecreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload host could not be resolved.
    #[error("could not resolve payload host: {0}")]
    DnsFailed(String),

    /// The HTTP client could not be constructed.
    #[error("could not set up HTTP client: {0}")]
    SocketCreateFailed(String),

    /// The payload server could not be reached.
    #[error("could not connect to payload server: {0}")]
    SocketConnectFailed(String),

    /// The server answered the payload request with a non-success status.
    #[error("server rejected the payload request with status {0}")]
    RequestRejected(u16),

    /// The response did not announce its length.
    #[error("response carried no Content-Length header")]
    ContentLengthMissing,

    /// The response body ended or errored before the announced length.
    #[error("download interrupted: {0}")]
    ChunkReadFailed(String),

    /// A downloaded chunk could not be written to storage.
    #[error("could not save downloaded data: {0}")]
    ChunkWriteFailed(#[source] std::io::Error),
}

impl InstallError {
    /// Stable symbolic code reported through the return protocol.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigUnavailable(_) => "CONFIG_UNAVAILABLE",
            Self::KeyNotFound(_) => "KEY_NOT_FOUND",
            Self::CorruptPairing(_) => "CORRUPT_PAIRING",
            Self::NoPayloadConfigured => "NO_PAYLOAD_CONFIGURED",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::ArchiveOpenFailed(_) => "ARCHIVE_OPEN_FAILED",
            Self::DirectoryCreateFailed { .. } => "DIRECTORY_CREATE_FAILED",
            Self::FileExtractFailed { .. } => "FILE_EXTRACT_FAILED",
            Self::UnexpectedDescriptorSize(_) => "UNEXPECTED_DESCRIPTOR_SIZE",
            Self::ContentNotStaged { .. } => "CONTENT_NOT_STAGED",
            Self::DescriptorReadFailed(_) => "DESCRIPTOR_READ_FAILED",
            Self::DescriptorWriteFailed(_) => "DESCRIPTOR_WRITE_FAILED",
            Self::ContentRecreateFailed { .. } => "CONTENT_RECREATE_FAILED",
            Self::DnsFailed(_) => "DNS_FAILED",
            Self::SocketCreateFailed(_) => "SOCKET_CREATE_FAILED",
            Self::SocketConnectFailed(_) => "SOCKET_CONNECT_FAILED",
            Self::RequestRejected(_) => "REQUEST_REJECTED",
            Self::ContentLengthMissing => "CONTENT_LENGTH_MISSING",
            Self::ChunkReadFailed(_) => "CHUNK_READ_FAILED",
            Self::ChunkWriteFailed(_) => "CHUNK_WRITE_FAILED",
        }
    }
}

/// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(InstallError::NoPayloadConfigured.code(), "NO_PAYLOAD_CONFIGURED");
        assert_eq!(InstallError::ContentLengthMissing.code(), "CONTENT_LENGTH_MISSING");
        assert_eq!(
            InstallError::UnexpectedDescriptorSize(519).code(),
            "UNEXPECTED_DESCRIPTOR_SIZE"
        );
        assert_eq!(
            InstallError::InvalidIdentifier("0".into()).code(),
            "INVALID_IDENTIFIER"
        );
    }
}
