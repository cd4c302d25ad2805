//! Payload resolution.
//!
//! The frontend can hand the installer its payload in one of three ways: a
//! direct download URL in the configuration blob, a staged title named by
//! the blob, or a staged title announced inside a broadcast mailbox
//! capture. All of them resolve to a single [`PayloadReference`] here, and
//! the rest of the pipeline never cares which path produced it.

use crate::config::{ConfigBlob, find_pattern};
use crate::error::{InstallError, Result};
use crate::title::TitleId;

/// Configuration key carrying the remote payload URL.
pub const URL_KEY: &str = "downloadUrl";

/// Configuration key carrying a staged title identifier.
pub const TITLE_KEY: &str = "titleId";

/// Optional key selecting which content of the staged title is the payload.
pub const CONTENT_KEY: &str = "titleContent";

/// Marker preceding a staged title id in a broadcast mailbox capture.
pub const STAGED_TITLE_MARKER: &[u8] = b"X-Staged-Title: ";

/// Where this run's payload comes from. Exactly one variant is active per
/// run; the two deployment paths are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadReference {
    /// Fetch a ZIP over HTTP.
    RemoteUrl(String),
    /// Open a ZIP already staged as title content on internal flash.
    StoredTitle { title: TitleId, content_index: u16 },
}

/// Derive the payload source from the loaded configuration.
///
/// A present, non-empty `downloadUrl` wins. Otherwise a `titleId` is parsed
/// as a hexadecimal 64-bit identifier, with the optional `titleContent` key
/// selecting the content index (default 0). With neither key configured
/// there is nothing to install.
pub fn resolve_download_target(blob: &ConfigBlob) -> Result<PayloadReference> {
    if let Some(url) = blob.lookup_str(URL_KEY) {
        if !url.is_empty() {
            return Ok(PayloadReference::RemoteUrl(url.to_string()));
        }
    }

    if let Some(id) = blob.lookup_str(TITLE_KEY) {
        let title: TitleId = id.parse()?;
        let content_index = match blob.lookup_str(CONTENT_KEY) {
            Some(raw) => raw
                .parse()
                .map_err(|_| InstallError::InvalidIdentifier(raw.to_string()))?,
            None => 0,
        };
        return Ok(PayloadReference::StoredTitle {
            title,
            content_index,
        });
    }

    Err(InstallError::NoPayloadConfigured)
}

/// Scan a broadcast mailbox capture for a staged title announcement.
///
/// The capture is an opaque buffer; the announcement is the
/// [`STAGED_TITLE_MARKER`] phrase followed by 16 hex digits. A capture
/// without the phrase, or with the phrase cut off at the end of the buffer,
/// simply carries no payload.
pub fn resolve_from_broadcast(capture: &[u8]) -> Result<PayloadReference> {
    let at = find_pattern(capture, STAGED_TITLE_MARKER).ok_or(InstallError::NoPayloadConfigured)?;

    let digits_start = at + STAGED_TITLE_MARKER.len();
    let digits = capture
        .get(digits_start..digits_start + 16)
        .ok_or(InstallError::NoPayloadConfigured)?;

    let digits = std::str::from_utf8(digits)
        .map_err(|_| InstallError::InvalidIdentifier(String::from_utf8_lossy(digits).into_owned()))?;

    Ok(PayloadReference::StoredTitle {
        title: digits.parse()?,
        content_index: 0,
    })
}
