use crate::config::ConfigBlob;
use crate::error::{InstallError, Result};

/// Outcome of a raw key scan.
///
/// Kept separate from the public API so callers that insist on a key can
/// tell a missing key apart from a corrupt pairing.
pub(crate) enum Scan<'a> {
    Found(&'a [u8]),
    Missing,
    Corrupt,
}

impl ConfigBlob {
    /// Search the blob for `key` and return its paired value.
    ///
    /// Records are null-terminated and strictly alternate key/value, with
    /// value records carrying a leading `=`. The returned slice borrows the
    /// blob's storage, excludes the marker byte, and is valid for as long
    /// as the blob lives.
    ///
    /// Returns `None` both when the key is absent and when the record after
    /// a matching key is not a value — a corrupt file never yields data
    /// from the wrong pair.
    pub fn lookup(&self, key: &str) -> Option<&[u8]> {
        match self.scan(key.as_bytes()) {
            Scan::Found(value) => Some(value),
            Scan::Missing | Scan::Corrupt => None,
        }
    }

    /// [`lookup`](Self::lookup) with UTF-8 decoding of the value.
    pub fn lookup_str(&self, key: &str) -> Option<&str> {
        self.lookup(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Look up a key that must be present and decodable.
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.scan(key.as_bytes()) {
            Scan::Found(value) => std::str::from_utf8(value)
                .map_err(|_| InstallError::CorruptPairing(key.to_string())),
            Scan::Missing => Err(InstallError::KeyNotFound(key.to_string())),
            Scan::Corrupt => Err(InstallError::CorruptPairing(key.to_string())),
        }
    }

    pub(crate) fn scan(&self, key: &[u8]) -> Scan<'_> {
        let data = self.as_bytes();
        let mut pos = 0;

        while pos < data.len() {
            let len = record_len(&data[pos..]);

            // A value with no preceding key. The known writer never emits
            // one, but the format does not forbid it either; skip past it
            // and keep scanning.
            if data[pos] == b'=' {
                pos += len + 1;
                continue;
            }

            if &data[pos..pos + len] != key {
                pos += len + 1;
                continue;
            }

            // Found the key. The record immediately after must be its value.
            pos += len + 1;
            if pos >= data.len() || data[pos] != b'=' {
                return Scan::Corrupt;
            }

            let value_len = record_len(&data[pos..]);
            return Scan::Found(&data[pos + 1..pos + value_len]);
        }

        Scan::Missing
    }
}

/// Length of the record at the head of `data`, not counting its null
/// terminator. A record running to the end of the blob is its own record.
fn record_len(data: &[u8]) -> usize {
    data.iter().position(|&b| b == 0).unwrap_or(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(pairs: &[(&str, &str)]) -> ConfigBlob {
        let mut data = Vec::new();
        for (key, value) in pairs {
            data.extend_from_slice(key.as_bytes());
            data.push(0);
            data.push(b'=');
            data.extend_from_slice(value.as_bytes());
            data.push(0);
        }
        ConfigBlob::from_bytes(data)
    }

    #[test]
    fn finds_every_pair_in_any_order() {
        let pairs = [
            ("downloadUrl", "http://example.com/a.zip"),
            ("titleId", "0001000848414241"),
            ("locale", "en"),
        ];
        let cfg = blob(&pairs);
        for (key, value) in pairs {
            assert_eq!(cfg.lookup(key), Some(value.as_bytes()));
        }

        let reversed: Vec<_> = pairs.iter().rev().copied().collect();
        let cfg = blob(&reversed);
        for (key, value) in pairs {
            assert_eq!(cfg.lookup(key), Some(value.as_bytes()));
        }
    }

    #[test]
    fn unknown_key_is_absent() {
        let cfg = blob(&[("downloadUrl", "http://example.com/a.zip")]);
        assert!(cfg.lookup("titleId").is_none());
    }

    #[test]
    fn empty_blob_has_no_keys() {
        let cfg = ConfigBlob::from_bytes(Vec::new());
        assert!(cfg.lookup("downloadUrl").is_none());
        assert!(cfg.is_empty());
    }

    #[test]
    fn value_may_be_empty() {
        let cfg = blob(&[("downloadUrl", "")]);
        assert_eq!(cfg.lookup("downloadUrl"), Some(&b""[..]));
    }

    #[test]
    fn corrupt_pairing_yields_nothing() {
        // A key followed by another key instead of a value must never
        // surface the next pair's value.
        let mut data = Vec::new();
        data.extend_from_slice(b"titleId\0");
        data.extend_from_slice(b"locale\0");
        data.extend_from_slice(b"=en\0");
        let cfg = ConfigBlob::from_bytes(data);

        assert!(cfg.lookup("titleId").is_none());
        assert_eq!(cfg.lookup("locale"), Some(&b"en"[..]));
    }

    #[test]
    fn key_at_end_of_blob_is_corrupt() {
        let cfg = ConfigBlob::from_bytes(b"titleId\0".to_vec());
        assert!(cfg.lookup("titleId").is_none());
        assert!(matches!(
            cfg.require("titleId"),
            Err(InstallError::CorruptPairing(_))
        ));
    }

    #[test]
    fn orphaned_leading_value_is_skipped() {
        let mut data = Vec::new();
        data.extend_from_slice(b"=stray\0");
        data.extend_from_slice(b"downloadUrl\0");
        data.extend_from_slice(b"=http://example.com/a.zip\0");
        let cfg = ConfigBlob::from_bytes(data);

        assert_eq!(cfg.lookup("downloadUrl"), Some(&b"http://example.com/a.zip"[..]));
    }

    #[test]
    fn require_distinguishes_missing_from_corrupt() {
        let cfg = blob(&[("downloadUrl", "x")]);
        assert!(matches!(
            cfg.require("titleId"),
            Err(InstallError::KeyNotFound(_))
        ));
        assert_eq!(cfg.require("downloadUrl").unwrap(), "x");

        let cfg = ConfigBlob::from_bytes(b"titleId\0junk\0".to_vec());
        assert!(matches!(
            cfg.require("titleId"),
            Err(InstallError::CorruptPairing(_))
        ));
    }

    #[test]
    fn value_equal_to_key_name_is_not_matched() {
        // A value record whose content happens to spell a key name must not
        // be treated as that key.
        let mut data = Vec::new();
        data.extend_from_slice(b"alias\0");
        data.extend_from_slice(b"=titleId\0");
        data.extend_from_slice(b"titleId\0");
        data.extend_from_slice(b"=0001000848414241\0");
        let cfg = ConfigBlob::from_bytes(data);

        assert_eq!(cfg.lookup("titleId"), Some(&b"0001000848414241"[..]));
    }
}
