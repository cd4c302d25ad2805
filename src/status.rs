//! Exit protocol shared with the calling channel.
//!
//! Whatever happens, the installer hands control back with a status token
//! encoded as a query-style parameter string. `SUCCESS` means the whole
//! pipeline ran; anything else is the symbolic code of the first failure.

use crate::error::InstallError;

/// Status token reported to the caller when the process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnStatus(&'static str);

impl ReturnStatus {
    pub const SUCCESS: ReturnStatus = ReturnStatus("SUCCESS");

    /// Status for a failed run, carrying the failure's symbolic code.
    pub fn failure(error: &InstallError) -> Self {
        Self(error.code())
    }

    pub fn token(&self) -> &'static str {
        self.0
    }

    /// Query-style return string appended to the caller's error path.
    pub fn query(&self) -> String {
        format!("/error?error={}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_query() {
        assert_eq!(ReturnStatus::SUCCESS.query(), "/error?error=SUCCESS");
        assert_eq!(ReturnStatus::SUCCESS.token(), "SUCCESS");
    }

    #[test]
    fn failure_query_carries_the_symbolic_code() {
        let status = ReturnStatus::failure(&InstallError::NoPayloadConfigured);
        assert_eq!(status.query(), "/error?error=NO_PAYLOAD_CONFIGURED");

        let status = ReturnStatus::failure(&InstallError::ContentLengthMissing);
        assert_eq!(status.query(), "/error?error=CONTENT_LENGTH_MISSING");
    }
}
