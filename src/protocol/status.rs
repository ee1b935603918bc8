//! Terminal statuses of the validation protocol.

use std::fmt;

/// Outcome of one validation request.
///
/// Every request ends in exactly one of these. The last four codes are
/// defined by the protocol for multi-server deployments and are never
/// emitted by this single-node server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Ok,
    BadOtp,
    ReplayedOtp,
    BadSignature,
    MissingParameter,
    NoSuchClient,
    OperationNotAllowed,
    BackendError,
    NotEnoughAnswers,
    ReplayedRequest,
}

impl ValidationStatus {
    /// The wire spelling of the status, as sent in the `status=` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadOtp => "BAD_OTP",
            Self::ReplayedOtp => "REPLAYED_OTP",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::MissingParameter => "MISSING_PARAMETER",
            Self::NoSuchClient => "NO_SUCH_CLIENT",
            Self::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            Self::BackendError => "BACKEND_ERROR",
            Self::NotEnoughAnswers => "NOT_ENOUGH_ANSWERS",
            Self::ReplayedRequest => "REPLAYED_REQUEST",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_spellings() {
        assert_eq!(ValidationStatus::Ok.as_str(), "OK");
        assert_eq!(ValidationStatus::BadOtp.as_str(), "BAD_OTP");
        assert_eq!(ValidationStatus::ReplayedOtp.as_str(), "REPLAYED_OTP");
        assert_eq!(ValidationStatus::BadSignature.as_str(), "BAD_SIGNATURE");
        assert_eq!(
            ValidationStatus::MissingParameter.as_str(),
            "MISSING_PARAMETER"
        );
        assert_eq!(ValidationStatus::NoSuchClient.as_str(), "NO_SUCH_CLIENT");
    }

    #[test]
    fn test_display_matches_wire_spelling() {
        assert_eq!(ValidationStatus::ReplayedOtp.to_string(), "REPLAYED_OTP");
    }
}
