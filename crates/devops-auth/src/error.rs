use thiserror::Error;

/// Errors returned by token issuance and validation.
///
/// Every variant except [`TokenError::Signing`] means the caller failed to
/// authenticate. HTTP surfaces collapse those into a single 401, but the
/// variants stay distinct so callers and tests can tell them apart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("JWT token has expired")]
    Expired,

    #[error("invalid JWT token: {0}")]
    Invalid(String),

    #[error("invalid JWT token: JWT token has already been used")]
    AlreadyUsed,

    #[error("invalid JWT token: JWT token not found in transactions")]
    UnknownTransaction,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl TokenError {
    /// `true` for the failures that mean "this token does not authenticate".
    pub fn is_authentication_failure(&self) -> bool {
        !matches!(self, TokenError::Signing(_))
    }

    /// Short stable label, used for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Expired => "expired",
            TokenError::Invalid(_) => "invalid",
            TokenError::AlreadyUsed => "already_used",
            TokenError::UnknownTransaction => "unknown_transaction",
            TokenError::Signing(_) => "signing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_is_not_an_authentication_failure() {
        assert!(!TokenError::Signing("boom".into()).is_authentication_failure());
        assert!(TokenError::Expired.is_authentication_failure());
        assert!(TokenError::AlreadyUsed.is_authentication_failure());
        assert!(TokenError::UnknownTransaction.is_authentication_failure());
        assert!(TokenError::Invalid("bad".into()).is_authentication_failure());
    }

    #[test]
    fn messages_keep_the_expiry_distinct() {
        assert_eq!(TokenError::Expired.to_string(), "JWT token has expired");
        assert!(TokenError::AlreadyUsed.to_string().contains("already been used"));
    }
}
