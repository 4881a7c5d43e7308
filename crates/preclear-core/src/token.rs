//! # Pre-Clearance Token
//!
//! The time-limited credential issued once a shipment holds both the
//! automated and the broker approval. Minting lives in the engine's
//! `TokenIssuer`; this module defines the value object and its expiry
//! invariant.

use serde::{Deserialize, Serialize};

use crate::temporal::Timestamp;

/// Number of days an issued token remains valid.
pub const TOKEN_VALIDITY_DAYS: i64 = 30;

/// A pre-clearance token: unique value, issuance time, expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token text, e.g. `PC-7G2MKQ04AHXN`.
    pub value: String,
    /// When the token was minted.
    pub issued_at: Timestamp,
    /// `issued_at + 30 days`, always.
    pub expires_at: Timestamp,
}

impl Token {
    /// Construct a token from its value and issuance time. The expiry is
    /// derived — there is no constructor that accepts an arbitrary one.
    pub fn new(value: String, issued_at: Timestamp) -> Self {
        let expires_at = issued_at.plus_days(TOKEN_VALIDITY_DAYS);
        Self {
            value,
            issued_at,
            expires_at,
        }
    }

    /// Whether the token has expired as of `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_thirty_days_after_issuance() {
        let issued = Timestamp::parse("2026-03-01T09:00:00Z").unwrap();
        let token = Token::new("PC-TESTTESTTEST".to_string(), issued);
        assert_eq!(token.expires_at, issued.plus_days(30));
        assert_eq!(token.expires_at.to_iso8601(), "2026-03-31T09:00:00Z");
    }

    #[test]
    fn test_is_expired() {
        let issued = Timestamp::parse("2026-03-01T09:00:00Z").unwrap();
        let token = Token::new("PC-TESTTESTTEST".to_string(), issued);
        assert!(!token.is_expired(issued));
        assert!(!token.is_expired(token.expires_at));
        assert!(token.is_expired(token.expires_at.plus_days(1)));
    }
}
