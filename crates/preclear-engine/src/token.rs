//! # Token Issuer
//!
//! Mints pre-clearance tokens once a shipment holds both approvals.
//!
//! ## Generation Scheme
//!
//! 16 bytes from the OS CSPRNG, hashed with SHA-256, the first 12 digest
//! bytes encoded in an unambiguous uppercase base-32 alphabet and
//! prefixed `PC-`. The issuer keeps a registry of every value it has
//! handed out and regenerates on collision, so uniqueness within the
//! issuer is a checked guarantee rather than a probabilistic one.
//!
//! ## Idempotency
//!
//! Issuing against a shipment that already carries a token returns that
//! token reconstructed from the stored value and issuance time — a
//! second token is never minted for the same shipment.

use std::collections::HashSet;

use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use preclear_core::{Timestamp, Token};
use preclear_state::{AiApproval, BrokerApproval, Shipment, StateConflictError};

/// Prefix of every pre-clearance token value.
pub const TOKEN_PREFIX: &str = "PC-";

/// Number of encoded characters after the prefix.
pub const TOKEN_SUFFIX_LEN: usize = 12;

/// Crockford-style base-32: no `I`, `L`, `O`, `U`.
const TOKEN_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Mints unique pre-clearance tokens.
#[derive(Debug, Default)]
pub struct TokenIssuer {
    issued: Mutex<HashSet<String>>,
}

impl TokenIssuer {
    /// Create an issuer with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a dual-approved shipment.
    ///
    /// Idempotent: if the shipment already carries a token, that token is
    /// returned unchanged. Issuing without dual approval is a
    /// [`StateConflictError::DualApprovalGate`].
    pub fn issue(&self, shipment: &Shipment) -> Result<Token, StateConflictError> {
        if let (Some(value), Some(issued_at)) = (&shipment.token, shipment.token_generated_at) {
            return Ok(Token::new(value.clone(), issued_at));
        }

        if shipment.ai_approval != AiApproval::Approved
            || shipment.broker_approval != BrokerApproval::Approved
        {
            return Err(StateConflictError::DualApprovalGate {
                ai_approval: shipment.ai_approval.to_string(),
                broker_approval: shipment.broker_approval.to_string(),
            });
        }

        Ok(Token::new(self.mint(), Timestamp::now()))
    }

    /// Pre-register token values issued in earlier process lifetimes so
    /// the collision check covers them too.
    pub fn register_existing<I: IntoIterator<Item = String>>(&self, values: I) {
        self.issued.lock().extend(values);
    }

    /// Draw entropy and encode until a value not seen before appears.
    fn mint(&self) -> String {
        loop {
            let mut entropy = [0u8; 16];
            OsRng.fill_bytes(&mut entropy);
            let digest = Sha256::digest(entropy);

            let suffix: String = digest
                .iter()
                .take(TOKEN_SUFFIX_LEN)
                .map(|byte| TOKEN_ALPHABET[(byte % 32) as usize] as char)
                .collect();
            let value = format!("{TOKEN_PREFIX}{suffix}");

            if self.issued.lock().insert(value.clone()) {
                return value;
            }
        }
    }
}
