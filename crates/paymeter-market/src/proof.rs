//! Consumption-proof authentication.
//!
//! A proof is a host-signed assertion of *cumulative* consumption. The
//! digest is recomputed here from the session's own fields — the submitter
//! supplies only the claim, the content reference, and the signature — so
//! a signature can never be replayed against another session, another
//! host, or another unit count.
//!
//! Verification is deliberately optimistic: it authenticates **who** is
//! claiming work, not that the work was performed correctly. Correctness
//! is enforced out-of-band via host staking and off-chain audit of the
//! referenced content.

use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};

use paymeter_types::constants::PROOF_DOMAIN;
use paymeter_types::{Address, MarketError, Result, SessionId};

/// Canonical digest a consumption proof must be signed over.
///
/// Format: `SHA-256(PROOF_DOMAIN || session_id(16) || host(32) ||
/// claimed_units(8, LE) || content_ref(utf8))`.
#[must_use]
pub fn proof_digest(
    session: SessionId,
    host: &Address,
    claimed_units: u64,
    content_ref: &str,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PROOF_DOMAIN);
    hasher.update(session.0.as_bytes());
    hasher.update(host.as_bytes());
    hasher.update(claimed_units.to_le_bytes());
    hasher.update(content_ref.as_bytes());
    hasher.finalize().into()
}

/// Verify an ed25519 signature over `digest` against the session's
/// registered host key.
///
/// # Errors
/// - `MalformedSignature` if the bytes are not a 64-byte signature
/// - `HostSignatureMismatch` if the host address is not a valid ed25519
///   key or the signature does not verify against it
pub fn verify_host_signature(
    session: SessionId,
    host: &Address,
    digest: &[u8; 32],
    signature: &[u8],
) -> Result<()> {
    let sig_bytes: &[u8; 64] =
        signature
            .try_into()
            .map_err(|_| MarketError::MalformedSignature {
                reason: format!("expected 64 bytes, got {}", signature.len()),
            })?;
    let signature = Signature::from_bytes(sig_bytes);
    let key = VerifyingKey::from_bytes(host.as_bytes())
        .map_err(|_| MarketError::HostSignatureMismatch { session })?;
    key.verify_strict(digest, &signature)
        .map_err(|_| MarketError::HostSignatureMismatch { session })
}
