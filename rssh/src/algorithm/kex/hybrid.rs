//! Post-quantum/classical hybrid key-exchange (`sntrup761x25519-sha512@openssh.com`,
//! `mlkem768x25519-sha256`).
//!
//! OpenSSH drives these with a two-message `SSH_MSG_KEX_HYBRID_INIT`/`_REPLY`
//! exchange carrying `S_CT2 || S_PK1` payloads, distinct from the
//! `SSH_MSG_KEX_ECDH_*` pair this crate's wire layer implements. No example
//! in the corpus this crate is grounded on exercises that message pair, and
//! no KEM primitive ships with this crate either, so the hybrid algorithms
//! are recognized for negotiation (`Kex::Sntrup761X25519Sha512`,
//! `Kex::MlKem768X25519Sha256`) but not wired to a concrete exchange; see
//! `DESIGN.md`.
//!
//! [`KemAlgorithm`] documents the shape a concrete backend would need if the
//! wire support above were added: a KEM paired with an X25519 fallback,
//! matching OpenSSH's construction.

use crate::Result;

/// A post-quantum key-encapsulation mechanism paired with an elliptic-curve
/// Diffie-Hellman as a classical fallback, matching the shape OpenSSH uses
/// for its hybrid key-exchange algorithms.
pub trait KemAlgorithm: Send + Sync {
    /// Opaque decapsulation secret kept across the two messages.
    type DecapsulationKey: Send + Sync;

    /// Initiator's ephemeral keypair: `(encapsulation key, decapsulation key)`.
    fn generate_keypair() -> (Vec<u8>, Self::DecapsulationKey)
    where
        Self: Sized;

    /// Encapsulate against the peer's encapsulation key, returning
    /// `(ciphertext, shared secret)`.
    fn encapsulate(encapsulation_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Decapsulate a ciphertext with our own decapsulation key.
    fn decapsulate(
        decapsulation_key: &Self::DecapsulationKey,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;
}
