//! Collection of error handling types and aliases.

use ssh_packet::trans::DisconnectReason;
use thiserror::Error;

/// The disconnection side for [`DisconnectedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectedBy {
    /// The session has been disconnected by _us_.
    Us,

    /// The session has been disconnected by _them_.
    Them,
}

/// The error type describing a disconnection, carrying the reason and
/// description the peer (or we) sent along with it.
#[must_use]
#[derive(Debug, Error, Clone)]
#[error("the session has been disconnected by {by:?} for {reason:?}: {description}")]
pub struct DisconnectedError {
    /// Side that sent the disconnect message.
    pub by: DisconnectedBy,

    /// Reason for disconnect.
    pub reason: DisconnectReason,

    /// Description of the disconnect reason.
    pub description: String,
}

/// The error types that can occur when manipulating this crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Identifier parsing error.
    #[error(transparent)]
    Id(#[from] ssh_packet::Error),

    /// I/O error, including connection refused/reset and timeouts surfaced
    /// by the underlying transport.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Binary (de)serialization error — a malformed packet on the wire.
    #[error(transparent)]
    Binary(#[from] ssh_packet::binrw::Error),

    /// SSH key error (parsing, signing or verification).
    #[error(transparent)]
    Key(#[from] ssh_key::Error),

    /// Packet integrity error: MAC or AEAD tag mismatch. Fatal, triggers a
    /// `DISCONNECT` with reason `MacError`(5).
    #[error(transparent)]
    Integrity(#[from] digest::MacError),

    /// Signature error during the key-exchange (bad host-key signature).
    #[error(transparent)]
    Signature(#[from] signature::Error),

    /// No common kex algorithm found between both sides.
    #[error("unable to negotiate a common key-exchange algorithm")]
    NoCommonKex,

    /// No common host-key algorithm found between both sides.
    #[error("unable to negotiate a common host-key algorithm")]
    NoCommonKey,

    /// No common cipher algorithm found between both sides.
    #[error("unable to negotiate a common encryption algorithm")]
    NoCommonCipher,

    /// No common hmac algorithm found between both sides.
    #[error("unable to negotiate a common HMAC algorithm")]
    NoCommonHmac,

    /// No common compression algorithm found between both sides.
    #[error("unable to negotiate a common compression algorithm")]
    NoCommonCompression,

    /// An algorithm name was negotiated but isn't implemented by this crate.
    #[error("negotiated algorithm is not supported by this implementation")]
    UnsupportedAlgorithm,

    /// Protocol error in the key-exchange (bad transcript, bad group, etc).
    #[error("error in the key-exchange algorithm")]
    KexError,

    /// The host-key was rejected by the caller-supplied verifier.
    #[error("host key was rejected by the verification hook")]
    HostKeyRejected,

    /// A peer violated the `kex-strict-*-v00@openssh.com` extension by
    /// sending a non-KEX message during key exchange.
    #[error("peer violated the strict key-exchange extension")]
    StrictKexViolation,

    /// Error while encrypting or decrypting messages.
    #[error("the cipher ended up in an error")]
    Cipher,

    /// The message received was unexpected in the current context.
    #[error("peer sent a message that made no sense in the current context")]
    UnexpectedMessage,

    /// An operation was cancelled before completion.
    #[error("operation was cancelled")]
    Cancelled,

    /// An operation did not complete before its deadline.
    #[error("operation timed out")]
    Timeout,

    /// An operation was attempted before the session finished connecting.
    #[error("not connected")]
    NotConnected,

    /// The session has been disconnected, either by us or by the peer.
    #[error(transparent)]
    Disconnected(#[from] DisconnectedError),
}

impl From<futures_time::task::Timeout<Error>> for Error {
    fn from(_: futures_time::task::Timeout<Error>) -> Self {
        Self::Timeout
    }
}

/// A handy [`std::result::Result`] type alias bounding the [`enum@Error`] struct as `E`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
