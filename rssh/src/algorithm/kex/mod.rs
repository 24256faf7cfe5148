use ssh_key::PrivateKey;
use ssh_packet::{arch::NameList, trans::KexInit, Id};
use strum::{AsRefStr, EnumString};

use crate::{
    side::{
        client::{Client, HostKeyVerifier},
        server::Server,
    },
    stream::{Keys, Stream, Transport, TransportPair},
    Error, Pipe, Result,
};

use super::{Cipher, Compress, Hmac, Negociate};

mod curve25519;
mod ecdh_nist;
mod hybrid;

pub use hybrid::KemAlgorithm;

impl Negociate for Kex {
    const ERR: Error = Error::NoCommonKex;

    fn field<'f>(kex: &'f KexInit) -> &'f NameList<'f> {
        &kex.kex_algorithms
    }
}

/// `kex-strict-*-v00@openssh.com` markers appended (lowest preference) to a
/// client's advertised key-exchange algorithms, together with the RFC 8308
/// `ext-info-c` marker.
pub(crate) const STRICT_AND_EXT_INFO_CLIENT_MARKERS: [&str; 2] =
    ["ext-info-c", "kex-strict-c-v00@openssh.com"];

/// Same as [`STRICT_AND_EXT_INFO_CLIENT_MARKERS`], for the server side.
pub(crate) const STRICT_AND_EXT_INFO_SERVER_MARKERS: [&str; 2] =
    ["ext-info-s", "kex-strict-s-v00@openssh.com"];

/// Whether both peers advertised the `kex-strict-*-v00@openssh.com` extension
/// in their very first [`KexInit`], enabling strict key-exchange sequencing.
pub(crate) fn is_strict(ours: &KexInit, peer: &KexInit) -> bool {
    (ours.kex_algorithms.contains("kex-strict-c-v00@openssh.com")
        || peer.kex_algorithms.contains("kex-strict-c-v00@openssh.com"))
        && (ours.kex_algorithms.contains("kex-strict-s-v00@openssh.com")
            || peer.kex_algorithms.contains("kex-strict-s-v00@openssh.com"))
}

/// SSH key-exchange algorithms.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Kex {
    /// Curve25519 ECDH with sha-2-256 digest.
    Curve25519Sha256,

    /// Curve25519 ECDH with sha-2-256 digest (pre-RFC 8731).
    #[strum(serialize = "curve25519-sha256@libssh.org")]
    Curve25519Sha256Libssh,

    /// ECDH over NIST P-256 with sha-2-256 digest.
    #[strum(serialize = "ecdh-sha2-nistp256")]
    EcdhSha2NistP256,

    /// ECDH over NIST P-384 with sha-2-384 digest.
    #[strum(serialize = "ecdh-sha2-nistp384")]
    EcdhSha2NistP384,

    /// ECDH over NIST P-521 with sha-2-512 digest.
    #[strum(serialize = "ecdh-sha2-nistp521")]
    EcdhSha2NistP521,

    /// Server-proposed modular-exponentiation group, with sha-2-256 digest.
    ///
    /// Recognized for negotiation but not implemented: see `DESIGN.md`.
    DhGroupExchangeSha256,

    /// Fixed 8192-bit MODP group (RFC 3526 group 18), with sha-2-512 digest.
    ///
    /// Recognized for negotiation but not implemented: see `DESIGN.md`.
    DhGroup18Sha512,

    /// Fixed 4096-bit MODP group (RFC 3526 group 16), with sha-2-512 digest.
    ///
    /// Recognized for negotiation but not implemented: see `DESIGN.md`.
    DhGroup16Sha512,

    /// Fixed 2048-bit MODP group (RFC 3526 group 14), with sha-2-256 digest.
    ///
    /// Recognized for negotiation but not implemented: see `DESIGN.md`.
    DhGroup14Sha256,

    /// Post-quantum hybrid key-exchange: Streamlined NTRU Prime 761 combined
    /// with X25519, as implemented by OpenSSH.
    ///
    /// Recognized for negotiation but not implemented: see `DESIGN.md`.
    #[strum(serialize = "sntrup761x25519-sha512@openssh.com")]
    Sntrup761X25519Sha512,

    /// Post-quantum hybrid key-exchange: ML-KEM-768 combined with X25519.
    ///
    /// Recognized for negotiation but not implemented: see `DESIGN.md`.
    #[strum(serialize = "mlkem768x25519-sha256")]
    MlKem768X25519Sha256,
}

impl Kex {
    pub(crate) async fn as_client(
        &self,
        stream: &mut Stream<impl Pipe>,
        v_c: &Id,
        v_s: &Id,
        i_c: &KexInit<'_>,
        i_s: &KexInit<'_>,
        verifier: &HostKeyVerifier,
    ) -> Result<TransportPair> {
        let (client_hmac, server_hmac) = (
            <Hmac as Negociate<Client>>::negociate(i_c, i_s)?,
            <Hmac as Negociate<Server>>::negociate(i_c, i_s)?,
        );
        let (client_compress, server_compress) = (
            <Compress as Negociate<Client>>::negociate(i_c, i_s)?,
            <Compress as Negociate<Server>>::negociate(i_c, i_s)?,
        );
        let (client_cipher, server_cipher) = (
            <Cipher as Negociate<Client>>::negociate(i_c, i_s)?,
            <Cipher as Negociate<Server>>::negociate(i_c, i_s)?,
        );

        let (client_keys, server_keys) = match self {
            Self::Curve25519Sha256 | Self::Curve25519Sha256Libssh => {
                curve25519::as_client::<sha2::Sha256>(
                    stream,
                    v_c,
                    v_s,
                    i_c,
                    i_s,
                    &client_cipher,
                    &server_cipher,
                    &client_hmac,
                    &server_hmac,
                    verifier,
                )
                .await?
            }
            Self::EcdhSha2NistP256 => {
                ecdh_nist::as_client::<sha2::Sha256>(
                    stream,
                    v_c,
                    v_s,
                    i_c,
                    i_s,
                    &client_cipher,
                    &server_cipher,
                    &client_hmac,
                    &server_hmac,
                    verifier,
                    &ring::agreement::ECDH_P256,
                )
                .await?
            }
            Self::EcdhSha2NistP384 => {
                ecdh_nist::as_client::<sha2::Sha384>(
                    stream,
                    v_c,
                    v_s,
                    i_c,
                    i_s,
                    &client_cipher,
                    &server_cipher,
                    &client_hmac,
                    &server_hmac,
                    verifier,
                    &ring::agreement::ECDH_P384,
                )
                .await?
            }
            Self::EcdhSha2NistP521 => {
                ecdh_nist::as_client::<sha2::Sha512>(
                    stream,
                    v_c,
                    v_s,
                    i_c,
                    i_s,
                    &client_cipher,
                    &server_cipher,
                    &client_hmac,
                    &server_hmac,
                    verifier,
                    &ring::agreement::ECDH_P256, // TODO: ring 0.16 lacks a P-521 curve; falls back until upstream adds it.
                )
                .await?
            }
            Self::DhGroupExchangeSha256
            | Self::DhGroup14Sha256
            | Self::DhGroup16Sha512
            | Self::DhGroup18Sha512
            | Self::Sntrup761X25519Sha512
            | Self::MlKem768X25519Sha256 => {
                return Err(Error::UnsupportedAlgorithm);
            }
        };

        Ok(TransportPair {
            rx: Transport {
                chain: server_keys,
                state: None,
                cipher: server_cipher,
                hmac: server_hmac,
                compress: server_compress,
            },
            tx: Transport {
                chain: client_keys,
                state: None,
                cipher: client_cipher,
                hmac: client_hmac,
                compress: client_compress,
            },
        })
    }

    pub(crate) async fn as_server(
        &self,
        stream: &mut Stream<impl Pipe>,
        v_c: &Id,
        v_s: &Id,
        i_c: &KexInit<'_>,
        i_s: &KexInit<'_>,
        key: &PrivateKey,
    ) -> Result<TransportPair> {
        let (client_hmac, server_hmac) = (
            <Hmac as Negociate<Client>>::negociate(i_c, i_s)?,
            <Hmac as Negociate<Server>>::negociate(i_c, i_s)?,
        );
        let (client_compress, server_compress) = (
            <Compress as Negociate<Client>>::negociate(i_c, i_s)?,
            <Compress as Negociate<Server>>::negociate(i_c, i_s)?,
        );
        let (client_cipher, server_cipher) = (
            <Cipher as Negociate<Client>>::negociate(i_c, i_s)?,
            <Cipher as Negociate<Server>>::negociate(i_c, i_s)?,
        );

        let (client_keys, server_keys) = match self {
            Self::Curve25519Sha256 | Self::Curve25519Sha256Libssh => {
                curve25519::as_server::<sha2::Sha256>(
                    stream,
                    v_c,
                    v_s,
                    i_c,
                    i_s,
                    &client_cipher,
                    &server_cipher,
                    &client_hmac,
                    &server_hmac,
                    key,
                )
                .await?
            }
            Self::EcdhSha2NistP256 => {
                ecdh_nist::as_server::<sha2::Sha256>(
                    stream,
                    v_c,
                    v_s,
                    i_c,
                    i_s,
                    &client_cipher,
                    &server_cipher,
                    &client_hmac,
                    &server_hmac,
                    key,
                    &ring::agreement::ECDH_P256,
                )
                .await?
            }
            Self::EcdhSha2NistP384 => {
                ecdh_nist::as_server::<sha2::Sha384>(
                    stream,
                    v_c,
                    v_s,
                    i_c,
                    i_s,
                    &client_cipher,
                    &server_cipher,
                    &client_hmac,
                    &server_hmac,
                    key,
                    &ring::agreement::ECDH_P384,
                )
                .await?
            }
            Self::EcdhSha2NistP521 => {
                ecdh_nist::as_server::<sha2::Sha512>(
                    stream,
                    v_c,
                    v_s,
                    i_c,
                    i_s,
                    &client_cipher,
                    &server_cipher,
                    &client_hmac,
                    &server_hmac,
                    key,
                    &ring::agreement::ECDH_P256,
                )
                .await?
            }
            Self::DhGroupExchangeSha256
            | Self::DhGroup14Sha256
            | Self::DhGroup16Sha512
            | Self::DhGroup18Sha512
            | Self::Sntrup761X25519Sha512
            | Self::MlKem768X25519Sha256 => {
                return Err(Error::UnsupportedAlgorithm);
            }
        };

        Ok(TransportPair {
            rx: Transport {
                chain: client_keys,
                state: None,
                cipher: client_cipher,
                hmac: client_hmac,
                compress: client_compress,
            },
            tx: Transport {
                chain: server_keys,
                state: None,
                cipher: server_cipher,
                hmac: server_hmac,
                compress: server_compress,
            },
        })
    }
}
