//! Server-[`Side`] implementation of the _session_.
//!
//! Kept for symmetry with [`super::client::Client`] and to drive the
//! in-memory loopback test harness; this crate does not expose a
//! first-class server product.

use std::time::Duration;

use futures_time::time::Duration as Timeout;
use rand::RngCore;
use ssh_key::Algorithm;
use ssh_packet::{arch::NameList, trans::KexInit};

use super::Side;
use crate::{
    algorithm::{Cipher, Compress, Hmac, Kex, Negociate},
    stream::{Stream, TransportPair},
    Pipe, Result,
};

#[doc(no_inline)]
pub use ssh_key::PrivateKey;
#[doc(no_inline)]
pub use ssh_packet::Id;

/// A _server_-side session configuration.
#[derive(Debug, Clone)]
pub struct Server {
    /// [`Id`] for this _server_ session.
    pub id: Id,

    /// Timeout for sending and receiving packets.
    pub timeout: Duration,

    /// Interval at which to send a keep-alive `SSH_MSG_IGNORE`, disabled by default.
    pub keep_alive_interval: Option<Duration>,

    /// Server keys for key-exchange signature.
    pub keys: Vec<PrivateKey>,

    /// The algorithms enabled for this _server_ session.
    pub algorithms: Algorithms,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            id: Id::v2(
                concat!(
                    env!("CARGO_PKG_NAME"),
                    "@server:",
                    env!("CARGO_PKG_VERSION")
                ),
                None::<&str>,
            ),
            timeout: Duration::from_secs(120),
            keep_alive_interval: None,
            keys: Default::default(),
            algorithms: Default::default(),
        }
    }
}

/// Algorithms for a _server_-side session.
#[derive(Debug, Clone)]
pub struct Algorithms {
    /// Enabled algorithms for _key-exchange_, in preference order.
    pub kexs: Vec<Kex>,

    /// Enabled algorithms for _encryption & decryption_, in preference order.
    pub ciphers: Vec<Cipher>,

    /// Enabled algorithms for _hmac_, in preference order.
    pub macs: Vec<Hmac>,

    /// Enabled algorithms for _compression_, in preference order.
    pub compressions: Vec<Compress>,
}

impl Default for Algorithms {
    fn default() -> Self {
        Self {
            kexs: vec![
                Kex::Curve25519Sha256,
                Kex::Curve25519Sha256Libssh,
                Kex::EcdhSha2NistP256,
                Kex::EcdhSha2NistP384,
                Kex::EcdhSha2NistP521,
            ],
            ciphers: vec![
                Cipher::Chacha20Poly1305,
                Cipher::Aes256Gcm,
                Cipher::Aes128Gcm,
                Cipher::Aes256Ctr,
                Cipher::Aes192Ctr,
                Cipher::Aes128Ctr,
                Cipher::Aes256Cbc,
                Cipher::Aes192Cbc,
                Cipher::Aes128Cbc,
                Cipher::TDesCbc,
            ],
            macs: vec![
                Hmac::HmacSha512ETM,
                Hmac::HmacSha256ETM,
                Hmac::HmacSha512,
                Hmac::HmacSha256,
                Hmac::HmacSha1ETM,
                Hmac::HmacSha1,
                Hmac::HmacMd5ETM,
                Hmac::HmacMd5,
            ],
            compressions: vec![Compress::ZlibOpenssh, Compress::Zlib, Compress::None],
        }
    }
}

impl Side for Server {
    fn id(&self) -> &Id {
        &self.id
    }

    fn timeout(&self) -> Timeout {
        self.timeout.into()
    }

    fn keep_alive(&self) -> Option<Timeout> {
        self.keep_alive_interval.map(Into::into)
    }

    fn kexinit(&self) -> KexInit<'static> {
        let mut cookie = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut cookie);

        KexInit {
            cookie,
            kex_algorithms: NameList::from_iter(
                self.algorithms
                    .kexs
                    .iter()
                    .map(Kex::as_ref)
                    .chain(crate::algorithm::kex::STRICT_AND_EXT_INFO_SERVER_MARKERS),
            ),
            server_host_key_algorithms: NameList::from_iter(
                self.keys.iter().map(PrivateKey::algorithm),
            ),
            encryption_algorithms_client_to_server: NameList::from_iter(&self.algorithms.ciphers),
            encryption_algorithms_server_to_client: NameList::from_iter(&self.algorithms.ciphers),
            mac_algorithms_client_to_server: NameList::from_iter(&self.algorithms.macs),
            mac_algorithms_server_to_client: NameList::from_iter(&self.algorithms.macs),
            compression_algorithms_client_to_server: NameList::from_iter(
                &self.algorithms.compressions,
            ),
            compression_algorithms_server_to_client: NameList::from_iter(
                &self.algorithms.compressions,
            ),
            languages_client_to_server: NameList::default(),
            languages_server_to_client: NameList::default(),
            first_kex_packet_follows: false.into(),
        }
    }

    async fn exchange(
        &self,
        stream: &mut Stream<impl Pipe>,
        kexinit: &KexInit<'_>,
        peerkexinit: &KexInit<'_>,
        peer_id: &Id,
    ) -> Result<TransportPair> {
        let alg = Algorithm::negociate(peerkexinit, kexinit)?;
        let key = self
            .keys
            .iter()
            .find(|key| key.algorithm() == alg)
            .expect("our KexInit advertised an algorithm none of our keys implement");

        Kex::negociate(peerkexinit, kexinit)?
            .as_server(stream, peer_id, self.id(), peerkexinit, kexinit, key)
            .await
    }
}
