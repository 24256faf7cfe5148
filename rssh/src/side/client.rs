//! Client-[`Side`] implementation of the _session_.

use std::{future::Future, pin::Pin, time::Duration};

use futures_time::time::Duration as Timeout;
use rand::RngCore;
use ssh_key::PublicKey;
use ssh_packet::{arch::NameList, trans::KexInit};

use super::Side;
use crate::{
    algorithm::{Cipher, Compress, Hmac, Kex, Key, Negociate},
    stream::{Stream, TransportPair},
    Error, Pipe, Result,
};

#[doc(no_inline)]
pub use ssh_packet::Id;

/// The outcome of [`Client::host_key_verifier`]'s verification hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyVerdict {
    /// The host key is accepted, the key-exchange may proceed.
    Accept,

    /// The host key is rejected, the key-exchange is aborted.
    Reject,
}

/// A caller-supplied async hook verifying the server's host key, invoked
/// once per key-exchange, before the exchange hash signature is checked.
///
/// Defaults to accepting any key (equivalent to a bare `TOFU`-less client);
/// callers wanting `known_hosts`-style pinning should supply their own.
pub type HostKeyVerifier =
    Box<dyn Fn(&PublicKey) -> Pin<Box<dyn Future<Output = HostKeyVerdict> + Send>> + Send + Sync>;

fn accept_any_host_key(_: &PublicKey) -> Pin<Box<dyn Future<Output = HostKeyVerdict> + Send>> {
    Box::pin(async { HostKeyVerdict::Accept })
}

/// A _client_-side session configuration.
pub struct Client {
    /// [`Id`] for this _client_ session.
    pub id: Id,

    /// Timeout for sending and receiving packets.
    pub timeout: Duration,

    /// Interval at which to send a keep-alive `SSH_MSG_IGNORE`, disabled by default.
    pub keep_alive_interval: Option<Duration>,

    /// The algorithms enabled for this _client_ session.
    pub algorithms: Algorithms,

    /// Hook called to verify the server's host key before trusting it.
    pub host_key_verifier: HostKeyVerifier,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .field("keep_alive_interval", &self.keep_alive_interval)
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self {
            id: Id::v2(
                concat!(
                    env!("CARGO_PKG_NAME"),
                    "@client:",
                    env!("CARGO_PKG_VERSION")
                ),
                None::<&str>,
            ),
            timeout: Duration::from_secs(120),
            keep_alive_interval: None,
            algorithms: Default::default(),
            host_key_verifier: Box::new(accept_any_host_key),
        }
    }
}

/// Algorithms for a _client_-side session.
#[derive(Debug, Clone)]
pub struct Algorithms {
    /// Enabled algorithms for _key-exchange_, in preference order.
    pub kexs: Vec<Kex>,

    /// Enabled algorithms for _server key signature_, in preference order.
    pub keys: Vec<Key>,

    /// Enabled algorithms for _encryption & decryption_, in preference order.
    pub ciphers: Vec<Cipher>,

    /// Enabled algorithms for _hmac_, in preference order.
    pub macs: Vec<Hmac>,

    /// Enabled algorithms for _compression_, in preference order.
    pub compressions: Vec<Compress>,
}

impl Default for Algorithms {
    fn default() -> Self {
        let super::server::Algorithms {
            kexs,
            ciphers,
            macs,
            compressions,
        } = Default::default();

        Self {
            kexs,
            keys: vec![
                Key::Ed25519,
                Key::Ecdsa {
                    curve: ssh_key::EcdsaCurve::NistP384,
                },
                Key::Ecdsa {
                    curve: ssh_key::EcdsaCurve::NistP256,
                },
                Key::Rsa {
                    hash: Some(ssh_key::HashAlg::Sha512),
                },
                Key::Rsa {
                    hash: Some(ssh_key::HashAlg::Sha256),
                },
                Key::Rsa { hash: None },
                Key::Dsa,
            ],
            ciphers,
            macs,
            compressions,
        }
    }
}

impl Side for Client {
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
                    .chain(crate::algorithm::kex::STRICT_AND_EXT_INFO_CLIENT_MARKERS),
            ),
            server_host_key_algorithms: NameList::from_iter(&self.algorithms.keys),
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
            languages_client_to_server: Default::default(),
            languages_server_to_client: Default::default(),
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
        Kex::negociate(kexinit, peerkexinit)?
            .as_client(
                stream,
                self.id(),
                peer_id,
                kexinit,
                peerkexinit,
                &self.host_key_verifier,
            )
            .await
    }
}

pub(crate) async fn verify(
    verifier: &HostKeyVerifier,
    key: &PublicKey,
) -> Result<()> {
    match verifier(key).await {
        HostKeyVerdict::Accept => Ok(()),
        HostKeyVerdict::Reject => Err(Error::HostKeyRejected),
    }
}
