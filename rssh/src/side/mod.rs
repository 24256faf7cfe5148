//! Session's [`Side`]s, either [`Client`] or [`Server`].

use futures::Future;
use futures_time::time::Duration;
use ssh_packet::{trans::KexInit, Id};

use crate::{
    stream::{Stream, TransportPair},
    Pipe, Result,
};

pub mod client;
use client::Client;

pub mod server;
use server::Server;

mod private {
    pub trait Sealed {}

    impl Sealed for super::Client {}
    impl Sealed for super::Server {}
}

/// A side of the SSH protocol, either [`Client`] or [`Server`].
pub trait Side: private::Sealed + Send + Sync + Unpin + 'static {
    /// Get the [`Id`] for this session.
    fn id(&self) -> &Id;

    /// Get the _timeout_ for sending and receiving packets on this session.
    fn timeout(&self) -> Duration;

    /// Get the interval at which to send a keep-alive `SSH_MSG_IGNORE`, if any.
    ///
    /// `None` (the default) disables the keep-alive mechanism entirely.
    fn keep_alive(&self) -> Option<Duration> {
        None
    }

    /// Generate a [`KexInit`] message from the config.
    fn kexinit(&self) -> KexInit<'static>;

    /// Exchange the keys from the config.
    fn exchange(
        &self,
        stream: &mut Stream<impl Pipe>,
        kexinit: &KexInit,
        peerkexinit: &KexInit,
        peer_id: &Id,
    ) -> impl Future<Output = Result<TransportPair>> + Send + Sync;

    /// Perform the key-exchange from this side.
    fn kex(
        &self,
        stream: &mut Stream<impl Pipe>,
        peer_id: &Id,
    ) -> impl Future<Output = Result<()>> + Send + Sync {
        async move {
            tracing::debug!("Starting key-exchange procedure");

            let kexinit = self.kexinit();
            stream.send(&kexinit).await?;

            let is_first_kex = stream.session_id().is_none();

            let peerkexinit = stream.recv().await?.to::<KexInit>()?;

            let transport = self
                .exchange(stream, &kexinit, &peerkexinit, peer_id)
                .await?;

            let strict = is_first_kex && crate::algorithm::kex::is_strict(&kexinit, &peerkexinit);

            stream.send(&ssh_packet::trans::NewKeys).await?;
            stream.recv().await?.to::<ssh_packet::trans::NewKeys>()?;

            tracing::debug!(
                "Key exchange success, negociated algorithms:\nrx: {:?}\ntx: {:?}",
                transport.rx,
                transport.tx,
            );

            stream.with_transport(transport, strict);

            Ok(())
        }
    }
}
