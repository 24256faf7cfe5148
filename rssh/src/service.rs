//! Service handling and requesting facilities.
//!
//! A _service_ is something negotiated on top of the transport layer once
//! the key-exchange has completed, per the `SSH_MSG_SERVICE_REQUEST` /
//! `SSH_MSG_SERVICE_ACCEPT` dance (e.g. `ssh-userauth`, `ssh-connection`).
//! [`Session::handle`](crate::Session::handle) and
//! [`Session::request`](crate::Session::request) drive that dance and hand
//! the (now consumed) [`Session`](crate::Session) off to the service.

use futures::Future;
use ssh_packet::arch::Ascii;

use crate::{Pipe, Session, side::Side};

// TODO: (feature) Handle multiple services negotiated on the same session.

/// A _service handler_, accepting a service requested by the peer.
pub trait Handler {
    /// The errorneous outcome of the [`Handler`].
    type Err: From<crate::Error>;

    /// The successful outcome of the [`Handler`].
    type Ok<IO: Pipe, S: Side>;

    /// The handled service _identifier_.
    const SERVICE_NAME: Ascii<'static>;

    /// Called once the peer's `SSH_MSG_SERVICE_REQUEST` for
    /// [`Self::SERVICE_NAME`] has been accepted.
    fn on_request<IO, S>(
        &mut self,
        session: Session<IO, S>,
    ) -> impl Future<Output = Result<Self::Ok<IO, S>, Self::Err>>
    where
        IO: Pipe,
        S: Side;
}

/// A _service request_, asking the peer to accept a service.
pub trait Request {
    /// The errorneous outcome of the [`Request`].
    type Err: From<crate::Error>;

    /// The successful outcome of the [`Request`].
    type Ok<IO: Pipe, S: Side>;

    /// The requested service _identifier_.
    const SERVICE_NAME: Ascii<'static>;

    /// Called once the peer accepted our `SSH_MSG_SERVICE_REQUEST` for
    /// [`Self::SERVICE_NAME`].
    fn on_accept<IO, S>(
        &mut self,
        session: Session<IO, S>,
    ) -> impl Future<Output = Result<Self::Ok<IO, S>, Self::Err>>
    where
        IO: Pipe,
        S: Side;
}
