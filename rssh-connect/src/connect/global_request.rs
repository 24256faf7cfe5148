//! The _global requests_ received from the peer.

use rssh::{side::Side, Pipe};
use futures::SinkExt;
use ssh_packet::{connect, IntoPacket};

use super::Connect;
use crate::Result;

#[doc(no_inline)]
pub use connect::GlobalRequestContext;

/// A received _global request_.
pub struct GlobalRequest<'c, IO: Pipe, S: Side> {
    connect: &'c Connect<IO, S>,
    inner: connect::GlobalRequest,
}

impl<'c, IO: Pipe, S: Side> GlobalRequest<'c, IO, S> {
    pub(super) fn new(connect: &'c Connect<IO, S>, inner: connect::GlobalRequest) -> Self {
        Self { connect, inner }
    }

    /// Access the _context_ of the global request.
    pub fn cx(&self) -> &GlobalRequestContext {
        &self.inner.context
    }

    /// Accept the global request, binding `bound_port` if the request was a
    /// `tcpip-forward` with a server-chosen port (`bind_port == 0`).
    pub async fn accept(self, bound_port: Option<u32>) -> Result<()> {
        if *self.inner.want_reply {
            let with_port = matches!(
                self.inner.context,
                GlobalRequestContext::TcpipForward { bind_port, .. } if bind_port == 0
            );

            let packet = if with_port {
                connect::ForwardingSuccess {
                    bound_port: bound_port.unwrap_or_default(),
                }
                .into_packet()
            } else {
                connect::RequestSuccess.into_packet()
            }
            .expect("Conversion to Packet shouldn't fail");

            self.connect.poller.lock().await.send(packet).await?;
        }

        Ok(())
    }

    /// Reject the global request.
    pub async fn reject(self) -> Result<()> {
        if *self.inner.want_reply {
            self.connect
                .poller
                .lock()
                .await
                .send(
                    connect::RequestFailure
                        .into_packet()
                        .expect("Conversion to Packet shouldn't fail"),
                )
                .await?;
        }

        Ok(())
    }
}
