//! The _channel open requests_ received from the peer.

use rssh::{side::Side, Pipe};
use futures::SinkExt;
use ssh_packet::{connect, IntoPacket};

use super::Connect;
use crate::{
    channel::{Channel, LocalWindow},
    Result,
};

#[doc(no_inline)]
pub use connect::{ChannelOpenContext, ChannelOpenFailureReason};

/// A received _channel open request_.
pub struct ChannelOpen<'c, IO: Pipe, S: Side> {
    connect: &'c Connect<IO, S>,
    inner: connect::ChannelOpen,
}

impl<'c, IO: Pipe, S: Side> ChannelOpen<'c, IO, S> {
    pub(super) fn new(connect: &'c Connect<IO, S>, inner: connect::ChannelOpen) -> Self {
        Self { connect, inner }
    }

    /// Access the _context_ of the channel open request.
    pub fn cx(&self) -> &ChannelOpenContext {
        &self.inner.context
    }

    /// Accept the channel open request, yielding the new [`Channel`].
    pub async fn accept(self) -> Result<Channel<'c, IO, S>> {
        let local_id = self.connect.local_id();
        self.connect.channels.insert(local_id);

        self.connect
            .poller
            .lock()
            .await
            .send(
                connect::ChannelOpenConfirmation {
                    recipient_channel: self.inner.sender_channel,
                    sender_channel: local_id,
                    initial_window_size: LocalWindow::INITIAL_WINDOW_SIZE,
                    maximum_packet_size: LocalWindow::MAXIMUM_PACKET_SIZE,
                }
                .into_packet()
                .expect("Conversion to Packet shouldn't fail"),
            )
            .await?;

        tracing::debug!(
            "Accepted channel open from peer, {}:{}",
            local_id,
            self.inner.sender_channel
        );

        Ok(Channel::new(
            self.connect,
            local_id,
            self.inner.sender_channel,
            self.inner.initial_window_size,
            self.inner.maximum_packet_size,
        ))
    }

    /// Reject the channel open request with the provided `reason` and `message`.
    pub async fn reject(
        self,
        reason: ChannelOpenFailureReason,
        message: impl Into<String>,
    ) -> Result<()> {
        self.connect
            .poller
            .lock()
            .await
            .send(
                connect::ChannelOpenFailure {
                    recipient_channel: self.inner.sender_channel,
                    reason,
                    description: message.into().into(),
                    language: Default::default(),
                }
                .into_packet()
                .expect("Conversion to Packet shouldn't fail"),
            )
            .await?;

        Ok(())
    }
}
