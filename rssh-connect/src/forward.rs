//! Port forwarding built on top of the `direct-tcpip`/`tcpip-forward`
//! messages exposed by the [`Connect`] layer.
//!
//! This module stays transport-agnostic: it pipes any `AsyncRead + AsyncWrite`
//! socket the caller hands it, rather than owning a TCP listener itself.

use futures::{AsyncRead, AsyncReadExt, AsyncWrite};
use rssh::{side::Side, Pipe};
use ssh_packet::{arch::Ascii, connect};

use crate::{channel::Channel, connect::Connect, Result};

/// Open a `direct-tcpip` channel (local forwarding) and pipe `socket` to it
/// bidirectionally until either side reaches EOF.
///
/// `host`/`port` is the destination the peer should connect to on our
/// behalf; `originator_address`/`originator_port` describe the end of
/// `socket` we accepted the connection from.
pub async fn local<IO, S, Socket>(
    connect: &Connect<IO, S>,
    socket: Socket,
    host: impl Into<Ascii<'static>>,
    port: u32,
    originator_address: impl Into<Ascii<'static>>,
    originator_port: u32,
) -> Result<()>
where
    IO: Pipe,
    S: Side,
    Socket: AsyncRead + AsyncWrite + Unpin,
{
    let channel = connect
        .channel_open(connect::ChannelOpenContext::DirectTcpip {
            address: host.into(),
            port,
            originator_address: originator_address.into(),
            originator_port,
        })
        .await?;

    pipe(socket, &channel).await
}

/// Ask the peer to forward connections made to `bind_address`:`bind_port`
/// back to us (`tcpip-forward`), returning the bound port (useful when
/// `bind_port == 0` was requested and the peer chose one).
pub async fn listen<IO, S>(
    connect: &Connect<IO, S>,
    bind_address: impl Into<Vec<u8>>,
    bind_port: u32,
) -> Result<u32>
where
    IO: Pipe,
    S: Side,
{
    let bound = connect
        .global_request(connect::GlobalRequestContext::TcpipForward {
            bind_address: bind_address.into().into(),
            bind_port,
        })
        .await?;

    Ok(bound.unwrap_or(bind_port))
}

/// Cancel a previously-requested `tcpip-forward`.
pub async fn unlisten<IO, S>(
    connect: &Connect<IO, S>,
    bind_address: impl Into<Vec<u8>>,
    bind_port: u32,
) -> Result<()>
where
    IO: Pipe,
    S: Side,
{
    connect
        .global_request(connect::GlobalRequestContext::CancelTcpipForward {
            bind_address: bind_address.into().into(),
            bind_port,
        })
        .await?;

    Ok(())
}

/// Pipe an accepted channel (typically a `forwarded-tcpip` one, handed to us
/// through [`Connect::channel_opens`](crate::connect::Connect::channel_opens))
/// and a local socket bidirectionally, until either side reaches EOF.
pub async fn pipe<IO, S, Socket>(mut socket: Socket, channel: &Channel<'_, IO, S>) -> Result<()>
where
    IO: Pipe,
    S: Side,
    Socket: AsyncRead + AsyncWrite + Unpin,
{
    let (mut socket_r, mut socket_w) = socket.split();
    let mut channel_r = channel.as_reader();
    let mut channel_w = channel.as_writer();

    futures::future::try_join(
        futures::io::copy(&mut socket_r, &mut channel_w),
        futures::io::copy(&mut channel_r, &mut socket_w),
    )
    .await?;

    channel.eof().await
}
