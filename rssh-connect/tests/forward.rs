use rssh::{
    algorithm::Key,
    side::{
        client::Client,
        server::{PrivateKey, Server},
    },
    Result,
};
use rssh_connect::{channel::request, connect::ChannelOpenContext, forward};

use async_compat::{Compat, CompatExt};
use futures::{AsyncReadExt, AsyncWriteExt, TryStreamExt};
use tokio::io::{BufStream, DuplexStream};

type IO = Compat<BufStream<DuplexStream>>;

#[tokio::test]
async fn channel_request_builders() -> Result<(), eyre::Error> {
    let duplex = tokio::io::duplex(ssh_packet::PACKET_MAX_SIZE * 16);
    let keys = vec![PrivateKey::random(&mut rand::thread_rng(), Key::Ed25519)?];

    tokio::try_join!(
        async {
            let server = Server {
                keys,
                ..Default::default()
            };
            let server = rssh::Session::new(BufStream::new(duplex.0).compat(), server).await?;

            let connect = server.handle(rssh_connect::Service).await?;
            let channel = connect
                .channel_opens()
                .try_next()
                .await?
                .expect("Disconnected before opening at least one channel")
                .accept()
                .await?;

            let req = channel
                .requests()
                .try_next()
                .await?
                .expect("Disconnected before sending a channel request");

            assert!(matches!(
                req.cx(),
                rssh_connect::channel::ChannelRequestContext::Shell
            ));
            req.accept().await?;

            Ok(())
        },
        async {
            let client = Client::default();
            let client: rssh::Session<IO, Client> =
                rssh::Session::new(BufStream::new(duplex.1).compat(), client).await?;

            let connect = client.request(rssh_connect::Service).await?;
            let channel = connect.channel_open(ChannelOpenContext::Session).await?;

            let response = channel.shell().await?;
            assert_eq!(response, request::Response::Success);

            Ok(())
        },
    )?;

    Ok(())
}

#[tokio::test]
async fn direct_tcpip_forward() -> Result<(), eyre::Error> {
    let duplex = tokio::io::duplex(ssh_packet::PACKET_MAX_SIZE * 16);
    let keys = vec![PrivateKey::random(&mut rand::thread_rng(), Key::Ed25519)?];

    // Stands in for the TCP connection a caller would've accepted locally.
    let (local_ours, local_theirs) = tokio::io::duplex(8192);

    tokio::try_join!(
        async {
            let server = Server {
                keys,
                ..Default::default()
            };
            let server = rssh::Session::new(BufStream::new(duplex.0).compat(), server).await?;

            let connect = server.handle(rssh_connect::Service).await?;
            let open = connect
                .channel_opens()
                .try_next()
                .await?
                .expect("Disconnected before opening at least one channel");

            assert!(matches!(
                open.cx(),
                ChannelOpenContext::DirectTcpip { port: 2222, .. }
            ));

            let channel = open.accept().await?;

            // Echo whatever the forwarded connection sends back to it.
            let mut buf = [0u8; 5];
            channel.as_reader().read_exact(&mut buf).await?;
            channel.as_writer().write_all(&buf).await?;
            channel.as_writer().flush().await?;
            channel.eof().await?;

            Ok(())
        },
        async {
            let client = Client::default();
            let client: rssh::Session<IO, Client> =
                rssh::Session::new(BufStream::new(duplex.1).compat(), client).await?;

            let connect = client.request(rssh_connect::Service).await?;

            let mut ours = local_ours.compat();
            ours.write_all(b"hello").await?;
            // Half-close: lets the forwarded copy's read direction reach EOF.
            ours.close().await?;

            forward::local(
                &connect,
                local_theirs.compat(),
                "example.org",
                2222,
                "127.0.0.1",
                4444,
            )
            .await?;

            let mut echoed = [0u8; 5];
            ours.read_exact(&mut echoed).await?;
            assert_eq!(&echoed, b"hello");

            Ok(())
        },
    )?;

    Ok(())
}
