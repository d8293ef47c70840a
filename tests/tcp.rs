//! End-to-end coverage over real TCP sockets.

use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tether::{
    Client,
    ConnectionState,
    Payload,
    transport::TcpConnector,
};
use tether_testing::{EventLog, Recorded};
use tokio::{net::TcpListener, sync::oneshot, time::timeout};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

const LIMIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn reconnects_after_the_server_drops_the_link() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = format!("tcp://{}", listener.local_addr().expect("local addr"));
    let (done_tx, done_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("first accept");
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
        let hello = framed.next().await.expect("frame").expect("decode");
        assert_eq!(&hello[..], b"hello");
        framed
            .send(Bytes::from_static(b"welcome"))
            .await
            .expect("reply");
        drop(framed);

        let (stream, _) = listener.accept().await.expect("second accept");
        let _ = done_rx.await;
        drop(stream);
    });

    let client = Client::builder(address)
        .max_attempts(3)
        .reconnect_delay(Duration::from_millis(20))
        .heartbeat_interval(Duration::ZERO)
        .build(TcpConnector::new());
    let log = EventLog::attach(&client);
    let sender = client.downgrade();
    client.once::<tether::events::Open>(move |()| sender.send("hello"));
    client.connect();

    timeout(LIMIT, async {
        while log.opens() < 2 {
            client.wait_for_state(|state| state != ConnectionState::Open).await;
            client.wait_for_state(|state| state == ConnectionState::Open).await;
        }
    })
    .await
    .expect("client should reopen the link");

    assert!(log.entries().contains(&Recorded::Message(Payload::Binary(
        Bytes::from_static(b"welcome")
    ))));
    assert_eq!(log.closes(), 1);
    assert_eq!(client.attempts(), 0);

    client.close();
    client
        .wait_for_state(|state| state == ConnectionState::Closed)
        .await;
    let _ = done_tx.send(());
    server.await.expect("server task");
}

#[tokio::test]
async fn unreachable_server_exhausts_attempts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = format!("tcp://{}", listener.local_addr().expect("local addr"));
    drop(listener);

    let client = Client::builder(address)
        .max_attempts(2)
        .reconnect_delay(Duration::from_millis(10))
        .build(TcpConnector::new());
    let log = EventLog::attach(&client);
    client.connect();

    let state = timeout(
        LIMIT,
        client.wait_for_state(|state| state == ConnectionState::Failed),
    )
    .await
    .expect("client should give up");

    assert_eq!(state, Some(ConnectionState::Failed));
    assert_eq!(log.closes(), 2);
    assert_eq!(log.opens(), 0);
}
