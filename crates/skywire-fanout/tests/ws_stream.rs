//! End-to-end tests for the `WebSocket` delta stream.
//!
//! A real server is bound to an ephemeral port and clients connect with
//! `tokio-tungstenite`.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt as _, StreamExt as _};
use skywire_broker::BrokerMessage;
use skywire_core::Channel;
use skywire_fanout::compress::gunzip;
use skywire_fanout::{AppState, relay_message, serve};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start(buffer: usize) -> (Arc<AppState>, SocketAddr) {
    let state = Arc::new(AppState::new(buffer));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, Arc::clone(&state), std::future::pending()));
    (state, addr)
}

async fn connect(state: &AppState, addr: SocketAddr) -> Client {
    let expected = state.registry.len().await.saturating_add(1);
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    timeout(WAIT, async {
        while state.registry.len().await < expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    client
}

async fn next_binary(client: &mut Client) -> Vec<u8> {
    loop {
        let message = timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
        if let Message::Binary(frame) = message {
            return gunzip(&frame).unwrap();
        }
    }
}

fn delta(payload: &'static str) -> BrokerMessage {
    BrokerMessage {
        channel: Channel::Delta,
        payload: Bytes::from_static(payload.as_bytes()),
    }
}

#[tokio::test]
async fn every_socket_receives_each_delta() {
    let (state, addr) = start(8).await;
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(connect(&state, addr).await);
    }

    relay_message(&state, &delta(r#"{"seq":1}"#)).await.unwrap();
    relay_message(&state, &delta(r#"{"seq":2}"#)).await.unwrap();

    for client in &mut clients {
        assert_eq!(next_binary(client).await, br#"{"seq":1}"#.to_vec());
        assert_eq!(next_binary(client).await, br#"{"seq":2}"#.to_vec());
    }
}

#[tokio::test]
async fn heartbeats_are_ignored_and_pings_answered() {
    let (state, addr) = start(8).await;
    let mut client = connect(&state, addr).await;

    client.send(Message::Text("heartbeat".into())).await.unwrap();
    client.send(Message::Ping(Bytes::from_static(b"p"))).await.unwrap();

    let pong = timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(pong, Message::Pong(Bytes::from_static(b"p")));

    relay_message(&state, &delta(r#"{"seq":1}"#)).await.unwrap();
    assert_eq!(next_binary(&mut client).await, br#"{"seq":1}"#.to_vec());
    assert_eq!(state.registry.len().await, 1);
}

#[tokio::test]
async fn closed_socket_leaves_registry() {
    let (state, addr) = start(8).await;
    let mut client = connect(&state, addr).await;
    let mut survivor = connect(&state, addr).await;

    client.close(None).await.unwrap();
    timeout(WAIT, async {
        while state.registry.len().await > 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    relay_message(&state, &delta("[]")).await.unwrap();
    assert_eq!(next_binary(&mut survivor).await, b"[]".to_vec());
}
