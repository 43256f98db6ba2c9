//! Axum WebSocket halves as hub transports.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use herald_core::TransportError;
use herald_hub::{FrameSink, FrameSource, Inbound, Payload};

/// Write half of an upgraded socket. Each payload becomes one text frame.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

/// Read half of an upgraded socket.
pub struct WsSource {
    inner: SplitStream<WebSocket>,
}

/// Split an upgraded socket into hub transport halves.
pub fn split(socket: WebSocket) -> (WsSink, WsSource) {
    let (sink, stream) = socket.split();
    (WsSink { inner: sink }, WsSource { inner: stream })
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_frame(&mut self, payload: &Payload) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(payload.as_str().into()))
            .await
            .map_err(TransportError::io)
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.inner
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(TransportError::io)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let sent = self.inner.send(Message::Close(None)).await;
        let closed = self.inner.close().await;
        sent.and(closed).map_err(TransportError::io)
    }
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next_inbound(&mut self) -> Option<Result<Inbound, TransportError>> {
        let inbound = match self.inner.next().await? {
            Ok(Message::Text(_) | Message::Binary(_)) => Ok(Inbound::Data),
            Ok(Message::Ping(_) | Message::Pong(_)) => Ok(Inbound::Heartbeat),
            Ok(Message::Close(_)) => Ok(Inbound::Close),
            Err(err) => Err(TransportError::io(err)),
        };
        Some(inbound)
    }
}
