//! Server-sent events.
//!
//! A handler answers with an [`EventStream`]: the emitter pushes events
//! through an [`EventSender`] while the client reads them as a
//! `text/event-stream` body. The stream ends when every sender is dropped.
//!
//! ```
//! use catpaw_core::sse::{EventStream, ServerSentEvent};
//!
//! tokio_test::block_on(async {
//!     let events = EventStream::create(|sender| async move {
//!         let _ = sender.send(ServerSentEvent::with_event("tick", "1")).await;
//!     });
//!     let response = events.into_response().render(None).unwrap();
//!     assert_eq!(response.header("Content-Type"), Some("text/event-stream"));
//!     assert_eq!(&response.into_bytes().await.unwrap()[..], b"event: tick\ndata: 1\n\n");
//! });
//! ```

use crate::error::{Error, Result};
use crate::response::SuccessResponseModifier;
use bytes::Bytes;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;

pub const TEXT_EVENT_STREAM: &str = "text/event-stream";

const CHANNEL_CAPACITY: usize = 100;
const KEEP_ALIVE: &str = ": keep-alive\n\n";

type Chunk = std::io::Result<Bytes>;

/// A single event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSentEvent {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
    /// Reconnection delay in milliseconds.
    pub retry: Option<u64>,
}

impl ServerSentEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_event(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_retry(mut self, retry: u64) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Wire format; multi-line data becomes one `data:` field per line.
    pub fn encode(&self) -> String {
        let mut output = String::new();
        if let Some(id) = &self.id {
            output.push_str(&format!("id: {id}\n"));
        }
        if let Some(event) = &self.event {
            output.push_str(&format!("event: {event}\n"));
        }
        if self.data.is_empty() {
            output.push_str("data: \n");
        }
        for line in self.data.lines() {
            output.push_str(&format!("data: {line}\n"));
        }
        if let Some(retry) = self.retry {
            output.push_str(&format!("retry: {retry}\n"));
        }
        output.push('\n');
        output
    }
}

/// Writing end of an [`EventStream`].
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Chunk>,
}

impl EventSender {
    pub async fn send(&self, event: ServerSentEvent) -> Result<()> {
        self.write(event.encode()).await
    }

    pub async fn send_message(&self, data: impl Into<String>) -> Result<()> {
        self.send(ServerSentEvent::new(data)).await
    }

    pub async fn send_json<T: Serialize>(&self, data: &T) -> Result<()> {
        let json = serde_json::to_string(data).map_err(|e| Error::Serialization(e.to_string()))?;
        self.send_message(json).await
    }

    /// Comment line that keeps idle connections open.
    pub async fn send_keep_alive(&self) -> Result<()> {
        self.write(KEEP_ALIVE.to_string()).await
    }

    /// The client went away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn write(&self, chunk: String) -> Result<()> {
        self.tx
            .send(Ok(Bytes::from(chunk)))
            .await
            .map_err(|e| Error::Internal(format!("Failed to send event: {e}")))
    }
}

/// Reading end of a server-sent event response.
///
/// `Cache-Control: no-store`, `Content-Type: text/event-stream` and
/// `Connection: keep-alive` are set by default. They can be replaced or
/// removed; a different content type breaks the event contract.
#[derive(Debug)]
pub struct EventStream {
    stream: ReceiverStream<Chunk>,
    headers: Vec<(String, String)>,
}

impl EventStream {
    pub fn channel() -> (EventSender, EventStream) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stream = EventStream {
            stream: ReceiverStream::new(rx),
            headers: vec![
                ("Cache-Control".to_string(), "no-store".to_string()),
                ("Content-Type".to_string(), TEXT_EVENT_STREAM.to_string()),
                ("Connection".to_string(), "keep-alive".to_string()),
            ],
        };
        (EventSender { tx }, stream)
    }

    /// Run `emitter` in the background, feeding the returned stream.
    pub fn create<F, Fut>(emitter: F) -> Self
    where
        F: FnOnce(EventSender) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, stream) = Self::channel();
        tokio::spawn(emitter(sender));
        stream
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self
    }

    pub fn into_response(self) -> SuccessResponseModifier {
        let mut response = SuccessResponseModifier::stream(Box::pin(self.stream));
        for (key, value) in self.headers {
            response = if key.eq_ignore_ascii_case("content-type") {
                response.as_type(value)
            } else {
                response.with_header(key, value)
            };
        }
        response
    }
}

impl From<EventStream> for crate::response::Response {
    fn from(stream: EventStream) -> Self {
        crate::response::Response::Success(stream.into_response())
    }
}

/// Fans events out to every registered client.
#[derive(Debug, Default)]
pub struct EventBroadcaster {
    clients: RwLock<Vec<EventSender>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self) -> EventStream {
        let (sender, stream) = EventStream::channel();
        self.clients.write().await.push(sender);
        stream
    }

    /// Send `event` to the connected clients, forgetting disconnected ones.
    pub async fn broadcast(&self, event: ServerSentEvent) {
        let encoded = event.encode();
        let mut clients = self.clients.write().await;
        clients.retain(|client| !client.is_closed());
        for client in clients.iter() {
            let _ = client.write(encoded.clone()).await;
        }
    }

    pub async fn client_count(&self) -> usize {
        let mut clients = self.clients.write().await;
        clients.retain(|client| !client.is_closed());
        clients.len()
    }

    /// Periodically send keep-alive comments to every client.
    pub fn start_keep_alive(self: std::sync::Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                let mut clients = self.clients.write().await;
                clients.retain(|client| !client.is_closed());
                for client in clients.iter() {
                    let _ = client.send_keep_alive().await;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_fields() {
        let event = ServerSentEvent::with_event("update", "line one\nline two")
            .with_id("7")
            .with_retry(3000);
        assert_eq!(
            event.encode(),
            "id: 7\nevent: update\ndata: line one\ndata: line two\nretry: 3000\n\n"
        );
        assert_eq!(ServerSentEvent::new("").encode(), "data: \n\n");
    }

    #[tokio::test]
    async fn test_default_headers() {
        let (_, stream) = EventStream::channel();
        let response = stream.into_response().render(None).unwrap();
        assert_eq!(response.header("Content-Type"), Some(TEXT_EVENT_STREAM));
        assert_eq!(response.header("Cache-Control"), Some("no-store"));
        assert_eq!(response.header("Connection"), Some("keep-alive"));
    }

    #[tokio::test]
    async fn test_headers_can_be_replaced_and_removed() {
        let (_, stream) = EventStream::channel();
        let response = stream
            .with_header("cache-control", "no-cache")
            .without_header("Connection")
            .into_response()
            .render(None)
            .unwrap();
        assert_eq!(response.header("Cache-Control"), Some("no-cache"));
        assert_eq!(response.header("Connection"), None);
    }

    #[tokio::test]
    async fn test_stream_ends_when_emitter_finishes() {
        let events = EventStream::create(|sender| async move {
            sender.send_message("hello").await.unwrap();
            sender.send_json(&serde_json::json!({"n": 1})).await.unwrap();
            sender.send_keep_alive().await.unwrap();
        });
        let body = events.into_response().render(None).unwrap().into_bytes().await.unwrap();
        assert_eq!(&body[..], b"data: hello\n\ndata: {\"n\":1}\n\n: keep-alive\n\n");
    }

    #[tokio::test]
    async fn test_send_to_dropped_stream_fails() {
        let (sender, stream) = EventStream::channel();
        drop(stream);
        assert!(sender.is_closed());
        assert!(sender.send_message("lost").await.is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_clients() {
        let broadcaster = EventBroadcaster::new();
        let first = broadcaster.register().await;
        let second = broadcaster.register().await;
        assert_eq!(broadcaster.client_count().await, 2);

        broadcaster.broadcast(ServerSentEvent::new("meow")).await;
        drop(second);
        assert_eq!(broadcaster.client_count().await, 1);
        drop(broadcaster);

        let body = first.into_response().render(None).unwrap().into_bytes().await.unwrap();
        assert_eq!(&body[..], b"data: meow\n\n");
    }
}
