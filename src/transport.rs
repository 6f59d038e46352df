//! Transport (§4.E): WebSocket connection lifecycle — open, ping/pong,
//! close-code handling, and bounded reconnect with optional exponential
//! backoff.
//!
//! Owned exclusively by a station's actor task; there is no cross-task
//! sharing of the socket (§5).

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::OcppError;

/// The station actor's view of a transport (§5, §8 mock-transport tests):
/// everything the actor loop needs from a live connection, abstracted so the
/// actor can be driven in tests by [MockTransport] instead of a real socket.
#[async_trait]
pub trait StationTransport: Send {
    fn is_open(&self) -> bool;
    async fn connect(&mut self) -> Result<(), OcppError>;
    async fn reconnect(&mut self) -> Result<(), OcppError>;
    async fn send_text(&mut self, text: String) -> Result<(), OcppError>;
    async fn send_ping(&mut self) -> Result<(), OcppError>;
    async fn close(&mut self, code: u16, reason: &str);
    async fn next_event(&mut self) -> Option<TransportEvent>;
}

/// WebSocket close code 1000 — normal closure, not reconnected.
pub const CLOSE_NORMAL: u16 = 1000;
/// WebSocket close code 1005 — no status received, treated as intentional.
pub const CLOSE_NO_STATUS: u16 = 1005;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub supervision_url: String,
    pub station_id: String,
    pub subprotocol: String,
    pub basic_auth: Option<(String, String)>,
    pub handshake_timeout: Duration,
    pub auto_reconnect_max_retries: i32,
    pub reconnect_exponential_delay: bool,
}

impl TransportConfig {
    fn url(&self) -> String {
        format!(
            "{}/{}",
            self.supervision_url.trim_end_matches('/'),
            self.station_id
        )
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An event surfaced from the transport to the station's select loop.
#[derive(Debug)]
pub enum TransportEvent {
    Frame(String),
    Ping,
    Pong,
    /// The connection closed with the given code (if any).
    Closed(Option<u16>),
    Error(String),
}

/// Owns (at most) one live WebSocket connection and the reconnect policy
/// around it.
pub struct Transport {
    config: TransportConfig,
    socket: Option<Socket>,
    retry_attempt: u32,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            socket: None,
            retry_attempt: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Open a fresh connection, resetting the retry counter on success
    /// (§4.E "On open").
    pub async fn connect(&mut self) -> Result<(), OcppError> {
        let request = self.build_request()?;
        let connect = tokio_tungstenite::connect_async(request);
        let (socket, _response) = tokio::time::timeout(self.config.handshake_timeout, connect)
            .await
            .map_err(|_| OcppError::Transport("handshake timed out".into()))?
            .map_err(|e| OcppError::Transport(format!("handshake failed: {e}")))?;
        info!(station = %self.config.station_id, "transport connected");
        self.socket = Some(socket);
        self.retry_attempt = 0;
        Ok(())
    }

    fn build_request(&self) -> Result<Request<()>, OcppError> {
        let url = self.config.url();
        let mut builder = Request::builder()
            .uri(&url)
            .header("Host", host_from_url(&url))
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", generate_key())
            .header("Sec-WebSocket-Protocol", self.config.subprotocol.clone());
        if let Some((user, pass)) = &self.config.basic_auth {
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{user}:{pass}"));
            builder = builder.header("Authorization", format!("Basic {token}"));
        }
        builder
            .body(())
            .map_err(|e| OcppError::Transport(format!("invalid handshake request: {e}")))
    }

    /// Reconnect loop per §4.E: up to `auto_reconnect_max_retries` attempts
    /// (-1 unlimited, 0 disabled), delayed by the handshake timeout or an
    /// exponential backoff keyed on attempt count.
    pub async fn reconnect(&mut self) -> Result<(), OcppError> {
        if self.config.auto_reconnect_max_retries == 0 {
            return Err(OcppError::Transport("reconnect disabled".into()));
        }
        loop {
            self.retry_attempt += 1;
            if self.config.auto_reconnect_max_retries > 0
                && self.retry_attempt > self.config.auto_reconnect_max_retries as u32
            {
                return Err(OcppError::Transport("reconnect retries exhausted".into()));
            }
            let delay = self.backoff_delay();
            tokio::time::sleep(delay).await;
            match self.connect().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt = self.retry_attempt, error = %e, "reconnect attempt failed");
                    continue;
                }
            }
        }
    }

    fn backoff_delay(&self) -> Duration {
        if self.config.reconnect_exponential_delay {
            let millis = self.config.handshake_timeout.as_millis() as u64
                * 2u64.saturating_pow(self.retry_attempt.saturating_sub(1));
            Duration::from_millis(millis.min(Duration::from_secs(300).as_millis() as u64))
        } else {
            self.config.handshake_timeout
        }
    }

    /// Send a text frame. Fails with `OcppError::Transport` if not open or
    /// the underlying send errors.
    pub async fn send_text(&mut self, text: String) -> Result<(), OcppError> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| OcppError::Transport("not connected".into()))?;
        socket
            .send(Message::Text(text))
            .await
            .map_err(|e| OcppError::Transport(format!("send failed: {e}")))
    }

    pub async fn send_ping(&mut self) -> Result<(), OcppError> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| OcppError::Transport("not connected".into()))?;
        socket
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| OcppError::Transport(format!("ping failed: {e}")))
    }

    /// Close the transport with the given code (used on station stop, §5).
    pub async fn close(&mut self, code: u16, reason: &str) {
        if let Some(mut socket) = self.socket.take() {
            let frame = CloseFrame {
                code: code.into(),
                reason: reason.to_string().into(),
            };
            let _ = socket.close(Some(frame)).await;
        }
    }

    /// Await the next event from the socket. Returns `None` only when no
    /// socket is open at all.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        let socket = self.socket.as_mut()?;
        match socket.next().await {
            Some(Ok(Message::Text(text))) => Some(TransportEvent::Frame(text)),
            Some(Ok(Message::Binary(bytes))) => {
                Some(TransportEvent::Frame(String::from_utf8_lossy(&bytes).into_owned()))
            }
            Some(Ok(Message::Ping(_))) => {
                debug!("received ping");
                Some(TransportEvent::Ping)
            }
            Some(Ok(Message::Pong(_))) => {
                debug!("received pong");
                Some(TransportEvent::Pong)
            }
            Some(Ok(Message::Close(frame))) => {
                self.socket = None;
                Some(TransportEvent::Closed(frame.map(|f| f.code.into())))
            }
            Some(Ok(Message::Frame(_))) => None,
            Some(Err(e)) => {
                self.socket = None;
                Some(TransportEvent::Error(e.to_string()))
            }
            None => {
                self.socket = None;
                Some(TransportEvent::Closed(None))
            }
        }
    }
}

#[async_trait]
impl StationTransport for Transport {
    fn is_open(&self) -> bool {
        Transport::is_open(self)
    }

    async fn connect(&mut self) -> Result<(), OcppError> {
        Transport::connect(self).await
    }

    async fn reconnect(&mut self) -> Result<(), OcppError> {
        Transport::reconnect(self).await
    }

    async fn send_text(&mut self, text: String) -> Result<(), OcppError> {
        Transport::send_text(self, text).await
    }

    async fn send_ping(&mut self) -> Result<(), OcppError> {
        Transport::send_ping(self).await
    }

    async fn close(&mut self, code: u16, reason: &str) {
        Transport::close(self, code, reason).await
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        Transport::next_event(self).await
    }
}

/// In-process transport double for integration tests (§8): frames "sent" by
/// the station are pushed to `sent`; frames to be "received" are queued with
/// [MockTransport::push_inbound]. No sockets, no runtime I/O.
#[derive(Default)]
pub struct MockTransport {
    open: bool,
    inbound: VecDeque<TransportEvent>,
    /// Fed by [MockTransport::inbound_injector] once a station actor has
    /// taken ownership of the transport, so a test can still deliver events
    /// after the fact (§8 mock-transport integration tests).
    inbound_rx: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    pub sent: Vec<String>,
    pub connect_attempts: u32,
    /// When set, the next `connect`/`reconnect` fails once then clears.
    pub fail_next_connect: bool,
    /// Notified with a copy of every sent frame, so a test can observe an
    /// outbound Call without owning the transport anymore.
    sent_observer: Option<mpsc::UnboundedSender<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&mut self, frame: impl Into<String>) {
        self.inbound.push_back(TransportEvent::Frame(frame.into()));
    }

    pub fn push_event(&mut self, event: TransportEvent) {
        self.inbound.push_back(event);
    }

    pub fn sent_commands(&self) -> Vec<String> {
        self.sent
            .iter()
            .filter_map(|raw| {
                let value: serde_json::Value = serde_json::from_str(raw).ok()?;
                value.get(2)?.as_str().map(str::to_string)
            })
            .collect()
    }

    /// Registers a channel a test can use to push inbound events after the
    /// transport has already been moved into a running station actor.
    pub fn inbound_injector(&mut self) -> mpsc::UnboundedSender<TransportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inbound_rx = Some(rx);
        tx
    }

    /// Registers a channel that receives a copy of every text frame this
    /// transport sends, so a test can react to an outbound Call without
    /// holding the transport itself.
    pub fn sent_observer(&mut self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sent_observer = Some(tx);
        rx
    }
}

#[async_trait]
impl StationTransport for MockTransport {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn connect(&mut self) -> Result<(), OcppError> {
        self.connect_attempts += 1;
        if self.fail_next_connect {
            self.fail_next_connect = false;
            return Err(OcppError::Transport("mock connect failure".into()));
        }
        self.open = true;
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), OcppError> {
        StationTransport::connect(self).await
    }

    async fn send_text(&mut self, text: String) -> Result<(), OcppError> {
        if !self.open {
            return Err(OcppError::Transport("mock transport not connected".into()));
        }
        if let Some(tx) = &self.sent_observer {
            let _ = tx.send(text.clone());
        }
        self.sent.push(text);
        Ok(())
    }

    async fn send_ping(&mut self) -> Result<(), OcppError> {
        if !self.open {
            return Err(OcppError::Transport("mock transport not connected".into()));
        }
        Ok(())
    }

    async fn close(&mut self, _code: u16, _reason: &str) {
        self.open = false;
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.inbound.pop_front() {
            if let TransportEvent::Closed(_) = event {
                self.open = false;
            }
            return Some(event);
        }
        if let Some(rx) = &mut self.inbound_rx {
            return match rx.recv().await {
                Some(event) => {
                    if let TransportEvent::Closed(_) = event {
                        self.open = false;
                    }
                    Some(event)
                }
                None if !self.open => None,
                None => std::future::pending().await,
            };
        }
        if !self.open {
            return None;
        }
        std::future::pending().await
    }
}

/// Whether a close code should be treated as intentional (no reconnect).
pub fn is_intentional_close(code: Option<u16>) -> bool {
    matches!(code, Some(CLOSE_NORMAL) | Some(CLOSE_NO_STATUS))
}

fn host_from_url(url: &str) -> String {
    url.trim_start_matches("wss://")
        .trim_start_matches("ws://")
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn intentional_close_codes() {
        assert!(is_intentional_close(Some(CLOSE_NORMAL)));
        assert!(is_intentional_close(Some(CLOSE_NO_STATUS)));
        assert!(!is_intentional_close(Some(1006)));
        assert!(!is_intentional_close(None));
    }

    #[test]
    fn url_joins_station_id() {
        let config = TransportConfig {
            supervision_url: "wss://example.com/ocpp".into(),
            station_id: "CP-1".into(),
            subprotocol: "ocpp1.6".into(),
            basic_auth: None,
            handshake_timeout: Duration::from_secs(30),
            auto_reconnect_max_retries: -1,
            reconnect_exponential_delay: false,
        };
        assert_eq!(config.url(), "wss://example.com/ocpp/CP-1");
    }
}
