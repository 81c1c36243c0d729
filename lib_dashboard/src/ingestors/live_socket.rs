//! # Live Socket Ingestor
//!
//! Websocket client for the dashboard's Socket.IO push channel. It keeps the
//! connection up, answers heartbeats, and forwards `new_events` deltas and
//! connectivity changes to the controller.

use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::core::controller::{Command, ControllerHandle};
use crate::dashboard::model::LiveDelta;
use crate::dashboard::views::Connectivity;
use crate::ingestors::socketio_frame::{Frame, NEW_EVENTS};

/// Configuration for the live channel.
#[derive(Debug, Clone)]
pub struct LiveSocketConfig {
    /// Full handshake URL, see `socketio_frame::handshake_url`.
    pub url: Url,
    pub reconnect_delay: Duration,
    /// Upper bound on the websocket handshake.
    pub connect_timeout: Duration,
}

pub struct LiveSocketIngestor {
    config: LiveSocketConfig,
    controller: ControllerHandle,
}

/// What to do after a frame has been handled.
#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Reconnect,
}

/// Next item from `read`, or `None` once `limit` passes without one.
async fn next_within<S>(read: &mut S, limit: Option<Duration>) -> Option<Option<S::Item>>
where
    S: Stream + Unpin,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, read.next()).await.ok(),
        None => Some(read.next().await),
    }
}

impl LiveSocketIngestor {
    pub fn new(config: LiveSocketConfig, controller: ControllerHandle) -> Self {
        Self { config, controller }
    }

    /// Connection loop with reconnection. Returns when `cancel` fires or the
    /// controller goes away.
    ///
    /// Once the server's open packet announces its heartbeat, a connection
    /// that stays silent for `pingInterval + pingTimeout` is dropped and
    /// reported offline.
    pub async fn run(&self, cancel: CancellationToken) {
        while !cancel.is_cancelled() && !self.controller.is_closed() {
            log::info!("Connecting to live channel: {}", redact(&self.config.url));

            let connected = tokio::select! {
                _ = cancel.cancelled() => return,
                result = tokio::time::timeout(self.config.connect_timeout, connect_async(self.config.url.as_str())) => result,
            };

            match connected {
                Ok(Ok((ws_stream, _))) => {
                    log::info!("Live channel socket open.");
                    let (mut write, mut read) = ws_stream.split();
                    let mut heartbeat: Option<Duration> = None;

                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                let _ = write.send(Message::Close(None)).await;
                                self.controller.connectivity(Connectivity::Offline);
                                return;
                            }
                            next = next_within(&mut read, heartbeat) => {
                                let Some(msg) = next else {
                                    log::warn!(
                                        "Live channel silent for {}ms; dropping the connection.",
                                        heartbeat.map_or(0, |d| d.as_millis())
                                    );
                                    break;
                                };
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        let frame = Frame::parse(text.as_str());
                                        if let Frame::Open(info) = &frame {
                                            heartbeat = info.heartbeat_deadline();
                                        }
                                        if let Some(reply) = frame.reply() {
                                            if let Err(e) = write.send(Message::text(reply)).await {
                                                log::error!("Live channel write error: {}", e);
                                                break;
                                            }
                                        }
                                        if self.dispatch(frame) == Flow::Reconnect {
                                            break;
                                        }
                                    }
                                    Some(Ok(Message::Close(_))) => {
                                        log::warn!("Live channel closed by server.");
                                        break;
                                    }
                                    Some(Err(e)) => {
                                        log::error!("Live channel read error: {}", e);
                                        break;
                                    }
                                    None => {
                                        log::warn!("Live channel stream ended.");
                                        break;
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }
                    self.controller.connectivity(Connectivity::Offline);
                }
                Ok(Err(e)) => {
                    log::error!(
                        "Failed to connect to live channel: {}. Retrying in {}s...",
                        e,
                        self.config.reconnect_delay.as_secs()
                    );
                }
                Err(_) => {
                    log::error!(
                        "Live channel handshake timed out after {}ms. Retrying in {}s...",
                        self.config.connect_timeout.as_millis(),
                        self.config.reconnect_delay.as_secs()
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    fn dispatch(&self, frame: Frame) -> Flow {
        let close = frame == Frame::Close;
        if let Some(command) = command_for(frame) {
            self.controller.send(command);
        }
        if close {
            Flow::Reconnect
        } else {
            Flow::Continue
        }
    }
}

/// Maps a decoded frame to the controller command it implies.
fn command_for(frame: Frame) -> Option<Command> {
    match frame {
        Frame::Connected => Some(Command::Connectivity(Connectivity::Live)),
        Frame::Disconnected | Frame::Close => Some(Command::Connectivity(Connectivity::Offline)),
        Frame::ConnectError(message) => {
            log::warn!("Live channel refused the connection: {}", message);
            Some(Command::Connectivity(Connectivity::Offline))
        }
        Frame::Event { name, payload } if name == NEW_EVENTS => match serde_json::from_value::<LiveDelta>(payload) {
            Ok(delta) => Some(Command::Delta(delta)),
            Err(e) => {
                log::warn!("Dropping malformed {} payload: {}", NEW_EVENTS, e);
                None
            }
        },
        Frame::Event { name, .. } => {
            log::debug!("Ignoring live event '{}'", name);
            None
        }
        Frame::Unsupported(text) => {
            log::debug!("Ignoring live frame: {}", text);
            None
        }
        Frame::Open(_) | Frame::Ping | Frame::Pong => None,
    }
}

/// The handshake URL without its token, for logs.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "*****".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestors::socketio_frame::handshake_url;
    use std::net::SocketAddr;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::{accept_async, WebSocketStream};

    const OPEN: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":60000,"pingTimeout":60000}"#;
    const OPEN_SHORT_HEARTBEAT: &str = r#"0{"sid":"s2","upgrades":[],"pingInterval":100,"pingTimeout":100}"#;

    fn config_for(addr: SocketAddr, connect_timeout: Duration) -> LiveSocketConfig {
        LiveSocketConfig {
            url: handshake_url(&format!("http://{}", addr), "tok").unwrap(),
            reconnect_delay: Duration::from_millis(50),
            connect_timeout,
        }
    }

    fn spawn_client(config: LiveSocketConfig) -> (UnboundedReceiver<Command>, CancellationToken, JoinHandle<()>) {
        let (handle, rx) = ControllerHandle::detached();
        let ingestor = LiveSocketIngestor::new(config, handle);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { ingestor.run(token).await });
        (rx, cancel, task)
    }

    async fn next_command(rx: &mut UnboundedReceiver<Command>) -> Command {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no command within 5s")
            .expect("command queue closed")
    }

    async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_string(),
                Some(Ok(_)) => continue,
                other => panic!("expected a text frame, got {:?}", other),
            }
        }
    }

    /// Accepts one websocket and walks it through open and namespace connect.
    async fn accept_connected(listener: &TcpListener, open: &'static str) -> WebSocketStream<TcpStream> {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::text(open)).await.unwrap();
        assert_eq!(next_text(&mut ws).await, "40");
        ws.send(Message::text("40")).await.unwrap();
        ws
    }

    #[tokio::test]
    async fn test_session_forwards_events_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut ws = accept_connected(&listener, OPEN).await;
            ws.send(Message::text("2")).await.unwrap();
            assert_eq!(next_text(&mut ws).await, "3");
            ws.send(Message::text(r#"42["new_events",{"count":3,"stats":{"total_events":7}}]"#))
                .await
                .unwrap();
            ws.close(None).await.unwrap();

            accept_connected(&listener, OPEN).await
        });

        let (mut rx, cancel, client) = spawn_client(config_for(addr, Duration::from_secs(5)));

        assert!(matches!(next_command(&mut rx).await, Command::Connectivity(Connectivity::Live)));
        match next_command(&mut rx).await {
            Command::Delta(delta) => {
                assert_eq!(delta.count, Some(3));
                assert_eq!(delta.stats.map(|s| s.total_events), Some(7));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(matches!(next_command(&mut rx).await, Command::Connectivity(Connectivity::Offline)));
        assert!(matches!(next_command(&mut rx).await, Command::Connectivity(Connectivity::Live)));

        let _second = server.await.unwrap();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), client).await.unwrap().unwrap();
        assert!(matches!(next_command(&mut rx).await, Command::Connectivity(Connectivity::Offline)));
    }

    #[tokio::test]
    async fn test_silent_connection_is_dropped_after_heartbeat() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            // The first socket stays open but never says anything again.
            let silent = accept_connected(&listener, OPEN_SHORT_HEARTBEAT).await;
            let second = accept_connected(&listener, OPEN).await;
            (silent, second)
        });

        let (mut rx, cancel, client) = spawn_client(config_for(addr, Duration::from_secs(5)));

        assert!(matches!(next_command(&mut rx).await, Command::Connectivity(Connectivity::Live)));
        assert!(matches!(next_command(&mut rx).await, Command::Connectivity(Connectivity::Offline)));
        assert!(matches!(next_command(&mut rx).await, Command::Connectivity(Connectivity::Live)));

        let _sockets = server.await.unwrap();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), client).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stalled_handshake_is_retried() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (mut rx, cancel, client) = spawn_client(config_for(addr, Duration::from_millis(100)));

        // Accept TCP but never answer the websocket upgrade.
        let (_first, _) = listener.accept().await.unwrap();
        let (_second, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("client did not retry")
            .unwrap();
        assert!(rx.try_recv().is_err());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), client).await.unwrap().unwrap();
    }

    #[test]
    fn test_connected_goes_live() {
        assert!(matches!(
            command_for(Frame::parse("40")),
            Some(Command::Connectivity(Connectivity::Live))
        ));
        assert!(matches!(
            command_for(Frame::parse("41")),
            Some(Command::Connectivity(Connectivity::Offline))
        ));
    }

    #[test]
    fn test_new_events_becomes_delta() {
        let frame = Frame::parse(r#"42["new_events",{"count":1,"alerts_triggered":0,"stats":{"total_events":42}}]"#);
        match command_for(frame) {
            Some(Command::Delta(delta)) => {
                assert_eq!(delta.stats.map(|s| s.total_events), Some(42));
                assert!(delta.timeline.is_none());
                assert_eq!(delta.count, Some(1));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_other_frames_are_ignored() {
        assert!(command_for(Frame::parse(r#"42["chat",{}]"#)).is_none());
        assert!(command_for(Frame::parse("2")).is_none());
        assert!(command_for(Frame::parse(r#"42["new_events","oops"]"#)).is_none());
    }

    #[test]
    fn test_redact_hides_token() {
        let url = handshake_url("http://siem.local:5000", "secret").unwrap();
        let shown = redact(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("EIO=4"));
    }
}
