//! # Socket.IO Frame Codec
//!
//! Just enough of Engine.IO v4 / Socket.IO v5 text framing to follow the
//! dashboard's push channel: the open handshake, heartbeats, namespace
//! connect/disconnect and event packets. Binary attachments and
//! acknowledgements are not used by the server and are not decoded.
//!
//! Everything here is pure so it can be tested without a socket.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::{DashboardError, DashboardResult};

/// Event name carrying live deltas.
pub const NEW_EVENTS: &str = "new_events";
/// Sent after the Engine.IO open packet to join the default namespace.
pub const CONNECT_REQUEST: &str = "40";
/// Heartbeat answer.
pub const PONG: &str = "3";

/// Contents of the Engine.IO open packet.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    pub ping_interval: u64,
    pub ping_timeout: u64,
}

impl OpenInfo {
    /// How long the connection may stay silent before it counts as dead:
    /// `pingInterval + pingTimeout`. `None` when the server sent neither.
    pub fn heartbeat_deadline(&self) -> Option<Duration> {
        match self.ping_interval.saturating_add(self.ping_timeout) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// One decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// `0{...}`
    Open(OpenInfo),
    /// `1`
    Close,
    /// `2`
    Ping,
    /// `3`
    Pong,
    /// `40...`, the namespace accepted us.
    Connected,
    /// `41`
    Disconnected,
    /// `44{...}`, usually a rejected token.
    ConnectError(String),
    /// `42["name", payload]`
    Event { name: String, payload: Value },
    /// Anything this client does not act on.
    Unsupported(String),
}

impl Frame {
    /// Decodes a text frame. Never fails; unknown input becomes `Unsupported`.
    pub fn parse(text: &str) -> Frame {
        let mut chars = text.chars();
        match chars.next() {
            Some('0') => Frame::Open(serde_json::from_str(chars.as_str()).unwrap_or_default()),
            Some('1') => Frame::Close,
            Some('2') => Frame::Ping,
            Some('3') => Frame::Pong,
            Some('4') => parse_packet(chars.as_str()).unwrap_or_else(|| Frame::Unsupported(text.to_string())),
            _ => Frame::Unsupported(text.to_string()),
        }
    }

    /// The frame the client must answer with, if any.
    pub fn reply(&self) -> Option<&'static str> {
        match self {
            Frame::Open(_) => Some(CONNECT_REQUEST),
            Frame::Ping => Some(PONG),
            _ => None,
        }
    }
}

/// Socket.IO packet inside an Engine.IO message frame.
fn parse_packet(packet: &str) -> Option<Frame> {
    let mut chars = packet.chars();
    let kind = chars.next()?;
    let rest = strip_namespace(chars.as_str());
    match kind {
        '0' => Some(Frame::Connected),
        '1' => Some(Frame::Disconnected),
        '2' => {
            // Ack ids precede the payload array.
            let body = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let Value::Array(mut items) = serde_json::from_str::<Value>(body).ok()? else {
                return None;
            };
            if items.is_empty() {
                return None;
            }
            let name = items.remove(0).as_str()?.to_string();
            let payload = if items.is_empty() { Value::Null } else { items.remove(0) };
            Some(Frame::Event { name, payload })
        }
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Some(Frame::ConnectError(message))
        }
        _ => None,
    }
}

/// Drops a `/namespace,` prefix. The dashboard only uses the default one.
fn strip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        }
    } else {
        rest
    }
}

/// Builds the websocket handshake URL from an HTTP(S) or WS(S) base.
///
/// The token rides along as a query parameter, which is what the server's
/// connect handler checks.
pub fn handshake_url(base: &str, token: &str) -> DashboardResult<Url> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(DashboardError::InvalidSettings(format!(
                "unsupported scheme for the live channel: {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| DashboardError::InvalidSettings(format!("cannot use {} for {}", scheme, base)))?;

    let mut path = url.path().trim_end_matches('/').to_string();
    path.push_str("/socket.io/");
    url.set_path(&path);
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket")
        .append_pair("token", token);
    Ok(url)
}
