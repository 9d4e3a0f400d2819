//! WebSocket transport implementation using `tokio-tungstenite`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, HandshakeCredentials, Transport, TransportError, MAX_FRAME_BYTES};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the address this transport is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self.listener.accept().await.map_err(TransportError::AcceptFailed)?;

        let mut credentials = HandshakeCredentials::default();
        let callback = |req: &Request, resp: Response| {
            let header = credentials_from_headers(req);
            let sub_protocol = credentials_from_sub_protocol(req);
            let query = credentials_from_query(req);
            credentials = header.or(sub_protocol).or(query);
            Ok(resp)
        };

        let ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.map_err(|e| {
            TransportError::AcceptFailed(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e))
        })?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        Ok(WebSocketConnection {
            id,
            ws: Arc::new(Mutex::new(ws)),
            credentials,
        })
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Extracts the `Authorization: Bearer <token>` header, if present.
fn credentials_from_headers(req: &Request) -> HandshakeCredentials {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let display_name = req
        .headers()
        .get("X-Liku-Display-Name")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let agent_type = req
        .headers()
        .get("X-Liku-Agent-Type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    HandshakeCredentials { token, display_name, agent_type }
}

/// Extracts credentials packed into the `Sec-WebSocket-Protocol` header as
/// `liku-token.<token>` / `liku-name.<name>` / `liku-type.<type>` entries.
fn credentials_from_sub_protocol(req: &Request) -> HandshakeCredentials {
    let mut creds = HandshakeCredentials::default();
    let Some(header) = req.headers().get("Sec-WebSocket-Protocol").and_then(|v| v.to_str().ok()) else {
        return creds;
    };
    for entry in header.split(',').map(str::trim) {
        if let Some(token) = entry.strip_prefix("liku-token.") {
            creds.token = Some(token.to_string());
        } else if let Some(name) = entry.strip_prefix("liku-name.") {
            creds.display_name = Some(name.to_string());
        } else if let Some(kind) = entry.strip_prefix("liku-type.") {
            creds.agent_type = Some(kind.to_string());
        }
    }
    creds
}

/// Extracts `?token=`, `?name=`, `?type=` query parameters from the request
/// URI without pulling in a full URL-parsing dependency.
fn credentials_from_query(req: &Request) -> HandshakeCredentials {
    let mut creds = HandshakeCredentials::default();
    let Some(query) = req.uri().query() else {
        return creds;
    };
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let value = percent_decode(value);
        match key {
            "token" => creds.token = Some(value),
            "name" => creds.display_name = Some(value),
            "type" => creds.agent_type = Some(value),
            _ => {}
        }
    }
    creds
}

/// Minimal percent-decoding sufficient for query-string tokens: handles
/// `%XX` escapes and `+` as space, passes everything else through.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(&input[i + 1..i + 3], 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// A single WebSocket connection, speaking JSON text frames.
pub struct WebSocketConnection {
    id: ConnectionId,
    ws: Arc<Mutex<WsStream>>,
    credentials: HandshakeCredentials,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        use futures_util::SinkExt;
        let text = String::from_utf8_lossy(data).into_owned();
        let msg = Message::Text(text.into());
        self.ws.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        use futures_util::StreamExt;
        loop {
            let msg = self.ws.lock().await.next().await;
            match msg {
                Some(Ok(Message::Text(text))) => {
                    if text.len() > MAX_FRAME_BYTES {
                        return Err(TransportError::PolicyViolation(text.len()));
                    }
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    if data.len() > MAX_FRAME_BYTES {
                        return Err(TransportError::PolicyViolation(data.len()));
                    }
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/frame handled by tungstenite
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.ws.lock().await.close(None).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn handshake_credentials(&self) -> &HandshakeCredentials {
        &self.credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_decode_handles_plus_and_escapes() {
        assert_eq!(percent_decode("liku%2Dhub"), "liku-hub");
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("plain"), "plain");
    }
}
