//! Socket transport
//!
//! The session talks to the network through [`Connector`], which yields a
//! write half and a read half. [`WsConnector`] is the WebSocket
//! implementation; tests substitute scripted ones.

use super::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// An inbound data frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Binary(Bytes),
    /// Not part of the protocol; discarded by the session
    Text(String),
}

/// Write half of a connection
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a connection
#[async_trait]
pub trait FrameStream: Send {
    /// Next data frame. Control frames are handled internally.
    async fn next_frame(&mut self) -> Result<Frame, TransportError>;
}

/// Opens connections to a chat host
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        host: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), TransportError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connector for `{scheme}://{host}{path}`
#[derive(Debug, Clone)]
pub struct WsConnector {
    scheme: String,
    path: String,
    user_agent: String,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            scheme: "wss".to_string(),
            path: "/sub".to_string(),
            user_agent: danmu_api::USER_AGENT.to_string(),
        }
    }
}

impl WsConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use plain `ws://`, for local servers
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.scheme = "ws".to_string();
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Endpoint URL for a host
    pub fn url(&self, host: &str) -> String {
        format!("{}://{}{}", self.scheme, host, self.path)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        host: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), TransportError> {
        let url = self.url(host);
        let mut request = url.as_str().into_client_request()?;
        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| TransportError::InvalidRequest(format!("user agent: {e}")))?;
        request.headers_mut().insert(header::USER_AGENT, user_agent);

        let (ws, response) = connect_async(request).await?;
        tracing::debug!(url = %url, status = %response.status(), "WebSocket handshake complete");

        let (sink, stream) = ws.split();
        Ok((Box::new(WsSink { sink }), Box::new(WsFrames { stream })))
    }
}

struct WsSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        self.sink.send(Message::Binary(frame.to_vec())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await?;
        Ok(())
    }
}

struct WsFrames {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameStream for WsFrames {
    async fn next_frame(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(Bytes::from(data))),
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text)),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    tracing::trace!("Control frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map_or_else(
                        || "close frame".to_string(),
                        |f| format!("{} {}", u16::from(f.code), f.reason),
                    );
                    return Err(TransportError::Closed(reason));
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(TransportError::Closed("stream ended".to_string())),
            }
        }
    }
}
