//! AT Driver protocol client
//!
//! Bidirectional correlation over a single WebSocket connection: outbound
//! requests carry ids from a strictly increasing counter, responses are
//! matched by id, and `interaction.capturedOutput` notifications arrive
//! interleaved at any time. The reader task logs and parses each raw frame
//! exactly once, then fans it out on a broadcast channel; every waiter
//! filters its own subscription, so no waiter can starve another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};
use crate::job::CancelableJob;
use crate::keys::KeySequence;

use super::types::{AtCapabilities, Inbound, NewSessionResult, VendorSetting};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Notification method carrying captured speech
const CAPTURED_OUTPUT: &str = "interaction.capturedOutput";

/// Parsed inbound frames buffered per subscriber before it observes a lag
const INBOUND_CAPACITY: usize = 256;

/// AT Driver client owning one WebSocket connection
///
/// One client per connection; the request-id space is not shared across
/// instances.
pub struct AtDriverClient {
    sink: Mutex<WsSink>,
    inbound: broadcast::Sender<Arc<Inbound>>,
    next_id: AtomicU64,
    at_capabilities: Option<AtCapabilities>,
    reader: CancelableJob<()>,
}

impl AtDriverClient {
    /// Open the WebSocket connection and start the inbound reader.
    ///
    /// The session does not exist yet: call [`new_session`] before any
    /// other request.
    ///
    /// [`new_session`]: AtDriverClient::new_session
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _response) = connect_async(url).await.map_err(|source| {
            Error::ConnectFailed {
                url: url.to_string(),
                source,
            }
        })?;
        tracing::debug!(url, "connected to AT driver");

        let (sink, source) = socket.split();
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);

        let reader = CancelableJob::start({
            let inbound = inbound.clone();
            move |token| read_frames(source, inbound, token)
        });

        Ok(Self {
            sink: Mutex::new(sink),
            inbound,
            next_id: AtomicU64::new(0),
            at_capabilities: None,
            reader,
        })
    }

    /// Create the AT driver session with empty capabilities.
    ///
    /// Every other operation is a precondition failure until this has
    /// succeeded.
    pub async fn new_session(&mut self) -> Result<AtCapabilities> {
        let result = self
            .call_unchecked("session.new", json!({ "capabilities": {} }))
            .await?;
        let session: NewSessionResult = serde_json::from_value(result)?;
        tracing::info!(
            at = %session.capabilities.at_name,
            version = %session.capabilities.at_version,
            "AT driver session ready"
        );
        self.at_capabilities = Some(session.capabilities.clone());
        Ok(session.capabilities)
    }

    /// AT identification from `session.new`, if the session exists.
    pub fn at_capabilities(&self) -> Option<&AtCapabilities> {
        self.at_capabilities.as_ref()
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.at_capabilities.is_some() {
            Ok(())
        } else {
            Err(Error::SessionNotReady)
        }
    }

    /// Send a request and wait for its correlated response.
    ///
    /// Inbound messages that do not match this request's id are left for
    /// whichever waiter they belong to; nothing is buffered or consumed on
    /// their behalf here.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.ensure_ready()?;
        self.call_unchecked(method, params).await
    }

    async fn call_unchecked(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();

        // Subscribe before sending so the response cannot slip past.
        let mut rx = self.inbound.subscribe();
        let frame = json!({ "id": id, "method": method, "params": params });
        self.send_frame(&frame).await?;

        loop {
            let message = match rx.recv().await {
                Ok(message) => message,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, method, "response waiter lagged behind inbound frames");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return Err(Error::ConnectionClosed),
            };

            if let Inbound::Response(response) = message.as_ref() {
                if response.id == id {
                    if let Some(error) = &response.error {
                        tracing::error!(method, %error, "AT driver rejected request");
                        return Err(Error::request_failed(method, &error_message(error)));
                    }
                    return Ok(response.result.clone().unwrap_or(Value::Null));
                }
            }
        }
    }

    /// Press a key sequence, one `interaction.pressKeys` request per chord,
    /// strictly in order. Each chord's response is awaited before the next
    /// chord is sent; a rejected chord fails the whole sequence.
    pub async fn send_keys(&self, sequence: &KeySequence) -> Result<()> {
        self.ensure_ready()?;
        if sequence.is_empty() {
            return Err(Error::Protocol("refusing to send an empty key sequence".to_string()));
        }
        for chord in sequence.chords() {
            tracing::debug!(chord = %chord, "pressing keys");
            self.call("interaction.pressKeys", json!({ "keys": chord.mapped_keys() }))
                .await?;
        }
        Ok(())
    }

    /// Update AT-vendor settings over a vendor side channel
    /// (e.g. `nvda:settings.setSettings`).
    pub async fn set_vendor_settings(
        &self,
        method: &str,
        settings: &[VendorSetting],
    ) -> Result<()> {
        self.call(method, json!({ "settings": settings })).await?;
        Ok(())
    }

    /// A live stream of captured speech.
    ///
    /// The stream never ends on its own; consume it inside a
    /// [`CancelableJob`]. Each call starts a fresh subscription: speech
    /// captured before the call is not replayed into it.
    pub fn speeches(&self) -> Speeches {
        Speeches {
            rx: self.inbound.subscribe(),
        }
    }

    /// Close the socket and wait for the reader to observe the close.
    ///
    /// Consumes the client; call once per client lifetime.
    pub async fn quit(self) -> Result<()> {
        {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Message::Close(None)).await {
                tracing::debug!(error = %e, "close frame not sent; connection already gone");
            }
        }
        self.reader.cancel().await?;
        tracing::debug!("AT driver connection closed");
        Ok(())
    }

    async fn send_frame(&self, frame: &Value) -> Result<()> {
        let json = serde_json::to_string(frame)?;
        tracing::debug!("AT >>> {json}");
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(json)).await?;
        Ok(())
    }
}

/// Reader loop: each raw frame is logged and parsed exactly once, then
/// fanned out to all subscribers.
async fn read_frames(
    mut source: WsSource,
    inbound: broadcast::Sender<Arc<Inbound>>,
    token: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = token.cancelled() => break,
            message = source.next() => message,
        };
        let message = match message {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "AT driver socket error");
                break;
            }
            None => break,
        };
        match message {
            Message::Text(raw) => {
                tracing::debug!("AT <<< {raw}");
                match serde_json::from_str::<Inbound>(&raw) {
                    Ok(frame) => {
                        let _ = inbound.send(Arc::new(frame));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "discarding unparseable AT driver frame")
                    }
                }
            }
            Message::Close(_) => {
                tracing::debug!("AT driver closed the connection");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => tracing::debug!(?other, "ignoring non-text AT driver frame"),
        }
    }
}

/// Restartable view of `interaction.capturedOutput` notifications
pub struct Speeches {
    rx: broadcast::Receiver<Arc<Inbound>>,
}

impl Speeches {
    #[cfg(test)]
    pub(crate) fn from_receiver(rx: broadcast::Receiver<Arc<Inbound>>) -> Self {
        Self { rx }
    }

    /// Next utterance, or `None` once the connection has closed.
    pub async fn next(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => {
                    if let Inbound::Notification(notification) = frame.as_ref() {
                        if notification.method == CAPTURED_OUTPUT {
                            if let Some(data) =
                                notification.params.get("data").and_then(Value::as_str)
                            {
                                return Some(data.to_string());
                            }
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "speech listener lagged; utterances dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}
