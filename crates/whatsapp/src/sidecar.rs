//! WebSocket link to the sidecar, with automatic reconnect.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    futures::{SinkExt, StreamExt},
    tokio::sync::{mpsc, oneshot},
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tracing::{debug, info, warn},
};

use crate::types::{GatewayMessage, SidecarMessage};

/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How long a `send_text` waits for the sidecar's `send_result`.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<Result<(), String>>>>>;

/// Events from the connection task.
#[derive(Debug)]
pub enum SidecarEvent {
    /// Socket (re)established. The session must be (re)opened with `login`.
    Connected,
    Disconnected,
    Message(SidecarMessage),
}

/// Handle to the background connection task.
#[derive(Clone)]
pub struct SidecarConnection {
    write_tx: mpsc::UnboundedSender<String>,
    pending: Pending,
}

impl SidecarConnection {
    /// Connect to `ws://127.0.0.1:{port}` in the background, reconnecting
    /// with exponential backoff. Returns immediately.
    pub fn spawn(port: u16, event_tx: mpsc::UnboundedSender<SidecarEvent>) -> Self {
        Self::spawn_url(format!("ws://127.0.0.1:{port}"), event_tx)
    }

    pub fn spawn_url(url: String, event_tx: mpsc::UnboundedSender<SidecarEvent>) -> Self {
        let (write_tx, write_rx) = mpsc::unbounded_channel::<String>();
        let pending: Pending = Arc::default();
        tokio::spawn(connection_loop(url, event_tx, write_rx, Arc::clone(&pending)));
        Self { write_tx, pending }
    }

    /// Queue a frame for the sidecar.
    pub fn send(&self, message: &GatewayMessage) -> tubepost_channels::Result<()> {
        let json = serde_json::to_string(message)?;
        self.write_tx
            .send(json)
            .map_err(|_| tubepost_channels::Error::unavailable("sidecar connection closed"))
    }

    /// Send a text message and wait for the sidecar to confirm delivery to
    /// WhatsApp.
    pub async fn send_text(
        &self,
        account_id: &str,
        to: &str,
        text: &str,
    ) -> tubepost_channels::Result<()> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(request_id.clone(), tx);

        let sent = self.send(&GatewayMessage::SendText {
            request_id: request_id.clone(),
            account_id: account_id.to_string(),
            to: to.to_string(),
            text: text.to_string(),
        });
        if let Err(e) = sent {
            lock_pending(&self.pending).remove(&request_id);
            return Err(e);
        }

        let outcome = tokio::time::timeout(SEND_TIMEOUT, rx).await;
        lock_pending(&self.pending).remove(&request_id);
        match outcome {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(error))) => Err(tubepost_channels::Error::unavailable(format!(
                "WhatsApp send failed: {error}"
            ))),
            Ok(Err(_)) => Err(tubepost_channels::Error::unavailable(
                "sidecar connection dropped before confirming send",
            )),
            Err(_) => Err(tubepost_channels::Error::unavailable(
                "timed out waiting for sidecar send result",
            )),
        }
    }
}

fn lock_pending(
    pending: &Pending,
) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<Result<(), String>>>> {
    pending
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Main connection loop with auto-reconnect.
async fn connection_loop(
    url: String,
    event_tx: mpsc::UnboundedSender<SidecarEvent>,
    mut write_rx: mpsc::UnboundedReceiver<String>,
    pending: Pending,
) {
    let mut backoff = Duration::from_secs(1);

    loop {
        debug!(url = %url, "connecting to WhatsApp sidecar");
        match connect_and_run(&url, &event_tx, &mut write_rx, &pending).await {
            Ok(Exit::Shutdown) => {
                debug!("sidecar connection closed by gateway");
                return;
            },
            Ok(Exit::Closed) => {
                info!("sidecar closed the connection");
                backoff = Duration::from_secs(1);
            },
            Err(e) => warn!(error = %e, "sidecar connection error"),
        }

        // Outstanding sends will never get a result from the old socket.
        lock_pending(&pending).clear();
        if event_tx.send(SidecarEvent::Disconnected).is_err() {
            return;
        }

        debug!(delay_ms = backoff.as_millis() as u64, "reconnecting to sidecar after delay");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

enum Exit {
    /// All handles dropped.
    Shutdown,
    /// The sidecar went away.
    Closed,
}

async fn connect_and_run(
    url: &str,
    event_tx: &mpsc::UnboundedSender<SidecarEvent>,
    write_rx: &mut mpsc::UnboundedReceiver<String>,
    pending: &Pending,
) -> Result<Exit, tokio_tungstenite::tungstenite::Error> {
    let (ws_stream, _response) = connect_async(url).await?;
    let (mut ws_sink, mut ws_reader) = ws_stream.split();
    info!(url, "connected to WhatsApp sidecar");
    if event_tx.send(SidecarEvent::Connected).is_err() {
        return Ok(Exit::Shutdown);
    }

    loop {
        tokio::select! {
            msg = ws_reader.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some(message) = parse_frame(text.as_str()) else {
                            continue;
                        };
                        if let SidecarMessage::SendResult { request_id, success, error } = &message
                            && let Some(waiter) = lock_pending(pending).remove(request_id)
                        {
                            let outcome = if *success {
                                Ok(())
                            } else {
                                Err(error.clone().unwrap_or_else(|| "unknown error".into()))
                            };
                            let _ = waiter.send(outcome);
                            continue;
                        }
                        if event_tx.send(SidecarEvent::Message(message)).is_err() {
                            return Ok(Exit::Shutdown);
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(Exit::Closed),
                    Some(Ok(Message::Ping(data))) => ws_sink.send(Message::Pong(data)).await?,
                    Some(Ok(_)) => {},
                    Some(Err(e)) => return Err(e),
                }
            },
            json = write_rx.recv() => {
                match json {
                    Some(text) => ws_sink.send(Message::Text(text.into())).await?,
                    None => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        return Ok(Exit::Shutdown);
                    },
                }
            },
        }
    }
}

fn parse_frame(text: &str) -> Option<SidecarMessage> {
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(e) => {
            debug!(error = %e, frame = %text, "ignoring unrecognised sidecar frame");
            None
        },
    }
}
