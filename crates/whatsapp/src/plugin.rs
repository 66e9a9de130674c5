//! The WhatsApp channel: sidecar lifecycle plus the inbound event loop.

use std::{future::Future, sync::Arc};

use {
    anyhow::{Result, anyhow},
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use tubepost_metrics::{counter, whatsapp as wa_metrics};

use {
    tubepost_channels::{
        ChannelOutbound, InboundHandler, InboundMessage, MediaAttachment, MediaKind, is_allowed,
    },
    tubepost_config::WhatsAppConfig,
};

use crate::{
    media::SidecarMediaSource,
    outbound::WhatsAppOutbound,
    process::{SidecarConfig, SidecarProcess, find_sidecar_dir, start_sidecar},
    sidecar::{SidecarConnection, SidecarEvent},
    types::{GatewayMessage, SidecarMessage},
};

/// Failed connection attempts tolerated before the first successful connect.
const STARTUP_ATTEMPTS: u32 = 5;

/// WhatsApp Web channel backed by a Baileys sidecar.
pub struct WhatsAppChannel {
    config: WhatsAppConfig,
    connection: Arc<SidecarConnection>,
    events: mpsc::UnboundedReceiver<SidecarEvent>,
    process: Option<SidecarProcess>,
    converter: InboundConverter,
}

impl WhatsAppChannel {
    /// Launch the sidecar (when `auto_start` is set and a checkout is found)
    /// and begin connecting to it.
    pub async fn start(config: WhatsAppConfig) -> Result<Self> {
        let process = if config.auto_start {
            match find_sidecar_dir(config.sidecar_dir.as_deref()) {
                Ok(sidecar_dir) => Some(
                    start_sidecar(SidecarConfig {
                        sidecar_dir,
                        port: config.sidecar_port,
                        auth_dir: Some(config.session_dir.clone()),
                    })
                    .await?,
                ),
                Err(e) => {
                    warn!(
                        error = %e,
                        port = config.sidecar_port,
                        "not starting WhatsApp sidecar, expecting one to be running"
                    );
                    None
                },
            }
        } else {
            None
        };

        let (event_tx, events) = mpsc::unbounded_channel();
        let connection = Arc::new(SidecarConnection::spawn(config.sidecar_port, event_tx));
        let converter = InboundConverter {
            account_id: config.account_id.clone(),
            allowlist: config.allowlist.clone(),
            http: reqwest::Client::new(),
            media_base_url: format!("http://127.0.0.1:{}", config.sidecar_port),
        };

        Ok(Self {
            config,
            connection,
            events,
            process,
            converter,
        })
    }

    /// Reply sender for this channel.
    pub fn outbound(&self) -> Arc<dyn ChannelOutbound> {
        Arc::new(WhatsAppOutbound::new(
            Arc::clone(&self.connection),
            self.config.account_id.clone(),
        ))
    }

    /// Process sidecar events until `shutdown` resolves, the session is logged
    /// out, or the sidecar cannot be reached at startup. Accepted inbound
    /// messages are handed to `handler` one at a time, in arrival order.
    pub async fn run<F>(mut self, handler: Arc<dyn InboundHandler>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut connected_once = false;
        let mut failed_attempts = 0u32;

        let outcome = loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutting down WhatsApp channel");
                    break Ok(());
                },
                event = self.events.recv() => match event {
                    None => break Err(anyhow!("sidecar connection task ended")),
                    Some(SidecarEvent::Connected) => {
                        connected_once = true;
                        failed_attempts = 0;
                        let login = GatewayMessage::Login {
                            account_id: self.config.account_id.clone(),
                            auth_dir: Some(self.config.session_dir.to_string_lossy().into_owned()),
                        };
                        if let Err(e) = self.connection.send(&login) {
                            warn!(error = %e, "failed to send login to sidecar");
                        }
                    },
                    Some(SidecarEvent::Disconnected) if !connected_once => {
                        failed_attempts += 1;
                        if failed_attempts >= STARTUP_ATTEMPTS {
                            break Err(anyhow!(
                                "could not reach WhatsApp sidecar on port {} after {failed_attempts} attempts",
                                self.config.sidecar_port
                            ));
                        }
                    },
                    Some(SidecarEvent::Disconnected) => warn!("lost connection to WhatsApp sidecar"),
                    Some(SidecarEvent::Message(message)) => {
                        if let Err(e) = self.on_sidecar_message(message, handler.as_ref()).await {
                            break Err(e);
                        }
                    },
                },
            }
        };

        if let Some(mut process) = self.process.take()
            && let Err(e) = process.stop().await
        {
            warn!(error = %e, "failed to stop WhatsApp sidecar");
        }
        outcome
    }

    async fn on_sidecar_message(
        &self,
        message: SidecarMessage,
        handler: &dyn InboundHandler,
    ) -> Result<()> {
        match message {
            SidecarMessage::Qr { account_id, qr } => {
                info!(
                    account_id = %account_id,
                    qr = %qr,
                    "scan this QR code in WhatsApp under Linked devices to pair"
                );
            },
            SidecarMessage::Connected {
                account_id,
                phone_number,
            } => {
                info!(account_id = %account_id, phone_number = ?phone_number, "WhatsApp session connected");
            },
            SidecarMessage::Disconnected { account_id, reason } => {
                warn!(account_id = %account_id, reason = ?reason, "WhatsApp session disconnected");
            },
            SidecarMessage::LoggedOut { account_id } if account_id == self.config.account_id => {
                return Err(anyhow!(
                    "WhatsApp session logged out; remove {} and pair again",
                    self.config.session_dir.display()
                ));
            },
            SidecarMessage::Error { account_id, error } => {
                warn!(account_id = ?account_id, error = %error, "sidecar reported an error");
            },
            message @ SidecarMessage::InboundMessage { .. } => {
                if let Some(inbound) = self.converter.convert(message) {
                    #[cfg(feature = "metrics")]
                    counter!(wa_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);

                    handler.handle(inbound).await;
                }
            },
            other => debug!(message = ?other, "ignoring sidecar message"),
        }
        Ok(())
    }
}

/// Turns sidecar `inbound_message` frames into channel messages, applying
/// the self and allowlist filters.
#[derive(Debug, Clone)]
struct InboundConverter {
    account_id: String,
    allowlist: Vec<String>,
    http: reqwest::Client,
    media_base_url: String,
}

impl InboundConverter {
    fn convert(&self, message: SidecarMessage) -> Option<InboundMessage> {
        let SidecarMessage::InboundMessage {
            account_id,
            message_id,
            chat_jid,
            sender_jid,
            from_me,
            body,
            media_type,
            mime_type,
        } = message
        else {
            return None;
        };

        if from_me || account_id != self.account_id {
            return None;
        }
        if !is_allowed(&sender_jid, &self.allowlist) {
            debug!(sender = %sender_jid, "sender not in allowlist, ignoring");
            return None;
        }

        let attachment = media_type
            .as_deref()
            .and_then(|declared| attachment_kind(declared, mime_type.as_deref()))
            .map(|kind| MediaAttachment {
                kind,
                mime_type: mime_type.clone(),
                source: Arc::new(SidecarMediaSource::with_base_url(
                    self.http.clone(),
                    &self.media_base_url,
                    &account_id,
                    &message_id,
                )),
            });
        let text = body.filter(|b| !b.trim().is_empty());
        if text.is_none() && attachment.is_none() {
            return None;
        }

        Some(InboundMessage {
            sender: sender_jid,
            conversation_id: chat_jid,
            text,
            attachment,
        })
    }
}

/// Only image, video and document messages carry uploadable media.
fn attachment_kind(media_type: &str, mime_type: Option<&str>) -> Option<MediaKind> {
    let declared = match media_type {
        "image" => MediaKind::Image,
        "video" => MediaKind::Video,
        "document" => MediaKind::Document,
        _ => return None,
    };
    // Documents that are really videos or images keep their true kind.
    match (declared, mime_type.map(MediaKind::from_mime)) {
        (MediaKind::Document, Some(kind @ (MediaKind::Image | MediaKind::Video))) => Some(kind),
        _ => Some(declared),
    }
}
