use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    tracing::{debug, error, info, warn},
    tubepost_channels::{ChannelOutbound, InboundMessage, MediaAttachment},
    tubepost_media::MediaIngestor,
    tubepost_sessions::{PublishFormat, SessionGuard, SessionState, SessionStore},
    tubepost_upload::{
        PublishTarget, PublishedVideo, UploadError, UploadOrchestrator, UploadRequest,
    },
};

#[cfg(feature = "metrics")]
use tubepost_metrics::{conversation as conv_metrics, counter, gauge};

use crate::{
    parse::parse_details,
    replies::{self, CANCEL_COMMAND, CONFIRM_COMMAND, POST_COMMAND},
};

/// Executes a confirmed upload.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request: UploadRequest) -> Result<PublishedVideo, UploadError>;
}

#[async_trait]
impl Publisher for UploadOrchestrator {
    async fn publish(&self, request: UploadRequest) -> Result<PublishedVideo, UploadError> {
        self.upload(request).await
    }
}

/// Applies inbound events to the sender's session and replies.
///
/// Each call holds the sender's session lock for its whole duration,
/// including the upload that follows `confirm`.
pub struct ConversationStateMachine {
    sessions: Arc<dyn SessionStore>,
    ingestor: MediaIngestor,
    publisher: Arc<dyn Publisher>,
    outbound: Arc<dyn ChannelOutbound>,
}

impl ConversationStateMachine {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        ingestor: MediaIngestor,
        publisher: Arc<dyn Publisher>,
        outbound: Arc<dyn ChannelOutbound>,
    ) -> Self {
        Self {
            sessions,
            ingestor,
            publisher,
            outbound,
        }
    }

    /// Route a channel message: text first, then the attachment.
    /// Returns whether anything consumed it.
    pub async fn handle(&self, message: &InboundMessage) -> bool {
        if let Some(text) = message.text.as_deref()
            && self
                .on_text(&message.sender, &message.conversation_id, text)
                .await
        {
            return true;
        }
        match &message.attachment {
            Some(attachment) => {
                self.on_media_attachment(&message.sender, &message.conversation_id, attachment)
                    .await
            },
            None => false,
        }
    }

    /// Apply a text message. Returns `false` when the text means nothing in
    /// the sender's current step.
    ///
    /// Replies within a running flow go to the conversation recorded when the
    /// flow started.
    pub async fn on_text(&self, sender: &str, conversation_id: &str, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let mut slot = self.sessions.lock(sender).await;
        let reply_to = reply_destination(&slot, conversation_id);
        let consumed = match slot.as_ref() {
            None => {
                if text.eq_ignore_ascii_case(POST_COMMAND) {
                    *slot = Some(SessionState::awaiting_media(conversation_id));
                    info!(sender, "posting flow started");
                    #[cfg(feature = "metrics")]
                    counter!(conv_metrics::FLOWS_STARTED_TOTAL).increment(1);
                    self.reply(conversation_id, replies::UPLOAD_PROMPT).await;
                    true
                } else {
                    false
                }
            },
            // A running flow must be cancelled before another can start.
            Some(_) if text.eq_ignore_ascii_case(POST_COMMAND) => false,
            Some(_) if text.eq_ignore_ascii_case(CANCEL_COMMAND) => {
                let previous = slot.clear();
                info!(sender, step = ?previous.as_ref().map(SessionState::step), "posting flow cancelled");
                #[cfg(feature = "metrics")]
                counter!(conv_metrics::FLOWS_CANCELLED_TOTAL).increment(1);
                self.reply(&reply_to, replies::CANCELLED).await;
                true
            },
            Some(SessionState::AwaitingMedia { .. }) => false,
            Some(SessionState::AwaitingDetails { media_path, .. }) => {
                let media_path = media_path.clone();
                self.on_details(&mut slot, &reply_to, text, media_path)
                    .await;
                true
            },
            Some(SessionState::ReadyToPost { .. }) => {
                if text.eq_ignore_ascii_case(CONFIRM_COMMAND) {
                    self.on_confirm(&mut slot, sender).await;
                    true
                } else {
                    false
                }
            },
        };

        #[cfg(feature = "metrics")]
        counter!(conv_metrics::EVENTS_TOTAL, "kind" => "text", "consumed" => consumed.to_string())
            .increment(1);
        debug!(sender, consumed, "text event");
        drop(slot);
        self.record_active_sessions();
        consumed
    }

    /// Apply a media attachment. Only consumed while awaiting media.
    pub async fn on_media_attachment(
        &self,
        sender: &str,
        conversation_id: &str,
        attachment: &MediaAttachment,
    ) -> bool {
        let mut slot = self.sessions.lock(sender).await;
        let reply_to = reply_destination(&slot, conversation_id);
        let consumed = if matches!(slot.as_ref(), Some(SessionState::AwaitingMedia { .. })) {
            match self.ingestor.ingest(attachment).await {
                Ok(media_path) => {
                    info!(sender, path = %media_path.display(), "media received");
                    self.reply(&reply_to, replies::DETAILS_TEMPLATE).await;
                    *slot = Some(SessionState::AwaitingDetails {
                        conversation_id: reply_to,
                        media_path,
                    });
                },
                Err(e) => {
                    warn!(sender, error = %e, "failed to store media");
                    slot.clear();
                    self.reply(&reply_to, replies::MEDIA_FAILED).await;
                },
            }
            true
        } else {
            false
        };

        #[cfg(feature = "metrics")]
        counter!(conv_metrics::EVENTS_TOTAL, "kind" => "media", "consumed" => consumed.to_string())
            .increment(1);
        debug!(sender, consumed, "media event");
        drop(slot);
        self.record_active_sessions();
        consumed
    }

    async fn on_details(
        &self,
        slot: &mut SessionGuard,
        conversation_id: &str,
        text: &str,
        media_path: PathBuf,
    ) {
        let details = match parse_details(text) {
            Ok(details) => details,
            Err(e) => {
                debug!(error = %e, "details rejected");
                self.reply(conversation_id, &replies::details_error(&e))
                    .await;
                return;
            },
        };

        match SessionState::ready_to_post(
            conversation_id,
            media_path,
            details.caption.clone(),
            details.publish,
        ) {
            Ok(ready) => {
                **slot = Some(ready);
                self.reply(
                    conversation_id,
                    &replies::ready_to_post(&details.caption, details.publish.format),
                )
                .await;
            },
            // parse_details already guarantees both fields
            Err(e) => warn!(error = %e, "details parsed but state rejected them"),
        }
    }

    async fn on_confirm(&self, slot: &mut SessionGuard, sender: &str) {
        // Whatever happens next, the sender starts from Idle afterwards.
        let Some(SessionState::ReadyToPost {
            conversation_id,
            media_path,
            caption,
            publish,
        }) = slot.clear()
        else {
            return;
        };

        if !tokio::fs::try_exists(&media_path).await.unwrap_or(false) {
            warn!(sender, path = %media_path.display(), "staged media is gone");
            self.reply(&conversation_id, replies::MEDIA_NOT_FOUND).await;
            return;
        }

        self.reply(&conversation_id, replies::UPLOADING).await;

        let target = match publish.format {
            PublishFormat::Shorts => PublishTarget::YouTubeShort,
            PublishFormat::Video => PublishTarget::YouTubeVideo,
        };
        let request = UploadRequest {
            file_path: media_path,
            title: caption.clone(),
            description: caption,
            target,
        };

        match self.publisher.publish(request).await {
            Ok(video) => {
                info!(sender, url = %video.url, "posted to YouTube");
                self.reply(&conversation_id, &replies::upload_complete(&video.url))
                    .await;
            },
            Err(e) => {
                if let UploadError::Auth(auth) = &e {
                    error!(sender, error = %auth, "YouTube authorization failed, run `tubepost auth login`");
                } else {
                    warn!(sender, error = %e, "upload failed");
                }
                self.reply(&conversation_id, &replies::upload_failed(&e))
                    .await;
            },
        }
    }

    async fn reply(&self, conversation_id: &str, text: &str) {
        if let Err(e) = self.outbound.send_text(conversation_id, text).await {
            warn!(conversation_id, error = %e, "failed to send reply");
        }
    }

    fn record_active_sessions(&self) {
        let active = self.sessions.active_sessions();
        #[cfg(feature = "metrics")]
        gauge!(conv_metrics::ACTIVE_SESSIONS).set(active as f64);
        debug!(active, "active posting flows");
    }
}

/// Where replies for this event go: the flow's recorded conversation, or the
/// event's own when the sender is idle.
fn reply_destination(slot: &SessionGuard, conversation_id: &str) -> String {
    slot.as_ref()
        .map_or(conversation_id, SessionState::conversation_id)
        .to_string()
}
