use {async_trait::async_trait, std::sync::Arc, tracing::debug};

#[cfg(feature = "metrics")]
use tubepost_metrics::{counter, whatsapp as wa_metrics};

use tubepost_channels::{ChannelOutbound, Result};

use crate::sidecar::SidecarConnection;

/// Replies through the sidecar's `send_text`.
#[derive(Clone)]
pub struct WhatsAppOutbound {
    connection: Arc<SidecarConnection>,
    account_id: String,
}

impl WhatsAppOutbound {
    pub fn new(connection: Arc<SidecarConnection>, account_id: impl Into<String>) -> Self {
        Self {
            connection,
            account_id: account_id.into(),
        }
    }
}

#[async_trait]
impl ChannelOutbound for WhatsAppOutbound {
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()> {
        debug!(to = conversation_id, len = text.len(), "sending WhatsApp reply");
        self.connection
            .send_text(&self.account_id, conversation_id, text)
            .await?;

        #[cfg(feature = "metrics")]
        counter!(wa_metrics::MESSAGES_SENT_TOTAL).increment(1);

        Ok(())
    }
}
