//! JSON frames exchanged with the sidecar, tagged by `type`.

use serde::{Deserialize, Serialize};

/// Gateway → sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayMessage {
    /// Open (or resume) the WhatsApp session stored in `auth_dir`.
    Login {
        account_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        auth_dir: Option<String>,
    },
    Logout {
        account_id: String,
    },
    SendText {
        request_id: String,
        account_id: String,
        to: String,
        text: String,
    },
}

/// Sidecar → gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarMessage {
    /// Pairing QR payload to scan with the phone.
    Qr {
        account_id: String,
        qr: String,
    },
    Connected {
        account_id: String,
        #[serde(default)]
        phone_number: Option<String>,
    },
    Disconnected {
        account_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
    /// The phone unlinked this device; the session must be paired again.
    LoggedOut {
        account_id: String,
    },
    InboundMessage {
        account_id: String,
        message_id: String,
        /// Chat the message arrived in (`remoteJid`).
        chat_jid: String,
        /// Participant in groups, otherwise the chat JID.
        sender_jid: String,
        #[serde(default)]
        from_me: bool,
        #[serde(default)]
        body: Option<String>,
        /// `image`, `video`, `document`, `audio`, `sticker`.
        #[serde(default)]
        media_type: Option<String>,
        #[serde(default)]
        mime_type: Option<String>,
    },
    SendResult {
        request_id: String,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    Error {
        #[serde(default)]
        account_id: Option<String>,
        error: String,
    },
}
