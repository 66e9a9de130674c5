//! WhatsApp Web transport via a Baileys sidecar.
//!
//! The sidecar (a Node.js process) owns the WhatsApp session. This crate talks
//! to it over a local WebSocket, turns its inbound messages into
//! [`tubepost_channels::InboundMessage`]s and sends replies through it.
//!
//! # Sidecar contract
//!
//! **Location and build.** A Node.js package at `sidecar/whatsapp-baileys`
//! (see [`find_sidecar_dir`] for the search order, or set
//! `TUBEPOST_WHATSAPP_SIDECAR_DIR`). [`start_sidecar`] runs `npm install` and
//! `npm run build` when `dist/index.js` is missing, then launches
//! `node dist/index.js` from that directory. Stdout is read as pino JSON lines
//! and re-emitted under the `whatsapp_sidecar` tracing target.
//!
//! **Environment.** The process receives `TUBEPOST_WHATSAPP_PORT` (the port to
//! listen on) and, when configured, `TUBEPOST_WHATSAPP_AUTH_DIR` (where the
//! Baileys auth state lives).
//!
//! **WebSocket.** The sidecar serves `ws://127.0.0.1:{port}`. Every frame is a
//! JSON text message with a snake_case `type` tag ([`types`]).
//!
//! Gateway to sidecar:
//!
//! | `type`      | fields                                  |
//! |-------------|-----------------------------------------|
//! | `login`     | `account_id`, optional `auth_dir`       |
//! | `logout`    | `account_id`                            |
//! | `send_text` | `request_id`, `account_id`, `to`, `text` |
//!
//! Sidecar to gateway:
//!
//! | `type`            | fields |
//! |-------------------|--------|
//! | `qr`              | `account_id`, `qr` |
//! | `connected`       | `account_id`, optional `phone_number` |
//! | `disconnected`    | `account_id`, optional `reason` |
//! | `logged_out`      | `account_id` |
//! | `inbound_message` | `account_id`, `message_id`, `chat_jid`, `sender_jid`, `from_me`, optional `body`, `media_type`, `mime_type` |
//! | `send_result`     | `request_id`, `success`, optional `error` |
//! | `error`           | optional `account_id`, `error` |
//!
//! Each `send_text` is answered by a `send_result` with the same `request_id`.
//! Unknown frame types are logged and skipped.
//!
//! **Media.** Attachment bytes are not sent over the socket. The sidecar
//! serves them at `GET http://127.0.0.1:{port}/media/{account_id}/{message_id}`
//! for messages whose `inbound_message` carried a `media_type`. Any non-2xx
//! status is a failed download ([`SidecarMediaSource`]).

pub mod media;
pub mod outbound;
pub mod plugin;
pub mod process;
pub mod sidecar;
pub mod types;

pub use {
    media::SidecarMediaSource,
    outbound::WhatsAppOutbound,
    plugin::WhatsAppChannel,
    process::{SidecarConfig, SidecarProcess, find_sidecar_dir, start_sidecar},
    sidecar::{SidecarConnection, SidecarEvent},
    types::{GatewayMessage, SidecarMessage},
};
