//! Metric name and label definitions.
//!
//! All metric names used throughout tubepost live here so they stay consistent
//! across crates.

/// Conversation / inbound event metrics
pub mod conversation {
    /// Inbound events handled by the state machine, labelled by `kind` and `consumed`
    pub const EVENTS_TOTAL: &str = "tubepost_conversation_events_total";
    /// Flows started with the `post content` command
    pub const FLOWS_STARTED_TOTAL: &str = "tubepost_conversation_flows_started_total";
    /// Flows cancelled by the user
    pub const FLOWS_CANCELLED_TOTAL: &str = "tubepost_conversation_flows_cancelled_total";
    /// Active per-sender worker queues
    pub const ACTIVE_SENDER_QUEUES: &str = "tubepost_conversation_active_sender_queues";
    /// Senders with a posting flow in progress
    pub const ACTIVE_SESSIONS: &str = "tubepost_conversation_active_sessions";
}

/// Media ingest and validation metrics
pub mod media {
    /// Attachments written to the media directory
    pub const INGESTED_TOTAL: &str = "tubepost_media_ingested_total";
    /// Attachment ingest failures
    pub const INGEST_ERRORS_TOTAL: &str = "tubepost_media_ingest_errors_total";
    /// Bytes written to the media directory
    pub const INGESTED_BYTES_TOTAL: &str = "tubepost_media_ingested_bytes_total";
    /// Short-form validation rejections, labelled by `reason`
    pub const VALIDATION_REJECTIONS_TOTAL: &str = "tubepost_media_validation_rejections_total";
}

/// OAuth credential metrics
pub mod oauth {
    /// Interactive authorization flows started
    pub const FLOW_STARTS_TOTAL: &str = "tubepost_oauth_flow_starts_total";
    /// Authorization code exchanges
    pub const CODE_EXCHANGE_TOTAL: &str = "tubepost_oauth_code_exchange_total";
    /// Authorization code exchange failures
    pub const CODE_EXCHANGE_ERRORS_TOTAL: &str = "tubepost_oauth_code_exchange_errors_total";
    /// Token refreshes
    pub const TOKEN_REFRESH_TOTAL: &str = "tubepost_oauth_token_refresh_total";
    /// Token refresh failures
    pub const TOKEN_REFRESH_FAILURES_TOTAL: &str = "tubepost_oauth_token_refresh_failures_total";
}

/// Platform upload metrics
pub mod upload {
    /// Upload attempts, labelled by `format` and `status`
    pub const UPLOADS_TOTAL: &str = "tubepost_upload_uploads_total";
    /// Wall-clock upload duration in seconds
    pub const UPLOAD_DURATION_SECONDS: &str = "tubepost_upload_duration_seconds";
    /// Bytes streamed to the platform
    pub const UPLOADED_BYTES_TOTAL: &str = "tubepost_upload_uploaded_bytes_total";
}

/// Transport (WhatsApp sidecar) metrics
pub mod whatsapp {
    /// Inbound messages received from the sidecar
    pub const MESSAGES_RECEIVED_TOTAL: &str = "tubepost_whatsapp_messages_received_total";
    /// Outbound text messages sent through the sidecar
    pub const MESSAGES_SENT_TOTAL: &str = "tubepost_whatsapp_messages_sent_total";
}

/// Histogram bucket boundaries.
pub mod buckets {
    /// Upload durations: 1s to 30 minutes
    pub const UPLOAD_DURATION: &[f64] = &[
        1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0, 1800.0,
    ];
}
