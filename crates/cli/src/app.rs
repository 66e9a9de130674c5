//! Builds the service graph from config and runs the chat bot.

use std::{sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    tracing::{debug, info, warn},
    tubepost_channels::InboundMessage,
    tubepost_config::TubepostConfig,
    tubepost_conversation::{ConversationStateMachine, FallThrough, InboundDispatcher},
    tubepost_media::{FfprobeProbe, FormatValidator, MediaIngestor},
    tubepost_oauth::{
        CredentialManager, CredentialProvider, CredentialStore, OAuthConfig, OAuthFlow,
        provider_from_config,
    },
    tubepost_sessions::InMemorySessionStore,
    tubepost_upload::UploadOrchestrator,
    tubepost_whatsapp::WhatsAppChannel,
    tubepost_youtube::YouTubeClient,
};

/// Credential manager using the configured code provider.
pub fn credential_manager(config: &TubepostConfig) -> Result<CredentialManager> {
    credential_manager_with(config, provider_from_config(&config.auth))
}

pub fn credential_manager_with(
    config: &TubepostConfig,
    provider: Arc<dyn CredentialProvider>,
) -> Result<CredentialManager> {
    let oauth = OAuthConfig::from_google(&config.google)
        .context("Google OAuth client is not configured")?;
    Ok(CredentialManager::new(
        CredentialStore::new(config.token_path()),
        OAuthFlow::new(oauth),
        provider,
        Duration::from_secs(config.auth.code_timeout_secs),
    ))
}

pub fn upload_orchestrator(
    config: &TubepostConfig,
    credentials: Arc<CredentialManager>,
) -> UploadOrchestrator {
    let probe = Arc::new(FfprobeProbe::new(config.media.ffprobe.clone()));
    UploadOrchestrator::new(
        credentials,
        Arc::new(YouTubeClient::new(config.upload.upload_base_url.clone())),
        FormatValidator::new(probe),
        config.upload.category_id.clone(),
        Duration::from_secs(config.upload.timeout_secs),
    )
}

/// Serve the posting conversation over WhatsApp until Ctrl-C.
pub async fn run(config: TubepostConfig) -> Result<()> {
    let credentials = Arc::new(credential_manager(&config)?);

    // Authorize up front so the first confirm does not stall on a prompt.
    match credentials.get_valid_credential().await {
        Ok(_) => info!("YouTube credential ready"),
        Err(e) => warn!(error = %e, "YouTube credential not ready, will retry on first upload"),
    }

    let orchestrator = Arc::new(upload_orchestrator(&config, Arc::clone(&credentials)));
    let channel = WhatsAppChannel::start(config.whatsapp.clone())
        .await
        .context("failed to start WhatsApp channel")?;

    let machine = Arc::new(ConversationStateMachine::new(
        Arc::new(InMemorySessionStore::new()),
        MediaIngestor::new(config.media.dir.clone()),
        orchestrator,
        channel.outbound(),
    ));
    let fall_through: FallThrough = Arc::new(|message: InboundMessage| {
        debug!(sender = %message.sender, "message not part of a posting flow");
    });
    let dispatcher = Arc::new(InboundDispatcher::new(machine).with_fall_through(fall_through));

    info!(
        media_dir = %config.media.dir.display(),
        port = config.whatsapp.sidecar_port,
        "tubepost is running, send \"post content\" on WhatsApp to start"
    );
    channel
        .run(dispatcher, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
