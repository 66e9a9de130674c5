#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    tubepost_channels::{
        BytesSource, ChannelOutbound, InboundMessage, MediaAttachment, MediaKind, MediaSource,
    },
    tubepost_conversation::{ConversationStateMachine, InboundDispatcher, Publisher, replies},
    tubepost_media::MediaIngestor,
    tubepost_sessions::{InMemorySessionStore, SessionState, SessionStore, Step},
    tubepost_upload::{PublishTarget, PublishedVideo, UploadError, UploadRequest},
};

const ALICE: &str = "15551230000@s.whatsapp.net";
const GROUP: &str = "120363041234567890@g.us";

/// Attachment whose download always fails.
struct UnreachableSource;

#[async_trait]
impl MediaSource for UnreachableSource {
    async fn fetch(&self) -> tubepost_channels::Result<Bytes> {
        Err(tubepost_channels::Error::unavailable("media download returned 404"))
    }
}

#[derive(Default)]
struct RecordingOutbound {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingOutbound {
    fn destinations(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    fn last(&self) -> String {
        self.texts().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ChannelOutbound for RecordingOutbound {
    async fn send_text(&self, conversation_id: &str, text: &str) -> tubepost_channels::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct FakePublisher {
    requests: Mutex<Vec<UploadRequest>>,
    fail: bool,
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, request: UploadRequest) -> Result<PublishedVideo, UploadError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(UploadError::MissingVideoId);
        }
        Ok(PublishedVideo {
            video_id: "vid42".into(),
            url: request.target.video_url("vid42"),
        })
    }
}

struct Harness {
    media_dir: tempfile::TempDir,
    sessions: Arc<InMemorySessionStore>,
    outbound: Arc<RecordingOutbound>,
    publisher: Arc<FakePublisher>,
    machine: Arc<ConversationStateMachine>,
}

impl Harness {
    fn new() -> Self {
        Self::with_publisher(FakePublisher::default())
    }

    fn with_publisher(publisher: FakePublisher) -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(InMemorySessionStore::new());
        let outbound = Arc::new(RecordingOutbound::default());
        let publisher = Arc::new(publisher);
        let machine = Arc::new(ConversationStateMachine::new(
            sessions.clone(),
            MediaIngestor::new(media_dir.path().join("media")),
            publisher.clone(),
            outbound.clone(),
        ));
        Self {
            media_dir,
            sessions,
            outbound,
            publisher,
            machine,
        }
    }

    async fn text(&self, text: &str) -> bool {
        self.machine.on_text(ALICE, ALICE, text).await
    }

    async fn media(&self, kind: MediaKind, mime: &str) -> bool {
        let attachment = MediaAttachment {
            kind,
            mime_type: Some(mime.into()),
            source: Arc::new(BytesSource(Bytes::from_static(b"payload"))),
        };
        self.machine.on_media_attachment(ALICE, ALICE, &attachment).await
    }

    async fn state(&self) -> Option<SessionState> {
        self.sessions.lock(ALICE).await.clone()
    }

    async fn step(&self) -> Step {
        Step::of(self.state().await.as_ref())
    }

    async fn media_path(&self) -> PathBuf {
        self.state().await.unwrap().media_path().unwrap().clone()
    }

    fn platform_calls(&self) -> usize {
        self.publisher.requests.lock().unwrap().len()
    }

    async fn ready_to_post(&self) {
        self.text("post content").await;
        self.media(MediaKind::Video, "video/mp4").await;
        self.text("Caption: Hello\nYoutube: Yes\nYoutube format: shorts").await;
        assert_eq!(self.step().await, Step::ReadyToPost);
    }
}

#[tokio::test]
async fn scenario_1_post_content_starts_flow() {
    let h = Harness::new();
    assert!(h.text("Post Content").await);
    assert_eq!(h.step().await, Step::AwaitingMedia);
    assert_eq!(
        h.outbound.last(),
        "📎 Please upload an image or video file to continue."
    );
}

#[tokio::test]
async fn scenario_2_image_is_stored_with_mime_extension() {
    for (mime, ext) in [("image/png", "png"), ("image/jpeg", "jpeg"), ("image/webp", "jpg")] {
        let h = Harness::new();
        h.text("post content").await;
        assert!(h.media(MediaKind::Image, mime).await);

        assert_eq!(h.step().await, Step::AwaitingDetails);
        let path = h.media_path().await;
        assert_eq!(path.extension().unwrap(), ext);
        assert!(path.starts_with(h.media_dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        assert!(h.outbound.last().contains("Youtube format: shorts/video"));
    }
}

#[tokio::test]
async fn scenario_3_details_move_to_ready_to_post() {
    let h = Harness::new();
    h.text("post content").await;
    h.media(MediaKind::Video, "video/mp4").await;

    assert!(h.text("Caption: Hello\nYoutube: Yes\nYoutube format: shorts").await);
    assert_eq!(h.step().await, Step::ReadyToPost);
    let reply = h.outbound.last();
    assert!(reply.contains("Hello"));
    assert!(reply.contains("shorts"));
}

#[tokio::test]
async fn scenario_4_missing_youtube_line_holds_state() {
    let h = Harness::new();
    h.text("post content").await;
    h.media(MediaKind::Video, "video/mp4").await;

    assert!(h.text("Caption: Hello").await);
    assert_eq!(h.step().await, Step::AwaitingDetails);
    assert_eq!(
        h.outbound.last(),
        "⚠️ You must enable YouTube to proceed (add `Youtube: Yes`)."
    );

    // the user can still correct it
    assert!(h.text("Caption: Hello\nYoutube: yes").await);
    assert_eq!(h.step().await, Step::ReadyToPost);
}

#[tokio::test]
async fn scenario_5_confirm_with_missing_file() {
    let h = Harness::new();
    h.ready_to_post().await;
    std::fs::remove_file(h.media_path().await).unwrap();

    assert!(h.text("confirm").await);
    assert_eq!(h.step().await, Step::Idle);
    assert_eq!(
        h.outbound.last(),
        "❌ Media file not found. Please start again with *post content*."
    );
    assert_eq!(h.platform_calls(), 0);
}

#[tokio::test]
async fn scenario_6_cancel_from_ready_to_post() {
    let h = Harness::new();
    h.ready_to_post().await;
    let path = h.media_path().await;

    assert!(h.text("CANCEL").await);
    assert_eq!(h.step().await, Step::Idle);
    assert_eq!(
        h.outbound.last(),
        "❌ Upload canceled. Start again by typing *post content*."
    );
    assert!(path.exists());
    assert_eq!(h.platform_calls(), 0);
}

#[tokio::test]
async fn confirm_uploads_and_resets() {
    let h = Harness::new();
    h.ready_to_post().await;
    let path = h.media_path().await;

    assert!(h.text("Confirm").await);
    assert_eq!(h.step().await, Step::Idle);

    let texts = h.outbound.texts();
    let n = texts.len();
    assert_eq!(texts[n - 2], "🚀 Uploading to YouTube... This may take a moment.");
    assert_eq!(
        texts[n - 1],
        "✅ Upload complete!\n\n📺 YouTube: https://www.youtube.com/shorts/vid42"
    );

    let requests = h.publisher.requests.lock().unwrap();
    assert_eq!(requests[0].file_path, path);
    assert_eq!(requests[0].title, "Hello");
    assert_eq!(requests[0].description, "Hello");
    assert_eq!(requests[0].target, PublishTarget::YouTubeShort);
}

#[tokio::test]
async fn failed_upload_still_resets() {
    let h = Harness::with_publisher(FakePublisher {
        fail: true,
        ..FakePublisher::default()
    });
    h.ready_to_post().await;

    assert!(h.text("confirm").await);
    assert_eq!(h.step().await, Step::Idle);
    assert_eq!(
        h.outbound.last(),
        "❌ Upload failed: upload completed but no video ID returned"
    );
}

#[tokio::test]
async fn unrelated_text_falls_through() {
    let h = Harness::new();
    assert!(!h.text("hello bot").await);
    assert!(!h.text("   ").await);

    h.text("post content").await;
    assert!(!h.text("what now?").await, "text while awaiting media");
    assert!(!h.text("post content").await, "restart while active");
    assert_eq!(h.step().await, Step::AwaitingMedia);

    h.media(MediaKind::Video, "video/quicktime").await;
    h.text("Caption: x\nYoutube: yes\nYoutube format: video").await;
    assert!(!h.text("maybe later").await, "text while ready to post");
    assert_eq!(h.step().await, Step::ReadyToPost);
}

#[tokio::test]
async fn media_outside_awaiting_media_is_ignored() {
    let h = Harness::new();
    assert!(!h.media(MediaKind::Image, "image/png").await);
    h.ready_to_post().await;
    assert!(!h.media(MediaKind::Image, "image/png").await);
    assert_eq!(h.step().await, Step::ReadyToPost);
}

#[tokio::test]
async fn cancel_works_in_every_active_step() {
    let h = Harness::new();
    assert!(!h.text("cancel").await, "nothing to cancel when idle");

    h.text("post content").await;
    assert!(h.text("cancel").await);
    assert_eq!(h.step().await, Step::Idle);

    h.text("post content").await;
    h.media(MediaKind::Video, "video/mp4").await;
    assert!(h.text("cancel").await);
    assert_eq!(h.step().await, Step::Idle);
}

#[tokio::test]
async fn dispatcher_applies_one_senders_events_in_order() {
    let h = Harness::new();
    let dispatcher = InboundDispatcher::new(h.machine.clone());

    dispatcher.dispatch(InboundMessage::text(ALICE, ALICE, "post content"));
    dispatcher.dispatch(InboundMessage::media(ALICE, ALICE, MediaAttachment {
        kind: MediaKind::Video,
        mime_type: Some("video/mp4".into()),
        source: Arc::new(BytesSource(Bytes::from_static(b"v"))),
    }));
    dispatcher.dispatch(InboundMessage::text(
        ALICE,
        ALICE,
        "Caption: queued\nYoutube: yes",
    ));

    for _ in 0..100 {
        if dispatcher.active_senders() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(dispatcher.active_senders(), 0);
    assert_eq!(h.step().await, Step::ReadyToPost);
}

#[tokio::test]
async fn dispatcher_hands_unconsumed_messages_to_fall_through() {
    let h = Harness::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let dispatcher = InboundDispatcher::new(h.machine.clone()).with_fall_through(Arc::new(
        move |message: InboundMessage| {
            sink.lock().unwrap().push(message.text.unwrap_or_default());
        },
    ));

    dispatcher.dispatch(InboundMessage::text(ALICE, ALICE, "good morning"));
    for _ in 0..100 {
        if !seen.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*seen.lock().unwrap(), vec!["good morning".to_string()]);
}

#[tokio::test]
async fn failed_media_download_resets_to_idle() {
    let h = Harness::new();
    h.text("post content").await;

    let attachment = MediaAttachment {
        kind: MediaKind::Video,
        mime_type: Some("video/mp4".into()),
        source: Arc::new(UnreachableSource),
    };
    assert!(h.machine.on_media_attachment(ALICE, ALICE, &attachment).await);

    assert_eq!(h.step().await, Step::Idle);
    assert_eq!(h.outbound.last(), replies::MEDIA_FAILED);
    assert_eq!(h.platform_calls(), 0);
    assert!(!h.media_dir.path().join("media").exists());
}

#[tokio::test]
async fn replies_follow_the_conversation_that_started_the_flow() {
    let h = Harness::new();
    assert!(h.machine.on_text(ALICE, GROUP, "post content").await);
    assert_eq!(h.sessions.active_sessions(), 1);

    // The rest of the flow arrives in the direct chat.
    assert!(h.media(MediaKind::Video, "video/mp4").await);
    assert!(h.text("Caption: Team clip\nYoutube: yes").await);
    assert!(h.text("confirm").await);

    assert_eq!(h.step().await, Step::Idle);
    assert_eq!(h.sessions.active_sessions(), 0);
    assert_eq!(h.platform_calls(), 1);
    let destinations = h.outbound.destinations();
    assert_eq!(destinations.len(), 5);
    assert!(destinations.iter().all(|c| c == GROUP), "{destinations:?}");
}

#[tokio::test]
async fn cancel_replies_to_the_flow_conversation() {
    let h = Harness::new();
    h.machine.on_text(ALICE, GROUP, "post content").await;
    assert!(h.text("cancel").await);

    assert_eq!(h.outbound.destinations(), vec![GROUP.to_string(), GROUP.to_string()]);
    assert_eq!(h.outbound.last(), replies::CANCELLED);
}
