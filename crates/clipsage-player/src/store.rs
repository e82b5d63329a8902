//! Player store.
//!
//! Closing is two-phase. The modal flag drops at once, while the session data
//! stays readable for a grace period so a closing animation can still render
//! it. A spawned task wipes the session afterwards unless the player was
//! reopened in the meantime.

use std::sync::Arc;
use std::time::Duration;

use clipsage_core::{
    ChangeBus, Notifier, OpStatus, Result, StatusCell, StoreKind, Video, VideoChunk,
};
use clipsage_gateway::BackendGateway;
use clipsage_notify::NotificationCenter;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Snapshot of the player slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerState {
    pub is_modal_open: bool,
    pub current_video_id: Option<String>,
    pub current_chunk_id: Option<String>,
    /// Playback start in seconds.
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub video: Option<Video>,
    pub chunks: Vec<VideoChunk>,
}

/// Where the player is in its open/close cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Closed,
    Open,
    /// Modal hidden, session not yet cleared.
    Closing,
}

/// Optional playback position for [`VideoPlayerStore::open_video`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayOptions {
    pub chunk_id: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

/// State reachable from the deferred clear task.
struct Session {
    state: RwLock<PlayerState>,
    status: StatusCell,
    notifier: Notifier,
}

impl Session {
    fn clear(&self) {
        *self.state.write() = PlayerState::default();
        self.status.reset();
        self.notifier.notify("session");
    }

    /// Deferred half of a close. Leaves `loading` alone so an open that is
    /// still fetching keeps its flag. Returns false if the player was
    /// reopened in the meantime.
    fn clear_if_closed(&self) -> bool {
        {
            let mut state = self.state.write();
            if state.is_modal_open {
                return false;
            }
            *state = PlayerState::default();
        }
        self.status.clear_error();
        self.notifier.notify("session");
        true
    }
}

pub struct VideoPlayerStore {
    gateway: Arc<dyn BackendGateway>,
    toasts: Arc<NotificationCenter>,
    session: Arc<Session>,
    close_grace: Duration,
    pending_clear: Mutex<Option<JoinHandle<()>>>,
}

impl VideoPlayerStore {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        toasts: Arc<NotificationCenter>,
        bus: &ChangeBus,
        close_grace: Duration,
    ) -> Self {
        let notifier = bus.notifier(StoreKind::Player);
        Self {
            gateway,
            toasts,
            session: Arc::new(Session {
                state: RwLock::new(PlayerState::default()),
                status: StatusCell::new(notifier.clone()),
                notifier,
            }),
            close_grace,
            pending_clear: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> PlayerState {
        self.session.state.read().clone()
    }

    pub fn is_modal_open(&self) -> bool {
        self.session.state.read().is_modal_open
    }

    pub fn current_video_id(&self) -> Option<String> {
        self.session.state.read().current_video_id.clone()
    }

    pub fn current_chunk_id(&self) -> Option<String> {
        self.session.state.read().current_chunk_id.clone()
    }

    pub fn video(&self) -> Option<Video> {
        self.session.state.read().video.clone()
    }

    pub fn chunks(&self) -> Vec<VideoChunk> {
        self.session.state.read().chunks.clone()
    }

    /// Playback range as `(start, end)`.
    pub fn time_range(&self) -> (f64, Option<f64>) {
        let state = self.session.state.read();
        (state.start_time, state.end_time)
    }

    pub fn status(&self) -> OpStatus {
        self.session.status.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.session.status.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.session.status.error()
    }

    pub fn phase(&self) -> Phase {
        let state = self.session.state.read();
        match (state.is_modal_open, state.current_video_id.is_some()) {
            (true, _) => Phase::Open,
            (false, true) => Phase::Closing,
            (false, false) => Phase::Closed,
        }
    }

    // ---------------------------------------------------------------
    // Open / close
    // ---------------------------------------------------------------

    /// Load a video and its chunks, then open the modal on them.
    ///
    /// Nothing is shown unless both fetches succeed. A clear pending from an
    /// earlier close is only dropped once the new session is committed, so a
    /// failed reopen still ends in the closed state.
    pub async fn open_video(&self, video_id: &str, options: PlayOptions) -> Result<()> {
        let _loading = self.session.status.begin();

        let fetched = tokio::try_join!(
            self.gateway.get_video(video_id),
            self.gateway.get_video_chunks(video_id),
        );

        match fetched {
            Ok((video, chunks)) => {
                self.cancel_pending_clear();
                {
                    let mut state = self.session.state.write();
                    *state = PlayerState {
                        is_modal_open: true,
                        current_video_id: Some(video_id.to_string()),
                        current_chunk_id: options.chunk_id,
                        start_time: options.start_time.unwrap_or(0.0),
                        end_time: options.end_time,
                        video: Some(video),
                        chunks: chunks.chunks,
                    };
                }
                self.session.notifier.notify("session");
                info!("Player opened {}", video_id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to open video {}: {}", video_id, e);
                self.session.status.fail(&e);
                self.toasts.error("Failed to load video", None);
                Err(e)
            }
        }
    }

    /// Hide the modal now and clear the session after the grace period.
    pub fn close_video(&self) {
        self.session.state.write().is_modal_open = false;
        self.session.notifier.notify("session");

        let mut pending = self.pending_clear.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let session = self.session.clone();
                let grace = self.close_grace;
                *pending = Some(runtime.spawn(async move {
                    tokio::time::sleep(grace).await;
                    if session.clear_if_closed() {
                        debug!("Player session cleared");
                    }
                }));
            }
            Err(_) => {
                warn!("No async runtime, clearing player session immediately");
                self.session.clear_if_closed();
            }
        }
    }

    /// Clear everything now, dropping any pending deferred clear.
    pub fn reset(&self) {
        self.cancel_pending_clear();
        self.session.clear();
    }

    fn cancel_pending_clear(&self) {
        if let Some(handle) = self.pending_clear.lock().take() {
            handle.abort();
        }
    }

    // ---------------------------------------------------------------
    // Chunk navigation
    // ---------------------------------------------------------------

    /// Make `chunk_id` the active chunk. When the chunk itself is supplied
    /// its bounds become the playback range.
    pub fn set_current_chunk(&self, chunk_id: &str, chunk: Option<&VideoChunk>) {
        {
            let mut state = self.session.state.write();
            state.current_chunk_id = Some(chunk_id.to_string());
            if let Some(chunk) = chunk {
                state.start_time = chunk.start_time;
                state.end_time = Some(chunk.end_time);
            }
        }
        self.session.notifier.notify("chunk");
    }

    /// Jump to a chunk of the loaded video. Returns false when the chunk is
    /// not part of the current session.
    pub fn select_chunk(&self, chunk_id: &str) -> bool {
        let chunk = self
            .session
            .state
            .read()
            .chunks
            .iter()
            .find(|c| c.chunk_id == chunk_id)
            .cloned();
        match chunk {
            Some(chunk) => {
                self.set_current_chunk(chunk_id, Some(&chunk));
                true
            }
            None => false,
        }
    }
}

impl Drop for VideoPlayerStore {
    fn drop(&mut self) {
        self.cancel_pending_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsage_gateway::{InMemoryBackend, Operation};
    use clipsage_notify::Severity;

    const GRACE: Duration = Duration::from_millis(100);

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        toasts: Arc<NotificationCenter>,
        player: Arc<VideoPlayerStore>,
    }

    fn fixture() -> Fixture {
        let bus = ChangeBus::new(64);
        let backend = Arc::new(InMemoryBackend::with_sample_catalog());
        let toasts = Arc::new(NotificationCenter::new(bus.notifier(StoreKind::Notifications)));
        let player = Arc::new(VideoPlayerStore::new(
            backend.clone(),
            toasts.clone(),
            &bus,
            GRACE,
        ));
        Fixture {
            backend,
            toasts,
            player,
        }
    }

    #[tokio::test]
    async fn test_open_with_defaults() {
        let f = fixture();
        f.player
            .open_video("vid-harbor", PlayOptions::default())
            .await
            .unwrap();

        let state = f.player.snapshot();
        assert!(state.is_modal_open);
        assert_eq!(state.current_video_id.as_deref(), Some("vid-harbor"));
        assert!(state.current_chunk_id.is_none());
        assert_eq!(state.start_time, 0.0);
        assert!(state.end_time.is_none());
        assert_eq!(state.video.unwrap().title, "Harbor at dawn");
        assert_eq!(state.chunks.len(), 2);
        assert_eq!(f.player.phase(), Phase::Open);
        assert!(!f.player.is_loading());
    }

    #[tokio::test]
    async fn test_open_at_chunk_range() {
        let f = fixture();
        f.player
            .open_video(
                "vid-kitchen",
                PlayOptions {
                    chunk_id: Some("vid-kitchen-c1".into()),
                    start_time: Some(15.0),
                    end_time: Some(30.0),
                },
            )
            .await
            .unwrap();
        assert_eq!(f.player.current_chunk_id().as_deref(), Some("vid-kitchen-c1"));
        assert_eq!(f.player.time_range(), (15.0, Some(30.0)));
    }

    #[tokio::test]
    async fn test_open_failure_shows_nothing() {
        let f = fixture();
        f.backend.fail(Operation::GetVideoChunks, "chunk index missing");

        let err = f
            .player
            .open_video("vid-harbor", PlayOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "chunk index missing");
        assert_eq!(f.player.snapshot(), PlayerState::default());
        assert_eq!(f.player.phase(), Phase::Closed);
        assert_eq!(f.player.error().as_deref(), Some("chunk index missing"));
        assert_eq!(f.toasts.toasts()[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_open_unknown_video_fails() {
        let f = fixture();
        assert!(f
            .player
            .open_video("vid-ghost", PlayOptions::default())
            .await
            .is_err());
        assert!(!f.player.is_modal_open());
    }

    #[tokio::test]
    async fn test_close_is_two_phase() {
        let f = fixture();
        f.player
            .open_video("vid-harbor", PlayOptions::default())
            .await
            .unwrap();

        f.player.close_video();
        assert!(!f.player.is_modal_open());
        assert_eq!(f.player.current_video_id().as_deref(), Some("vid-harbor"));
        assert_eq!(f.player.phase(), Phase::Closing);

        tokio::time::sleep(GRACE / 3).await;
        assert!(f.player.video().is_some());

        tokio::time::sleep(GRACE * 2).await;
        assert_eq!(f.player.snapshot(), PlayerState::default());
        assert_eq!(f.player.phase(), Phase::Closed);
    }

    #[tokio::test]
    async fn test_close_clears_error_after_grace() {
        let f = fixture();
        f.backend.fail(Operation::GetVideo, "gone");
        let _ = f.player.open_video("vid-harbor", PlayOptions::default()).await;
        assert!(f.player.error().is_some());

        f.player.close_video();
        tokio::time::sleep(GRACE * 2).await;
        assert!(f.player.error().is_none());
    }

    #[tokio::test]
    async fn test_reopen_during_grace_keeps_new_session() {
        let f = fixture();
        f.player
            .open_video("vid-harbor", PlayOptions::default())
            .await
            .unwrap();
        f.player.close_video();
        f.player
            .open_video("vid-kitchen", PlayOptions::default())
            .await
            .unwrap();

        tokio::time::sleep(GRACE * 2).await;
        assert!(f.player.is_modal_open());
        assert_eq!(f.player.current_video_id().as_deref(), Some("vid-kitchen"));
    }

    #[tokio::test]
    async fn test_failed_reopen_during_grace_still_closes() {
        let f = fixture();
        f.player
            .open_video("vid-harbor", PlayOptions::default())
            .await
            .unwrap();
        f.player.close_video();

        f.backend.fail(Operation::GetVideo, "metadata unavailable");
        assert!(f
            .player
            .open_video("vid-kitchen", PlayOptions::default())
            .await
            .is_err());

        tokio::time::sleep(GRACE * 3).await;
        assert_eq!(f.player.phase(), Phase::Closed);
        assert!(f.player.current_video_id().is_none());
        assert!(f.player.video().is_none());
        assert!(f.player.chunks().is_empty());
    }

    #[tokio::test]
    async fn test_deferred_clear_keeps_loading_of_slow_reopen() {
        let f = fixture();
        f.player
            .open_video("vid-harbor", PlayOptions::default())
            .await
            .unwrap();
        f.player.close_video();
        f.backend.set_latency(Operation::GetVideo, GRACE * 3);

        let player = f.player.clone();
        let reopen = tokio::spawn(async move {
            player
                .open_video("vid-kitchen", PlayOptions::default())
                .await
        });

        tokio::time::sleep(GRACE * 2).await;
        assert_eq!(f.player.phase(), Phase::Closed);
        assert!(f.player.is_loading());

        reopen.await.unwrap().unwrap();
        assert!(!f.player.is_loading());
        assert_eq!(f.player.phase(), Phase::Open);
        assert_eq!(f.player.current_video_id().as_deref(), Some("vid-kitchen"));
    }

    #[tokio::test]
    async fn test_set_current_chunk_adopts_bounds() {
        let f = fixture();
        f.player
            .open_video("vid-kitchen", PlayOptions::default())
            .await
            .unwrap();

        f.player.set_current_chunk("anything", None);
        assert_eq!(f.player.current_chunk_id().as_deref(), Some("anything"));
        assert_eq!(f.player.time_range(), (0.0, None));

        let chunk = f.player.chunks()[1].clone();
        f.player.set_current_chunk(&chunk.chunk_id, Some(&chunk));
        assert_eq!(f.player.time_range(), (chunk.start_time, Some(chunk.end_time)));
    }

    #[tokio::test]
    async fn test_select_chunk_looks_up_loaded_chunks() {
        let f = fixture();
        f.player
            .open_video("vid-harbor", PlayOptions::default())
            .await
            .unwrap();

        assert!(f.player.select_chunk("vid-harbor-c1"));
        let chunk = f.player.chunks()[1].clone();
        assert_eq!(f.player.time_range(), (chunk.start_time, Some(chunk.end_time)));

        assert!(!f.player.select_chunk("vid-kitchen-c0"));
        assert_eq!(f.player.current_chunk_id().as_deref(), Some("vid-harbor-c1"));
    }

    #[tokio::test]
    async fn test_reset_cancels_deferred_clear() {
        let f = fixture();
        f.player
            .open_video("vid-harbor", PlayOptions::default())
            .await
            .unwrap();
        f.player.close_video();
        f.player.reset();
        assert_eq!(f.player.phase(), Phase::Closed);
        assert!(f.player.pending_clear.lock().is_none());
    }
}
