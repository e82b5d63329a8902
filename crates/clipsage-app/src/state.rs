//! Shared application state.

use std::sync::Arc;

use clipsage_chat::ChatStore;
use clipsage_core::{ChangeBus, ClipSageConfig, Result, SearchResult, StateChange, StoreKind};
use clipsage_gateway::BackendGateway;
use clipsage_library::LibraryStore;
use clipsage_notify::NotificationCenter;
use clipsage_player::{PlayOptions, VideoPlayerStore};
use clipsage_search::SearchStore;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Every container the UI binds to.
pub struct AppState {
    pub config: ClipSageConfig,
    pub gateway: Arc<dyn BackendGateway>,
    pub bus: ChangeBus,
    pub notifications: Arc<NotificationCenter>,
    pub library: LibraryStore,
    pub search: SearchStore,
    pub chat: ChatStore,
    pub player: VideoPlayerStore,
}

impl AppState {
    pub fn new(config: ClipSageConfig, gateway: Arc<dyn BackendGateway>) -> Self {
        let bus = ChangeBus::new(config.event_capacity);
        let notifications = Arc::new(NotificationCenter::with_default_lifetime(
            bus.notifier(StoreKind::Notifications),
            config.toast_lifetime_ms,
        ));

        let library = LibraryStore::new(gateway.clone(), notifications.clone(), &bus);
        let search = SearchStore::new(
            gateway.clone(),
            notifications.clone(),
            &bus,
            config.search_defaults.clone(),
        );
        let chat = ChatStore::new(gateway.clone(), notifications.clone(), &bus);
        let player = VideoPlayerStore::new(
            gateway.clone(),
            notifications.clone(),
            &bus,
            config.close_grace(),
        );

        info!(
            "Application state ready (top_k={}, toast={}ms, close grace={}ms)",
            config.search_defaults.top_k, config.toast_lifetime_ms, config.close_grace_ms
        );

        Self {
            config,
            gateway,
            bus,
            notifications,
            library,
            search,
            chat,
            player,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.bus.subscribe()
    }

    /// Delete a video and drop every reference other containers hold to it.
    pub async fn delete_video(&self, video_id: &str) -> Result<()> {
        self.library.delete_video(video_id).await?;

        self.chat.remove_clips_for_video(video_id);
        if self.player.current_video_id().as_deref() == Some(video_id) {
            self.player.close_video();
        }
        Ok(())
    }

    /// Open the player on a search hit's time range.
    pub async fn open_result(&self, result: &SearchResult) -> Result<()> {
        self.player
            .open_video(
                &result.video_id,
                PlayOptions {
                    chunk_id: Some(result.chunk_id.clone()),
                    start_time: Some(result.start_time),
                    end_time: Some(result.end_time),
                },
            )
            .await
    }

    /// Attach the current search result with `chunk_id` to the chat.
    /// Returns whether a new clip was attached.
    pub fn attach_result(&self, chunk_id: &str) -> bool {
        match self.search.result(chunk_id) {
            Some(result) => self.chat.add_clip(result),
            None => {
                warn!("No search result {} to attach", chunk_id);
                false
            }
        }
    }

    /// Clear every container.
    pub fn reset(&self) {
        self.library.reset();
        self.search.reset();
        self.chat.reset();
        self.player.reset();
        self.notifications.dismiss_all();
    }
}
