//! Library store.

use std::sync::Arc;

use clipsage_core::{ChangeBus, Notifier, OpStatus, Result, StatusCell, StoreKind, Video};
use clipsage_gateway::BackendGateway;
use clipsage_notify::NotificationCenter;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, info, warn};

/// Snapshot of the library slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LibraryState {
    pub videos: Vec<Video>,
    pub selected_video_id: Option<String>,
}

/// Local view of the backend video catalog.
///
/// Entries only ever come from backend responses. A failed call leaves the
/// catalog exactly as it was.
pub struct LibraryStore {
    gateway: Arc<dyn BackendGateway>,
    toasts: Arc<NotificationCenter>,
    state: RwLock<LibraryState>,
    status: StatusCell,
    notifier: Notifier,
}

impl LibraryStore {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        toasts: Arc<NotificationCenter>,
        bus: &ChangeBus,
    ) -> Self {
        let notifier = bus.notifier(StoreKind::Library);
        Self {
            gateway,
            toasts,
            state: RwLock::new(LibraryState::default()),
            status: StatusCell::new(notifier.clone()),
            notifier,
        }
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub fn snapshot(&self) -> LibraryState {
        self.state.read().clone()
    }

    pub fn videos(&self) -> Vec<Video> {
        self.state.read().videos.clone()
    }

    pub fn status(&self) -> OpStatus {
        self.status.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.status.error()
    }

    pub fn selected_video_id(&self) -> Option<String> {
        self.state.read().selected_video_id.clone()
    }

    /// The selected video, if it is still in the catalog.
    pub fn selected_video(&self) -> Option<Video> {
        let state = self.state.read();
        let id = state.selected_video_id.as_deref()?;
        state.videos.iter().find(|v| v.video_id == id).cloned()
    }

    pub fn video(&self, video_id: &str) -> Option<Video> {
        self.state
            .read()
            .videos
            .iter()
            .find(|v| v.video_id == video_id)
            .cloned()
    }

    pub fn video_count(&self) -> usize {
        self.state.read().videos.len()
    }

    pub fn indexed_videos(&self) -> Vec<Video> {
        self.filtered(Video::is_indexed)
    }

    /// Uploaded videos the backend has not finished indexing.
    pub fn processing_videos(&self) -> Vec<Video> {
        self.filtered(Video::is_processing)
    }

    fn filtered(&self, keep: impl Fn(&Video) -> bool) -> Vec<Video> {
        self.state
            .read()
            .videos
            .iter()
            .filter(|v| keep(*v))
            .cloned()
            .collect()
    }

    // ---------------------------------------------------------------
    // Backend operations
    // ---------------------------------------------------------------

    /// Replace the whole catalog with the backend's list.
    pub async fn fetch_all(&self) -> Result<()> {
        let _loading = self.status.begin();

        match self.gateway.list_videos().await {
            Ok(response) => {
                let count = response.videos.len();
                self.state.write().videos = response.videos;
                self.notifier.notify("videos");
                info!("Library loaded: {} videos", count);
                Ok(())
            }
            Err(e) => {
                error!("Failed to fetch videos: {}", e);
                self.status.fail(&e);
                self.toasts.error("Failed to load video library", None);
                Err(e)
            }
        }
    }

    /// Delete on the backend, then drop the local entry.
    pub async fn delete_video(&self, video_id: &str) -> Result<()> {
        let _loading = self.status.begin();

        if let Err(e) = self.gateway.delete_video(video_id).await {
            error!("Failed to delete video {}: {}", video_id, e);
            self.status.fail(&e);
            self.toasts.error("Failed to delete video", None);
            return Err(e);
        }

        let (removed, selection_cleared) = {
            let mut state = self.state.write();
            let removed = state
                .videos
                .iter()
                .position(|v| v.video_id == video_id)
                .map(|index| state.videos.remove(index));
            let selection_cleared = state.selected_video_id.as_deref() == Some(video_id);
            if selection_cleared {
                state.selected_video_id = None;
            }
            (removed, selection_cleared)
        };

        match removed {
            Some(video) => {
                self.notifier.notify("videos");
                self.toasts.success(format!("Deleted \"{}\"", video.title), None);
                info!("Deleted video {} ({})", video_id, video.title);
            }
            None => warn!("Deleted video {} was not in the local catalog", video_id),
        }
        if selection_cleared {
            self.notifier.notify("selection");
        }
        Ok(())
    }

    /// Re-fetch one video. Known entries are replaced in place, new ones go
    /// to the front.
    pub async fn refresh_video(&self, video_id: &str) -> Result<()> {
        let _loading = self.status.begin();

        let video = match self.gateway.get_video(video_id).await {
            Ok(video) => video,
            Err(e) => {
                error!("Failed to refresh video {}: {}", video_id, e);
                self.status.fail(&e);
                self.toasts.error("Failed to refresh video", None);
                return Err(e);
            }
        };

        {
            let mut state = self.state.write();
            match state.videos.iter_mut().find(|v| v.video_id == video_id) {
                Some(existing) => *existing = video,
                None => state.videos.insert(0, video),
            }
        }
        self.notifier.notify("videos");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Local operations
    // ---------------------------------------------------------------

    pub fn select_video(&self, video_id: Option<&str>) {
        self.state.write().selected_video_id = video_id.map(str::to_string);
        self.notifier.notify("selection");
    }

    pub fn reset(&self) {
        *self.state.write() = LibraryState::default();
        self.status.reset();
        self.notifier.notify("videos");
        self.notifier.notify("selection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsage_gateway::{InMemoryBackend, Operation};
    use clipsage_notify::Severity;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        toasts: Arc<NotificationCenter>,
        library: LibraryStore,
    }

    fn fixture() -> Fixture {
        let bus = ChangeBus::new(64);
        let backend = Arc::new(InMemoryBackend::with_sample_catalog());
        let toasts = Arc::new(NotificationCenter::new(bus.notifier(StoreKind::Notifications)));
        let library = LibraryStore::new(backend.clone(), toasts.clone(), &bus);
        Fixture {
            backend,
            toasts,
            library,
        }
    }

    #[tokio::test]
    async fn test_fetch_all_replaces_catalog_and_derives_views() {
        let f = fixture();
        f.library.fetch_all().await.unwrap();

        assert_eq!(f.library.video_count(), 3);
        assert_eq!(f.library.indexed_videos().len(), 2);
        let processing = f.library.processing_videos();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].video_id, "vid-upload");
        assert!(!f.library.is_loading());
        assert!(f.library.error().is_none());
    }

    #[tokio::test]
    async fn test_fetch_all_failure_keeps_catalog() {
        let f = fixture();
        f.library.fetch_all().await.unwrap();
        let before = f.library.videos();

        f.backend.fail(Operation::ListVideos, "backend offline");
        let err = f.library.fetch_all().await.unwrap_err();

        assert_eq!(err.to_string(), "backend offline");
        assert_eq!(f.library.videos(), before);
        assert_eq!(f.library.error().as_deref(), Some("backend offline"));
        assert!(!f.library.is_loading());
        let toasts = f.toasts.toasts();
        assert_eq!(toasts.last().unwrap().severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_delete_video_failure_leaves_list_unchanged() {
        let f = fixture();
        f.library.fetch_all().await.unwrap();
        f.library.select_video(Some("vid-harbor"));
        let before = f.library.snapshot();

        f.backend.fail(Operation::DeleteVideo, "locked");
        assert!(f.library.delete_video("vid-harbor").await.is_err());

        assert_eq!(f.library.snapshot(), before);
        assert_eq!(f.library.error().as_deref(), Some("locked"));
        assert_eq!(f.toasts.toasts()[0].message, "Failed to delete video");
    }

    #[tokio::test]
    async fn test_delete_video_removes_entry_and_selection() {
        let f = fixture();
        f.library.fetch_all().await.unwrap();
        f.library.select_video(Some("vid-harbor"));

        f.library.delete_video("vid-harbor").await.unwrap();

        assert!(f.library.video("vid-harbor").is_none());
        assert!(f.library.selected_video_id().is_none());
        let toast = &f.toasts.toasts()[0];
        assert_eq!(toast.severity, Severity::Success);
        assert_eq!(toast.message, "Deleted \"Harbor at dawn\"");
    }

    #[tokio::test]
    async fn test_delete_keeps_other_selection() {
        let f = fixture();
        f.library.fetch_all().await.unwrap();
        f.library.select_video(Some("vid-kitchen"));
        f.library.delete_video("vid-harbor").await.unwrap();
        assert_eq!(f.library.selected_video().unwrap().title, "Kitchen interview");
    }

    #[tokio::test]
    async fn test_refresh_replaces_in_place_or_prepends() {
        let f = fixture();
        f.library.fetch_all().await.unwrap();

        let mut renamed = f.library.video("vid-kitchen").unwrap();
        renamed.title = "Kitchen interview (cut)".into();
        f.backend.upsert_video(renamed);
        f.library.refresh_video("vid-kitchen").await.unwrap();
        let ids: Vec<String> = f.library.videos().into_iter().map(|v| v.video_id).collect();
        assert_eq!(ids, vec!["vid-harbor", "vid-kitchen", "vid-upload"]);
        assert_eq!(f.library.videos()[1].title, "Kitchen interview (cut)");

        let mut fresh = f.library.video("vid-upload").unwrap();
        fresh.video_id = "vid-new".into();
        f.backend.upsert_video(fresh);
        f.library.refresh_video("vid-new").await.unwrap();
        assert_eq!(f.library.videos()[0].video_id, "vid-new");
        assert_eq!(f.library.video_count(), 4);
    }

    #[tokio::test]
    async fn test_refresh_unknown_video_propagates() {
        let f = fixture();
        assert!(f.library.refresh_video("vid-ghost").await.is_err());
        assert!(f.library.error().unwrap().contains("vid-ghost"));
        assert_eq!(f.library.video_count(), 0);
    }

    #[tokio::test]
    async fn test_selection_and_reset() {
        let f = fixture();
        f.library.fetch_all().await.unwrap();
        f.library.select_video(Some("vid-missing"));
        assert!(f.library.selected_video().is_none());

        f.library.reset();
        assert_eq!(f.library.snapshot(), LibraryState::default());
        assert_eq!(f.library.status(), OpStatus::default());
    }
}
