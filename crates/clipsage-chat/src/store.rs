//! Chat store.

use std::sync::Arc;

use clipsage_core::{
    ChangeBus, ChatRequest, IdGenerator, Notifier, OpStatus, Result, SearchResult, StatusCell,
    StoreKind,
};
use clipsage_gateway::BackendGateway;
use clipsage_notify::NotificationCenter;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::types::ChatMessage;

/// Snapshot of the chat slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    /// Clips in attach order, unique by chunk id.
    pub attached_clips: Vec<SearchResult>,
}

pub struct ChatStore {
    gateway: Arc<dyn BackendGateway>,
    toasts: Arc<NotificationCenter>,
    state: RwLock<ChatState>,
    ids: IdGenerator,
    status: StatusCell,
    notifier: Notifier,
}

impl ChatStore {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        toasts: Arc<NotificationCenter>,
        bus: &ChangeBus,
    ) -> Self {
        let notifier = bus.notifier(StoreKind::Chat);
        Self {
            gateway,
            toasts,
            state: RwLock::new(ChatState::default()),
            ids: IdGenerator::new("msg"),
            status: StatusCell::new(notifier.clone()),
            notifier,
        }
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.read().clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().messages.clone()
    }

    pub fn attached_clips(&self) -> Vec<SearchResult> {
        self.state.read().attached_clips.clone()
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

    pub fn has_attached_clips(&self) -> bool {
        !self.state.read().attached_clips.is_empty()
    }

    pub fn clip_count(&self) -> usize {
        self.state.read().attached_clips.len()
    }

    pub fn has_messages(&self) -> bool {
        !self.state.read().messages.is_empty()
    }

    // ---------------------------------------------------------------
    // Clips
    // ---------------------------------------------------------------

    /// Attach a clip. A clip whose chunk id is already attached is ignored.
    /// Returns whether the clip was added.
    pub fn add_clip(&self, clip: SearchResult) -> bool {
        let added = {
            let mut state = self.state.write();
            if state.attached_clips.iter().any(|c| c.chunk_id == clip.chunk_id) {
                false
            } else {
                state.attached_clips.push(clip);
                true
            }
        };

        if added {
            self.notifier.notify("clips");
            self.toasts.success("Clip added to chat", None);
        } else {
            self.toasts.info("Clip already added to chat", None);
        }
        added
    }

    pub fn remove_clip(&self, chunk_id: &str) -> bool {
        let removed = {
            let mut state = self.state.write();
            match state.attached_clips.iter().position(|c| c.chunk_id == chunk_id) {
                Some(index) => {
                    state.attached_clips.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notifier.notify("clips");
        }
        removed
    }

    /// Detach every clip cut from `video_id`. Returns how many were removed.
    pub fn remove_clips_for_video(&self, video_id: &str) -> usize {
        let removed = {
            let mut state = self.state.write();
            let before = state.attached_clips.len();
            state.attached_clips.retain(|c| c.video_id != video_id);
            before - state.attached_clips.len()
        };
        if removed > 0 {
            debug!("Detached {} clips of deleted video {}", removed, video_id);
            self.notifier.notify("clips");
        }
        removed
    }

    pub fn clear_clips(&self) {
        self.state.write().attached_clips.clear();
        self.notifier.notify("clips");
    }

    // ---------------------------------------------------------------
    // Conversation
    // ---------------------------------------------------------------

    /// Ask the backend about the attached clips.
    ///
    /// Blank text does nothing. Without clips a warning toast is raised and
    /// the backend is not called. The user turn is appended before the call;
    /// if the call fails it is removed again, so a failed round trip leaves
    /// the conversation as it was.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        if !self.has_attached_clips() {
            self.toasts
                .warning("Please add at least one video clip to chat", None);
            return Ok(());
        }

        let _loading = self.status.begin();

        let user = ChatMessage::user(self.ids.next_id(), text);
        let user_id = user.id.clone();
        let clip_ids: Vec<String> = {
            let mut state = self.state.write();
            state.messages.push(user);
            state
                .attached_clips
                .iter()
                .map(|c| c.chunk_id.clone())
                .collect()
        };
        self.notifier.notify("messages");

        let request = ChatRequest {
            query: text.to_string(),
            clip_ids,
        };

        match self.gateway.chat_with_clips(&request).await {
            Ok(response) => {
                let reply = ChatMessage::assistant(
                    self.ids.next_id(),
                    response.answer,
                    response.sources.unwrap_or_default(),
                    response.cache_used,
                );
                info!(
                    "Chat answered over {} clips (cache_used={:?})",
                    request.clip_ids.len(),
                    reply.cache_used
                );
                self.state.write().messages.push(reply);
                self.notifier.notify("messages");
                Ok(())
            }
            Err(e) => {
                error!("Failed to send chat message: {}", e);
                self.rollback(&user_id);
                self.status.fail(&e);
                self.toasts
                    .error("Failed to send message. Please try again.", None);
                Err(e)
            }
        }
    }

    /// Remove the optimistic user turn by id.
    fn rollback(&self, message_id: &str) {
        let removed = {
            let mut state = self.state.write();
            match state.messages.iter().rposition(|m| m.id == message_id) {
                Some(index) => {
                    state.messages.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notifier.notify("messages");
        }
    }

    pub fn clear_messages(&self) {
        self.state.write().messages.clear();
        self.notifier.notify("messages");
    }

    /// Clear messages, clips, and status.
    pub fn reset(&self) {
        *self.state.write() = ChatState::default();
        self.status.reset();
        self.notifier.notify("messages");
        self.notifier.notify("clips");
    }
}
