//! The gateway trait and its named operations.

use async_trait::async_trait;
use clipsage_core::{
    ChatRequest, ChatResponse, ChunkListResponse, HealthStatus, Result, SearchOptions,
    SearchResponse, Video, VideoListResponse,
};
use serde::{Deserialize, Serialize};

/// Asynchronous request/response interface to the backend.
///
/// Every call may fail; the error's `Display` is the message shown to the
/// user. Implementations must be `Send + Sync` so one gateway can be shared
/// by all containers.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn list_videos(&self) -> Result<VideoListResponse>;

    async fn get_video(&self, video_id: &str) -> Result<Video>;

    async fn get_video_chunks(&self, video_id: &str) -> Result<ChunkListResponse>;

    async fn delete_video(&self, video_id: &str) -> Result<()>;

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse>;

    async fn chat_with_clips(&self, request: &ChatRequest) -> Result<ChatResponse>;

    async fn health(&self) -> Result<HealthStatus>;
}

/// Gateway operations, one per IPC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListVideos,
    GetVideo,
    GetVideoChunks,
    DeleteVideo,
    Search,
    ChatWithClips,
    Health,
}

impl Operation {
    pub fn all() -> &'static [Operation] {
        &[
            Self::ListVideos,
            Self::GetVideo,
            Self::GetVideoChunks,
            Self::DeleteVideo,
            Self::Search,
            Self::ChatWithClips,
            Self::Health,
        ]
    }

    /// IPC channel name.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::ListVideos => "backend:get-videos",
            Self::GetVideo => "backend:get-video",
            Self::GetVideoChunks => "backend:get-video-chunks",
            Self::DeleteVideo => "backend:delete-video",
            Self::Search => "backend:search",
            Self::ChatWithClips => "backend:chat-with-clips",
            Self::Health => "backend:health",
        }
    }

    pub fn from_channel(channel: &str) -> Option<Self> {
        Self::all().iter().copied().find(|op| op.channel() == channel)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.channel())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_round_trip() {
        for op in Operation::all() {
            assert_eq!(Operation::from_channel(op.channel()), Some(*op));
        }
        assert_eq!(Operation::from_channel("backend:reboot"), None);
    }
}
