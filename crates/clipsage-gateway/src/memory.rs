//! In-memory [`BackendGateway`] for tests and the demo binary.
//!
//! Holds a video catalog and its chunks behind `parking_lot` locks. Search is
//! plain term overlap over chunk text, chat answers are assembled from the
//! referenced chunks. Failures and latency can be injected per operation, and
//! every call is recorded so tests can assert on what reached the backend.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use clipsage_core::{
    ChatRequest, ChatResponse, ChunkListResponse, Error, HealthStatus, Result, SearchOptions,
    SearchResponse, SearchResult, Video, VideoChunk, VideoListResponse,
};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::gateway::{BackendGateway, Operation};

/// On-disk catalog format accepted by [`InMemoryBackend::from_fixture`].
#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    videos: Vec<Video>,
    #[serde(default)]
    chunks: Vec<VideoChunk>,
}

/// Self-contained backend.
pub struct InMemoryBackend {
    videos: RwLock<Vec<Video>>,
    chunks: RwLock<HashMap<String, Vec<VideoChunk>>>,
    failures: RwLock<HashMap<Operation, String>>,
    latency: RwLock<HashMap<Operation, Duration>>,
    calls: Mutex<Vec<Operation>>,
    searches: Mutex<Vec<(String, SearchOptions)>>,
    chats: Mutex<Vec<ChatRequest>>,
    /// Answer and resolved sources per (query, clip ids).
    answer_cache: Mutex<HashMap<(String, Vec<String>), (String, Vec<String>)>>,
}

impl InMemoryBackend {
    /// Create a backend with an empty catalog.
    pub fn new() -> Self {
        Self {
            videos: RwLock::new(Vec::new()),
            chunks: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            latency: RwLock::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
            answer_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Create a backend seeded with the given catalog.
    pub fn with_catalog(videos: Vec<Video>, chunks: Vec<VideoChunk>) -> Self {
        let backend = Self::new();
        *backend.videos.write() = videos;
        {
            let mut by_video = backend.chunks.write();
            for chunk in chunks {
                by_video.entry(chunk.video_id.clone()).or_default().push(chunk);
            }
        }
        backend
    }

    /// Load a catalog from a JSON file: `{"videos": [...], "chunks": [...]}`.
    pub fn from_fixture(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&data)?;
        info!(
            "Loaded fixture {}: {} videos, {} chunks",
            path.display(),
            fixture.videos.len(),
            fixture.chunks.len()
        );
        Ok(Self::with_catalog(fixture.videos, fixture.chunks))
    }

    /// Three videos: two indexed, one still processing.
    pub fn with_sample_catalog() -> Self {
        let videos = vec![
            sample_video("vid-harbor", "Harbor at dawn", 95.0, Some("2026-01-04T09:12:00Z")),
            sample_video("vid-kitchen", "Kitchen interview", 312.5, Some("2026-01-05T17:40:00Z")),
            sample_video("vid-upload", "Untitled upload", 48.0, None),
        ];
        let chunks = vec![
            sample_chunk("vid-harbor", 0, 0.0, 15.0, "fishing boats leave the harbor at dawn"),
            sample_chunk("vid-harbor", 1, 15.0, 30.0, "a man waves from the pier as boats pass"),
            sample_chunk("vid-kitchen", 0, 0.0, 20.0, "the chef explains why the sauce needs time"),
            sample_chunk("vid-kitchen", 1, 20.0, 45.0, "a woman laughs and picks up a paper menu"),
        ];
        Self::with_catalog(videos, chunks)
    }

    // ---------------------------------------------------------------
    // Test controls
    // ---------------------------------------------------------------

    /// Make every call to `op` fail with `message` until [`recover`](Self::recover).
    pub fn fail(&self, op: Operation, message: &str) {
        self.failures.write().insert(op, message.to_string());
    }

    pub fn recover(&self, op: Operation) {
        self.failures.write().remove(&op);
    }

    /// Delay every call to `op`.
    pub fn set_latency(&self, op: Operation, delay: Duration) {
        self.latency.write().insert(op, delay);
    }

    /// Number of calls that reached `op`, including failed ones.
    pub fn call_count(&self, op: Operation) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Query and options of the most recent search call.
    pub fn last_search(&self) -> Option<(String, SearchOptions)> {
        self.searches.lock().last().cloned()
    }

    pub fn last_chat(&self) -> Option<ChatRequest> {
        self.chats.lock().last().cloned()
    }

    /// Insert or replace a video directly, as if the backend indexed it.
    pub fn upsert_video(&self, video: Video) {
        let mut videos = self.videos.write();
        match videos.iter_mut().find(|v| v.video_id == video.video_id) {
            Some(existing) => *existing = video,
            None => videos.push(video),
        }
    }

    async fn enter(&self, op: Operation) -> Result<()> {
        self.calls.lock().push(op);
        let delay = self.latency.read().get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.read().get(&op) {
            Some(message) => Err(Error::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn find_chunk(&self, chunk_id: &str) -> Option<VideoChunk> {
        self.chunks
            .read()
            .values()
            .flatten()
            .find(|c| c.chunk_id == chunk_id)
            .cloned()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendGateway for InMemoryBackend {
    async fn list_videos(&self) -> Result<VideoListResponse> {
        self.enter(Operation::ListVideos).await?;
        Ok(VideoListResponse {
            videos: self.videos.read().clone(),
        })
    }

    async fn get_video(&self, video_id: &str) -> Result<Video> {
        self.enter(Operation::GetVideo).await?;
        self.videos
            .read()
            .iter()
            .find(|v| v.video_id == video_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("video {}", video_id)))
    }

    async fn get_video_chunks(&self, video_id: &str) -> Result<ChunkListResponse> {
        self.enter(Operation::GetVideoChunks).await?;
        if !self.videos.read().iter().any(|v| v.video_id == video_id) {
            return Err(Error::NotFound(format!("video {}", video_id)));
        }
        let mut chunks = self.chunks.read().get(video_id).cloned().unwrap_or_default();
        chunks.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(ChunkListResponse { chunks })
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        self.enter(Operation::DeleteVideo).await?;
        let mut videos = self.videos.write();
        let before = videos.len();
        videos.retain(|v| v.video_id != video_id);
        if videos.len() == before {
            return Err(Error::NotFound(format!("video {}", video_id)));
        }
        drop(videos);
        self.chunks.write().remove(video_id);
        Ok(())
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        self.searches
            .lock()
            .push((query.to_string(), options.clone()));
        self.enter(Operation::Search).await?;

        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Ok(SearchResponse::default());
        }

        let titles: HashMap<String, String> = self
            .videos
            .read()
            .iter()
            .map(|v| (v.video_id.clone(), v.title.clone()))
            .collect();
        let floor = options
            .score_threshold
            .unwrap_or(0.0)
            .max(options.confidence_threshold);

        let chunks = self.chunks.read();
        let mut results: Vec<SearchResult> = chunks
            .values()
            .flatten()
            .filter(|c| {
                options
                    .video_id_filter
                    .as_ref()
                    .map_or(true, |id| &c.video_id == id)
            })
            .filter_map(|c| {
                let haystack = format!(
                    "{} {}",
                    c.transcript.as_deref().unwrap_or(""),
                    c.visual_description.as_deref().unwrap_or("")
                )
                .to_lowercase();
                let hits = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                let score = hits as f64 / terms.len() as f64;
                (hits > 0 && score >= floor).then(|| SearchResult {
                    chunk_id: c.chunk_id.clone(),
                    video_id: c.video_id.clone(),
                    score,
                    video_title: titles.get(&c.video_id).cloned(),
                    start_time: c.start_time,
                    end_time: c.end_time,
                    transcript: c.transcript.clone(),
                    visual_description: c.visual_description.clone(),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        results.truncate(options.top_k);
        Ok(SearchResponse { results })
    }

    async fn chat_with_clips(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.chats.lock().push(request.clone());
        self.enter(Operation::ChatWithClips).await?;

        if request.clip_ids.is_empty() {
            return Err(Error::Backend("No clips provided".into()));
        }

        let key = (request.query.clone(), request.clip_ids.clone());
        if let Some((answer, sources)) = self.answer_cache.lock().get(&key).cloned() {
            return Ok(ChatResponse {
                answer,
                sources: Some(sources),
                cache_used: Some(true),
            });
        }

        let clips: Vec<VideoChunk> = request
            .clip_ids
            .iter()
            .filter_map(|id| self.find_chunk(id))
            .collect();
        if clips.is_empty() {
            return Err(Error::NotFound("none of the attached clips exist".into()));
        }

        let excerpts: Vec<String> = clips
            .iter()
            .map(|c| {
                format!(
                    "[{:.0}s-{:.0}s] {}",
                    c.start_time,
                    c.end_time,
                    c.transcript.as_deref().unwrap_or("(no transcript)")
                )
            })
            .collect();
        let answer = format!(
            "Looking at {} clip(s) for \"{}\": {}",
            clips.len(),
            request.query,
            excerpts.join(" ")
        );
        let sources: Vec<String> = clips.into_iter().map(|c| c.chunk_id).collect();
        self.answer_cache
            .lock()
            .insert(key, (answer.clone(), sources.clone()));

        Ok(ChatResponse {
            answer,
            sources: Some(sources),
            cache_used: Some(false),
        })
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.enter(Operation::Health).await?;
        Ok(HealthStatus {
            status: "ok".into(),
            version: Some(env!("CARGO_PKG_VERSION").into()),
            videos_indexed: Some(self.videos.read().iter().filter(|v| v.is_indexed()).count()),
        })
    }
}

fn sample_video(id: &str, title: &str, duration: f64, indexed_at: Option<&str>) -> Video {
    let mut extra = serde_json::Map::new();
    extra.insert("filename".into(), json!(format!("{}.mp4", id)));
    Video {
        video_id: id.to_string(),
        title: title.to_string(),
        duration_seconds: duration,
        indexed_at: indexed_at.map(str::to_string),
        extra,
    }
}

fn sample_chunk(video_id: &str, index: usize, start: f64, end: f64, transcript: &str) -> VideoChunk {
    VideoChunk {
        chunk_id: format!("{}-c{}", video_id, index),
        video_id: video_id.to_string(),
        start_time: start,
        end_time: end,
        transcript: Some(transcript.to_string()),
        visual_description: None,
    }
}
