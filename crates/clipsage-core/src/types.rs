//! Shared data model matching the backend's JSON shapes.
//!
//! Every response field the containers read carries a serde default so a
//! missing field decodes as empty rather than failing the whole response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A video known to the backend library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub video_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration_seconds: f64,
    /// Set once the backend has finished indexing the video.
    #[serde(default)]
    pub indexed_at: Option<String>,
    /// Remaining descriptive metadata, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Video {
    pub fn is_indexed(&self) -> bool {
        self.indexed_at.is_some()
    }

    /// Uploaded but not yet indexed.
    pub fn is_processing(&self) -> bool {
        self.indexed_at.is_none() && self.duration_seconds > 0.0
    }
}

/// A time segment of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoChunk {
    pub chunk_id: String,
    pub video_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_description: Option<String>,
}

/// A ranked reference to a chunk, produced by a search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub video_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_description: Option<String>,
}

/// Search configuration sent with every search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub top_k: usize,
    pub use_cascaded_reranking: bool,
    pub confidence_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier1_candidates: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            use_cascaded_reranking: true,
            confidence_threshold: 0.0,
            video_id_filter: None,
            score_threshold: None,
            tier1_candidates: None,
        }
    }
}

impl SearchOptions {
    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &SearchOptionsPatch) {
        if let Some(top_k) = patch.top_k {
            self.top_k = top_k;
        }
        if let Some(rerank) = patch.use_cascaded_reranking {
            self.use_cascaded_reranking = rerank;
        }
        if let Some(threshold) = patch.confidence_threshold {
            self.confidence_threshold = threshold;
        }
        if let Some(filter) = &patch.video_id_filter {
            self.video_id_filter = filter.clone();
        }
        if let Some(threshold) = patch.score_threshold {
            self.score_threshold = threshold;
        }
        if let Some(candidates) = patch.tier1_candidates {
            self.tier1_candidates = candidates;
        }
    }

    /// Return a copy with `patch` applied, leaving `self` untouched.
    pub fn merged(&self, patch: &SearchOptionsPatch) -> Self {
        let mut out = self.clone();
        out.apply(patch);
        out
    }
}

/// Partial [`SearchOptions`]. For the nullable fields the outer `Option`
/// means "touch this field" and the inner one is the new value, so
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptionsPatch {
    pub top_k: Option<usize>,
    pub use_cascaded_reranking: Option<bool>,
    pub confidence_threshold: Option<f64>,
    pub video_id_filter: Option<Option<String>>,
    pub score_threshold: Option<Option<f64>>,
    pub tier1_candidates: Option<Option<usize>>,
}

impl SearchOptionsPatch {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k: Some(top_k),
            ..Default::default()
        }
    }

    pub fn video_filter(video_id: Option<String>) -> Self {
        Self {
            video_id_filter: Some(video_id),
            ..Default::default()
        }
    }
}

/// `backend:get-videos` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub videos: Vec<Video>,
}

/// `backend:get-video-chunks` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunks: Vec<VideoChunk>,
}

/// `backend:search` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<SearchResult>,
}

/// `backend:chat-with-clips` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clip_ids: Vec<String>,
}

/// `backend:chat-with-clips` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub cache_used: Option<bool>,
}

/// `backend:health` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos_indexed: Option<usize>,
}

/// Decode an explicit `null` as the type's default, same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_list_fields_decode_empty() {
        let videos: VideoListResponse = serde_json::from_str("{}").unwrap();
        assert!(videos.videos.is_empty());
        let results: SearchResponse = serde_json::from_str(r#"{"took_ms": 12}"#).unwrap();
        assert!(results.results.is_empty());
        let chat: ChatResponse = serde_json::from_str(r#"{"answer": "hi"}"#).unwrap();
        assert_eq!(chat.answer, "hi");
        assert!(chat.sources.is_none());
        assert!(chat.cache_used.is_none());
    }

    #[test]
    fn test_null_fields_decode_as_default() {
        let videos: VideoListResponse =
            serde_json::from_str(r#"{"videos": null}"#).unwrap();
        assert!(videos.videos.is_empty());
        let chunks: ChunkListResponse =
            serde_json::from_str(r#"{"chunks": null}"#).unwrap();
        assert!(chunks.chunks.is_empty());
        let chat: ChatResponse =
            serde_json::from_str(r#"{"answer": null, "sources": null}"#).unwrap();
        assert_eq!(chat.answer, "");
        assert!(chat.sources.is_none());

        let hit: SearchResult = serde_json::from_value(serde_json::json!({
            "chunk_id": "c1",
            "video_id": "v1",
            "score": null,
            "start_time": null,
            "end_time": 8.0,
        }))
        .unwrap();
        assert_eq!(hit.score, 0.0);
        assert_eq!(hit.start_time, 0.0);
        assert_eq!(hit.end_time, 8.0);

        let video: Video = serde_json::from_value(serde_json::json!({
            "video_id": "v2",
            "title": null,
            "duration_seconds": null,
        }))
        .unwrap();
        assert!(video.title.is_empty());
        assert!(!video.is_processing());
    }

    #[test]
    fn test_video_keeps_unknown_metadata() {
        let video: Video = serde_json::from_value(serde_json::json!({
            "video_id": "v1",
            "title": "Beach day",
            "duration_seconds": 42.5,
            "indexed_at": null,
            "filename": "beach.mp4",
        }))
        .unwrap();
        assert!(video.is_processing());
        assert_eq!(video.extra.get("filename").unwrap(), "beach.mp4");

        let back = serde_json::to_value(&video).unwrap();
        assert_eq!(back["filename"], "beach.mp4");
    }

    #[test]
    fn test_options_wire_names_are_camel_case() {
        let json = serde_json::to_value(SearchOptions::default()).unwrap();
        assert_eq!(json["topK"], 10);
        assert_eq!(json["useCascadedReranking"], true);
        assert!(json.get("videoIdFilter").is_none());
    }

    #[test]
    fn test_patch_sets_and_clears_nullable_fields() {
        let mut opts = SearchOptions::default();
        opts.apply(&SearchOptionsPatch::video_filter(Some("v1".into())));
        assert_eq!(opts.video_id_filter.as_deref(), Some("v1"));

        // Untouched field stays.
        opts.apply(&SearchOptionsPatch::top_k(3));
        assert_eq!(opts.video_id_filter.as_deref(), Some("v1"));
        assert_eq!(opts.top_k, 3);

        opts.apply(&SearchOptionsPatch::video_filter(None));
        assert!(opts.video_id_filter.is_none());
    }

    #[test]
    fn test_merged_does_not_touch_baseline() {
        let base = SearchOptions::default();
        let merged = base.merged(&SearchOptionsPatch::top_k(20));
        assert_eq!(merged.top_k, 20);
        assert_eq!(base.top_k, 10);
    }
}
