//! Framed IPC transport for the backend gateway.
//!
//! Requests travel as [`RequestFrame`]s (`{id, channel, args}`) and come back
//! as [`ReplyFrame`]s (`{id, ok}` or `{id, error}`). Replies may arrive in any
//! order; the client matches them to waiting callers by id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clipsage_core::{
    ChatRequest, ChatResponse, ChunkListResponse, Error, HealthStatus, Result, SearchOptions,
    SearchResponse, Video, VideoListResponse,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::gateway::{BackendGateway, Operation};

/// Buffer size for the loopback channels.
const CHANNEL_CAPACITY: usize = 64;

/// Outbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: String,
    pub channel: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Reply to a [`RequestFrame`] with the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyFrame {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplyFrame {
    pub fn ok(id: String, value: Value) -> Self {
        Self {
            id,
            ok: Some(value),
            error: None,
        }
    }

    pub fn error(id: String, message: String) -> Self {
        Self {
            id,
            ok: None,
            error: Some(message),
        }
    }

    /// A `null` payload decodes as a missing `ok`, so anything without an
    /// error is a success.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(message) => Err(Error::Backend(message)),
            None => Ok(self.ok.unwrap_or(Value::Null)),
        }
    }
}

struct Pending {
    waiters: Mutex<HashMap<String, oneshot::Sender<ReplyFrame>>>,
    closed: AtomicBool,
}

impl Pending {
    fn remove(&self, id: &str) {
        self.waiters.lock().remove(id);
    }
}

/// Client side of the IPC channel.
pub struct IpcGateway {
    outbound: mpsc::Sender<RequestFrame>,
    pending: Arc<Pending>,
    timeout: Duration,
}

impl IpcGateway {
    /// Connect over an established channel pair. Spawns the reply router, so
    /// this must run inside a tokio runtime.
    pub fn connect(
        outbound: mpsc::Sender<RequestFrame>,
        mut inbound: mpsc::Receiver<ReplyFrame>,
        timeout: Duration,
    ) -> Self {
        let pending = Arc::new(Pending {
            waiters: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        });

        let router = pending.clone();
        tokio::spawn(async move {
            while let Some(reply) = inbound.recv().await {
                let waiter = router.waiters.lock().remove(&reply.id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(reply);
                    }
                    None => warn!("Dropping reply for unknown request {}", reply.id),
                }
            }
            router.closed.store(true, Ordering::SeqCst);
            // Dropping the senders wakes every waiter with a disconnect.
            router.waiters.lock().clear();
            info!("IPC reply channel closed");
        });

        Self {
            outbound,
            pending,
            timeout,
        }
    }

    /// Number of requests still waiting for a reply.
    pub fn in_flight(&self) -> usize {
        self.pending.waiters.lock().len()
    }

    async fn invoke(&self, op: Operation, args: Vec<Value>) -> Result<Value> {
        if self.pending.closed.load(Ordering::SeqCst) {
            return Err(Error::Disconnected);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.waiters.lock().insert(id.clone(), tx);
        // The router may have shut down between the check and the insert.
        if self.pending.closed.load(Ordering::SeqCst) {
            self.pending.remove(&id);
            return Err(Error::Disconnected);
        }

        let frame = RequestFrame {
            id: id.clone(),
            channel: op.channel().to_string(),
            args,
        };
        debug!("IPC -> {} ({})", frame.channel, id);

        if self.outbound.send(frame).await.is_err() {
            self.pending.remove(&id);
            return Err(Error::Disconnected);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply.into_result(),
            Ok(Err(_)) => Err(Error::Disconnected),
            Err(_) => {
                self.pending.remove(&id);
                Err(Error::Timeout(op.channel().to_string()))
            }
        }
    }

    async fn call<T: DeserializeOwned>(&self, op: Operation, args: Vec<Value>) -> Result<T> {
        let value = self.invoke(op, args).await?;
        serde_json::from_value(value).map_err(|e| Error::Protocol(format!("{}: {}", op, e)))
    }
}

#[async_trait]
impl BackendGateway for IpcGateway {
    async fn list_videos(&self) -> Result<VideoListResponse> {
        self.call(Operation::ListVideos, vec![]).await
    }

    async fn get_video(&self, video_id: &str) -> Result<Video> {
        self.call(Operation::GetVideo, vec![Value::from(video_id)])
            .await
    }

    async fn get_video_chunks(&self, video_id: &str) -> Result<ChunkListResponse> {
        self.call(Operation::GetVideoChunks, vec![Value::from(video_id)])
            .await
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        self.invoke(Operation::DeleteVideo, vec![Value::from(video_id)])
            .await
            .map(|_| ())
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let options = serde_json::to_value(options)?;
        self.call(Operation::Search, vec![Value::from(query), options])
            .await
    }

    async fn chat_with_clips(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let request = serde_json::to_value(request)?;
        self.call(Operation::ChatWithClips, vec![request]).await
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.call(Operation::Health, vec![]).await
    }
}

/// Dispatch loop for the backend end of the channel. Each request is handled
/// on its own task so a slow call never blocks the ones behind it. Returns
/// when the request channel closes.
pub async fn serve(
    handler: Arc<dyn BackendGateway>,
    mut requests: mpsc::Receiver<RequestFrame>,
    replies: mpsc::Sender<ReplyFrame>,
) {
    while let Some(frame) = requests.recv().await {
        let handler = handler.clone();
        let replies = replies.clone();
        tokio::spawn(async move {
            let id = frame.id.clone();
            let reply = match dispatch(handler.as_ref(), &frame).await {
                Ok(value) => ReplyFrame::ok(id, value),
                Err(e) => {
                    debug!("IPC {} failed: {}", frame.channel, e);
                    ReplyFrame::error(id, e.to_string())
                }
            };
            if replies.send(reply).await.is_err() {
                debug!("Reply for {} dropped, client gone", frame.id);
            }
        });
    }
    info!("IPC dispatcher stopped");
}

async fn dispatch(handler: &dyn BackendGateway, frame: &RequestFrame) -> Result<Value> {
    let op = Operation::from_channel(&frame.channel)
        .ok_or_else(|| Error::Protocol(format!("unknown channel {}", frame.channel)))?;

    let value = match op {
        Operation::ListVideos => serde_json::to_value(handler.list_videos().await?)?,
        Operation::GetVideo => {
            let video_id: String = arg(frame, 0)?;
            serde_json::to_value(handler.get_video(&video_id).await?)?
        }
        Operation::GetVideoChunks => {
            let video_id: String = arg(frame, 0)?;
            serde_json::to_value(handler.get_video_chunks(&video_id).await?)?
        }
        Operation::DeleteVideo => {
            let video_id: String = arg(frame, 0)?;
            handler.delete_video(&video_id).await?;
            Value::Null
        }
        Operation::Search => {
            let query: String = arg(frame, 0)?;
            let options: SearchOptions = match frame.args.get(1) {
                Some(Value::Null) | None => SearchOptions::default(),
                Some(_) => arg(frame, 1)?,
            };
            serde_json::to_value(handler.search(&query, &options).await?)?
        }
        Operation::ChatWithClips => {
            let request: ChatRequest = arg(frame, 0)?;
            serde_json::to_value(handler.chat_with_clips(&request).await?)?
        }
        Operation::Health => serde_json::to_value(handler.health().await?)?,
    };
    Ok(value)
}

fn arg<T: DeserializeOwned>(frame: &RequestFrame, index: usize) -> Result<T> {
    let raw = frame.args.get(index).cloned().ok_or_else(|| {
        Error::Protocol(format!("{}: missing argument {}", frame.channel, index))
    })?;
    serde_json::from_value(raw)
        .map_err(|e| Error::Protocol(format!("{}: bad argument {}: {}", frame.channel, index, e)))
}

/// Wire an [`IpcGateway`] to an in-process dispatcher serving `handler`.
pub fn loopback(handler: Arc<dyn BackendGateway>, timeout: Duration) -> IpcGateway {
    let (req_tx, req_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (reply_tx, reply_rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(serve(handler, req_rx, reply_tx));
    IpcGateway::connect(req_tx, reply_rx, timeout)
}
