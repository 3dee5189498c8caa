//! Resumable stream manager
//!
//! Keeps one record per generation session in the key-value store so that a
//! client which dropped its connection can reconnect and replay the output.
//! Features:
//! - TTL-bounded records refreshed on every write (sliding expiration)
//! - Per-user active stream sets
//! - Terminal states (`completed`, `error`, `cancelled`) are sticky
//! - Periodic sweep of records idle for longer than the TTL

use crate::helpers::kv_store::{KeyValueStore, StoreError};
use crate::models::{PromptMessage, StreamState, StreamStatus, StreamStatusView};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const STREAM_KEY_PREFIX: &str = "stream:";
const CANCEL_KEY_PREFIX: &str = "stream_cancel:";
const USER_STREAMS_KEY_PREFIX: &str = "user_streams:";

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("stream not found")]
    NotFound,
    #[error("stream belongs to another user")]
    Forbidden,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stream record is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Arguments of [`StreamManager::start_stream`].
#[derive(Debug, Clone)]
pub struct StartStream {
    pub chat_id: String,
    pub message_id: String,
    pub user_id: String,
    pub model_id: String,
    pub messages: Vec<PromptMessage>,
    pub api_key: Option<String>,
}

/// Note appended to the accumulated content when generation fails.
pub fn error_note(message: &str) -> String {
    format!("\n\n[Error: {}]", message)
}

/// Whether a record idle since `last_activity` has outlived `ttl` at `now`.
pub fn is_expired(last_activity: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match (now - last_activity).to_std() {
        Ok(idle) => idle > ttl,
        // last activity in the future (clock skew between nodes)
        Err(_) => false,
    }
}

pub struct StreamManager {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl StreamManager {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn stream_key(stream_id: &str) -> String {
        format!("{}{}", STREAM_KEY_PREFIX, stream_id)
    }

    fn cancel_key(stream_id: &str) -> String {
        format!("{}{}", CANCEL_KEY_PREFIX, stream_id)
    }

    fn user_streams_key(user_id: &str) -> String {
        format!("{}{}", USER_STREAMS_KEY_PREFIX, user_id)
    }

    async fn read(&self, stream_id: &str) -> Result<Option<StreamState>, StreamError> {
        match self.store.get(&Self::stream_key(stream_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, state: &StreamState) -> Result<(), StreamError> {
        let raw = serde_json::to_string(state)?;
        self.store
            .set_ex(&Self::stream_key(&state.stream_id), &raw, self.ttl)
            .await?;
        Ok(())
    }

    async fn is_cancel_requested(&self, stream_id: &str) -> Result<bool, StreamError> {
        Ok(self.store.get(&Self::cancel_key(stream_id)).await?.is_some())
    }

    #[tracing::instrument(name = "Start stream", skip(self, request), fields(chat_id = %request.chat_id, user_id = %request.user_id, model_id = %request.model_id))]
    pub async fn start_stream(&self, request: StartStream) -> Result<String, StreamError> {
        let stream_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let state = StreamState {
            stream_id: stream_id.clone(),
            chat_id: request.chat_id,
            message_id: request.message_id,
            user_id: request.user_id,
            model_id: request.model_id,
            messages: request.messages,
            content: String::new(),
            status: StreamStatus::Streaming,
            start_time: now,
            last_activity: now,
            position: 0,
            api_key: request.api_key,
        };

        self.write(&state).await?;

        let user_key = Self::user_streams_key(&state.user_id);
        self.store.set_add(&user_key, &stream_id).await?;
        self.store.expire(&user_key, self.ttl).await?;

        tracing::info!(stream_id = %stream_id, "Stream started");

        Ok(stream_id)
    }

    pub async fn get_stream_state(&self, stream_id: &str) -> Result<Option<StreamState>, StreamError> {
        self.read(stream_id).await
    }

    /// Replace the accumulated content and cursor.
    ///
    /// Returns `false` without touching the record when it is gone or no
    /// longer streaming; the writer treats that as a signal to stop.
    pub async fn update_stream_content(
        &self,
        stream_id: &str,
        content: &str,
        position: u64,
    ) -> Result<bool, StreamError> {
        if self.is_cancel_requested(stream_id).await? {
            // reassert in case this writer raced the cancel request
            self.finish(stream_id, StreamStatus::Cancelled, None).await?;
            return Ok(false);
        }

        let mut state = match self.read(stream_id).await? {
            Some(state) => state,
            None => return Ok(false),
        };

        if state.status.is_terminal() {
            tracing::debug!(
                stream_id = stream_id,
                status = %state.status,
                "Ignoring content update for finished stream"
            );
            return Ok(false);
        }

        state.content = content.to_string();
        state.position = position;
        state.last_activity = Utc::now();
        self.write(&state).await?;
        // the owner set must outlive every stream still being written
        self.store
            .expire(&Self::user_streams_key(&state.user_id), self.ttl)
            .await?;

        Ok(true)
    }

    pub async fn complete_stream(&self, stream_id: &str) -> Result<bool, StreamError> {
        self.finish(stream_id, StreamStatus::Completed, None).await
    }

    pub async fn error_stream(&self, stream_id: &str, message: &str) -> Result<bool, StreamError> {
        self.finish(stream_id, StreamStatus::Error, Some(message)).await
    }

    /// Mark the stream cancelled. The record stays readable until it expires.
    pub async fn cancel_stream(&self, stream_id: &str) -> Result<bool, StreamError> {
        match self.read(stream_id).await? {
            Some(state) if !state.status.is_terminal() => {}
            _ => return Ok(false),
        }
        self.store
            .set_ex(&Self::cancel_key(stream_id), "1", self.ttl)
            .await?;
        self.finish(stream_id, StreamStatus::Cancelled, None).await
    }

    /// Move a streaming record into a terminal state. The first terminal
    /// state wins; returns whether this call performed the transition.
    async fn finish(
        &self,
        stream_id: &str,
        status: StreamStatus,
        error: Option<&str>,
    ) -> Result<bool, StreamError> {
        let mut state = match self.read(stream_id).await? {
            Some(state) => state,
            None => return Ok(false),
        };

        let status = if status != StreamStatus::Cancelled
            && self.is_cancel_requested(stream_id).await?
        {
            StreamStatus::Cancelled
        } else {
            status
        };

        if state.status.is_terminal() {
            return Ok(false);
        }

        state.status = status;
        state.last_activity = Utc::now();
        if let (StreamStatus::Error, Some(message)) = (status, error) {
            state.content.push_str(&error_note(message));
        }
        self.write(&state).await?;

        self.store
            .set_remove(&Self::user_streams_key(&state.user_id), stream_id)
            .await?;

        tracing::info!(stream_id = stream_id, status = %status, "Stream finished");

        Ok(true)
    }

    /// `false` for any user other than the owner, and for unknown ids.
    pub async fn validate_stream_ownership(
        &self,
        stream_id: &str,
        user_id: &str,
    ) -> Result<bool, StreamError> {
        Ok(self
            .read(stream_id)
            .await?
            .map(|state| state.is_owned_by(user_id))
            .unwrap_or(false))
    }

    /// Load a record on behalf of `user_id`, telling "missing" apart from
    /// "not yours".
    pub async fn authorize(&self, stream_id: &str, user_id: &str) -> Result<StreamState, StreamError> {
        match self.read(stream_id).await? {
            Some(state) if state.is_owned_by(user_id) => Ok(state),
            Some(_) => Err(StreamError::Forbidden),
            None => Err(StreamError::NotFound),
        }
    }

    pub async fn get_stream_status(&self, stream_id: &str) -> Result<StreamStatusView, StreamError> {
        Ok(StreamStatusView::from(self.read(stream_id).await?))
    }

    /// Ids of the user's streams that are still generating. Members whose
    /// record has expired are pruned from the set.
    pub async fn get_active_streams(&self, user_id: &str) -> Result<Vec<String>, StreamError> {
        let user_key = Self::user_streams_key(user_id);
        let mut active = Vec::new();

        for stream_id in self.store.set_members(&user_key).await? {
            match self.read(&stream_id).await? {
                Some(state) if state.status == StreamStatus::Streaming => active.push(stream_id),
                Some(_) => {}
                None => self.store.set_remove(&user_key, &stream_id).await?,
            }
        }

        active.sort();
        Ok(active)
    }

    /// Delete every record idle for longer than the TTL. Returns the number
    /// of records removed. A store failure on one record is logged and the
    /// sweep moves on; only a failed key scan aborts it.
    #[tracing::instrument(name = "Cleanup expired streams", skip(self))]
    pub async fn cleanup_expired_streams(&self) -> Result<usize, StreamError> {
        let now = Utc::now();
        let keys: HashSet<String> = self
            .store
            .scan(&format!("{}*", STREAM_KEY_PREFIX))
            .await?
            .into_iter()
            .collect();

        let mut removed = 0;
        for key in keys {
            let stream_id = match key.strip_prefix(STREAM_KEY_PREFIX) {
                Some(id) => id.to_string(),
                None => continue,
            };

            let raw = match self.store.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(stream_id = %stream_id, error = %err, "Skipping stream record during cleanup");
                    continue;
                }
            };

            let owner = match serde_json::from_str::<StreamState>(&raw) {
                Ok(state) if is_expired(state.last_activity, now, self.ttl) => Some(state.user_id),
                Ok(_) => continue,
                Err(err) => {
                    tracing::warn!(stream_id = %stream_id, error = %err, "Removing unreadable stream record");
                    None
                }
            };

            match self.remove(&stream_id, owner.as_deref()).await {
                Ok(()) => removed += 1,
                Err(err) => {
                    tracing::warn!(stream_id = %stream_id, error = %err, "Failed to remove expired stream");
                }
            }
        }

        if let Err(err) = self.prune_user_sets().await {
            tracing::warn!(error = %err, "Failed to prune user stream sets");
        }

        if removed > 0 {
            tracing::info!(removed = removed, "Removed expired streams");
        }

        Ok(removed)
    }

    async fn remove(&self, stream_id: &str, user_id: Option<&str>) -> Result<(), StreamError> {
        self.store.del(&Self::stream_key(stream_id)).await?;
        self.store.del(&Self::cancel_key(stream_id)).await?;
        if let Some(user_id) = user_id {
            self.store
                .set_remove(&Self::user_streams_key(user_id), stream_id)
                .await?;
        }
        Ok(())
    }

    /// Drop active-set members whose record the store already expired.
    async fn prune_user_sets(&self) -> Result<(), StreamError> {
        let user_keys = self
            .store
            .scan(&format!("{}*", USER_STREAMS_KEY_PREFIX))
            .await?;

        for user_key in user_keys {
            for stream_id in self.store.set_members(&user_key).await? {
                if self.store.get(&Self::stream_key(&stream_id)).await?.is_none() {
                    self.store.set_remove(&user_key, &stream_id).await?;
                }
            }
        }

        Ok(())
    }
}
