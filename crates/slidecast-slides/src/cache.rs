//! Offline slide cache contract.
//!
//! Viewers download every slide of a session once and then render from a
//! local cache, so a slide change only needs the slide number on the wire.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

/// Local image store keyed by session and 1-based slide index.
#[async_trait]
pub trait SlideCache: Send + Sync {
    /// Store one slide image, replacing any previous one.
    async fn put(&self, session_id: &str, index: u32, image: Bytes);

    /// Fetch one slide image.
    async fn get(&self, session_id: &str, index: u32) -> Option<Bytes>;

    /// Whether the slide at `highest_index` is present. Slides are fetched in
    /// order, so the last one standing in for the full set is enough.
    async fn has(&self, session_id: &str, highest_index: u32) -> bool;
}

/// Whether every slide of a session is already cached.
pub async fn is_session_downloaded(
    cache: &dyn SlideCache,
    session_id: &str,
    slide_count: u32,
) -> bool {
    slide_count == 0 || cache.has(session_id, slide_count).await
}

/// Cache key, `{sessionId}-slide-{n}`.
pub fn cache_key(session_id: &str, index: u32) -> String {
    format!("{session_id}-slide-{index}")
}

/// [`SlideCache`] held in process memory.
#[derive(Default)]
pub struct MemorySlideCache {
    slides: RwLock<HashMap<String, Bytes>>,
}

impl MemorySlideCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.slides.read().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.slides.read().is_empty()
    }
}

#[async_trait]
impl SlideCache for MemorySlideCache {
    async fn put(&self, session_id: &str, index: u32, image: Bytes) {
        let _ = self.slides.write().insert(cache_key(session_id, index), image);
    }

    async fn get(&self, session_id: &str, index: u32) -> Option<Bytes> {
        self.slides.read().get(&cache_key(session_id, index)).cloned()
    }

    async fn has(&self, session_id: &str, highest_index: u32) -> bool {
        self.slides
            .read()
            .contains_key(&cache_key(session_id, highest_index))
    }
}
