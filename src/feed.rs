//! Home feed paging

use crate::{
    api::FeedApi,
    gate::{FetchGate, PageRequest, Trigger},
    merge::{merge_page, MergeMode},
    model::Post,
    settings::Settings,
    store::{ListStatus, LoadState},
    Result,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct FeedState {
    posts: Vec<Post>,
    load: LoadState,
    error: Option<String>,
}

/// Paged home feed with its own cursor
pub struct FeedStore {
    api: Arc<dyn FeedApi>,
    gate: FetchGate,
    state: RwLock<FeedState>,
}

impl FeedStore {
    /// Create an empty feed
    pub fn new(api: Arc<dyn FeedApi>, settings: &Settings) -> Self {
        Self {
            api,
            gate: FetchGate::with_debounce(settings.feed_page_limit, settings.fetch_debounce()),
            state: RwLock::new(FeedState::default()),
        }
    }

    /// Load the first page (`reset`) or the next one
    pub async fn load_page(&self, reset: bool) -> Trigger {
        let fetch = |page: PageRequest| self.fetch_page(page, reset);
        if reset {
            self.gate.trigger_reset(fetch).await
        } else {
            self.gate.trigger(fetch).await
        }
    }

    /// End-of-feed trigger; rapid calls collapse into the last one
    pub async fn load_more_debounced(&self) -> Trigger {
        self.gate
            .trigger_debounced(|page| self.fetch_page(page, false))
            .await
    }

    async fn fetch_page(&self, page: PageRequest, reset: bool) -> Result<usize> {
        {
            let mut state = self.state.write().await;
            state.load = LoadState::Loading;
            state.error = None;
        }

        let result = self.api.fetch_feed(page).await;

        let mut state = self.state.write().await;
        match result {
            Ok(incoming) => {
                let count = incoming.len();
                if !self.gate.is_current(&page) {
                    return Ok(count);
                }
                let mode = if reset { MergeMode::Replace } else { MergeMode::Append };
                let existing = std::mem::take(&mut state.posts);
                state.posts = merge_page(existing, incoming, mode);
                state.load = LoadState::Loaded;
                debug!("Feed holds {} posts", state.posts.len());
                Ok(count)
            }
            Err(e) => {
                state.load = LoadState::Loaded;
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Loaded posts in feed order
    pub async fn posts(&self) -> Vec<Post> {
        self.state.read().await.posts.clone()
    }

    /// Whether the feed has reached its end
    pub async fn is_exhausted(&self) -> bool {
        self.gate.cursor().await.exhausted
    }

    /// Render status for the feed view
    pub async fn status(&self) -> ListStatus {
        let state = self.state.read().await;
        match (state.load, &state.error) {
            (LoadState::Idle, _) => ListStatus::Idle,
            (LoadState::Loading, _) => ListStatus::Loading,
            (LoadState::Loaded, Some(error)) => ListStatus::Error(error.clone()),
            (LoadState::Loaded, None) if state.posts.is_empty() => ListStatus::Empty,
            (LoadState::Loaded, None) => ListStatus::Ready,
        }
    }

    /// Drop every post and rewind the cursor
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = FeedState::default();
        self.gate.reset().await;
    }
}
