// Test support - scripted in-memory collaborators and fixtures

use crate::api::{ConversationApi, FeedApi, MessageApi};
use crate::gate::PageRequest;
use crate::model::{Conversation, CreateMessageInput, Message, Post, SeenReceipt, User};
use crate::settings::Settings;
use crate::store::ConversationStore;
use crate::sync::MessageSyncEngine;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const ME: &str = "me";

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("valid timestamp")
}

pub fn user(id: &str, name: &str) -> User {
    User::new(id, format!("{}_handle", id), name)
}

/// One-to-one conversation with `peer`; `last_at` is the newest message time
pub fn conversation(id: &str, peer: &str, last_at: Option<i64>) -> Conversation {
    let mut conversation = Conversation::new(
        id,
        Some(user(peer, &format!("{} Person", peer))),
        vec![ME.to_string(), peer.to_string()],
    );
    if let Some(secs) = last_at {
        conversation.last_message_content = Some(format!("last in {}", id));
        conversation.last_message_created_at = Some(ts(secs));
    }
    conversation
}

pub fn message(id: &str, conversation_id: &str, author: &str, secs: i64) -> Message {
    Message::new(id, conversation_id, author, format!("body of {}", id), ts(secs))
}

pub fn conversations(prefix: &str, count: usize) -> Vec<Conversation> {
    (0..count)
        .map(|i| conversation(&format!("{}{}", prefix, i), &format!("peer{}", i), Some(i as i64)))
        .collect()
}

pub fn post(id: &str) -> Post {
    Post {
        id: id.to_string(),
        content: format!("post {}", id),
        user: user("author", "Author"),
        file_url: Vec::new(),
        like_count: 0,
        comment_count: 0,
        is_liked: false,
        created_at: ts(0),
    }
}

/// Conversation API answering from scripted queues.
///
/// An empty queue answers with an empty page. With `hold` set, list
/// fetches wait for a `notify_one` before answering.
#[derive(Default)]
pub struct FakeConversationApi {
    pub pages: Mutex<VecDeque<Result<Vec<Conversation>>>>,
    pub history: Mutex<VecDeque<Result<Vec<Message>>>>,
    pub single: Mutex<VecDeque<Result<Conversation>>>,
    pub created: Mutex<VecDeque<Result<Conversation>>>,
    pub list_calls: Mutex<Vec<PageRequest>>,
    pub history_calls: Mutex<Vec<(String, PageRequest)>>,
    pub create_calls: AtomicUsize,
    pub hold_list: Option<Arc<Notify>>,
    pub hold_history: Option<Arc<Notify>>,
}

impl FakeConversationApi {
    pub fn push_page(&self, page: Result<Vec<Conversation>>) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn push_history(&self, page: Result<Vec<Message>>) {
        self.history.lock().unwrap().push_back(page);
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ConversationApi for FakeConversationApi {
    async fn fetch_conversations(&self, page: PageRequest) -> Result<Vec<Conversation>> {
        self.list_calls.lock().unwrap().push(page);
        if let Some(hold) = &self.hold_list {
            hold.notified().await;
        }
        let next = self.pages.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_conversation(&self, id: &str) -> Result<Conversation> {
        let next = self.single.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(Error::Graph(format!("conversation {} not found", id))))
    }

    async fn fetch_messages(&self, conversation_id: &str, page: PageRequest) -> Result<Vec<Message>> {
        self.history_calls
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), page));
        if let Some(hold) = &self.hold_history {
            hold.notified().await;
        }
        let next = self.history.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create_conversation(&self, member_ids: &BTreeSet<String>) -> Result<Conversation> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.created.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            let members: Vec<String> = member_ids.iter().cloned().collect();
            Ok(Conversation::new(format!("new-{}", members.join("-")), None, members))
        })
    }
}

/// Message API that confirms every send unless a failure is scripted.
///
/// With `hold_send` set, sends wait for a `notify_one` before answering.
#[derive(Default)]
pub struct FakeMessageApi {
    pub send_results: Mutex<VecDeque<Result<Message>>>,
    pub seen_results: Mutex<VecDeque<Result<SeenReceipt>>>,
    pub sent: Mutex<Vec<CreateMessageInput>>,
    pub hold_send: Option<Arc<Notify>>,
    next_id: AtomicUsize,
}

impl FakeMessageApi {
    pub fn holding(release: Arc<Notify>) -> Self {
        Self {
            hold_send: Some(release),
            ..Self::default()
        }
    }

    pub fn fail_next_send(&self, error: Error) {
        self.send_results.lock().unwrap().push_back(Err(error));
    }
}

#[async_trait]
impl MessageApi for FakeMessageApi {
    async fn send_message(&self, input: &CreateMessageInput) -> Result<Message> {
        self.sent.lock().unwrap().push(input.clone());
        if let Some(hold) = &self.hold_send {
            hold.notified().await;
        }
        if let Some(scripted) = self.send_results.lock().unwrap().pop_front() {
            return scripted;
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut confirmed = Message::new(
            format!("srv-{}", n),
            input.conversation_id.clone(),
            input.author_id.clone(),
            input.content.clone(),
            Utc::now(),
        );
        confirmed.temp_message_id = Some(input.temp_message_id.clone());
        confirmed.file_url = input.file_url.clone();
        Ok(confirmed)
    }

    async fn mark_seen(&self, conversation_id: &str) -> Result<SeenReceipt> {
        if let Some(scripted) = self.seen_results.lock().unwrap().pop_front() {
            return scripted;
        }
        Ok(SeenReceipt {
            conversation_id: conversation_id.to_string(),
            author_id: ME.to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeFeedApi {
    pub pages: Mutex<VecDeque<Result<Vec<Post>>>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl FeedApi for FakeFeedApi {
    async fn fetch_feed(&self, _page: PageRequest) -> Result<Vec<Post>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.pages.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn store_with(api: Arc<FakeConversationApi>) -> Arc<ConversationStore> {
    Arc::new(ConversationStore::new(api, ME, Settings::default()))
}

pub fn engine_with(
    conversation_api: Arc<FakeConversationApi>,
    message_api: Arc<FakeMessageApi>,
) -> MessageSyncEngine {
    MessageSyncEngine::new(store_with(conversation_api), message_api)
}

/// Store preloaded with `list` through a refresh
pub async fn loaded_engine(list: Vec<Conversation>) -> (MessageSyncEngine, Arc<FakeMessageApi>) {
    let conversation_api = Arc::new(FakeConversationApi::default());
    conversation_api.push_page(Ok(list));
    let message_api = Arc::new(FakeMessageApi::default());
    let engine = engine_with(conversation_api, message_api.clone());
    engine.store().refresh().await;
    (engine, message_api)
}
