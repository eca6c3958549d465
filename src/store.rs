//! Conversation store
//!
//! Owns the conversation list, the open conversation and its message
//! timeline. Every mutation of that state goes through this module:
//! - paged list loading (refresh and load-more) behind a [`FetchGate`]
//! - paged history loading per conversation, each with its own gate
//! - the derived, searchable visible list
//! - the mutation primitives used by [`MessageSyncEngine`](crate::sync::MessageSyncEngine)
//!
//! State sits behind a `tokio::sync::RwLock` that is never held across a
//! collaborator call, so readers always observe fully applied updates.

use crate::{
    api::ConversationApi,
    gate::{Debouncer, FetchGate, PageRequest, Trigger},
    merge::{merge_page, sort_stable, upsert_sorted, MergeMode},
    model::{
        message::{place_message, Placement},
        Conversation, DeliveryStatus, Message, SeenReceipt, Typing,
    },
    search,
    settings::Settings,
    Result,
};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Progress of a paged collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing requested yet
    #[default]
    Idle,
    /// A page request is running
    Loading,
    /// At least one request finished
    Loaded,
}

/// What a list view should render around its rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    /// No load attempted yet
    Idle,
    /// A page is loading
    Loading,
    /// The last load failed
    Error(String),
    /// Loaded, nothing to show
    Empty,
    /// Loaded, rows available
    Ready,
}

/// The conversation currently open on screen
#[derive(Debug, Clone)]
pub struct ActiveConversation {
    /// Conversation summary
    pub conversation: Conversation,
    /// Timeline, newest first
    pub messages: Vec<Message>,
    /// History paging progress
    pub history: LoadState,
    /// Last history error
    pub error: Option<String>,
    gate: Arc<FetchGate>,
    /// Seen receipts as (author, sequence of the latest receipt)
    receipts: Vec<(String, u64)>,
    receipt_seq: u64,
    epoch: u64,
}

impl ActiveConversation {
    fn new(conversation: Conversation, gate: FetchGate, epoch: u64) -> Self {
        Self {
            conversation,
            messages: Vec::new(),
            history: LoadState::Idle,
            error: None,
            gate: Arc::new(gate),
            receipts: Vec::new(),
            receipt_seq: 0,
            epoch,
        }
    }

    /// Conversation id
    pub fn id(&self) -> &str {
        &self.conversation.id
    }

    /// History cursor of this conversation; dropped when it closes
    pub(crate) fn history_gate(&self) -> &Arc<FetchGate> {
        &self.gate
    }

    fn record_receipt(&mut self, author_id: &str) {
        self.receipt_seq += 1;
        let seq = self.receipt_seq;
        match self.receipts.iter_mut().find(|(id, _)| id == author_id) {
            Some(receipt) => receipt.1 = seq,
            None => self.receipts.push((author_id.to_string(), seq)),
        }
    }

    /// Authors whose receipt arrived after sequence `since`
    fn receipts_after(&self, since: u64) -> Vec<String> {
        self.receipts
            .iter()
            .filter(|(_, seq)| *seq > since)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn mark_seen_by(&mut self, user_id: &str) -> usize {
        let changed = self
            .messages
            .iter_mut()
            .map(|m| m.mark_seen_by(user_id))
            .filter(|changed| *changed)
            .count();
        changed + self.conversation.mark_seen_by(user_id)
    }
}

/// Where an applied message landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Applied {
    /// Placement in the conversation-list entry, if the entry exists
    pub list: Option<Placement>,
    /// Placement in the open timeline, if the conversation is open
    pub timeline: Option<Placement>,
}

impl Applied {
    /// Whether either collection had to fall back to inserting
    pub fn inserted_anywhere(&self) -> bool {
        self.list == Some(Placement::Inserted) || self.timeline == Some(Placement::Inserted)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    conversations: Vec<Conversation>,
    list_load: LoadState,
    list_error: Option<String>,
    search_text: String,
    active: Option<ActiveConversation>,
    open_error: Option<String>,
    typing: Option<Typing>,
    create_loading: bool,
    create_error: Option<String>,
    send_error: Option<String>,
    seen_error: Option<String>,
    next_epoch: u64,
}

impl StoreState {
    fn entry_mut(&mut self, conversation_id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == conversation_id)
    }

    fn active_mut(&mut self, conversation_id: &str) -> Option<&mut ActiveConversation> {
        self.active.as_mut().filter(|a| a.conversation.id == conversation_id)
    }
}

/// Newest activity first; a conversation with no message yet ranks before
/// all others.
fn by_recent_activity(a: &Conversation, b: &Conversation) -> Ordering {
    match (a.last_message_created_at, b.last_message_created_at) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => b.cmp(&a),
    }
}

/// Derive the visible list: conversations with activity, newest first,
/// filtered by `search_text` against the display name.
pub fn visible_conversations(conversations: &[Conversation], search_text: &str) -> Vec<Conversation> {
    let mut visible: Vec<Conversation> = conversations
        .iter()
        .filter(|c| c.has_activity())
        .cloned()
        .collect();
    sort_stable(&mut visible, by_recent_activity);
    visible.retain(|c| search::matches(c.display_name(), search_text));
    visible
}

/// Conversation list and open-timeline state for one signed-in user
pub struct ConversationStore {
    api: Arc<dyn ConversationApi>,
    local_user_id: String,
    settings: Settings,
    list_gate: FetchGate,
    search_debouncer: Debouncer,
    state: RwLock<StoreState>,
}

impl ConversationStore {
    /// Create an empty store for `local_user_id`
    pub fn new(api: Arc<dyn ConversationApi>, local_user_id: impl Into<String>, settings: Settings) -> Self {
        Self {
            api,
            local_user_id: local_user_id.into(),
            list_gate: FetchGate::with_debounce(settings.conversation_page_limit, settings.fetch_debounce()),
            search_debouncer: Debouncer::new(settings.search_debounce()),
            state: RwLock::new(StoreState::default()),
            settings,
        }
    }

    /// The signed-in user
    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    // ========== Conversation list ==========

    /// Load a page of conversations.
    ///
    /// With `reset` the cursor rewinds and the first page replaces the list;
    /// otherwise the next page is appended without duplicates. A call while
    /// another list fetch is running is dropped, not queued.
    pub async fn load_page(&self, reset: bool) -> Trigger {
        let fetch = |page: PageRequest| self.fetch_list_page(page, reset);
        if reset {
            self.list_gate.trigger_reset(fetch).await
        } else {
            self.list_gate.trigger(fetch).await
        }
    }

    /// Pull-to-refresh
    pub async fn refresh(&self) -> Trigger {
        self.load_page(true).await
    }

    /// End-of-list trigger; rapid calls collapse into the last one
    pub async fn load_more_debounced(&self) -> Trigger {
        self.list_gate
            .trigger_debounced(|page| self.fetch_list_page(page, false))
            .await
    }

    async fn fetch_list_page(&self, page: PageRequest, reset: bool) -> Result<usize> {
        {
            let mut state = self.state.write().await;
            state.list_load = LoadState::Loading;
            state.list_error = None;
        }

        debug!("Fetching conversations offset={} limit={}", page.offset, page.limit);
        let result = self.api.fetch_conversations(page).await;

        let mut state = self.state.write().await;
        match result {
            Ok(incoming) => {
                let count = incoming.len();
                if !self.list_gate.is_current(&page) {
                    debug!("Dropping conversation page fetched before reset");
                    return Ok(count);
                }
                let mode = if reset { MergeMode::Replace } else { MergeMode::Append };
                let existing = std::mem::take(&mut state.conversations);
                state.conversations = merge_page(existing, incoming, mode);
                state.list_load = LoadState::Loaded;
                info!("Loaded {} conversations ({} total)", count, state.conversations.len());
                Ok(count)
            }
            Err(e) => {
                state.list_load = LoadState::Loaded;
                state.list_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Raw conversation list in fetch order
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.read().await.conversations.clone()
    }

    /// A conversation-list entry by id
    pub async fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        let state = self.state.read().await;
        state.conversations.iter().find(|c| c.id == conversation_id).cloned()
    }

    /// Conversations to render: with activity, newest first, search applied
    pub async fn visible_conversations(&self) -> Vec<Conversation> {
        let state = self.state.read().await;
        visible_conversations(&state.conversations, &state.search_text)
    }

    /// Render status for the list view
    pub async fn list_status(&self) -> ListStatus {
        let state = self.state.read().await;
        match state.list_load {
            LoadState::Idle => ListStatus::Idle,
            LoadState::Loading => ListStatus::Loading,
            LoadState::Loaded => {
                if let Some(error) = &state.list_error {
                    ListStatus::Error(error.clone())
                } else if visible_conversations(&state.conversations, &state.search_text).is_empty() {
                    ListStatus::Empty
                } else {
                    ListStatus::Ready
                }
            }
        }
    }

    /// Last list fetch error
    pub async fn list_error(&self) -> Option<String> {
        self.state.read().await.list_error.clone()
    }

    /// Whether the list cursor has reached the end
    pub async fn is_exhausted(&self) -> bool {
        self.list_gate.cursor().await.exhausted
    }

    /// Current search text
    pub async fn search_text(&self) -> String {
        self.state.read().await.search_text.clone()
    }

    /// Set the search text immediately
    pub async fn set_search_text(&self, text: impl Into<String>) {
        self.state.write().await.search_text = text.into();
    }

    /// Set the search text once typing pauses. Returns `false` if a newer
    /// keystroke replaced this one.
    pub async fn set_search_text_debounced(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        if !self.search_debouncer.settle().await {
            return false;
        }
        self.set_search_text(text).await;
        true
    }

    /// Create a conversation with `member_ids`, or return the existing
    /// one-to-one conversation with exactly these members.
    ///
    /// The local user is always added to the member set. One the list already
    /// holds (same id) is replaced in place; a new one is placed by recent
    /// activity, so an empty conversation goes to the head of the list.
    pub async fn create_conversation(&self, member_ids: BTreeSet<String>) -> Option<Conversation> {
        let mut members = member_ids;
        members.insert(self.local_user_id.clone());

        {
            let mut state = self.state.write().await;
            if let Some(existing) = state
                .conversations
                .iter()
                .find(|c| !c.is_group && c.has_members(&members))
            {
                debug!("Reusing conversation {} for {:?}", existing.id, members);
                return Some(existing.clone());
            }
            state.create_loading = true;
            state.create_error = None;
        }

        let result = self.api.create_conversation(&members).await;

        let mut state = self.state.write().await;
        state.create_loading = false;
        match result {
            Ok(conversation) => {
                info!("Created conversation {}", conversation.id);
                upsert_sorted(&mut state.conversations, conversation.clone(), &by_recent_activity);
                Some(conversation)
            }
            Err(e) => {
                warn!("Failed to create conversation: {}", e);
                state.create_error = Some(e.to_string());
                None
            }
        }
    }

    /// Whether a create call is running
    pub async fn is_creating(&self) -> bool {
        self.state.read().await.create_loading
    }

    /// Last create error
    pub async fn create_error(&self) -> Option<String> {
        self.state.read().await.create_error.clone()
    }

    /// Forget everything (logout)
    pub async fn reset_all(&self) {
        let mut state = self.state.write().await;
        let next_epoch = state.next_epoch;
        *state = StoreState {
            next_epoch,
            ..StoreState::default()
        };
        self.list_gate.reset().await;
        info!("Conversation state reset");
    }

    // ========== Open conversation ==========

    /// Open `conversation` with an empty timeline and a fresh history cursor
    pub async fn open_conversation(&self, conversation: Conversation) {
        let gate = FetchGate::with_debounce(self.settings.message_page_limit, self.settings.fetch_debounce());

        let mut state = self.state.write().await;
        state.next_epoch += 1;
        let epoch = state.next_epoch;
        debug!("Opening conversation {}", conversation.id);
        state.active = Some(ActiveConversation::new(conversation, gate, epoch));
        state.open_error = None;
    }

    /// Fetch a conversation by id and open it
    pub async fn open_conversation_by_id(&self, conversation_id: &str) -> bool {
        match self.api.fetch_conversation(conversation_id).await {
            Ok(conversation) => {
                self.open_conversation(conversation).await;
                true
            }
            Err(e) => {
                warn!("Failed to fetch conversation {}: {}", conversation_id, e);
                let mut state = self.state.write().await;
                state.open_error = Some(e.to_string());
                false
            }
        }
    }

    /// Last open-by-id error
    pub async fn open_error(&self) -> Option<String> {
        self.state.read().await.open_error.clone()
    }

    /// Close the open conversation; its list entry stays
    pub async fn reset_conversation(&self) {
        let mut state = self.state.write().await;
        if let Some(active) = state.active.take() {
            debug!("Closing conversation {}", active.id());
        }
    }

    /// Snapshot of the open conversation
    pub async fn active_conversation(&self) -> Option<ActiveConversation> {
        self.state.read().await.active.clone()
    }

    /// Open conversation's timeline, newest first
    pub async fn timeline(&self) -> Vec<Message> {
        let state = self.state.read().await;
        state.active.as_ref().map(|a| a.messages.clone()).unwrap_or_default()
    }

    /// Load the next page of the open conversation's history.
    ///
    /// Returns `None` when no conversation is open. Each conversation pages
    /// through its own cursor, independent of the list and of other
    /// conversations.
    pub async fn load_history(&self) -> Option<Trigger> {
        let (conversation_id, epoch, gate) = {
            let state = self.state.read().await;
            let active = state.active.as_ref()?;
            (active.conversation.id.clone(), active.epoch, active.history_gate().clone())
        };
        let outcome = gate
            .trigger(|page| self.fetch_history_page(&conversation_id, epoch, page))
            .await;
        Some(outcome)
    }

    async fn fetch_history_page(&self, conversation_id: &str, epoch: u64, page: PageRequest) -> Result<usize> {
        // Receipts up to here are already reflected by the server's answer
        let since = {
            let mut state = self.state.write().await;
            match state.active.as_mut().filter(|a| a.epoch == epoch) {
                Some(active) => {
                    active.history = LoadState::Loading;
                    active.error = None;
                    active.receipt_seq
                }
                None => return Ok(0),
            }
        };

        debug!(
            "Fetching history of {} offset={} limit={}",
            conversation_id, page.offset, page.limit
        );
        let result = self.api.fetch_messages(conversation_id, page).await;

        let mut state = self.state.write().await;
        let Some(active) = state.active.as_mut().filter(|a| a.epoch == epoch) else {
            debug!("Dropping history page for closed conversation {}", conversation_id);
            return result.map(|page| page.len());
        };
        match result {
            Ok(mut incoming) => {
                let count = incoming.len();
                // Pages arrive oldest first; the timeline is newest first.
                incoming.reverse();
                for author_id in active.receipts_after(since) {
                    for message in &mut incoming {
                        message.mark_seen_by(&author_id);
                    }
                }
                let existing = std::mem::take(&mut active.messages);
                active.messages = merge_page(existing, incoming, MergeMode::Append);
                active.history = LoadState::Loaded;
                Ok(count)
            }
            Err(e) => {
                active.history = LoadState::Loaded;
                active.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // ========== Real-time mutation primitives ==========

    /// Put a message into its list entry and, if open, the timeline.
    ///
    /// Only a newly inserted list message with `count_unread` bumps the
    /// unread badge; redelivery and reconciliation never do. A message from
    /// the typing peer clears the typing slot.
    pub(crate) async fn apply_message(&self, message: Message, count_unread: bool) -> Applied {
        let mut state = self.state.write().await;
        let mut applied = Applied::default();

        if state
            .typing
            .as_ref()
            .is_some_and(|t| t.conversation_id == message.conversation_id && t.author_id == message.author_id)
        {
            state.typing = None;
        }

        if let Some(active) = state.active_mut(&message.conversation_id) {
            let placement = place_message(&mut active.messages, message.clone());
            active.conversation.sync_last_message_from(&active.messages);
            applied.timeline = Some(placement);
        }

        if let Some(entry) = state.entry_mut(&message.conversation_id) {
            let placement = entry.place_message(message);
            if count_unread && placement == Placement::Inserted {
                entry.total_unread_messages_count += 1;
            }
            applied.list = Some(placement);
        } else {
            debug!("No list entry for conversation {}", message.conversation_id);
        }

        applied
    }

    /// Record that `author_id` saw the conversation's messages.
    ///
    /// Applies to the list entry and the open timeline. While the
    /// conversation is open the receipt is also recorded, so a history page
    /// that was in flight when it arrived is marked too. Returns how many
    /// messages changed.
    pub(crate) async fn apply_seen(&self, conversation_id: &str, author_id: &str) -> usize {
        let mut state = self.state.write().await;
        let mut changed = 0;
        if let Some(entry) = state.entry_mut(conversation_id) {
            changed += entry.mark_seen_by(author_id);
        }
        if let Some(active) = state.active_mut(conversation_id) {
            changed += active.mark_seen_by(author_id);
            active.record_receipt(author_id);
        }
        changed
    }

    /// Apply a confirmed seen receipt: the badge drops to zero and every
    /// loaded message is marked seen by the receipt's author.
    pub(crate) async fn apply_seen_confirmation(&self, receipt: &SeenReceipt) {
        {
            let mut state = self.state.write().await;
            if let Some(entry) = state.entry_mut(&receipt.conversation_id) {
                entry.clear_unread();
            }
            if let Some(active) = state.active_mut(&receipt.conversation_id) {
                active.conversation.clear_unread();
            }
            state.seen_error = None;
        }
        self.apply_seen(&receipt.conversation_id, &receipt.author_id).await;
    }

    /// Mark a local echo as failed in both collections
    pub(crate) async fn mark_send_failed(&self, conversation_id: &str, temp_id: &str, error: String) -> bool {
        let mut state = self.state.write().await;
        state.send_error = Some(error);
        let mut found = false;
        for messages in state.message_lists_mut(conversation_id) {
            if let Some(message) = messages.iter_mut().find(|m| m.id == temp_id) {
                message.mark_failed();
                found = true;
            }
        }
        found
    }

    /// Flip a failed local echo back to sending and return it.
    ///
    /// Returns `None` unless the echo is marked failed, so an echo whose send
    /// is still running is never sent twice.
    pub(crate) async fn mark_resending(&self, conversation_id: &str, temp_id: &str) -> Option<Message> {
        let mut state = self.state.write().await;
        let mut resent = None;
        for messages in state.message_lists_mut(conversation_id) {
            if let Some(message) = messages
                .iter_mut()
                .find(|m| m.id == temp_id && m.delivery_status == DeliveryStatus::Failed)
            {
                message.mark_sending();
                resent = Some(message.clone());
            }
        }
        if resent.is_some() {
            state.send_error = None;
        }
        resent
    }

    /// Record a seen-receipt failure
    pub(crate) async fn set_seen_error(&self, error: String) {
        self.state.write().await.seen_error = Some(error);
    }

    /// Replace the typing slot. A stop event only clears its own author.
    pub(crate) async fn set_typing(&self, typing: Typing) {
        let mut state = self.state.write().await;
        if typing.typing {
            state.typing = Some(typing);
        } else if state
            .typing
            .as_ref()
            .is_some_and(|t| t.conversation_id == typing.conversation_id && t.author_id == typing.author_id)
        {
            state.typing = None;
        }
    }

    /// Current typing indicator
    pub async fn typing(&self) -> Option<Typing> {
        self.state.read().await.typing.clone()
    }

    /// Last send error
    pub async fn send_error(&self) -> Option<String> {
        self.state.read().await.send_error.clone()
    }

    /// Last seen-receipt error
    pub async fn seen_error(&self) -> Option<String> {
        self.state.read().await.seen_error.clone()
    }

    /// Member ids of a conversation, from the open conversation or the list
    pub async fn members_of(&self, conversation_id: &str) -> Vec<String> {
        let state = self.state.read().await;
        state
            .active
            .as_ref()
            .filter(|a| a.conversation.id == conversation_id)
            .map(|a| &a.conversation)
            .or_else(|| state.conversations.iter().find(|c| c.id == conversation_id))
            .map(|c| c.members.clone())
            .unwrap_or_default()
    }
}

impl StoreState {
    fn message_lists_mut(&mut self, conversation_id: &str) -> Vec<&mut Vec<Message>> {
        let mut lists = Vec::with_capacity(2);
        if let Some(active) = self
            .active
            .as_mut()
            .filter(|a| a.conversation.id == conversation_id)
        {
            lists.push(&mut active.messages);
        }
        if let Some(entry) = self.conversations.iter_mut().find(|c| c.id == conversation_id) {
            lists.push(&mut entry.messages);
        }
        lists
    }
}
