use std::rc::Rc;

use serde_json::Value;

use crate::domain::chat_item::{ChatItem, ChatItemType, ChatItemUpdate};
use crate::infra::event_bus::{EventBus, UiEvent, Vote};
use crate::infra::scheduler::{
    SCROLL_SNAP_RELEASE, ScheduledTask, Scheduler, VOTE_CONFIRMATION_LIFETIME,
};
use crate::infra::tab_store::{StoreKey, TabDataStore};

/// Prefix of message ids generated for cards pushed without one.
pub const TEMP_MESSAGE_ID_PREFIX: &str = "TEMP_";

/// Rendered conversation card with its stream bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatCard {
    pub item: ChatItem,
    pub is_stream_ended: bool,
    /// Vote shown as confirmed until the confirmation timer fires.
    pub vote_confirmation: Option<Vote>,
    pending: Vec<ChatItemUpdate>,
}

impl From<ChatItem> for ChatCard {
    fn from(item: ChatItem) -> Self {
        let is_stream_ended = !item.item_type.is_stream();

        Self {
            item,
            is_stream_ended,
            vote_confirmation: None,
            pending: Vec::new(),
        }
    }
}

impl ChatCard {
    /// Returns the message id every inserted card carries.
    pub fn message_id(&self) -> &str {
        self.item.message_id.as_deref().unwrap_or_default()
    }

    /// Returns whether updates are still waiting for the next flush.
    pub fn has_pending_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    fn flush(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        for update in std::mem::take(&mut self.pending) {
            self.item.apply(&update);
        }

        true
    }
}

/// Conversation of one tab: cards grouped by prompt, answer streaming and
/// vote confirmation.
pub struct ChatWrapper {
    bus: Rc<EventBus>,
    cards: Vec<ChatCard>,
    /// Card indices grouped by conversation turn.
    groups: Vec<Vec<usize>>,
    is_scroll_snapped: bool,
    last_streaming_message_id: Option<String>,
    scheduler: Rc<Scheduler>,
    store: Rc<TabDataStore>,
    tab_id: String,
}

impl ChatWrapper {
    /// Creates an empty conversation for `tab_id`.
    pub fn new(
        tab_id: impl Into<String>,
        bus: Rc<EventBus>,
        scheduler: Rc<Scheduler>,
        store: Rc<TabDataStore>,
    ) -> Self {
        Self {
            bus,
            cards: Vec::new(),
            groups: Vec::new(),
            is_scroll_snapped: false,
            last_streaming_message_id: None,
            scheduler,
            store,
            tab_id: tab_id.into(),
        }
    }

    pub fn cards(&self) -> &[ChatCard] {
        &self.cards
    }

    /// Returns the cards of every conversation turn in order.
    pub fn groups(&self) -> Vec<Vec<&ChatCard>> {
        self.groups
            .iter()
            .map(|group| group.iter().filter_map(|&index| self.cards.get(index)).collect())
            .collect()
    }

    pub fn last_streaming_message_id(&self) -> Option<&str> {
        self.last_streaming_message_id.as_deref()
    }

    /// Returns whether the list should stay snapped to the latest prompt.
    pub fn is_scroll_snapped(&self) -> bool {
        self.is_scroll_snapped
    }

    /// Returns the card of `message_id`.
    pub fn chat_item(&self, message_id: &str) -> Option<&ChatItem> {
        self.card(message_id).map(|card| &card.item)
    }

    /// Appends `item` and returns its message id.
    ///
    /// The previous stream ends first. Prompts open a new conversation turn
    /// and snap the list to their top.
    pub fn insert_chat_item(&mut self, mut item: ChatItem) -> String {
        if let Some(message_id) = self.last_streaming_message_id.take() {
            self.finish_stream(&message_id, None);
        }

        let message_id = item
            .message_id
            .clone()
            .unwrap_or_else(|| format!("{TEMP_MESSAGE_ID_PREFIX}{}", uuid::Uuid::new_v4()));
        item.message_id = Some(message_id.clone());
        let item_type = item.item_type;
        let is_snapping = item_type.snaps_to_top() || item.snap_to_top;

        let index = self.cards.len();
        self.cards.push(ChatCard::from(item));
        match self.groups.last_mut() {
            Some(group) if item_type != ChatItemType::Prompt => group.push(index),
            _ => self.groups.push(vec![index]),
        }
        if item_type.is_stream() {
            self.last_streaming_message_id = Some(message_id.clone());
        }
        if is_snapping {
            self.is_scroll_snapped = true;
            self.scheduler.schedule(
                SCROLL_SNAP_RELEASE,
                ScheduledTask::ClearScrollSnap {
                    tab_id: self.tab_id.clone(),
                },
            );
        }
        tracing::debug!(tab_id = %self.tab_id, message_id = %message_id, ?item_type, "chat item inserted");
        self.mirror_items();

        message_id
    }

    /// Queues `update` for the streaming card. A new message id in the
    /// update re-keys the card.
    pub fn update_last_chat_answer(&mut self, update: ChatItemUpdate) -> bool {
        let Some(message_id) = self.last_streaming_message_id.clone() else {
            return false;
        };
        if let Some(new_id) = update.message_id.as_ref().filter(|id| **id != message_id) {
            if let Some(card) = self.card_mut(&message_id) {
                card.item.message_id = Some(new_id.clone());
            }
            tracing::trace!(tab_id = %self.tab_id, from = %message_id, to = %new_id, "streaming card re-keyed");
            self.last_streaming_message_id = Some(new_id.clone());
        }

        let target_id = self
            .last_streaming_message_id
            .clone()
            .unwrap_or(message_id);

        self.queue_update(&target_id, update)
    }

    /// Queues `update` for the card of `message_id`.
    pub fn update_chat_answer_with_message_id(
        &mut self,
        message_id: &str,
        update: ChatItemUpdate,
    ) -> bool {
        self.queue_update(message_id, update)
    }

    /// Flushes and finalizes the card of `message_id`, applying
    /// `update` last. Works on cards that are no longer the streaming one.
    pub fn end_stream_with_message_id(
        &mut self,
        message_id: &str,
        update: Option<ChatItemUpdate>,
    ) -> bool {
        if self.last_streaming_message_id.as_deref() == Some(message_id) {
            self.last_streaming_message_id = None;
        }

        self.finish_stream(message_id, update)
    }

    /// Applies every queued update. Returns whether a card changed.
    pub fn flush_pending(&mut self) -> bool {
        let mut is_changed = false;
        for card in &mut self.cards {
            is_changed |= card.flush();
        }
        if is_changed {
            self.mirror_items();
        }

        is_changed
    }

    /// Removes every card and empties the store list.
    pub fn clear(&mut self) {
        self.clear_cards();
        self.store
            .update(StoreKey::ChatItems, Value::Array(Vec::new()));
    }

    /// Removes every card, leaving the store untouched.
    pub fn clear_cards(&mut self) {
        self.cards.clear();
        self.groups.clear();
        self.last_streaming_message_id = None;
        tracing::debug!(tab_id = %self.tab_id, "conversation cleared");
    }

    /// Records `vote` on a votable card and schedules the confirmation
    /// dismissal.
    pub fn vote(&mut self, message_id: &str, vote: Vote) -> bool {
        let Some(card) = self.card_mut(message_id) else {
            return false;
        };
        if !card.item.can_be_voted {
            return false;
        }
        card.vote_confirmation = Some(vote);

        self.bus.dispatch(&UiEvent::CardVote {
            tab_id: self.tab_id.clone(),
            message_id: message_id.to_string(),
            vote,
        });
        self.scheduler.schedule(
            VOTE_CONFIRMATION_LIFETIME,
            ScheduledTask::DismissVoteConfirmation {
                tab_id: self.tab_id.clone(),
                message_id: message_id.to_string(),
            },
        );

        true
    }

    /// Hides the vote confirmation. A card removed in the meantime is
    /// ignored.
    pub fn dismiss_vote_confirmation(&mut self, message_id: &str) -> bool {
        let Some(card) = self.card_mut(message_id) else {
            tracing::trace!(message_id, "vote confirmation target gone");

            return false;
        };

        card.vote_confirmation.take().is_some()
    }

    /// Releases the scroll snap.
    pub fn clear_scroll_snap(&mut self) {
        self.is_scroll_snapped = false;
    }

    fn queue_update(&mut self, message_id: &str, update: ChatItemUpdate) -> bool {
        let Some(card) = self.card_mut(message_id) else {
            tracing::warn!(message_id, "update for unknown chat item ignored");

            return false;
        };
        card.pending.push(update);

        true
    }

    fn finish_stream(&mut self, message_id: &str, update: Option<ChatItemUpdate>) -> bool {
        let Some(card) = self.card_mut(message_id) else {
            return false;
        };
        card.flush();
        if let Some(update) = &update {
            card.item.apply(update);
        }
        card.is_stream_ended = true;
        tracing::debug!(message_id, "stream ended");
        self.mirror_items();

        true
    }

    fn card(&self, message_id: &str) -> Option<&ChatCard> {
        self.cards
            .iter()
            .find(|card| card.message_id() == message_id)
    }

    fn card_mut(&mut self, message_id: &str) -> Option<&mut ChatCard> {
        self.cards
            .iter_mut()
            .find(|card| card.message_id() == message_id)
    }

    fn mirror_items(&self) {
        let items: Vec<&ChatItem> = self.cards.iter().map(|card| &card.item).collect();
        match serde_json::to_value(items) {
            Ok(value) => self.store.update(StoreKey::ChatItems, value),
            Err(error) => tracing::warn!(%error, "chat items could not be stored"),
        }
    }
}
