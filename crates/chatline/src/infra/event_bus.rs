use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::domain::command::QuickActionCommand;
use crate::domain::prompt::ChatPrompt;

/// Listener callback invoked for each matching event.
pub type EventListener = Rc<dyn Fn(&UiEvent)>;

/// Vote cast on an answer card.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Vote {
    Upvote,
    Downvote,
}

/// Notification emitted by the widget for its host.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiEvent {
    ChatPrompt {
        tab_id: String,
        prompt: ChatPrompt,
    },
    TabAdded {
        tab_id: String,
    },
    TabSelected {
        tab_id: String,
    },
    TabChanged {
        tab_id: String,
    },
    TabRemoved {
        tab_id: String,
    },
    TabFocus {
        tab_id: String,
    },
    ResetStore {
        tab_id: String,
    },
    ContextSelected {
        tab_id: String,
        item: QuickActionCommand,
    },
    ContextPinned {
        tab_id: String,
        item: QuickActionCommand,
    },
    TopBarItemAdd {
        tab_id: String,
        item: QuickActionCommand,
    },
    TopBarItemRemove {
        tab_id: String,
        item: QuickActionCommand,
    },
    TopBarButtonClick {
        tab_id: String,
        button_id: String,
    },
    ResetTopBarClicked {
        tab_id: String,
    },
    OpenFileSystem {
        tab_id: String,
        kind: String,
        insert_position: usize,
    },
    AttachmentAdded {
        tab_id: String,
        content: String,
    },
    AttachmentRemoved {
        tab_id: String,
    },
    QuickCommandGroupActionClick {
        tab_id: String,
        action_id: String,
    },
    PromptInputOptionsChange {
        tab_id: String,
        options: BTreeMap<String, serde_json::Value>,
    },
    PromptInputButtonClick {
        tab_id: String,
        button_id: String,
    },
    StopChatResponse {
        tab_id: String,
    },
    FilesDropped {
        tab_id: String,
        files: Vec<PathBuf>,
        insert_position: usize,
    },
    CardVote {
        tab_id: String,
        message_id: String,
        vote: Vote,
    },
}

/// Name used to subscribe to one kind of [`UiEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UiEventName {
    ChatPrompt,
    TabAdded,
    TabSelected,
    TabChanged,
    TabRemoved,
    TabFocus,
    ResetStore,
    ContextSelected,
    ContextPinned,
    TopBarItemAdd,
    TopBarItemRemove,
    TopBarButtonClick,
    ResetTopBarClicked,
    OpenFileSystem,
    AttachmentAdded,
    AttachmentRemoved,
    QuickCommandGroupActionClick,
    PromptInputOptionsChange,
    PromptInputButtonClick,
    StopChatResponse,
    FilesDropped,
    CardVote,
}

impl UiEvent {
    /// Returns the subscription name of this event.
    pub fn name(&self) -> UiEventName {
        match self {
            UiEvent::ChatPrompt { .. } => UiEventName::ChatPrompt,
            UiEvent::TabAdded { .. } => UiEventName::TabAdded,
            UiEvent::TabSelected { .. } => UiEventName::TabSelected,
            UiEvent::TabChanged { .. } => UiEventName::TabChanged,
            UiEvent::TabRemoved { .. } => UiEventName::TabRemoved,
            UiEvent::TabFocus { .. } => UiEventName::TabFocus,
            UiEvent::ResetStore { .. } => UiEventName::ResetStore,
            UiEvent::ContextSelected { .. } => UiEventName::ContextSelected,
            UiEvent::ContextPinned { .. } => UiEventName::ContextPinned,
            UiEvent::TopBarItemAdd { .. } => UiEventName::TopBarItemAdd,
            UiEvent::TopBarItemRemove { .. } => UiEventName::TopBarItemRemove,
            UiEvent::TopBarButtonClick { .. } => UiEventName::TopBarButtonClick,
            UiEvent::ResetTopBarClicked { .. } => UiEventName::ResetTopBarClicked,
            UiEvent::OpenFileSystem { .. } => UiEventName::OpenFileSystem,
            UiEvent::AttachmentAdded { .. } => UiEventName::AttachmentAdded,
            UiEvent::AttachmentRemoved { .. } => UiEventName::AttachmentRemoved,
            UiEvent::QuickCommandGroupActionClick { .. } => {
                UiEventName::QuickCommandGroupActionClick
            }
            UiEvent::PromptInputOptionsChange { .. } => UiEventName::PromptInputOptionsChange,
            UiEvent::PromptInputButtonClick { .. } => UiEventName::PromptInputButtonClick,
            UiEvent::StopChatResponse { .. } => UiEventName::StopChatResponse,
            UiEvent::FilesDropped { .. } => UiEventName::FilesDropped,
            UiEvent::CardVote { .. } => UiEventName::CardVote,
        }
    }
}

struct Subscription {
    id: String,
    listener: EventListener,
    name: Option<UiEventName>,
}

/// In-memory publish/subscribe bus shared by every component of a widget.
///
/// Listeners run in registration order. Dispatch works on a snapshot of the
/// listener list, so listeners may dispatch or subscribe re-entrantly.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RefCell<Vec<Subscription>>,
}

impl EventBus {
    /// Creates a bus without listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for events named `name` and returns its id.
    pub fn subscribe(&self, name: UiEventName, listener: impl Fn(&UiEvent) + 'static) -> String {
        self.add_subscription(Some(name), Rc::new(listener))
    }

    /// Registers `listener` for every event and returns its id.
    pub fn subscribe_all(&self, listener: impl Fn(&UiEvent) + 'static) -> String {
        self.add_subscription(None, Rc::new(listener))
    }

    /// Removes a listener. Returns whether `listener_id` was registered.
    pub fn unsubscribe(&self, listener_id: &str) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let count_before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != listener_id);

        subscriptions.len() != count_before
    }

    /// Delivers `event` to every matching listener.
    pub fn dispatch(&self, event: &UiEvent) {
        let name = event.name();
        let listeners: Vec<EventListener> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|subscription| subscription.name.is_none_or(|filter| filter == name))
            .map(|subscription| Rc::clone(&subscription.listener))
            .collect();
        tracing::trace!(event = ?name, listeners = listeners.len(), "dispatching ui event");

        for listener in listeners {
            listener(event);
        }
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    fn add_subscription(&self, name: Option<UiEventName>, listener: EventListener) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.subscriptions.borrow_mut().push(Subscription {
            id: id.clone(),
            listener,
            name,
        });

        id
    }
}

/// Collects dispatched events, used by hosts that poll instead of reacting.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<UiEvent>>>,
}

impl EventRecorder {
    /// Subscribes a recorder to every event on `bus`.
    pub fn attach(bus: &EventBus) -> Self {
        let recorder = Self::default();
        let events = Rc::clone(&recorder.events);
        bus.subscribe_all(move |event| events.borrow_mut().push(event.clone()));

        recorder
    }

    /// Drains and returns the recorded events.
    pub fn take(&self) -> Vec<UiEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<UiEvent> {
        self.events.borrow().clone()
    }
}
