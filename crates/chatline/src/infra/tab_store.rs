use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::infra::event_bus::{EventBus, UiEvent};

/// Callback notified with the new value of a store key.
pub type StoreListener = Rc<dyn Fn(&Value)>;

/// Key of the per-tab data store.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreKey {
    TabTitle,
    LoadingChat,
    CancelButtonWhenLoading,
    ChatItems,
    PromptInputText,
    PromptInputLabel,
    PromptInputVisible,
    PromptInputInfo,
    PromptInputStickyCard,
    PromptInputPlaceholder,
    PromptInputDisabledState,
    PromptInputOptions,
    PromptInputButtons,
    PromptInputProgress,
    ContextCommands,
    QuickActionCommands,
    QuickActionCommandsHeader,
    PromptTopBarContextItems,
    PromptTopBarTitle,
    PromptTopBarButton,
    SelectedCodeSnippet,
    CustomContextCommand,
}

/// Error raised by tab bookkeeping.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TabStoreError {
    #[error("tab limit of {0} reached")]
    TabLimitReached(usize),
    #[error("unknown tab `{0}`")]
    UnknownTab(String),
}

struct StoreSubscription {
    id: String,
    key: StoreKey,
    listener: StoreListener,
}

/// Reactive key/value data of one tab.
///
/// Missing keys fall back to the defaults the store was created with.
/// [`TabDataStore::update_store`] writes every key before notifying, so
/// subscribers always observe the whole batch.
pub struct TabDataStore {
    defaults: BTreeMap<StoreKey, Value>,
    subscriptions: RefCell<Vec<StoreSubscription>>,
    values: RefCell<BTreeMap<StoreKey, Value>>,
}

impl TabDataStore {
    /// Creates a store seeded with `defaults` and then `initial` values.
    pub fn new(defaults: BTreeMap<StoreKey, Value>, initial: BTreeMap<StoreKey, Value>) -> Self {
        let mut values = defaults.clone();
        values.extend(initial);

        Self {
            defaults,
            subscriptions: RefCell::new(Vec::new()),
            values: RefCell::new(values),
        }
    }

    /// Returns the current value of `key`, or `Value::Null` when unset.
    pub fn get(&self, key: StoreKey) -> Value {
        self.values
            .borrow()
            .get(&key)
            .or_else(|| self.defaults.get(&key))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Returns the value of `key` deserialized into `T`.
    ///
    /// Unset keys and values of a different shape yield `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: StoreKey) -> Option<T> {
        let value = self.get(key);
        if value.is_null() {
            return None;
        }

        serde_json::from_value(value).ok()
    }

    /// Returns the value of `key` as a string, empty when unset.
    pub fn get_string(&self, key: StoreKey) -> String {
        match self.get(key) {
            Value::String(text) => text,
            _ => String::new(),
        }
    }

    /// Returns the value of `key` as a boolean, `false` when unset.
    pub fn get_bool(&self, key: StoreKey) -> bool {
        self.get(key).as_bool().unwrap_or(false)
    }

    /// Registers `listener` for changes of `key` and returns its id.
    pub fn subscribe(&self, key: StoreKey, listener: impl Fn(&Value) + 'static) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.subscriptions.borrow_mut().push(StoreSubscription {
            id: id.clone(),
            key,
            listener: Rc::new(listener),
        });

        id
    }

    /// Removes a subscription. Returns whether `subscription_id` existed.
    pub fn unsubscribe(&self, subscription_id: &str) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let count_before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != subscription_id);

        subscriptions.len() != count_before
    }

    /// Writes every entry of `updates`, then notifies subscribers.
    ///
    /// Scalars notify only when they change; objects and arrays always
    /// notify.
    pub fn update_store(&self, updates: Vec<(StoreKey, Value)>) {
        let mut changed = Vec::new();
        {
            let mut values = self.values.borrow_mut();
            for (key, value) in updates {
                let is_container = value.is_object() || value.is_array();
                let previous = values.insert(key, value);
                let is_changed =
                    is_container || previous.as_ref() != values.get(&key);
                if is_changed && !changed.contains(&key) {
                    changed.push(key);
                }
            }
        }

        for key in changed {
            self.notify(key);
        }
    }

    /// Writes one key and notifies its subscribers.
    pub fn update(&self, key: StoreKey, value: Value) {
        self.update_store(vec![(key, value)]);
    }

    /// Restores every key to its default and notifies all subscribers.
    pub fn reset_store(&self) {
        *self.values.borrow_mut() = self.defaults.clone();

        let mut keys: Vec<StoreKey> = self
            .subscriptions
            .borrow()
            .iter()
            .map(|subscription| subscription.key)
            .collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            self.notify(key);
        }
    }

    fn notify(&self, key: StoreKey) {
        let listeners: Vec<StoreListener> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|subscription| subscription.key == key)
            .map(|subscription| Rc::clone(&subscription.listener))
            .collect();
        let value = self.get(key);

        for listener in listeners {
            listener(&value);
        }
    }
}

struct TabEntry {
    store: Rc<TabDataStore>,
    tab_id: String,
}

/// Ordered collection of tabs with one selected tab.
pub struct TabsStore {
    bus: Rc<EventBus>,
    defaults: BTreeMap<StoreKey, Value>,
    max_tabs: usize,
    selected_tab_id: RefCell<Option<String>>,
    tabs: RefCell<Vec<TabEntry>>,
}

impl TabsStore {
    /// Creates an empty tab collection.
    pub fn new(bus: Rc<EventBus>, defaults: BTreeMap<StoreKey, Value>, max_tabs: usize) -> Self {
        Self {
            bus,
            defaults,
            max_tabs,
            selected_tab_id: RefCell::new(None),
            tabs: RefCell::new(Vec::new()),
        }
    }

    /// Adds and selects a tab seeded with `initial` values.
    ///
    /// # Errors
    /// Returns [`TabStoreError::TabLimitReached`] when the tab limit is hit.
    pub fn add_tab(&self, initial: BTreeMap<StoreKey, Value>) -> Result<String, TabStoreError> {
        if self.tabs.borrow().len() >= self.max_tabs {
            return Err(TabStoreError::TabLimitReached(self.max_tabs));
        }

        let tab_id = uuid::Uuid::new_v4().to_string();
        let store = Rc::new(TabDataStore::new(self.defaults.clone(), initial));
        self.tabs.borrow_mut().push(TabEntry {
            store,
            tab_id: tab_id.clone(),
        });
        tracing::debug!(tab_id = %tab_id, "tab added");
        self.bus.dispatch(&UiEvent::TabAdded {
            tab_id: tab_id.clone(),
        });
        self.select_tab(&tab_id)?;

        Ok(tab_id)
    }

    /// Removes a tab and selects its neighbour when it was selected.
    ///
    /// # Errors
    /// Returns [`TabStoreError::UnknownTab`] for an unknown id.
    pub fn remove_tab(&self, tab_id: &str) -> Result<(), TabStoreError> {
        let next_selection = {
            let mut tabs = self.tabs.borrow_mut();
            let index = tabs
                .iter()
                .position(|tab| tab.tab_id == tab_id)
                .ok_or_else(|| TabStoreError::UnknownTab(tab_id.to_string()))?;
            tabs.remove(index);

            let was_selected = self.selected_tab_id.borrow().as_deref() == Some(tab_id);
            if was_selected {
                tabs.get(index.saturating_sub(1))
                    .or_else(|| tabs.first())
                    .map(|tab| tab.tab_id.clone())
            } else {
                None
            }
        };
        tracing::debug!(tab_id = %tab_id, "tab removed");
        self.bus.dispatch(&UiEvent::TabRemoved {
            tab_id: tab_id.to_string(),
        });

        if self.selected_tab_id.borrow().as_deref() == Some(tab_id) {
            *self.selected_tab_id.borrow_mut() = None;
            if let Some(next_tab_id) = next_selection {
                self.select_tab(&next_tab_id)?;
            }
        }

        Ok(())
    }

    /// Marks `tab_id` as the selected tab.
    ///
    /// # Errors
    /// Returns [`TabStoreError::UnknownTab`] for an unknown id.
    pub fn select_tab(&self, tab_id: &str) -> Result<(), TabStoreError> {
        if !self.tabs.borrow().iter().any(|tab| tab.tab_id == tab_id) {
            return Err(TabStoreError::UnknownTab(tab_id.to_string()));
        }

        *self.selected_tab_id.borrow_mut() = Some(tab_id.to_string());
        self.bus.dispatch(&UiEvent::TabSelected {
            tab_id: tab_id.to_string(),
        });

        Ok(())
    }

    /// Returns the selected tab id.
    pub fn selected_tab_id(&self) -> Option<String> {
        self.selected_tab_id.borrow().clone()
    }

    /// Returns tab ids in creation order.
    pub fn tab_ids(&self) -> Vec<String> {
        self.tabs
            .borrow()
            .iter()
            .map(|tab| tab.tab_id.clone())
            .collect()
    }

    /// Returns the data store of `tab_id`.
    pub fn tab_store(&self, tab_id: &str) -> Option<Rc<TabDataStore>> {
        self.tabs
            .borrow()
            .iter()
            .find(|tab| tab.tab_id == tab_id)
            .map(|tab| Rc::clone(&tab.store))
    }

    /// Applies a batched update to one tab and announces the change.
    ///
    /// # Errors
    /// Returns [`TabStoreError::UnknownTab`] for an unknown id.
    pub fn update_tab(
        &self,
        tab_id: &str,
        updates: Vec<(StoreKey, Value)>,
    ) -> Result<(), TabStoreError> {
        let store = self
            .tab_store(tab_id)
            .ok_or_else(|| TabStoreError::UnknownTab(tab_id.to_string()))?;
        store.update_store(updates);
        self.bus.dispatch(&UiEvent::TabChanged {
            tab_id: tab_id.to_string(),
        });

        Ok(())
    }

    /// Resets one tab to the defaults.
    ///
    /// # Errors
    /// Returns [`TabStoreError::UnknownTab`] for an unknown id.
    pub fn reset_tab(&self, tab_id: &str) -> Result<(), TabStoreError> {
        let store = self
            .tab_store(tab_id)
            .ok_or_else(|| TabStoreError::UnknownTab(tab_id.to_string()))?;
        store.reset_store();
        self.bus.dispatch(&UiEvent::ResetStore {
            tab_id: tab_id.to_string(),
        });

        Ok(())
    }
}
