use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::command::ChatItemButton;
use crate::infra::event_bus::{EventBus, UiEvent};
use crate::infra::tab_store::{StoreKey, TabDataStore};

/// Host-defined option rendered under the prompt, such as a toggle or a
/// select.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOption {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Progress bar state mirrored from `promptInputProgress`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Percentage in `0..=100`; negative means indeterminate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

/// Chip showing the quick action locked for the next send.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandChip {
    command: Option<String>,
}

impl CommandChip {
    pub fn set(&mut self, command: &str) {
        self.command = Some(command.to_string());
    }

    pub fn clear(&mut self) {
        self.command = None;
    }

    /// Returns the locked command, if any.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }
}

/// Options, custom buttons, send/stop and progress around the prompt.
pub struct PromptControls {
    bus: Rc<EventBus>,
    buttons: Vec<ChatItemButton>,
    is_cancel_enabled: bool,
    is_loading: bool,
    options: Vec<FilterOption>,
    progress: Option<PromptProgress>,
    tab_id: String,
}

impl PromptControls {
    /// Creates controls seeded from the tab store.
    pub fn new(tab_id: impl Into<String>, bus: Rc<EventBus>, store: &TabDataStore) -> Self {
        let mut controls = Self {
            bus,
            buttons: Vec::new(),
            is_cancel_enabled: false,
            is_loading: false,
            options: Vec::new(),
            progress: None,
            tab_id: tab_id.into(),
        };
        for key in [
            StoreKey::PromptInputOptions,
            StoreKey::PromptInputButtons,
            StoreKey::LoadingChat,
            StoreKey::CancelButtonWhenLoading,
            StoreKey::PromptInputProgress,
        ] {
            controls.sync(key, store);
        }

        controls
    }

    /// Re-reads `key` from `store`. Returns whether the key belongs to the
    /// controls.
    pub fn sync(&mut self, key: StoreKey, store: &TabDataStore) -> bool {
        match key {
            StoreKey::PromptInputOptions => {
                self.options = store.get_as(key).unwrap_or_default();
            }
            StoreKey::PromptInputButtons => {
                self.buttons = store.get_as(key).unwrap_or_default();
            }
            StoreKey::LoadingChat => self.is_loading = store.get_bool(key),
            StoreKey::CancelButtonWhenLoading => self.is_cancel_enabled = store.get_bool(key),
            StoreKey::PromptInputProgress => self.progress = store.get_as(key),
            _ => return false,
        }

        true
    }

    pub fn options(&self) -> &[FilterOption] {
        &self.options
    }

    pub fn buttons(&self) -> &[ChatItemButton] {
        &self.buttons
    }

    pub fn progress(&self) -> Option<&PromptProgress> {
        self.progress.as_ref()
    }

    /// Returns the current value of every option keyed by id.
    pub fn option_values(&self) -> BTreeMap<String, Value> {
        self.options
            .iter()
            .map(|option| (option.id.clone(), option.value.clone()))
            .collect()
    }

    /// Changes one option and announces the new value set.
    pub fn set_option_value(&mut self, id: &str, value: Value) -> bool {
        let Some(option) = self.options.iter_mut().find(|option| option.id == id) else {
            return false;
        };
        option.value = value;
        self.bus.dispatch(&UiEvent::PromptInputOptionsChange {
            tab_id: self.tab_id.clone(),
            options: self.option_values(),
        });

        true
    }

    /// Announces a click on the custom button `id`.
    pub fn button_click(&self, id: &str) -> bool {
        if !self
            .buttons
            .iter()
            .any(|button| button.id == id && !button.disabled)
        {
            return false;
        }
        self.bus.dispatch(&UiEvent::PromptInputButtonClick {
            tab_id: self.tab_id.clone(),
            button_id: id.to_string(),
        });

        true
    }

    /// Returns whether the stop button replaces the send button.
    pub fn is_stop_visible(&self) -> bool {
        self.is_loading && self.is_cancel_enabled
    }

    /// Returns whether an answer is being generated.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Asks the host to stop the current answer.
    pub fn stop_click(&self) -> bool {
        if !self.is_stop_visible() {
            return false;
        }
        tracing::debug!(tab_id = %self.tab_id, "stop requested");
        self.bus.dispatch(&UiEvent::StopChatResponse {
            tab_id: self.tab_id.clone(),
        });

        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::infra::event_bus::EventRecorder;

    fn controls(initial: BTreeMap<StoreKey, Value>) -> (PromptControls, TabDataStore, EventRecorder) {
        let bus = Rc::new(EventBus::new());
        let recorder = EventRecorder::attach(&bus);
        let store = TabDataStore::new(BTreeMap::new(), initial);
        let controls = PromptControls::new("tab-1", bus, &store);

        (controls, store, recorder)
    }

    #[test]
    fn test_set_option_value_dispatches_all_values() {
        // Arrange
        let (mut controls, _, recorder) = controls(BTreeMap::from([(
            StoreKey::PromptInputOptions,
            json!([{ "id": "mode", "value": "fast" }, { "id": "web", "value": false }]),
        )]));

        // Act
        let changed = controls.set_option_value("web", json!(true));

        // Assert
        assert!(changed);
        assert_eq!(
            recorder.take(),
            vec![UiEvent::PromptInputOptionsChange {
                tab_id: "tab-1".to_string(),
                options: BTreeMap::from([
                    ("mode".to_string(), json!("fast")),
                    ("web".to_string(), json!(true)),
                ]),
            }]
        );
    }

    #[test]
    fn test_stop_needs_loading_and_cancel_flag() {
        // Arrange
        let (mut controls, store, recorder) =
            controls(BTreeMap::from([(StoreKey::LoadingChat, json!(true))]));
        let stopped_without_flag = controls.stop_click();

        // Act
        store.update(StoreKey::CancelButtonWhenLoading, json!(true));
        controls.sync(StoreKey::CancelButtonWhenLoading, &store);
        let stopped = controls.stop_click();

        // Assert
        assert!(!stopped_without_flag);
        assert!(stopped);
        assert_eq!(
            recorder.take(),
            vec![UiEvent::StopChatResponse {
                tab_id: "tab-1".to_string()
            }]
        );
    }

    #[test]
    fn test_sync_ignores_foreign_keys() {
        // Arrange
        let (mut controls, store, _) = controls(BTreeMap::new());

        // Act
        let handled = controls.sync(StoreKey::TabTitle, &store);

        // Assert
        assert!(!handled);
    }

    #[test]
    fn test_button_click_requires_known_enabled_button() {
        // Arrange
        let (controls, _, recorder) = controls(BTreeMap::from([(
            StoreKey::PromptInputButtons,
            json!([{ "id": "rules" }, { "id": "off", "disabled": true }]),
        )]));

        // Act
        let clicks = [
            controls.button_click("rules"),
            controls.button_click("off"),
            controls.button_click("missing"),
        ];

        // Assert
        assert_eq!(clicks, [true, false, false]);
        assert_eq!(recorder.take().len(), 1);
    }

    #[test]
    fn test_command_chip_tracks_locked_command() {
        // Arrange
        let mut chip = CommandChip::default();

        // Act
        chip.set("/dev");
        let locked = chip.command().map(str::to_string);
        chip.clear();

        // Assert
        assert_eq!(locked.as_deref(), Some("/dev"));
        assert_eq!(chip.command(), None);
    }
}
