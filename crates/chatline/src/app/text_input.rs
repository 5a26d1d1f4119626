use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crossterm::event::KeyCode;

use crate::domain::command::{QuickActionCommand, QuickActionCommandGroup, has_image_context};
use crate::domain::document::{
    ContextPill, CursorPosition, PILL_TRAILING_SPACE, PromptDocument, Segment,
};
use crate::domain::key::KeyInput;
use crate::infra::event_bus::{EventBus, UiEvent};
use crate::infra::tab_store::{StoreKey, TabDataStore};
use crate::ui::state::overlay::{Overlay, OverlayAnchor, OverlayContent, OverlaySlot};

/// Typed keyword that requests an image file instead of staying in the text.
pub const IMAGE_CONTEXT_SELECT_KEYWORD: &str = "@image:";
const IMAGE_FILE_KIND: &str = "image";

/// Editable prompt surface mixing free text with atomic context pills.
///
/// Owns the pill-to-context map. After every mutation a reconciliation pass
/// drops map entries whose pill left the document, so the key set of the map
/// always equals the pill ids of the document.
pub struct PromptTextInput {
    auto_focus: bool,
    bus: Rc<EventBus>,
    document: PromptDocument,
    is_disabled: bool,
    is_focused: bool,
    last_cursor: usize,
    max_input_chars: usize,
    max_length: usize,
    placeholder: String,
    placeholder_overlay: OverlaySlot,
    selected_context: BTreeMap<String, QuickActionCommand>,
    store: Rc<TabDataStore>,
    tab_id: String,
}

impl PromptTextInput {
    /// Creates an empty input bound to the store of `tab_id`.
    ///
    /// `max_input_chars` hard-caps typed and pasted text.
    pub fn new(
        tab_id: impl Into<String>,
        bus: Rc<EventBus>,
        store: Rc<TabDataStore>,
        max_input_chars: usize,
        auto_focus: bool,
    ) -> Self {
        let placeholder = store.get_string(StoreKey::PromptInputPlaceholder);
        let is_disabled = store.get_bool(StoreKey::PromptInputDisabledState);

        Self {
            auto_focus,
            bus,
            document: PromptDocument::new(),
            is_disabled,
            is_focused: false,
            last_cursor: 0,
            max_input_chars,
            max_length: max_input_chars,
            placeholder,
            placeholder_overlay: OverlaySlot::new(),
            selected_context: BTreeMap::new(),
            store,
            tab_id: tab_id.into(),
        }
    }

    /// Returns the underlying document.
    pub fn document(&self) -> &PromptDocument {
        &self.document
    }

    /// Returns the context registered for each live pill.
    pub fn selected_context(&self) -> &BTreeMap<String, QuickActionCommand> {
        &self.selected_context
    }

    /// Inserts `item` as a pill at `position`, replacing the typed span up to
    /// the cursor, and returns the generated temporary id.
    ///
    /// Pills are pinnable to the top bar unless `top_bar_hidden` is set. An
    /// item with a placeholder shows it in a card anchored to the pill until
    /// the next input.
    pub fn insert_context_item(
        &mut self,
        item: &QuickActionCommand,
        position: usize,
        top_bar_hidden: bool,
    ) -> String {
        let temporary_id = uuid::Uuid::new_v4().to_string();
        self.selected_context
            .insert(temporary_id.clone(), item.clone());
        let command = item
            .command
            .strip_prefix('@')
            .unwrap_or(&item.command)
            .to_string();
        self.document.insert_pill(
            ContextPill {
                temporary_id: temporary_id.clone(),
                command,
                icon: item.icon.clone(),
                description: item.description.clone(),
                pinnable: !top_bar_hidden,
            },
            position,
        );

        if let Some(placeholder) = &item.placeholder {
            self.placeholder_overlay.show(
                OverlayContent::Card {
                    text: placeholder.clone(),
                },
                OverlayAnchor::Pill {
                    temporary_id: temporary_id.clone(),
                },
            );
        }
        tracing::debug!(tab_id = %self.tab_id, temporary_id = %temporary_id, "context pill inserted");
        self.after_mutation();

        temporary_id
    }

    /// Removes the logical span `[start, end)`; pills it touches go whole.
    pub fn delete_text_range(&mut self, start: usize, end: usize) {
        self.document.delete_range(start, end);
        self.after_mutation();
    }

    /// Returns the cursor offset measured after the last edit.
    pub fn cursor_pos(&self) -> usize {
        self.last_cursor
    }

    /// Re-measures the cursor offset from the document.
    pub fn update_cursor_pos(&mut self) -> usize {
        self.last_cursor = self.document.cursor();

        self.last_cursor
    }

    /// Returns the visual line placement of the cursor.
    pub fn cursor_position(&self, wrap_width: usize) -> CursorPosition {
        self.document.cursor_position(wrap_width)
    }

    /// Returns the context of every pill in document order.
    pub fn used_context(&self) -> Vec<QuickActionCommand> {
        self.document
            .pills()
            .filter_map(|pill| self.selected_context.get(&pill.temporary_id).cloned())
            .collect()
    }

    /// Drops context entries whose pill is gone and returns their ids.
    ///
    /// Matching entries of the tab's custom context list are removed in the
    /// same pass, compared by command, icon and description.
    pub fn reconcile(&mut self) -> Vec<String> {
        let live_ids: BTreeSet<&str> = self.document.pill_ids().into_iter().collect();
        let removed_ids: Vec<String> = self
            .selected_context
            .keys()
            .filter(|temporary_id| !live_ids.contains(temporary_id.as_str()))
            .cloned()
            .collect();
        if removed_ids.is_empty() {
            return removed_ids;
        }

        let removed: Vec<QuickActionCommand> = removed_ids
            .iter()
            .filter_map(|temporary_id| self.selected_context.remove(temporary_id))
            .collect();
        tracing::debug!(tab_id = %self.tab_id, removed = removed.len(), "context pills reconciled");

        let custom_context: Vec<QuickActionCommand> = self
            .store
            .get_as(StoreKey::CustomContextCommand)
            .unwrap_or_default();
        let kept: Vec<QuickActionCommand> = custom_context
            .into_iter()
            .filter(|context| !removed.iter().any(|item| item.same_identity(context)))
            .collect();
        if let Ok(value) = serde_json::to_value(&kept) {
            self.store.update(StoreKey::CustomContextCommand, value);
        }

        removed_ids
    }

    /// Inserts clipboard text at the cursor as plain text.
    ///
    /// Replaces the selection, drops carriage returns and truncates to the
    /// remaining input capacity. Returns whether anything changed.
    pub fn paste(&mut self, text: &str) -> bool {
        if self.is_disabled {
            return false;
        }

        let selected_len = self
            .document
            .selection()
            .map_or(0, |(start, end)| end - start);
        let available = self
            .max_input_chars
            .saturating_sub(self.document.len() - selected_len);
        let plain: String = text
            .chars()
            .filter(|ch| *ch != '\r')
            .take(available)
            .collect();
        if plain.is_empty() {
            return false;
        }

        self.document.insert_text(&plain);
        self.after_input();

        true
    }

    /// Applies the default editing behavior of `key`.
    ///
    /// Returns whether the key was understood as an editing key.
    pub fn apply_edit_key(&mut self, key: &KeyInput) -> bool {
        if self.is_disabled {
            return false;
        }

        let mut is_content_changed = false;
        match key.code() {
            _ if key.is_ctrl_char('a') => self.document.select_all(),
            _ if key.is_enter() => {
                if !key.shift() && !key.alt() {
                    return false;
                }
                is_content_changed = self.insert_capped('\n');
            }
            KeyCode::Char(_) => {
                let Some(ch) = key.printable_char() else {
                    return false;
                };
                is_content_changed = self.insert_capped(ch);
            }
            KeyCode::Backspace => {
                let len_before = self.document.len();
                self.document.delete_backward();
                is_content_changed = self.document.len() != len_before;
            }
            KeyCode::Delete => {
                let len_before = self.document.len();
                self.document.delete_forward();
                is_content_changed = self.document.len() != len_before;
            }
            KeyCode::Left => self.document.move_left(),
            KeyCode::Right => self.document.move_right(),
            KeyCode::Home => self.document.move_home(),
            KeyCode::End => self.document.move_end(),
            KeyCode::Up => self.document.move_up(),
            KeyCode::Down => self.document.move_down(),
            _ => return false,
        }

        if is_content_changed {
            self.after_input();
        } else {
            self.update_cursor_pos();
        }

        true
    }

    /// Post-keystroke pass: re-measures the cursor and runs the image
    /// keyword detection. Returns whether the image keyword fired.
    pub fn after_keystroke(&mut self) -> bool {
        self.update_cursor_pos();

        self.check_image_trigger()
    }

    /// Removes the first `@image:` keyword and asks the host for an image.
    ///
    /// Active only when the tab's context catalog offers the `image` command.
    pub fn check_image_trigger(&mut self) -> bool {
        let context_commands: Vec<QuickActionCommandGroup> = self
            .store
            .get_as(StoreKey::ContextCommands)
            .unwrap_or_default();
        if !has_image_context(&context_commands) {
            return false;
        }

        let cursor = self.document.cursor();
        if self
            .document
            .remove_first(IMAGE_CONTEXT_SELECT_KEYWORD)
            .is_none()
        {
            return false;
        }

        let insert_position = cursor.saturating_sub(IMAGE_CONTEXT_SELECT_KEYWORD.chars().count());
        tracing::debug!(tab_id = %self.tab_id, insert_position, "image keyword typed");
        self.bus.dispatch(&UiEvent::OpenFileSystem {
            tab_id: self.tab_id.clone(),
            kind: IMAGE_FILE_KIND.to_string(),
            insert_position,
        });
        self.after_input();

        true
    }

    /// Inserts every command of a host-provided context list as pills.
    ///
    /// Insertion starts at `insert_position` or the last cursor and each
    /// following pill lands after the previous one.
    pub fn add_custom_context(
        &mut self,
        commands: &[QuickActionCommand],
        insert_position: Option<usize>,
        top_bar_hidden: bool,
    ) {
        let mut position = insert_position.unwrap_or(self.last_cursor);
        for command in commands {
            self.document.set_cursor(position);
            self.insert_context_item(command, position, top_bar_hidden);
            position = self.cursor_pos();
        }
        self.focus();
    }

    /// Removes all content and restores the store placeholder.
    pub fn clear(&mut self) {
        self.document.clear();
        let placeholder = self.store.get_string(StoreKey::PromptInputPlaceholder);
        self.update_placeholder(&placeholder);
        self.placeholder_overlay.close();
        self.after_mutation();
    }

    /// Focuses the input, when auto focus is enabled, and moves the cursor
    /// to the end.
    pub fn focus(&mut self) {
        if self.auto_focus && !self.is_disabled {
            self.is_focused = true;
        }
        self.document.move_end();
        self.update_cursor_pos();
    }

    /// Removes focus.
    pub fn blur(&mut self) {
        self.is_focused = false;
    }

    /// Returns whether the input has focus.
    pub fn is_focused(&self) -> bool {
        self.is_focused
    }

    /// Returns the trimmed logical text with pill spacing normalized.
    pub fn text_value(&self) -> String {
        self.document
            .text()
            .replace(PILL_TRAILING_SPACE, " ")
            .trim()
            .to_string()
    }

    /// Replaces the whole content with plain `value`.
    pub fn update_text_value(&mut self, value: &str) {
        self.document.set_text(value);
        self.after_mutation();
    }

    /// Appends a non-breaking space without moving the cursor.
    pub fn insert_end_space(&mut self) {
        let len = self.document.len();
        self.document
            .insert_at(len, Segment::Text(PILL_TRAILING_SPACE.to_string()));
        self.update_cursor_pos();
    }

    /// Sets the character budget.
    pub fn update_max_length(&mut self, max_length: usize) {
        self.max_length = max_length;
    }

    /// Returns the character budget.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Sets the placeholder shown while the input is empty.
    pub fn update_placeholder(&mut self, text: &str) {
        self.placeholder = text.to_string();
    }

    /// Returns the current placeholder.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Returns the placeholder card of the last inserted pill, if shown.
    pub fn placeholder_card(&self) -> Option<&OverlayContent> {
        self.placeholder_overlay.content()
    }

    /// Returns whether the input holds neither text nor pills.
    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    /// Enables or disables editing, blurring when disabled.
    pub fn set_disabled(&mut self, is_disabled: bool) {
        self.is_disabled = is_disabled;
        if is_disabled {
            self.blur();
        } else if self.auto_focus {
            self.is_focused = true;
        }
    }

    /// Returns whether editing is disabled.
    pub fn is_disabled(&self) -> bool {
        self.is_disabled
    }

    /// Announces that the pill `temporary_id` was clicked for pinning.
    pub fn pin_context(&self, temporary_id: &str) -> bool {
        let Some(item) = self.selected_context.get(temporary_id) else {
            return false;
        };
        self.bus.dispatch(&UiEvent::ContextPinned {
            tab_id: self.tab_id.clone(),
            item: item.clone(),
        });

        true
    }

    fn insert_capped(&mut self, ch: char) -> bool {
        let selected_len = self
            .document
            .selection()
            .map_or(0, |(start, end)| end - start);
        if self.document.len() - selected_len >= self.max_input_chars {
            return false;
        }
        self.document.insert_char(ch);

        true
    }

    fn after_input(&mut self) {
        self.placeholder_overlay.close();
        self.after_mutation();
    }

    fn after_mutation(&mut self) {
        self.reconcile();
        self.update_cursor_pos();
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use serde_json::json;

    use super::*;
    use crate::infra::event_bus::EventRecorder;

    fn text_input() -> (PromptTextInput, Rc<TabDataStore>, EventRecorder) {
        let bus = Rc::new(EventBus::new());
        let recorder = EventRecorder::attach(&bus);
        let store = Rc::new(TabDataStore::new(
            BTreeMap::from([(StoreKey::PromptInputPlaceholder, json!("Ask"))]),
            BTreeMap::new(),
        ));
        let input = PromptTextInput::new("tab-1", bus, Rc::clone(&store), 20, true);

        (input, store, recorder)
    }

    fn type_text(input: &mut PromptTextInput, text: &str) {
        for ch in text.chars() {
            input.apply_edit_key(&KeyInput::new(KeyCode::Char(ch), KeyModifiers::NONE));
        }
    }

    fn key(code: KeyCode) -> KeyInput {
        KeyInput::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_insert_context_item_replaces_trigger_and_places_cursor() {
        // Arrange
        let (mut input, _, _) = text_input();
        type_text(&mut input, "see @fi");

        // Act
        let temporary_id =
            input.insert_context_item(&QuickActionCommand::new("@file.ts"), 4, true);

        // Assert
        assert_eq!(input.document().text(), "see @file.ts\u{a0}");
        assert_eq!(input.cursor_pos(), 4 + "@file.ts".len() + 1);
        assert_eq!(input.document().pill_ids(), vec![temporary_id.as_str()]);
        assert_eq!(
            input.used_context(),
            vec![QuickActionCommand::new("@file.ts")]
        );
    }

    #[test]
    fn test_pill_and_context_sets_stay_equal_across_edits() {
        // Arrange
        let (mut input, _, _) = text_input();
        input.insert_context_item(&QuickActionCommand::new("a.rs"), 0, true);
        type_text(&mut input, "x");
        input.insert_context_item(&QuickActionCommand::new("b.rs"), input.cursor_pos(), true);

        // Act
        input.apply_edit_key(&key(KeyCode::Backspace));
        input.apply_edit_key(&key(KeyCode::Backspace));
        let ids_after_backspace: Vec<String> = input
            .document()
            .pill_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        let keys_after_backspace: Vec<String> =
            input.selected_context().keys().cloned().collect();
        input.delete_text_range(0, 1);

        // Assert
        assert_eq!(ids_after_backspace.len(), 1);
        assert_eq!(ids_after_backspace, keys_after_backspace);
        assert!(input.selected_context().is_empty());
        assert!(input.document().pill_ids().is_empty());
    }

    #[test]
    fn test_reconcile_drops_matching_custom_context() {
        // Arrange
        let (mut input, store, _) = text_input();
        let rule = QuickActionCommand::new("rule").description("team rule");
        let other = QuickActionCommand::new("other");
        store.update(StoreKey::CustomContextCommand, json!([rule, other]));
        input.insert_context_item(&rule, 0, true);

        // Act
        input.clear();

        // Assert
        let remaining: Vec<QuickActionCommand> = store
            .get_as(StoreKey::CustomContextCommand)
            .unwrap_or_default();
        assert_eq!(remaining, vec![QuickActionCommand::new("other")]);
        assert!(input.selected_context().is_empty());
        assert_eq!(input.placeholder(), "Ask");
    }

    #[test]
    fn test_paste_inserts_plain_text_over_selection_and_truncates() {
        // Arrange
        let (mut input, _, _) = text_input();
        type_text(&mut input, "hello");
        input.apply_edit_key(&KeyInput::new(KeyCode::Char('a'), KeyModifiers::CONTROL));

        // Act
        let pasted = input.paste("line one\r\nline two and more text");

        // Assert
        assert!(pasted);
        assert_eq!(input.document().text(), "line one\nline two an");
        assert_eq!(input.cursor_pos(), 20);
    }

    #[test]
    fn test_typing_stops_at_hard_cap() {
        // Arrange
        let (mut input, _, _) = text_input();
        type_text(&mut input, "01234567890123456789");

        // Act
        type_text(&mut input, "x");

        // Assert
        assert_eq!(input.document().len(), 20);
        assert!(!input.document().text().contains('x'));
    }

    #[test]
    fn test_image_keyword_requests_file_picker_when_enabled() {
        // Arrange
        let (mut input, store, recorder) = text_input();
        store.update(
            StoreKey::ContextCommands,
            json!([{ "commands": [{ "command": "image" }] }]),
        );
        type_text(&mut input, "hi @image:");

        // Act
        let fired = input.after_keystroke();

        // Assert
        assert!(fired);
        assert_eq!(input.document().text(), "hi ");
        assert_eq!(
            recorder.take(),
            vec![UiEvent::OpenFileSystem {
                tab_id: "tab-1".to_string(),
                kind: "image".to_string(),
                insert_position: 3,
            }]
        );
    }

    #[test]
    fn test_image_keyword_is_plain_text_without_capability() {
        // Arrange
        let (mut input, _, recorder) = text_input();
        type_text(&mut input, "@image:");

        // Act
        let fired = input.after_keystroke();

        // Assert
        assert!(!fired);
        assert_eq!(input.document().text(), "@image:");
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_placeholder_card_closes_on_next_input() {
        // Arrange
        let (mut input, _, _) = text_input();
        input.insert_context_item(
            &QuickActionCommand::new("folder").placeholder("Pick a folder"),
            0,
            true,
        );
        let card_before = input.placeholder_card().cloned();

        // Act
        type_text(&mut input, "x");

        // Assert
        assert_eq!(
            card_before,
            Some(OverlayContent::Card {
                text: "Pick a folder".to_string()
            })
        );
        assert_eq!(input.placeholder_card(), None);
    }

    #[test]
    fn test_add_custom_context_chains_insert_positions() {
        // Arrange
        let (mut input, _, _) = text_input();
        type_text(&mut input, "ab");

        // Act
        input.add_custom_context(
            &[QuickActionCommand::new("x"), QuickActionCommand::new("y")],
            Some(1),
            true,
        );

        // Assert
        let commands: Vec<String> = input
            .used_context()
            .into_iter()
            .map(|item| item.command)
            .collect();
        assert_eq!(commands, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(input.document().text(), "a@x\u{a0}@y\u{a0}b");
        assert!(input.is_focused());
    }

    #[test]
    fn test_pin_context_dispatches_pinned_item() {
        // Arrange
        let (mut input, _, recorder) = text_input();
        let temporary_id = input.insert_context_item(&QuickActionCommand::new("a.rs"), 0, false);

        // Act
        let pinned = input.pin_context(&temporary_id);

        // Assert
        assert!(pinned);
        assert_eq!(
            recorder.take(),
            vec![UiEvent::ContextPinned {
                tab_id: "tab-1".to_string(),
                item: QuickActionCommand::new("a.rs"),
            }]
        );
        assert!(!input.pin_context("missing"));
    }

    #[test]
    fn test_disabled_input_ignores_edits() {
        // Arrange
        let (mut input, _, _) = text_input();
        input.set_disabled(true);

        // Act
        type_text(&mut input, "abc");
        let pasted = input.paste("x");

        // Assert
        assert!(input.is_empty());
        assert!(!pasted);
        assert!(!input.is_focused());
    }
}
