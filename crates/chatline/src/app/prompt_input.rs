use std::cell::RefCell;
use std::rc::Rc;

use crossterm::event::KeyCode;
use regex::RegexBuilder;
use serde_json::Value;

use crate::app::WidgetServices;
use crate::app::attachment::PromptAttachment;
use crate::app::prompt_controls::{CommandChip, PromptControls};
use crate::app::text_input::PromptTextInput;
use crate::app::top_bar::PromptTopBar;
use crate::domain::command::{
    QuickActionCommand, QuickActionCommandGroup, QuickActionCommandsHeader, command_count,
};
use crate::domain::key::KeyInput;
use crate::domain::prompt::{AttachmentKind, ChatPrompt, UserPrompt, escape_prompt};
use crate::infra::config::MAX_USER_INPUT_THRESHOLD;
use crate::infra::event_bus::UiEvent;
use crate::infra::scheduler::{FOCUS_AFTER_ATTACHMENT, FOCUS_AFTER_TEXT_UPDATE, ScheduledTask};
use crate::infra::tab_store::{StoreKey, TabDataStore};
use crate::ui::state::overlay::{
    Overlay, OverlayAnchor, OverlayContent, OverlaySlot, OverlaySnapshot,
};
use crate::ui::state::prompt::{PromptHistoryState, SelectorState};
use crate::ui::state::quick_pick::{QuickPickMode, QuickPickSession, TargetDirection};

const SUBSCRIBED_KEYS: [StoreKey; 12] = [
    StoreKey::PromptInputText,
    StoreKey::PromptInputPlaceholder,
    StoreKey::PromptInputDisabledState,
    StoreKey::PromptInputOptions,
    StoreKey::PromptInputButtons,
    StoreKey::PromptInputProgress,
    StoreKey::LoadingChat,
    StoreKey::CancelButtonWhenLoading,
    StoreKey::PromptTopBarContextItems,
    StoreKey::PromptTopBarTitle,
    StoreKey::PromptTopBarButton,
    StoreKey::QuickActionCommandsHeader,
];

/// Decides whether a picked context item ends up in the prompt.
///
/// The host answers after `ContextSelected`; rejecting removes the typed
/// trigger instead.
#[cfg_attr(test, mockall::automock)]
pub trait ContextSelectionPolicy {
    /// Returns whether `item` should be inserted for `tab_id`.
    fn should_insert(&self, tab_id: &str, item: &QuickActionCommand) -> bool;
}

/// Policy accepting every picked context item.
pub struct AlwaysInsert;

impl ContextSelectionPolicy for AlwaysInsert {
    fn should_insert(&self, _tab_id: &str, _item: &QuickActionCommand) -> bool {
        true
    }
}

/// Result of routing one key press through the prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key changed the prompt or its overlays.
    Consumed,
    /// The key committed a prompt.
    Sent,
    /// The prompt had no use for the key.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SelectionMethod {
    Click,
    Enter,
    Tab,
}

enum KeyFlow {
    /// Default editing applies after the transition.
    Default,
    Prevent,
    Sent,
}

/// Prompt composer: text input, command/context pickers, history,
/// attachment and character budget of one tab.
pub struct ChatPromptInput {
    attachment: PromptAttachment,
    chip: CommandChip,
    controls: PromptControls,
    history: PromptHistoryState,
    indicator: OverlaySlot,
    policy: Box<dyn ContextSelectionPolicy>,
    quick_pick: OverlaySlot,
    selector: SelectorState,
    services: WidgetServices,
    store: Rc<TabDataStore>,
    store_changes: Rc<RefCell<Vec<StoreKey>>>,
    subscription_ids: Vec<String>,
    tab_id: String,
    text_input: PromptTextInput,
    top_bar: PromptTopBar,
    top_bar_title_clicked: bool,
    wrap_width: usize,
}

impl ChatPromptInput {
    /// Creates the prompt of `tab_id` bound to its data store.
    pub fn new(
        tab_id: impl Into<String>,
        services: &WidgetServices,
        store: Rc<TabDataStore>,
    ) -> Self {
        let tab_id = tab_id.into();
        let config = &services.config;
        let mut text_input = PromptTextInput::new(
            tab_id.clone(),
            Rc::clone(&services.bus),
            Rc::clone(&store),
            config.max_user_input(),
            config.auto_focus,
        );
        let initial_text = store.get_string(StoreKey::PromptInputText);
        if !initial_text.trim().is_empty() {
            text_input.update_text_value(&initial_text);
        }
        let top_bar = PromptTopBar::new(
            tab_id.clone(),
            Rc::clone(&services.bus),
            store.get_string(StoreKey::PromptTopBarTitle),
            store
                .get_as(StoreKey::PromptTopBarContextItems)
                .unwrap_or_default(),
            store.get_as(StoreKey::PromptTopBarButton),
        );
        let controls = PromptControls::new(tab_id.clone(), Rc::clone(&services.bus), &store);

        let store_changes = Rc::new(RefCell::new(Vec::new()));
        let subscription_ids = SUBSCRIBED_KEYS
            .iter()
            .map(|&key| {
                let queue = Rc::clone(&store_changes);
                store.subscribe(key, move |_| {
                    let mut queue = queue.borrow_mut();
                    if !queue.contains(&key) {
                        queue.push(key);
                    }
                })
            })
            .collect();

        Self {
            attachment: PromptAttachment::new(),
            chip: CommandChip::default(),
            controls,
            history: PromptHistoryState::default(),
            indicator: OverlaySlot::new(),
            policy: Box::new(AlwaysInsert),
            quick_pick: OverlaySlot::new(),
            selector: SelectorState::Idle,
            services: services.clone(),
            store,
            store_changes,
            subscription_ids,
            tab_id,
            text_input,
            top_bar,
            top_bar_title_clicked: false,
            wrap_width: 0,
        }
    }

    /// Replaces the context selection policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Box<dyn ContextSelectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn text_input(&self) -> &PromptTextInput {
        &self.text_input
    }

    pub fn attachment(&self) -> &PromptAttachment {
        &self.attachment
    }

    pub fn controls(&self) -> &PromptControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut PromptControls {
        &mut self.controls
    }

    pub fn top_bar(&self) -> &PromptTopBar {
        &self.top_bar
    }

    pub fn top_bar_mut(&mut self) -> &mut PromptTopBar {
        &mut self.top_bar
    }

    pub fn selector(&self) -> &SelectorState {
        &self.selector
    }

    pub fn history(&self) -> &PromptHistoryState {
        &self.history
    }

    /// Returns the quick action locked for the next send.
    pub fn selected_command(&self) -> Option<&str> {
        self.chip.command()
    }

    /// Returns the open quick-pick overlay.
    pub fn quick_pick_snapshot(&self) -> Option<OverlaySnapshot> {
        self.quick_pick.snapshot()
    }

    /// Returns the character indicator overlay.
    pub fn indicator_snapshot(&self) -> Option<OverlaySnapshot> {
        self.indicator.snapshot()
    }

    /// Sets the width used to wrap the prompt into visual lines.
    pub fn set_wrap_width(&mut self, wrap_width: usize) {
        self.wrap_width = wrap_width;
    }

    /// Returns whether the pill-pinning origin is the top bar title.
    pub fn is_top_bar_title_clicked(&self) -> bool {
        self.top_bar_title_clicked
    }

    /// Routes one key press through the selector state machine, then
    /// applies default editing unless the transition prevented it.
    pub fn handle_key(&mut self, key: &KeyInput) -> KeyOutcome {
        if self.text_input.is_disabled() {
            return KeyOutcome::Ignored;
        }

        let flow = match self.selector.session().map(|session| session.top_bar_triggered) {
            Some(true) => self.handle_top_bar_picker_key(key),
            Some(false) => self.handle_picker_key(key),
            None => self.handle_prompt_key(key),
        };

        match flow {
            KeyFlow::Sent => KeyOutcome::Sent,
            KeyFlow::Prevent => {
                self.text_input.update_cursor_pos();

                KeyOutcome::Consumed
            }
            KeyFlow::Default => {
                if !self.text_input.apply_edit_key(key) {
                    return KeyOutcome::Ignored;
                }
                self.text_input.after_keystroke();
                self.refresh_indicator();

                KeyOutcome::Consumed
            }
        }
    }

    /// Inserts clipboard text as plain text.
    pub fn paste(&mut self, text: &str) -> bool {
        let is_pasted = self.text_input.paste(text);
        if is_pasted {
            self.refresh_indicator();
        }

        is_pasted
    }

    /// Focuses the prompt and refreshes the indicator.
    ///
    /// Text starting with `/` reopens the quick-action picker filtered by
    /// the first word after the slash.
    pub fn focus(&mut self) {
        self.text_input.focus();
        self.refresh_indicator();

        let value = self.text_input.text_value();
        let Some(rest) = value.strip_prefix('/') else {
            return;
        };
        if self.selector.session().is_some() {
            return;
        }
        let groups: Vec<QuickActionCommandGroup> = self
            .store
            .get_as(StoreKey::QuickActionCommands)
            .unwrap_or_default();
        if groups.is_empty() {
            return;
        }

        let word: String = rest
            .chars()
            .take_while(|ch| !ch.is_whitespace())
            .collect();
        let mut session = QuickPickSession::new(
            QuickPickMode::QuickAction,
            1,
            self.text_input.cursor_pos(),
            groups,
        );
        session.filtered_groups = filter_by_pattern(&session.item_groups, &word);
        session.hidden = command_count(&session.filtered_groups) == 0;
        self.show_quick_pick(session);
    }

    /// Removes focus, releasing a locked command when no text was typed.
    pub fn blur(&mut self) {
        if matches!(self.selector, SelectorState::AwaitingConfirmation)
            && self.text_input.text_value().is_empty()
        {
            self.chip.clear();
            self.selector = SelectorState::Idle;
            let placeholder = self.store.get_string(StoreKey::PromptInputPlaceholder);
            self.text_input.update_placeholder(&placeholder);
            self.text_input.update_max_length(self.max_user_input());
            tracing::debug!(tab_id = %self.tab_id, "locked command released");
        }
        self.text_input.blur();
        self.indicator.close();
    }

    /// Commits the prompt. Returns whether a prompt was dispatched.
    ///
    /// A locked command wins over a command detected from the text prefix.
    /// The detected prefix is stripped from the prompt text.
    pub fn send_prompt(&mut self) -> bool {
        let current = self.text_input.text_value();
        let locked = self
            .chip
            .command()
            .filter(|command| !command.trim().is_empty())
            .map(str::to_string);
        if current.is_empty() && locked.is_none() {
            return false;
        }

        let detected = locked.clone().or_else(|| self.detect_command(&current));
        let text = match (&locked, &detected) {
            (None, Some(command)) => current.replacen(command.as_str(), "", 1),
            _ => current.clone(),
        };
        let prompt = format!("{text}{}", self.attachment.prompt_text());
        let context = self.text_input.used_context();
        let chat_prompt = ChatPrompt {
            escaped_prompt: escape_prompt(&prompt, &context),
            prompt,
            command: detected,
            context,
            options: self.controls.option_values(),
        };
        let history_entry = UserPrompt::new(current.clone(), self.attachment.content())
            .attachment_kind(self.attachment.kind());

        self.clear_text_area(false);
        if !current.is_empty() {
            self.history.push(history_entry);
        }
        self.history.reset_navigation();

        tracing::debug!(
            tab_id = %self.tab_id,
            command = ?chat_prompt.command,
            context = chat_prompt.context.len(),
            "prompt sent"
        );
        self.services.bus.dispatch(&UiEvent::ChatPrompt {
            tab_id: self.tab_id.clone(),
            prompt: chat_prompt,
        });

        true
    }

    /// Empties the prompt and releases any locked command.
    pub fn clear_text_area(&mut self, keep_attachment: bool) {
        self.store
            .update(StoreKey::PromptInputText, Value::String(String::new()));
        self.chip.clear();
        if !matches!(self.selector, SelectorState::QuickPickOpen(_)) {
            self.selector = SelectorState::Idle;
        }
        self.text_input.clear();
        self.text_input.update_max_length(self.max_user_input());
        if !keep_attachment {
            self.attachment.clear();
            self.mirror_attachment();
        }
        self.refresh_indicator();
    }

    /// Attaches `content`, cropped to the remaining budget, and shrinks the
    /// text budget accordingly.
    pub fn add_attachment(&mut self, content: &str, kind: AttachmentKind) {
        self.apply_attachment(content, kind);
        self.services.scheduler.schedule(
            FOCUS_AFTER_ATTACHMENT,
            ScheduledTask::FocusPromptInput {
                tab_id: self.tab_id.clone(),
            },
        );
        self.services.bus.dispatch(&UiEvent::AttachmentAdded {
            tab_id: self.tab_id.clone(),
            content: self.attachment.content().to_string(),
        });
    }

    /// Drops the attachment and restores the full text budget.
    pub fn remove_attachment(&mut self) {
        self.drop_attachment();
        self.services.bus.dispatch(&UiEvent::AttachmentRemoved {
            tab_id: self.tab_id.clone(),
        });
    }

    /// Returns characters counted against the budget, attachment included.
    pub fn characters_used(&self) -> usize {
        let max = self.max_user_input();
        let text_len = self.text_input.text_value().chars().count();
        let free = self.text_input.max_length().saturating_sub(text_len);

        max - free.min(max)
    }

    /// Returns characters still available.
    pub fn remaining_chars(&self) -> usize {
        self.max_user_input() - self.characters_used()
    }

    /// Selects the listed command at `index` as if it was clicked.
    pub fn select_quick_pick_item(&mut self, index: usize) -> bool {
        let Some(command) = self
            .selector
            .session()
            .and_then(|session| session.command(index))
            .cloned()
        else {
            return false;
        };
        self.select_command(command, SelectionMethod::Click, false);

        true
    }

    /// Runs a quick-pick group action: the typed trigger is removed and the
    /// host is notified.
    pub fn group_action_click(&mut self, action_id: &str) -> bool {
        let Some(trigger_index) = self
            .selector
            .session()
            .map(|session| session.trigger_index)
        else {
            return false;
        };
        let cursor = self.text_input.cursor_pos();
        self.text_input.delete_text_range(trigger_index, cursor);
        self.services
            .bus
            .dispatch(&UiEvent::QuickCommandGroupActionClick {
                tab_id: self.tab_id.clone(),
                action_id: action_id.to_string(),
            });

        true
    }

    /// Opens the context picker from the context selector button.
    pub fn context_selector_button_click(&mut self) -> bool {
        let trigger_index = self.text_input.cursor_pos();
        self.text_input.insert_end_space();

        self.open_picker(QuickPickMode::Context, trigger_index, false)
    }

    /// Opens the context picker from the top bar title; picked items are
    /// pinned to the bar.
    pub fn top_bar_title_click(&mut self) -> bool {
        if self.top_bar.is_hidden() {
            return false;
        }
        let trigger_index = self.text_input.cursor_pos();

        self.open_picker(QuickPickMode::Context, trigger_index, true)
    }

    /// Routes later context picks back into the prompt.
    pub fn reset_top_bar_clicked(&mut self) {
        self.top_bar_title_clicked = false;
    }

    /// Announces a pill click for pinning.
    pub fn pin_context(&self, temporary_id: &str) -> bool {
        self.text_input.pin_context(temporary_id)
    }

    /// Appends host-provided context to the store and inserts it as pills.
    pub fn add_custom_context(
        &mut self,
        commands: &[QuickActionCommand],
        insert_position: Option<usize>,
    ) {
        let mut custom_context: Vec<QuickActionCommand> = self
            .store
            .get_as(StoreKey::CustomContextCommand)
            .unwrap_or_default();
        custom_context.extend(commands.iter().cloned());
        match serde_json::to_value(&custom_context) {
            Ok(value) => self.store.update(StoreKey::CustomContextCommand, value),
            Err(error) => tracing::warn!(%error, "custom context could not be stored"),
        }

        let top_bar_hidden = self.top_bar.is_hidden();
        self.text_input
            .add_custom_context(commands, insert_position, top_bar_hidden);
        self.refresh_indicator();
    }

    /// Applies queued store notifications.
    pub fn apply_store_changes(&mut self) {
        loop {
            let changes = std::mem::take(&mut *self.store_changes.borrow_mut());
            if changes.is_empty() {
                break;
            }
            for key in changes {
                self.apply_store_change(key);
            }
        }
    }

    fn apply_store_change(&mut self, key: StoreKey) {
        match key {
            StoreKey::PromptInputText => {
                let value = self.store.get_string(key);
                if value != self.text_input.text_value() {
                    self.text_input.update_text_value(&value);
                    self.refresh_indicator();
                    self.services.scheduler.schedule(
                        FOCUS_AFTER_TEXT_UPDATE,
                        ScheduledTask::FocusPromptInput {
                            tab_id: self.tab_id.clone(),
                        },
                    );
                }
            }
            StoreKey::PromptInputPlaceholder => {
                let placeholder = self.store.get_string(key);
                self.text_input.update_placeholder(&placeholder);
            }
            StoreKey::PromptInputDisabledState => {
                self.text_input.set_disabled(self.store.get_bool(key));
            }
            StoreKey::PromptTopBarContextItems => {
                self.top_bar
                    .update_context_items(self.store.get_as(key).unwrap_or_default());
            }
            StoreKey::PromptTopBarTitle => {
                self.top_bar.update_title(&self.store.get_string(key));
            }
            StoreKey::PromptTopBarButton => {
                self.top_bar.update_button(self.store.get_as(key));
            }
            StoreKey::QuickActionCommandsHeader => self.refresh_quick_pick(),
            _ => {
                self.controls.sync(key, &self.store);
            }
        }
    }

    fn handle_prompt_key(&mut self, key: &KeyInput) -> KeyFlow {
        let is_awaiting = matches!(self.selector, SelectorState::AwaitingConfirmation);
        if key.code() == KeyCode::Esc {
            if is_awaiting {
                self.blur();
                if self.services.config.auto_focus {
                    self.text_input.focus();
                }

                return KeyFlow::Prevent;
            }

            return KeyFlow::Default;
        }

        if matches!(key.code(), KeyCode::Backspace | KeyCode::Delete)
            && self.chip.command().is_some()
            && self.text_input.text_value().is_empty()
        {
            self.clear_text_area(true);

            return KeyFlow::Prevent;
        }

        if key.is_enter() {
            let is_ctrl = key.command_modifier();
            let is_commit = (!key.is_composing && !key.shift() && !is_ctrl)
                || (key.is_composing && key.shift());
            if !is_commit {
                return KeyFlow::Default;
            }

            return if self.send_prompt() {
                KeyFlow::Sent
            } else {
                KeyFlow::Prevent
            };
        }

        if key.is_char('/') && self.chip.command().is_none() && self.text_input.text_value().is_empty()
        {
            self.open_picker(QuickPickMode::QuickAction, 1, false);

            return KeyFlow::Default;
        }

        if key.is_char('@') && self.text_input.max_length() > 0 {
            let trigger_index = self.text_input.cursor_pos();
            self.open_picker(QuickPickMode::Context, trigger_index, false);

            return KeyFlow::Default;
        }

        if matches!(key.code(), KeyCode::Up | KeyCode::Down)
            && !key.shift()
            && self.navigate_history(key.code())
        {
            return KeyFlow::Prevent;
        }

        KeyFlow::Default
    }

    fn handle_picker_key(&mut self, key: &KeyInput) -> KeyFlow {
        let Some(mode) = self.selector.session().map(|session| session.mode) else {
            return KeyFlow::Default;
        };

        if key.is_char(' ') {
            self.close_quick_pick();

            return KeyFlow::Default;
        }
        if key.code() == KeyCode::Esc {
            if mode == QuickPickMode::QuickAction {
                self.clear_text_area(true);
            }
            self.close_quick_pick();

            return KeyFlow::Prevent;
        }
        if key.is_enter() || key.code() == KeyCode::Tab {
            let method = if key.code() == KeyCode::Tab {
                SelectionMethod::Tab
            } else {
                SelectionMethod::Enter
            };
            let target = self
                .selector
                .session()
                .and_then(QuickPickSession::target_command)
                .cloned();
            if let Some(command) = target {
                self.select_command(command, method, key.alt());
            }

            return KeyFlow::Prevent;
        }
        if key.is_char('@') || key.is_char('/') || key.is_char('\\') {
            return KeyFlow::Prevent;
        }
        if self.move_target(key.code()) {
            return KeyFlow::Prevent;
        }

        if self.text_input.text_value().is_empty() {
            self.close_quick_pick();

            return KeyFlow::Default;
        }

        match key.code() {
            KeyCode::Left | KeyCode::Right => return KeyFlow::Prevent,
            KeyCode::Backspace => {
                let is_all_selected = self.text_input.document().is_all_selected();
                let is_term_empty = self
                    .selector
                    .session()
                    .is_some_and(|session| session.search_term.is_empty());
                if is_term_empty || is_all_selected {
                    self.close_quick_pick();

                    return KeyFlow::Default;
                }
                if let Some(session) = self.selector.session_mut() {
                    session.pop_char();
                }
            }
            _ => {
                if let Some(ch) = key.printable_char()
                    && let Some(session) = self.selector.session_mut()
                {
                    session.push_char(ch);
                }
            }
        }
        self.refresh_quick_pick();

        KeyFlow::Default
    }

    fn handle_top_bar_picker_key(&mut self, key: &KeyInput) -> KeyFlow {
        if self.move_target(key.code()) {
            return KeyFlow::Prevent;
        }

        match key.code() {
            KeyCode::Esc => {
                self.close_quick_pick();
                self.top_bar_title_clicked = false;
                if self.services.config.auto_focus {
                    self.text_input.focus();
                }
            }
            KeyCode::Backspace => {
                if let Some(session) = self.selector.session_mut() {
                    session.pop_char();
                }
                self.refresh_quick_pick();
            }
            _ if key.is_enter() => {
                let target = self
                    .selector
                    .session()
                    .and_then(QuickPickSession::target_command)
                    .cloned();
                if let Some(command) = target {
                    self.handle_context_selection(command, false);
                }
            }
            _ => {
                if let Some(ch) = key.printable_char()
                    && let Some(session) = self.selector.session_mut()
                {
                    session.push_char(ch);
                }
                self.refresh_quick_pick();
            }
        }

        KeyFlow::Prevent
    }

    fn move_target(&mut self, code: KeyCode) -> bool {
        let direction = match code {
            KeyCode::Up => TargetDirection::Up,
            KeyCode::Down => TargetDirection::Down,
            _ => return false,
        };
        if let Some(session) = self.selector.session_mut() {
            session.move_target(direction);
        }
        self.refresh_quick_pick();

        true
    }

    fn navigate_history(&mut self, code: KeyCode) -> bool {
        let position = self.text_input.cursor_position(self.wrap_width);
        let entry = match code {
            KeyCode::Up if position.is_at_the_beginning => {
                let current = UserPrompt::new(
                    self.text_input.text_value(),
                    self.attachment.content(),
                )
                .attachment_kind(self.attachment.kind());
                self.history.navigate_up(current)
            }
            KeyCode::Down if position.is_at_the_end => self.history.navigate_down(),
            _ => None,
        };
        let Some(entry) = entry else {
            return false;
        };

        self.text_input.update_text_value(&entry.input_text);
        if entry.code_attachment.is_empty() {
            self.drop_attachment();
        } else {
            self.restore_attachment(&entry.code_attachment, entry.attachment_kind);
        }
        tracing::trace!(tab_id = %self.tab_id, index = ?self.history.selected_index, "history entry restored");

        true
    }

    fn open_picker(&mut self, mode: QuickPickMode, trigger_index: usize, from_top_bar: bool) -> bool {
        let key = match mode {
            QuickPickMode::QuickAction => StoreKey::QuickActionCommands,
            QuickPickMode::Context => StoreKey::ContextCommands,
        };
        let groups: Vec<QuickActionCommandGroup> = self.store.get_as(key).unwrap_or_default();
        self.top_bar_title_clicked = from_top_bar;
        if groups.is_empty() {
            return false;
        }

        let mut session =
            QuickPickSession::new(mode, trigger_index, self.text_input.cursor_pos(), groups);
        if from_top_bar {
            session = session.from_top_bar();
        }
        self.show_quick_pick(session);

        true
    }

    fn show_quick_pick(&mut self, session: QuickPickSession) {
        let anchor = if session.top_bar_triggered {
            OverlayAnchor::TopBar
        } else {
            OverlayAnchor::Cursor
        };
        let view = session.view(self.quick_pick_header(&session));
        let is_hidden = session.hidden && !session.top_bar_triggered;
        self.quick_pick
            .show(OverlayContent::QuickPick(view), anchor);
        self.quick_pick.toggle_hidden(is_hidden);
        tracing::debug!(tab_id = %self.tab_id, mode = ?session.mode, trigger_index = session.trigger_index, "quick pick opened");
        self.selector = SelectorState::QuickPickOpen(session);
    }

    fn refresh_quick_pick(&mut self) {
        let Some(session) = self.selector.session() else {
            return;
        };
        let view = session.view(self.quick_pick_header(session));
        let is_hidden = session.hidden && !session.top_bar_triggered;
        self.quick_pick
            .update_content(OverlayContent::QuickPick(view));
        self.quick_pick.toggle_hidden(is_hidden);
    }

    fn close_quick_pick(&mut self) {
        if self.selector.session().is_none() {
            return;
        }

        self.quick_pick.close();
        self.selector = if self.chip.command().is_some() {
            SelectorState::AwaitingConfirmation
        } else {
            SelectorState::Idle
        };
        tracing::debug!(tab_id = %self.tab_id, "quick pick closed");
    }

    fn quick_pick_header(&self, session: &QuickPickSession) -> Option<QuickActionCommandsHeader> {
        match session.mode {
            QuickPickMode::QuickAction => self
                .store
                .get_as::<QuickActionCommandsHeader>(StoreKey::QuickActionCommandsHeader)
                .filter(QuickActionCommandsHeader::has_content),
            QuickPickMode::Context => {
                let hint = &self.services.config.texts.pin_context_hint;
                let is_hint_shown =
                    !session.top_bar_triggered && !self.top_bar.is_hidden() && !hint.is_empty();

                is_hint_shown.then(|| QuickActionCommandsHeader {
                    description: Some(hint.clone()),
                    ..QuickActionCommandsHeader::default()
                })
            }
        }
    }

    fn select_command(
        &mut self,
        command: QuickActionCommand,
        method: SelectionMethod,
        is_hotkey: bool,
    ) {
        if command.disabled {
            return;
        }
        let Some(session) = self.selector.session() else {
            return;
        };

        match session.mode {
            QuickPickMode::Context if command.command.is_empty() => {
                let typed = self
                    .text_input
                    .document()
                    .slice(session.trigger_index, self.text_input.cursor_pos());
                self.handle_context_selection(QuickActionCommand::new(typed), false);
            }
            QuickPickMode::Context => self.handle_context_selection(command, is_hotkey),
            QuickPickMode::QuickAction => self.handle_quick_action_selection(&command, method),
        }
    }

    fn handle_quick_action_selection(&mut self, command: &QuickActionCommand, method: SelectionMethod) {
        self.text_input.update_text_value("");
        self.chip.set(&command.command);

        if let Some(placeholder) = &command.placeholder {
            self.text_input.update_placeholder(placeholder);
            self.text_input.update_max_length(0);
            self.text_input.focus();
        } else if matches!(method, SelectionMethod::Enter | SelectionMethod::Click) {
            self.send_prompt();
        } else {
            let confirmation = self.services.config.texts.command_confirmation.clone();
            self.text_input.update_placeholder(&confirmation);
            self.text_input.update_max_length(0);
        }
        tracing::debug!(tab_id = %self.tab_id, command = %command.command, ?method, "quick action selected");

        self.close_quick_pick();
        self.refresh_indicator();
    }

    fn handle_context_selection(&mut self, command: QuickActionCommand, is_hotkey: bool) {
        let Some(trigger_index) = self
            .selector
            .session()
            .map(|session| session.trigger_index)
        else {
            return;
        };
        let from_top_bar = self.top_bar_title_clicked;

        if command.has_children() {
            if !from_top_bar {
                let cursor = self.text_input.cursor_pos();
                self.text_input.delete_text_range(trigger_index + 1, cursor);
            }
            if let Some(session) = self.selector.session_mut() {
                session.descend(command.children.clone());
            }
            self.refresh_quick_pick();

            return;
        }

        self.close_quick_pick();
        self.services.bus.dispatch(&UiEvent::ContextSelected {
            tab_id: self.tab_id.clone(),
            item: command.clone(),
        });

        if !self.policy.should_insert(&self.tab_id, &command) {
            let cursor = self.text_input.cursor_pos();
            self.text_input.delete_text_range(trigger_index, cursor);

            return;
        }

        if !self.top_bar.is_hidden() && (from_top_bar || is_hotkey) {
            self.top_bar.add_context_pill(&command);
            if is_hotkey && !from_top_bar {
                let cursor = self.text_input.cursor_pos();
                self.text_input.delete_text_range(trigger_index, cursor);
            }
        } else {
            let top_bar_hidden = self.top_bar.is_hidden();
            self.text_input
                .insert_context_item(&command, trigger_index, top_bar_hidden);
        }
        self.refresh_indicator();
    }

    fn detect_command(&self, text: &str) -> Option<String> {
        let groups: Vec<QuickActionCommandGroup> = self
            .store
            .get_as(StoreKey::QuickActionCommands)
            .unwrap_or_default();

        groups
            .iter()
            .flat_map(|group| group.commands.iter())
            .find(|command| {
                !command.disabled
                    && !command.command.is_empty()
                    && text.starts_with(&command.command)
            })
            .map(|command| command.command.clone())
    }

    fn apply_attachment(&mut self, content: &str, kind: AttachmentKind) {
        let max = self.max_user_input();
        let text_len = self.text_input.text_value().chars().count();
        let cropped: String = content.chars().take(max.saturating_sub(text_len)).collect();

        self.restore_attachment(&cropped, kind);
    }

    /// Sets the attachment as given and derives the text budget from it.
    fn restore_attachment(&mut self, content: &str, kind: AttachmentKind) {
        let max = self.max_user_input();
        let content_len = content.chars().count();

        self.attachment.update(content, kind);
        self.text_input
            .update_max_length(MAX_USER_INPUT_THRESHOLD.max(max.saturating_sub(content_len)));
        self.mirror_attachment();
        self.refresh_indicator();
    }

    fn drop_attachment(&mut self) {
        self.text_input.update_max_length(self.max_user_input());
        self.attachment.clear();
        self.mirror_attachment();
        self.refresh_indicator();
    }

    fn mirror_attachment(&self) {
        self.store.update(
            StoreKey::SelectedCodeSnippet,
            Value::String(self.attachment.content().to_string()),
        );
    }

    fn refresh_indicator(&mut self) {
        let content = OverlayContent::CharacterIndicator {
            used: self.characters_used(),
            max: self.max_user_input(),
        };
        let is_hidden =
            self.characters_used() < self.services.config.user_input_length_warning_threshold;
        if self.indicator.is_open() {
            self.indicator.update_content(content);
        } else {
            self.indicator.show(content, OverlayAnchor::PromptInput);
        }
        self.indicator.toggle_hidden(is_hidden);
    }

    fn max_user_input(&self) -> usize {
        self.services.config.max_user_input()
    }
}

impl Drop for ChatPromptInput {
    fn drop(&mut self) {
        for subscription_id in &self.subscription_ids {
            self.store.unsubscribe(subscription_id);
        }
    }
}

/// Keeps, per group, the commands matching `pattern` as a case-insensitive
/// regex. Groups with an invalid pattern or no match are dropped.
fn filter_by_pattern(groups: &[QuickActionCommandGroup], pattern: &str) -> Vec<QuickActionCommandGroup> {
    let Ok(regex) = RegexBuilder::new(pattern).case_insensitive(true).build() else {
        return Vec::new();
    };

    groups
        .iter()
        .filter_map(|group| {
            let commands: Vec<QuickActionCommand> = group
                .commands
                .iter()
                .filter(|command| regex.is_match(&command.command))
                .cloned()
                .collect();

            (!commands.is_empty()).then(|| QuickActionCommandGroup {
                commands,
                ..group.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crossterm::event::KeyModifiers;
    use serde_json::json;

    use super::*;
    use crate::domain::document::PILL_TRAILING_SPACE;
    use crate::infra::config::WidgetConfig;
    use crate::infra::event_bus::EventRecorder;

    fn services() -> WidgetServices {
        WidgetServices::new(WidgetConfig {
            max_user_input: 196,
            user_input_length_warning_threshold: 90,
            ..WidgetConfig::default()
        })
    }

    fn prompt_input(
        initial: Vec<(StoreKey, Value)>,
    ) -> (ChatPromptInput, Rc<TabDataStore>, EventRecorder, WidgetServices) {
        let services = services();
        let recorder = EventRecorder::attach(&services.bus);
        let store = Rc::new(TabDataStore::new(
            services.config.store_defaults(),
            initial.into_iter().collect::<BTreeMap<_, _>>(),
        ));
        let input = ChatPromptInput::new("tab-1", &services, Rc::clone(&store));

        (input, store, recorder, services)
    }

    fn key(code: KeyCode) -> KeyInput {
        KeyInput::new(code, KeyModifiers::NONE)
    }

    fn type_text(input: &mut ChatPromptInput, text: &str) {
        for ch in text.chars() {
            input.handle_key(&key(KeyCode::Char(ch)));
        }
    }

    fn quick_actions() -> (StoreKey, Value) {
        (
            StoreKey::QuickActionCommands,
            json!([{ "commands": [
                { "command": "/dev", "placeholder": "Enter value" },
                { "command": "/test" },
                { "command": "/clear" }
            ] }]),
        )
    }

    fn context_commands() -> (StoreKey, Value) {
        (
            StoreKey::ContextCommands,
            json!([{ "commands": [
                { "command": "file.ts" },
                { "command": "folder", "children": [{ "commands": [{ "command": "src" }] }] }
            ] }]),
        )
    }

    fn sent_prompts(recorder: &EventRecorder) -> Vec<ChatPrompt> {
        recorder
            .take()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::ChatPrompt { prompt, .. } => Some(prompt),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_slash_command_with_placeholder_awaits_confirmation() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(vec![quick_actions()]);
        type_text(&mut input, "/");

        // Act
        input.handle_key(&key(KeyCode::Down));
        let outcome = input.handle_key(&key(KeyCode::Enter));

        // Assert
        assert_eq!(outcome, KeyOutcome::Consumed);
        assert_eq!(input.selector(), &SelectorState::AwaitingConfirmation);
        assert_eq!(input.text_input().placeholder(), "Enter value");
        assert_eq!(input.text_input().max_length(), 0);
        assert_eq!(input.selected_command(), Some("/dev"));
        assert!(input.text_input().is_empty());
        assert_eq!(input.quick_pick_snapshot(), None);
    }

    #[test]
    fn test_backspace_on_empty_locked_prompt_releases_command() {
        // Arrange
        let (mut input, _, _, services) = prompt_input(vec![quick_actions()]);
        type_text(&mut input, "/");
        input.handle_key(&key(KeyCode::Down));
        input.handle_key(&key(KeyCode::Enter));

        // Act
        input.handle_key(&key(KeyCode::Backspace));

        // Assert
        assert_eq!(input.selector(), &SelectorState::Idle);
        assert_eq!(input.selected_command(), None);
        assert_eq!(
            input.text_input().placeholder(),
            services.config.texts.prompt_placeholder
        );
        assert_eq!(input.text_input().max_length(), 100);
    }

    #[test]
    fn test_tab_without_placeholder_locks_with_confirmation_text() {
        // Arrange
        let (mut input, _, recorder, services) = prompt_input(vec![quick_actions()]);
        type_text(&mut input, "/te");
        input.handle_key(&key(KeyCode::Down));

        // Act
        input.handle_key(&key(KeyCode::Tab));
        type_text(&mut input, "/clear now");
        let outcome = input.handle_key(&key(KeyCode::Enter));

        // Assert
        assert_eq!(outcome, KeyOutcome::Sent);
        let prompts = sent_prompts(&recorder);
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].command.as_deref(), Some("/test"));
        assert_eq!(prompts[0].prompt, "/clear now");
        assert_ne!(
            input.text_input().placeholder(),
            services.config.texts.command_confirmation
        );
    }

    #[test]
    fn test_enter_on_quick_action_without_placeholder_sends_at_once() {
        // Arrange
        let (mut input, _, recorder, _) = prompt_input(vec![quick_actions()]);
        type_text(&mut input, "/cl");
        input.handle_key(&key(KeyCode::Down));

        // Act
        input.handle_key(&key(KeyCode::Enter));

        // Assert
        let prompts = sent_prompts(&recorder);
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].command.as_deref(), Some("/clear"));
        assert_eq!(prompts[0].prompt, "");
        assert_eq!(input.selector(), &SelectorState::Idle);
    }

    #[test]
    fn test_send_detects_typed_command_prefix() {
        // Arrange
        let (mut input, _, recorder, _) = prompt_input(vec![quick_actions()]);
        type_text(&mut input, "/test hi");

        // Act
        let outcome = input.handle_key(&key(KeyCode::Enter));

        // Assert
        assert_eq!(outcome, KeyOutcome::Sent);
        assert_eq!(
            sent_prompts(&recorder),
            vec![ChatPrompt {
                prompt: " hi".to_string(),
                escaped_prompt: " hi".to_string(),
                command: Some("/test".to_string()),
                context: Vec::new(),
                options: BTreeMap::new(),
            }]
        );
        assert!(input.text_input().is_empty());
    }

    #[test]
    fn test_enter_on_empty_prompt_sends_nothing() {
        // Arrange
        let (mut input, _, recorder, _) = prompt_input(Vec::new());

        // Act
        let outcome = input.handle_key(&key(KeyCode::Enter));

        // Assert
        assert_eq!(outcome, KeyOutcome::Consumed);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        // Arrange
        let (mut input, _, recorder, _) = prompt_input(Vec::new());
        type_text(&mut input, "a");

        // Act
        input.handle_key(&KeyInput::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut input, "b");

        // Assert
        assert_eq!(input.text_input().document().text(), "a\nb");
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_context_selection_replaces_typed_trigger_with_pill() {
        // Arrange
        let (mut input, _, recorder, _) = prompt_input(vec![context_commands()]);
        type_text(&mut input, "see @fi");
        input.handle_key(&key(KeyCode::Down));

        // Act
        input.handle_key(&key(KeyCode::Enter));

        // Assert
        assert_eq!(
            input.text_input().document().text(),
            format!("see @file.ts{PILL_TRAILING_SPACE}")
        );
        assert_eq!(input.selector(), &SelectorState::Idle);
        assert_eq!(
            recorder.take(),
            vec![UiEvent::ContextSelected {
                tab_id: "tab-1".to_string(),
                item: QuickActionCommand::new("file.ts"),
            }]
        );
    }

    #[test]
    fn test_rejected_context_removes_typed_trigger() {
        // Arrange
        let mut policy = MockContextSelectionPolicy::new();
        policy
            .expect_should_insert()
            .times(1)
            .returning(|tab_id, item| tab_id != "tab-1" || item.command != "file.ts");
        let (input, _, _, _) = prompt_input(vec![context_commands()]);
        let mut input = input.with_policy(Box::new(policy));
        type_text(&mut input, "see @fi");
        input.handle_key(&key(KeyCode::Down));

        // Act
        input.handle_key(&key(KeyCode::Enter));

        // Assert
        assert_eq!(input.text_input().document().text(), "see ");
        assert!(input.text_input().selected_context().is_empty());
    }

    #[test]
    fn test_context_with_children_descends_and_drops_typed_term() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(vec![context_commands()]);
        type_text(&mut input, "@fo");
        input.handle_key(&key(KeyCode::Down));

        // Act
        input.handle_key(&key(KeyCode::Enter));

        // Assert
        assert_eq!(input.text_input().document().text(), "@");
        let session = input.selector().session().expect("picker should stay open");
        assert_eq!(session.item_groups[0].commands[0].command, "src");
        assert!(session.search_term.is_empty());
    }

    #[test]
    fn test_alt_enter_pins_context_to_visible_top_bar() {
        // Arrange
        let (mut input, _, recorder, _) = prompt_input(vec![
            context_commands(),
            (StoreKey::PromptTopBarTitle, json!("Context")),
        ]);
        type_text(&mut input, "@fi");
        input.handle_key(&key(KeyCode::Down));

        // Act
        input.handle_key(&KeyInput::new(KeyCode::Enter, KeyModifiers::ALT));

        // Assert
        assert!(input.text_input().is_empty());
        assert_eq!(input.top_bar().context_items().len(), 1);
        let names: Vec<_> = recorder.take().iter().map(UiEvent::name).collect();
        assert_eq!(
            names,
            vec![
                crate::infra::event_bus::UiEventName::ContextSelected,
                crate::infra::event_bus::UiEventName::TopBarItemAdd,
            ]
        );
    }

    #[test]
    fn test_picker_hides_on_no_match_and_backspace_closes_on_empty_term() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(vec![context_commands()]);
        type_text(&mut input, "@zz");
        let hidden = input.quick_pick_snapshot().map(|snapshot| snapshot.hidden);

        // Act
        input.handle_key(&key(KeyCode::Backspace));
        input.handle_key(&key(KeyCode::Backspace));
        let open_after_pop = input.selector().session().is_some();
        input.handle_key(&key(KeyCode::Backspace));

        // Assert
        assert_eq!(hidden, Some(true));
        assert!(open_after_pop);
        assert_eq!(input.selector(), &SelectorState::Idle);
        assert_eq!(input.text_input().document().text(), "");
    }

    #[test]
    fn test_escape_in_quick_action_picker_clears_text_keeping_attachment() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(vec![quick_actions()]);
        input.add_attachment("let a = 1;", AttachmentKind::Code);
        type_text(&mut input, "/de");

        // Act
        input.handle_key(&key(KeyCode::Esc));

        // Assert
        assert!(input.text_input().is_empty());
        assert_eq!(input.attachment().content(), "let a = 1;");
        assert_eq!(input.quick_pick_snapshot(), None);
    }

    #[test]
    fn test_space_closes_picker_and_is_typed() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(vec![context_commands()]);
        type_text(&mut input, "@f");

        // Act
        input.handle_key(&key(KeyCode::Char(' ')));

        // Assert
        assert_eq!(input.selector(), &SelectorState::Idle);
        assert_eq!(input.text_input().document().text(), "@f ");
    }

    #[test]
    fn test_history_round_trip_restores_draft() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(Vec::new());
        for text in ["first", "second"] {
            type_text(&mut input, text);
            input.handle_key(&key(KeyCode::Enter));
        }
        type_text(&mut input, "draft");

        // Act
        input.handle_key(&key(KeyCode::Home));
        input.handle_key(&key(KeyCode::Up));
        let newest = input.text_input().text_value();
        input.handle_key(&key(KeyCode::Home));
        input.handle_key(&key(KeyCode::Up));
        let oldest = input.text_input().text_value();
        input.handle_key(&key(KeyCode::Down));
        input.handle_key(&key(KeyCode::Down));

        // Assert
        assert_eq!(newest, "second");
        assert_eq!(oldest, "first");
        assert_eq!(input.text_input().text_value(), "draft");
        assert_eq!(input.history().entries.len(), 2);
    }

    #[test]
    fn test_history_round_trip_restores_draft_attachment_verbatim() {
        // Arrange
        let (mut input, store, _, _) = prompt_input(Vec::new());
        type_text(&mut input, "first");
        input.handle_key(&key(KeyCode::Enter));
        let attachment = "x".repeat(50);
        input.add_attachment(&attachment, AttachmentKind::Markdown);
        let draft = "y".repeat(80);
        type_text(&mut input, &draft);

        // Act
        input.handle_key(&key(KeyCode::Home));
        input.handle_key(&key(KeyCode::Up));
        let restored_entry = input.attachment().content().to_string();
        input.handle_key(&key(KeyCode::Down));

        // Assert
        assert!(restored_entry.is_empty());
        assert_eq!(input.text_input().text_value(), draft);
        assert_eq!(input.attachment().content(), attachment);
        assert_eq!(input.attachment().kind(), AttachmentKind::Markdown);
        assert_eq!(input.text_input().max_length(), 96);
        assert_eq!(store.get_string(StoreKey::SelectedCodeSnippet), attachment);
    }

    #[test]
    fn test_up_away_from_start_moves_cursor_only() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(Vec::new());
        type_text(&mut input, "sent");
        input.handle_key(&key(KeyCode::Enter));
        type_text(&mut input, "draft");

        // Act
        input.handle_key(&key(KeyCode::Up));

        // Assert
        assert_eq!(input.text_input().text_value(), "draft");
        assert_eq!(input.text_input().cursor_pos(), 0);
        assert_eq!(input.history().selected_index, None);
    }

    #[test]
    fn test_attachment_is_cropped_and_shrinks_budget() {
        // Arrange
        let (mut input, store, recorder, services) = prompt_input(Vec::new());
        type_text(&mut input, "hello");

        // Act
        input.add_attachment(&"x".repeat(200), AttachmentKind::Code);

        // Assert
        assert_eq!(input.attachment().content().len(), 95);
        assert_eq!(input.text_input().max_length(), 96);
        assert_eq!(input.characters_used(), 9);
        assert_eq!(input.remaining_chars(), 91);
        assert_eq!(store.get_string(StoreKey::SelectedCodeSnippet).len(), 95);
        assert_eq!(services.scheduler.pending_count(), 1);
        assert_eq!(
            recorder.take().last().map(UiEvent::name),
            Some(crate::infra::event_bus::UiEventName::AttachmentAdded)
        );
    }

    #[test]
    fn test_remove_attachment_restores_budget() {
        // Arrange
        let (mut input, store, _, _) = prompt_input(Vec::new());
        type_text(&mut input, "hello");
        input.add_attachment(&"x".repeat(50), AttachmentKind::Markdown);
        let used_with_attachment = input.characters_used();

        // Act
        input.remove_attachment();

        // Assert
        assert!(used_with_attachment > input.characters_used());
        assert_eq!(input.characters_used(), 5);
        assert_eq!(input.text_input().max_length(), 100);
        assert_eq!(store.get_string(StoreKey::SelectedCodeSnippet), "");
    }

    #[test]
    fn test_indicator_visible_from_warning_threshold() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(Vec::new());
        type_text(&mut input, &"a".repeat(89));
        let hidden_below = input.indicator_snapshot().map(|snapshot| snapshot.hidden);

        // Act
        type_text(&mut input, "a");

        // Assert
        assert_eq!(hidden_below, Some(true));
        let snapshot = input.indicator_snapshot().expect("indicator should exist");
        assert!(!snapshot.hidden);
        assert_eq!(
            snapshot.content,
            OverlayContent::CharacterIndicator { used: 90, max: 100 }
        );
    }

    #[test]
    fn test_store_text_update_replaces_text_and_schedules_focus() {
        // Arrange
        let (mut input, store, _, services) = prompt_input(Vec::new());

        // Act
        store.update(StoreKey::PromptInputText, json!("from host"));
        input.apply_store_changes();

        // Assert
        assert_eq!(input.text_input().text_value(), "from host");
        assert_eq!(services.scheduler.pending_count(), 1);
    }

    #[test]
    fn test_store_disabled_state_blocks_keys() {
        // Arrange
        let (mut input, store, _, _) = prompt_input(Vec::new());

        // Act
        store.update(StoreKey::PromptInputDisabledState, json!(true));
        input.apply_store_changes();
        let outcome = input.handle_key(&key(KeyCode::Char('a')));

        // Assert
        assert_eq!(outcome, KeyOutcome::Ignored);
        assert!(input.text_input().is_empty());
    }

    #[test]
    fn test_focus_with_slash_text_reopens_filtered_picker() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(vec![
            quick_actions(),
            (StoreKey::PromptInputText, json!("/te something")),
        ]);

        // Act
        input.focus();

        // Assert
        let session = input.selector().session().expect("picker should open");
        assert_eq!(session.mode, QuickPickMode::QuickAction);
        let commands: Vec<&str> = session.filtered_groups[0]
            .commands
            .iter()
            .map(|command| command.command.as_str())
            .collect();
        assert_eq!(commands, vec!["/test"]);
    }

    #[test]
    fn test_top_bar_title_click_filters_without_touching_text() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(vec![
            context_commands(),
            (StoreKey::PromptTopBarTitle, json!("Context")),
        ]);
        input.top_bar_title_click();

        // Act
        type_text(&mut input, "fil");
        input.handle_key(&key(KeyCode::Down));
        input.handle_key(&key(KeyCode::Enter));

        // Assert
        assert!(input.text_input().is_empty());
        assert_eq!(input.top_bar().context_items()[0].command, "file.ts");
        assert!(input.is_top_bar_title_clicked());
        input.reset_top_bar_clicked();
        assert!(!input.is_top_bar_title_clicked());
    }

    #[test]
    fn test_group_action_click_removes_trigger_and_notifies() {
        // Arrange
        let (mut input, _, recorder, _) = prompt_input(vec![context_commands()]);
        type_text(&mut input, "x @fi");

        // Act
        let clicked = input.group_action_click("add-rule");

        // Assert
        assert!(clicked);
        assert_eq!(input.text_input().document().text(), "x ");
        assert_eq!(
            recorder.take(),
            vec![UiEvent::QuickCommandGroupActionClick {
                tab_id: "tab-1".to_string(),
                action_id: "add-rule".to_string(),
            }]
        );
    }

    #[test]
    fn test_context_selector_button_opens_picker_after_end_space() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(vec![context_commands()]);
        type_text(&mut input, "ab");

        // Act
        let opened = input.context_selector_button_click();
        input.select_quick_pick_item(0);

        // Assert
        assert!(opened);
        assert_eq!(
            input.text_input().document().text(),
            format!("ab@file.ts{PILL_TRAILING_SPACE}")
        );
    }

    #[test]
    fn test_add_custom_context_appends_store_and_inserts_pills() {
        // Arrange
        let (mut input, store, _, _) = prompt_input(Vec::new());

        // Act
        input.add_custom_context(&[QuickActionCommand::new("rule")], None);

        // Assert
        let stored: Vec<QuickActionCommand> = store
            .get_as(StoreKey::CustomContextCommand)
            .unwrap_or_default();
        assert_eq!(stored, vec![QuickActionCommand::new("rule")]);
        assert_eq!(
            input.text_input().used_context(),
            vec![QuickActionCommand::new("rule")]
        );
    }

    #[test]
    fn test_escape_releases_locked_command_without_text() {
        // Arrange
        let (mut input, _, _, _) = prompt_input(vec![quick_actions()]);
        type_text(&mut input, "/te");
        input.handle_key(&key(KeyCode::Down));
        input.handle_key(&key(KeyCode::Tab));

        // Act
        input.handle_key(&key(KeyCode::Esc));

        // Assert
        assert_eq!(input.selector(), &SelectorState::Idle);
        assert_eq!(input.selected_command(), None);
    }

    #[test]
    fn test_filter_by_pattern_drops_invalid_patterns() {
        // Arrange
        let groups = vec![QuickActionCommandGroup::new(vec![QuickActionCommand::new(
            "/dev",
        )])];

        // Act
        let invalid = filter_by_pattern(&groups, "(");
        let empty = filter_by_pattern(&groups, "");

        // Assert
        assert!(invalid.is_empty());
        assert_eq!(empty, groups);
    }
}
