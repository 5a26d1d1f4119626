//! Widget-level orchestration: shared services, tabs and host commands.

pub mod attachment;
pub mod chat_wrapper;
pub mod prompt_controls;
pub mod prompt_input;
pub mod text_input;
pub mod top_bar;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;

use crate::app::chat_wrapper::ChatWrapper;
use crate::app::prompt_input::{ChatPromptInput, KeyOutcome};
use crate::domain::chat_item::{ChatItem, ChatItemUpdate};
use crate::domain::command::{QuickActionCommand, QuickActionCommandGroup, has_image_context};
use crate::domain::key::KeyInput;
use crate::domain::prompt::AttachmentKind;
use crate::infra::config::WidgetConfig;
use crate::infra::event_bus::{EventBus, UiEvent};
use crate::infra::scheduler::{ScheduledTask, Scheduler};
use crate::infra::tab_store::{StoreKey, TabStoreError, TabsStore};

/// File extensions accepted by an image drop.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["gif", "jpeg", "jpg", "png", "webp"];

/// Services shared by every component of one widget.
#[derive(Clone)]
pub struct WidgetServices {
    pub bus: Rc<EventBus>,
    pub config: Rc<WidgetConfig>,
    pub scheduler: Rc<Scheduler>,
    pub tabs: Rc<TabsStore>,
}

impl WidgetServices {
    /// Creates fresh services for `config`.
    pub fn new(config: WidgetConfig) -> Self {
        let bus = Rc::new(EventBus::new());
        let tabs = Rc::new(TabsStore::new(
            Rc::clone(&bus),
            config.store_defaults(),
            config.max_tabs,
        ));

        Self {
            bus,
            config: Rc::new(config),
            scheduler: Rc::new(Scheduler::new()),
            tabs,
        }
    }
}

/// Inbound request from the host for one tab.
#[derive(Clone, Debug, PartialEq)]
pub enum HostCommand {
    AddChatItem(ChatItem),
    UpdateLastChatAnswer(ChatItemUpdate),
    UpdateChatAnswerWithMessageId {
        message_id: String,
        update: ChatItemUpdate,
    },
    EndMessageStream {
        message_id: String,
        update: Option<ChatItemUpdate>,
    },
    UpdateStore(Vec<(StoreKey, Value)>),
    AddAttachment {
        content: String,
        kind: AttachmentKind,
    },
    RemoveAttachment,
    AddCustomContext {
        commands: Vec<QuickActionCommand>,
        insert_position: Option<usize>,
    },
    FocusTab,
}

/// Components mounted for one tab.
pub struct ChatTab {
    chat: ChatWrapper,
    prompt_input: ChatPromptInput,
}

impl ChatTab {
    pub fn chat(&self) -> &ChatWrapper {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatWrapper {
        &mut self.chat
    }

    pub fn prompt_input(&self) -> &ChatPromptInput {
        &self.prompt_input
    }

    pub fn prompt_input_mut(&mut self) -> &mut ChatPromptInput {
        &mut self.prompt_input
    }
}

/// Multi-tab chat widget.
///
/// Every entry point drains the queued store notifications before it
/// returns, so components observe store writes in a consistent order.
pub struct ChatWidget {
    services: WidgetServices,
    tabs: BTreeMap<String, ChatTab>,
}

impl ChatWidget {
    /// Creates a widget without tabs.
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            services: WidgetServices::new(config),
            tabs: BTreeMap::new(),
        }
    }

    pub fn services(&self) -> &WidgetServices {
        &self.services
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.services.bus
    }

    /// Opens and selects a tab seeded with `initial` store values.
    ///
    /// # Errors
    /// Returns [`TabStoreError::TabLimitReached`] when the tab limit is hit.
    pub fn add_tab(&mut self, initial: BTreeMap<StoreKey, Value>) -> Result<String, TabStoreError> {
        let tab_id = self.services.tabs.add_tab(initial)?;
        let store = self
            .services
            .tabs
            .tab_store(&tab_id)
            .ok_or_else(|| TabStoreError::UnknownTab(tab_id.clone()))?;
        let mut prompt_input = ChatPromptInput::new(tab_id.clone(), &self.services, Rc::clone(&store));
        prompt_input.focus();
        let chat = ChatWrapper::new(
            tab_id.clone(),
            Rc::clone(&self.services.bus),
            Rc::clone(&self.services.scheduler),
            store,
        );
        self.tabs.insert(tab_id.clone(), ChatTab { chat, prompt_input });
        self.apply_store_changes();

        Ok(tab_id)
    }

    /// Closes a tab.
    ///
    /// # Errors
    /// Returns [`TabStoreError::UnknownTab`] for an unknown id.
    pub fn remove_tab(&mut self, tab_id: &str) -> Result<(), TabStoreError> {
        self.services.tabs.remove_tab(tab_id)?;
        self.tabs.remove(tab_id);
        if let Some(selected) = self.selected_tab_mut() {
            selected.prompt_input.focus();
        }

        Ok(())
    }

    /// Selects a tab and focuses its prompt.
    ///
    /// # Errors
    /// Returns [`TabStoreError::UnknownTab`] for an unknown id.
    pub fn select_tab(&mut self, tab_id: &str) -> Result<(), TabStoreError> {
        self.services.tabs.select_tab(tab_id)?;
        for (id, tab) in &mut self.tabs {
            if id == tab_id {
                tab.prompt_input.focus();
            } else {
                tab.prompt_input.blur();
            }
        }
        self.apply_store_changes();

        Ok(())
    }

    /// Resets a tab store to its defaults and empties its components.
    ///
    /// # Errors
    /// Returns [`TabStoreError::UnknownTab`] for an unknown id.
    pub fn reset_tab(&mut self, tab_id: &str) -> Result<(), TabStoreError> {
        self.services.tabs.reset_tab(tab_id)?;
        if let Some(tab) = self.tabs.get_mut(tab_id) {
            tab.prompt_input.clear_text_area(false);
            tab.chat.clear_cards();
        }
        self.apply_store_changes();

        Ok(())
    }

    /// Returns tab ids in creation order.
    pub fn tab_ids(&self) -> Vec<String> {
        self.services.tabs.tab_ids()
    }

    pub fn selected_tab_id(&self) -> Option<String> {
        self.services.tabs.selected_tab_id()
    }

    pub fn tab(&self, tab_id: &str) -> Option<&ChatTab> {
        self.tabs.get(tab_id)
    }

    pub fn tab_mut(&mut self, tab_id: &str) -> Option<&mut ChatTab> {
        self.tabs.get_mut(tab_id)
    }

    pub fn selected_tab(&self) -> Option<&ChatTab> {
        self.selected_tab_id()
            .and_then(|tab_id| self.tabs.get(&tab_id))
    }

    pub fn selected_tab_mut(&mut self) -> Option<&mut ChatTab> {
        let tab_id = self.selected_tab_id()?;

        self.tabs.get_mut(&tab_id)
    }

    /// Routes a key press to the selected prompt.
    pub fn handle_key(&mut self, key: &KeyInput) -> KeyOutcome {
        let outcome = self
            .selected_tab_mut()
            .map_or(KeyOutcome::Ignored, |tab| tab.prompt_input.handle_key(key));
        self.apply_store_changes();

        outcome
    }

    /// Pastes text into the selected prompt.
    pub fn paste(&mut self, text: &str) -> bool {
        let is_pasted = self
            .selected_tab_mut()
            .is_some_and(|tab| tab.prompt_input.paste(text));
        self.apply_store_changes();

        is_pasted
    }

    /// Applies one host command to `tab_id`.
    ///
    /// # Errors
    /// Returns [`TabStoreError::UnknownTab`] for an unknown id.
    pub fn handle_host_command(
        &mut self,
        tab_id: &str,
        command: HostCommand,
    ) -> Result<(), TabStoreError> {
        if !self.tabs.contains_key(tab_id) {
            return Err(TabStoreError::UnknownTab(tab_id.to_string()));
        }

        match command {
            HostCommand::UpdateStore(updates) => {
                let is_chat_cleared = updates.iter().any(|(key, value)| {
                    *key == StoreKey::ChatItems && value.as_array().is_some_and(Vec::is_empty)
                });
                self.services.tabs.update_tab(tab_id, updates)?;
                if is_chat_cleared && let Some(tab) = self.tabs.get_mut(tab_id) {
                    tab.chat.clear_cards();
                }
            }
            HostCommand::FocusTab => {
                self.select_tab(tab_id)?;
                self.services.bus.dispatch(&UiEvent::TabFocus {
                    tab_id: tab_id.to_string(),
                });
            }
            HostCommand::AddCustomContext {
                commands,
                insert_position,
            } => {
                self.services.bus.dispatch(&UiEvent::ResetTopBarClicked {
                    tab_id: tab_id.to_string(),
                });
                if let Some(tab) = self.tabs.get_mut(tab_id) {
                    tab.prompt_input.reset_top_bar_clicked();
                    tab.prompt_input
                        .add_custom_context(&commands, insert_position);
                }
            }
            command => {
                if let Some(tab) = self.tabs.get_mut(tab_id) {
                    tab.apply_host_command(command);
                }
            }
        }
        self.apply_store_changes();

        Ok(())
    }

    /// Announces dropped image files to the host for the selected tab.
    ///
    /// Requires the `image` context command in the tab catalog. Returns
    /// whether anything was dispatched.
    pub fn drop_files(&mut self, paths: &[PathBuf]) -> bool {
        let Some(tab_id) = self.selected_tab_id() else {
            return false;
        };
        let Some(store) = self.services.tabs.tab_store(&tab_id) else {
            return false;
        };
        let context_commands: Vec<QuickActionCommandGroup> = store
            .get_as(StoreKey::ContextCommands)
            .unwrap_or_default();
        if !has_image_context(&context_commands) {
            return false;
        }

        let files: Vec<PathBuf> = paths.iter().filter(|path| is_image(path)).cloned().collect();
        if files.is_empty() {
            return false;
        }
        let Some(tab) = self.tabs.get_mut(&tab_id) else {
            return false;
        };
        tab.prompt_input.reset_top_bar_clicked();
        let insert_position = tab.prompt_input.text_input().cursor_pos();

        self.services.bus.dispatch(&UiEvent::ResetTopBarClicked {
            tab_id: tab_id.clone(),
        });
        tracing::debug!(tab_id = %tab_id, files = files.len(), "files dropped");
        self.services.bus.dispatch(&UiEvent::FilesDropped {
            tab_id,
            files,
            insert_position,
        });

        true
    }

    /// Advances the virtual clock, runs due tasks on live tabs and flushes
    /// queued chat updates. Returns whether anything visible changed.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        let tasks = self.services.scheduler.advance(elapsed);
        let mut is_changed = !tasks.is_empty();
        for task in tasks {
            let Some(tab) = self.tabs.get_mut(task.tab_id()) else {
                tracing::trace!(?task, "task for closed tab dropped");

                continue;
            };
            tab.run_task(task);
        }
        for tab in self.tabs.values_mut() {
            is_changed |= tab.chat.flush_pending();
        }
        self.apply_store_changes();

        is_changed
    }

    /// Applies queued store notifications of every tab.
    pub fn apply_store_changes(&mut self) {
        for tab in self.tabs.values_mut() {
            tab.prompt_input.apply_store_changes();
        }
    }
}

impl ChatTab {
    fn apply_host_command(&mut self, command: HostCommand) {
        match command {
            HostCommand::AddChatItem(item) => {
                self.chat.insert_chat_item(item);
            }
            HostCommand::UpdateLastChatAnswer(update) => {
                self.chat.update_last_chat_answer(update);
            }
            HostCommand::UpdateChatAnswerWithMessageId { message_id, update } => {
                self.chat
                    .update_chat_answer_with_message_id(&message_id, update);
            }
            HostCommand::EndMessageStream { message_id, update } => {
                self.chat.end_stream_with_message_id(&message_id, update);
            }
            HostCommand::AddAttachment { content, kind } => {
                self.prompt_input.add_attachment(&content, kind);
            }
            HostCommand::RemoveAttachment => self.prompt_input.remove_attachment(),
            HostCommand::UpdateStore(_)
            | HostCommand::FocusTab
            | HostCommand::AddCustomContext { .. } => {}
        }
    }

    fn run_task(&mut self, task: ScheduledTask) {
        match task {
            ScheduledTask::FocusPromptInput { .. } => self.prompt_input.focus(),
            ScheduledTask::DismissVoteConfirmation { message_id, .. } => {
                self.chat.dismiss_vote_confirmation(&message_id);
            }
            ScheduledTask::ClearScrollSnap { .. } => self.chat.clear_scroll_snap(),
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|image| image.eq_ignore_ascii_case(extension))
        })
}
