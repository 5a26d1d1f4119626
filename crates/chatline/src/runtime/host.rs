use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use serde_json::{Value, json};

use crate::app::{ChatWidget, HostCommand};
use crate::domain::chat_item::{ChatItem, ChatItemType, ChatItemUpdate};
use crate::infra::event_bus::{EventBus, UiEvent, UiEventName};
use crate::infra::tab_store::{StoreKey, TabStoreError};

/// Delay between two streamed words of an answer.
pub const WORD_INTERVAL: Duration = Duration::from_millis(80);

const CLEAR_COMMAND: &str = "/clear";
const HELP_COMMAND: &str = "/help";
const HELP_TEXT: &str = "Type / for quick actions and @ for context. \
Ctrl+T opens a tab, Ctrl+W closes it, Ctrl+N and Ctrl+P switch tabs. \
Ctrl+S stops an answer, Ctrl+U and Ctrl+D vote on the last answer, Ctrl+C quits.";

/// Request queued by a bus listener until the next host tick.
#[derive(Clone, Debug, PartialEq)]
enum HostRequest {
    Answer {
        command: Option<String>,
        prompt: String,
        tab_id: String,
    },
    Stop {
        tab_id: String,
    },
}

/// Answer being streamed into one tab.
struct AnswerStream {
    body: String,
    message_id: String,
    since_last_word: Duration,
    tab_id: String,
    words: VecDeque<String>,
}

/// Demo host that echoes every prompt back as a streamed answer.
pub struct EchoHost {
    bus: Rc<EventBus>,
    listener_ids: Vec<String>,
    requests: Rc<RefCell<Vec<HostRequest>>>,
    streams: Vec<AnswerStream>,
}

impl EchoHost {
    /// Subscribes to prompts and stop requests on `bus`.
    pub fn attach(bus: &Rc<EventBus>) -> Self {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let listener_ids = [UiEventName::ChatPrompt, UiEventName::StopChatResponse]
            .into_iter()
            .map(|name| {
                let requests = Rc::clone(&requests);
                bus.subscribe(name, move |event| {
                    let request = match event {
                        UiEvent::ChatPrompt { tab_id, prompt } => HostRequest::Answer {
                            command: prompt.command.clone(),
                            prompt: prompt.prompt.clone(),
                            tab_id: tab_id.clone(),
                        },
                        UiEvent::StopChatResponse { tab_id } => HostRequest::Stop {
                            tab_id: tab_id.clone(),
                        },
                        _ => return,
                    };
                    requests.borrow_mut().push(request);
                })
            })
            .collect();

        Self {
            bus: Rc::clone(bus),
            listener_ids,
            requests,
            streams: Vec::new(),
        }
    }

    /// Returns whether an answer is still streaming.
    pub fn is_streaming(&self) -> bool {
        !self.streams.is_empty()
    }

    /// Answers queued prompts and streams pending words into `widget`.
    /// Returns whether the widget changed.
    pub fn tick(&mut self, widget: &mut ChatWidget, elapsed: Duration) -> bool {
        let requests = std::mem::take(&mut *self.requests.borrow_mut());
        let mut is_changed = !requests.is_empty();
        for request in requests {
            let result = match request {
                HostRequest::Answer {
                    command,
                    prompt,
                    tab_id,
                } => self.answer(widget, &tab_id, command.as_deref(), &prompt),
                HostRequest::Stop { tab_id } => self.stop_answer(widget, &tab_id),
            };
            if let Err(error) = result {
                tracing::debug!(%error, "host request dropped");
            }
        }

        let mut finished = Vec::new();
        for (index, stream) in self.streams.iter_mut().enumerate() {
            stream.since_last_word += elapsed;
            if stream.since_last_word < WORD_INTERVAL {
                continue;
            }
            stream.since_last_word = Duration::ZERO;

            let Some(word) = stream.words.pop_front() else {
                finished.push(index);

                continue;
            };
            if !stream.body.is_empty() {
                stream.body.push(' ');
            }
            stream.body.push_str(&word);
            is_changed = true;

            let result = widget.handle_host_command(
                &stream.tab_id,
                HostCommand::UpdateChatAnswerWithMessageId {
                    message_id: stream.message_id.clone(),
                    update: ChatItemUpdate::body(stream.body.clone()),
                },
            );
            if result.is_err() {
                tracing::debug!(tab_id = %stream.tab_id, "answer tab closed");
                finished.push(index);
            }
        }

        for index in finished.into_iter().rev() {
            let stream = self.streams.remove(index);
            is_changed = true;
            if let Err(error) = finish_answer(widget, &stream) {
                tracing::debug!(%error, "answer finished on closed tab");
            }
        }

        is_changed
    }

    fn answer(
        &mut self,
        widget: &mut ChatWidget,
        tab_id: &str,
        command: Option<&str>,
        prompt: &str,
    ) -> Result<(), TabStoreError> {
        match command {
            Some(CLEAR_COMMAND) => {
                self.streams.retain(|stream| stream.tab_id != tab_id);
                widget.handle_host_command(
                    tab_id,
                    HostCommand::UpdateStore(vec![
                        (StoreKey::ChatItems, Value::Array(Vec::new())),
                        (StoreKey::LoadingChat, Value::Bool(false)),
                    ]),
                )
            }
            Some(HELP_COMMAND) => self.start_answer(widget, tab_id, HELP_COMMAND, HELP_TEXT),
            Some(command) => {
                let prompt = format!("{command} {prompt}");
                let reply = format!("You said: {}", prompt.trim());

                self.start_answer(widget, tab_id, &prompt, &reply)
            }
            None => {
                let reply = if prompt.trim().is_empty() {
                    "You sent an empty prompt.".to_string()
                } else {
                    format!("You said: {}", prompt.trim())
                };

                self.start_answer(widget, tab_id, prompt, &reply)
            }
        }
    }

    fn start_answer(
        &mut self,
        widget: &mut ChatWidget,
        tab_id: &str,
        prompt: &str,
        reply: &str,
    ) -> Result<(), TabStoreError> {
        widget.handle_host_command(
            tab_id,
            HostCommand::AddChatItem(ChatItem::new(ChatItemType::Prompt, prompt)),
        )?;
        widget.handle_host_command(
            tab_id,
            HostCommand::UpdateStore(vec![
                (StoreKey::LoadingChat, Value::Bool(true)),
                (StoreKey::CancelButtonWhenLoading, Value::Bool(true)),
            ]),
        )?;

        let message_id = uuid::Uuid::new_v4().to_string();
        widget.handle_host_command(
            tab_id,
            HostCommand::AddChatItem(
                ChatItem::new(ChatItemType::AnswerStream, "").message_id(message_id.clone()),
            ),
        )?;
        tracing::debug!(tab_id, message_id = %message_id, "answer started");

        self.streams.push(AnswerStream {
            body: String::new(),
            message_id,
            since_last_word: Duration::ZERO,
            tab_id: tab_id.to_string(),
            words: reply.split_whitespace().map(str::to_string).collect(),
        });

        Ok(())
    }

    fn stop_answer(&mut self, widget: &mut ChatWidget, tab_id: &str) -> Result<(), TabStoreError> {
        let Some(index) = self.streams.iter().position(|stream| stream.tab_id == tab_id) else {
            return Ok(());
        };
        let stream = self.streams.remove(index);
        tracing::debug!(tab_id, message_id = %stream.message_id, "answer stopped");

        finish_answer(widget, &stream)
    }
}

impl Drop for EchoHost {
    fn drop(&mut self) {
        for listener_id in &self.listener_ids {
            self.bus.unsubscribe(listener_id);
        }
    }
}

fn finish_answer(widget: &mut ChatWidget, stream: &AnswerStream) -> Result<(), TabStoreError> {
    widget.handle_host_command(
        &stream.tab_id,
        HostCommand::EndMessageStream {
            message_id: stream.message_id.clone(),
            update: Some(ChatItemUpdate {
                can_be_voted: Some(true),
                ..ChatItemUpdate::default()
            }),
        },
    )?;
    widget.handle_host_command(
        &stream.tab_id,
        HostCommand::UpdateStore(vec![(StoreKey::LoadingChat, Value::Bool(false))]),
    )
}

/// Returns demo catalogs for every store key the configured tab defaults
/// leave unset.
pub fn demo_tab_store(tab_defaults: &BTreeMap<StoreKey, Value>) -> BTreeMap<StoreKey, Value> {
    let quick_actions = json!([{
        "groupName": "Quick actions",
        "commands": [
            { "command": CLEAR_COMMAND, "description": "Clear this conversation" },
            { "command": HELP_COMMAND, "description": "Show keyboard shortcuts" },
            {
                "command": "/explain",
                "description": "Explain a topic",
                "placeholder": "Type the topic to explain"
            }
        ]
    }]);
    let context = json!([{
        "groupName": "Context",
        "commands": [
            { "command": "workspace", "description": "Whole workspace" },
            {
                "command": "folder",
                "description": "Pick a folder",
                "children": [{
                    "groupName": "Folders",
                    "commands": [
                        { "command": "src", "description": "Sources" },
                        { "command": "docs", "description": "Documentation" }
                    ]
                }]
            },
            { "command": "image", "description": "Attach an image" }
        ]
    }]);

    [
        (StoreKey::QuickActionCommands, quick_actions),
        (StoreKey::ContextCommands, context),
        (
            StoreKey::PromptInputInfo,
            Value::String(format!("{HELP_COMMAND} lists the keyboard shortcuts")),
        ),
    ]
    .into_iter()
    .filter(|(key, _)| !tab_defaults.contains_key(key))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prompt::ChatPrompt;
    use crate::infra::config::WidgetConfig;

    fn widget_with_tab() -> (ChatWidget, String) {
        let mut widget = ChatWidget::new(WidgetConfig::default());
        let tab_id = widget.add_tab(BTreeMap::new()).expect("tab should be added");

        (widget, tab_id)
    }

    fn dispatch_prompt(widget: &ChatWidget, tab_id: &str, prompt: &str) {
        dispatch_command(widget, tab_id, None, prompt);
    }

    fn dispatch_command(widget: &ChatWidget, tab_id: &str, command: Option<&str>, prompt: &str) {
        widget.bus().dispatch(&UiEvent::ChatPrompt {
            tab_id: tab_id.to_string(),
            prompt: ChatPrompt {
                command: command.map(str::to_string),
                prompt: prompt.to_string(),
                ..ChatPrompt::default()
            },
        });
    }

    #[test]
    fn test_tick_adds_prompt_and_streaming_answer() {
        // Arrange
        let (mut widget, tab_id) = widget_with_tab();
        let mut host = EchoHost::attach(widget.bus());
        dispatch_prompt(&widget, &tab_id, "hello");

        // Act
        let is_changed = host.tick(&mut widget, Duration::ZERO);

        // Assert
        let tab = widget.tab(&tab_id).expect("tab should exist");
        let cards = tab.chat().cards();
        let store = widget
            .services()
            .tabs
            .tab_store(&tab_id)
            .expect("store should exist");
        assert!(is_changed);
        assert!(host.is_streaming());
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].item.item_type, ChatItemType::Prompt);
        assert_eq!(cards[1].item.item_type, ChatItemType::AnswerStream);
        assert!(store.get_bool(StoreKey::LoadingChat));
    }

    #[test]
    fn test_tick_streams_words_then_ends_answer() {
        // Arrange
        let (mut widget, tab_id) = widget_with_tab();
        let mut host = EchoHost::attach(widget.bus());
        dispatch_prompt(&widget, &tab_id, "hi");
        host.tick(&mut widget, Duration::ZERO);

        // Act
        for _ in 0..4 {
            host.tick(&mut widget, WORD_INTERVAL);
            widget.tick(WORD_INTERVAL);
        }

        // Assert
        let tab = widget.tab(&tab_id).expect("tab should exist");
        let answer = &tab.chat().cards()[1];
        let store = widget
            .services()
            .tabs
            .tab_store(&tab_id)
            .expect("store should exist");
        assert!(!host.is_streaming());
        assert!(answer.is_stream_ended);
        assert!(answer.item.can_be_voted);
        assert_eq!(answer.item.body.as_deref(), Some("You said: hi"));
        assert!(!store.get_bool(StoreKey::LoadingChat));
    }

    #[test]
    fn test_stop_request_ends_stream_early() {
        // Arrange
        let (mut widget, tab_id) = widget_with_tab();
        let mut host = EchoHost::attach(widget.bus());
        dispatch_prompt(&widget, &tab_id, "a long prompt to echo");
        host.tick(&mut widget, Duration::ZERO);

        // Act
        widget.bus().dispatch(&UiEvent::StopChatResponse {
            tab_id: tab_id.clone(),
        });
        host.tick(&mut widget, Duration::ZERO);

        // Assert
        let tab = widget.tab(&tab_id).expect("tab should exist");
        assert!(!host.is_streaming());
        assert!(tab.chat().cards()[1].is_stream_ended);
    }

    #[test]
    fn test_clear_command_empties_conversation() {
        // Arrange
        let (mut widget, tab_id) = widget_with_tab();
        let mut host = EchoHost::attach(widget.bus());
        dispatch_prompt(&widget, &tab_id, "hello");
        host.tick(&mut widget, Duration::ZERO);

        // Act
        dispatch_command(&widget, &tab_id, Some(CLEAR_COMMAND), "");
        host.tick(&mut widget, Duration::ZERO);

        // Assert
        let tab = widget.tab(&tab_id).expect("tab should exist");
        assert!(tab.chat().cards().is_empty());
        assert!(!host.is_streaming());
    }

    #[test]
    fn test_demo_tab_store_keeps_configured_catalogs() {
        // Arrange
        let tab_defaults = BTreeMap::from([(StoreKey::QuickActionCommands, json!([]))]);

        // Act
        let store = demo_tab_store(&tab_defaults);

        // Assert
        assert!(!store.contains_key(&StoreKey::QuickActionCommands));
        assert!(store.contains_key(&StoreKey::ContextCommands));
        assert!(store.contains_key(&StoreKey::PromptInputInfo));
    }

    #[test]
    fn test_drop_unsubscribes_listeners() {
        // Arrange
        let (widget, _) = widget_with_tab();
        let listener_count = widget.bus().listener_count();
        let host = EchoHost::attach(widget.bus());

        // Act
        drop(host);

        // Assert
        assert_eq!(widget.bus().listener_count(), listener_count);
    }
}
