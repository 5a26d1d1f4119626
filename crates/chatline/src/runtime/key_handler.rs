use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::ChatWidget;
use crate::domain::key::KeyInput;
use crate::infra::event_bus::Vote;
use crate::runtime::EventResult;
use crate::runtime::host::demo_tab_store;

/// Applies widget-level shortcuts, then routes the key to the selected
/// prompt.
pub(crate) fn handle_key_event(widget: &mut ChatWidget, key: KeyEvent) -> EventResult {
    if key.kind == KeyEventKind::Release {
        return EventResult::Continue;
    }

    if let KeyCode::Char(ch) = key.code
        && key.modifiers.contains(KeyModifiers::CONTROL)
    {
        match ch.to_ascii_lowercase() {
            'c' | 'q' => return EventResult::Quit,
            't' => open_tab(widget),
            'w' => close_selected_tab(widget),
            'n' => cycle_tab(widget, true),
            'p' => cycle_tab(widget, false),
            's' => {
                if let Some(tab) = widget.selected_tab() {
                    tab.prompt_input().controls().stop_click();
                }
            }
            'o' => {
                if let Some(tab) = widget.selected_tab_mut() {
                    tab.prompt_input_mut().context_selector_button_click();
                }
                widget.apply_store_changes();
            }
            'u' => vote_last_answer(widget, Vote::Upvote),
            'd' => vote_last_answer(widget, Vote::Downvote),
            _ => {
                widget.handle_key(&KeyInput::new(key.code, key.modifiers));
            }
        }

        return EventResult::Continue;
    }

    widget.handle_key(&KeyInput::new(key.code, key.modifiers));

    EventResult::Continue
}

/// Opens a new tab seeded with the demo catalogs and selects it.
pub(crate) fn open_tab(widget: &mut ChatWidget) {
    let initial = demo_tab_store(&widget.services().config.tab_defaults);
    if let Err(error) = widget.add_tab(initial) {
        tracing::warn!(%error, "tab not opened");
    }
}

fn close_selected_tab(widget: &mut ChatWidget) {
    let Some(tab_id) = widget.selected_tab_id() else {
        return;
    };
    if let Err(error) = widget.remove_tab(&tab_id) {
        tracing::warn!(%error, "tab not closed");
    }
}

fn cycle_tab(widget: &mut ChatWidget, is_forward: bool) {
    let tab_ids = widget.tab_ids();
    let Some(selected_tab_id) = widget.selected_tab_id() else {
        return;
    };
    let Some(index) = tab_ids.iter().position(|tab_id| *tab_id == selected_tab_id) else {
        return;
    };
    let next_index = if is_forward {
        (index + 1) % tab_ids.len()
    } else {
        (index + tab_ids.len() - 1) % tab_ids.len()
    };

    if let Err(error) = widget.select_tab(&tab_ids[next_index]) {
        tracing::warn!(%error, "tab not selected");
    }
}

fn vote_last_answer(widget: &mut ChatWidget, vote: Vote) {
    let Some(tab) = widget.selected_tab_mut() else {
        return;
    };
    let Some(message_id) = tab
        .chat()
        .cards()
        .iter()
        .rev()
        .find(|card| card.item.can_be_voted && card.vote_confirmation.is_none())
        .map(|card| card.message_id().to_string())
    else {
        return;
    };

    tab.chat_mut().vote(&message_id, vote);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat_item::{ChatItem, ChatItemType};
    use crate::infra::config::WidgetConfig;

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_ctrl_c_quits() {
        // Arrange
        let mut widget = ChatWidget::new(WidgetConfig::default());

        // Act
        let result = handle_key_event(&mut widget, ctrl('c'));

        // Assert
        assert!(matches!(result, EventResult::Quit));
    }

    #[test]
    fn test_ctrl_t_and_ctrl_w_open_and_close_tabs() {
        // Arrange
        let mut widget = ChatWidget::new(WidgetConfig::default());

        // Act
        handle_key_event(&mut widget, ctrl('t'));
        handle_key_event(&mut widget, ctrl('t'));
        let opened = widget.tab_ids().len();
        handle_key_event(&mut widget, ctrl('w'));

        // Assert
        assert_eq!(opened, 2);
        assert_eq!(widget.tab_ids().len(), 1);
    }

    #[test]
    fn test_ctrl_n_wraps_to_first_tab() {
        // Arrange
        let mut widget = ChatWidget::new(WidgetConfig::default());
        open_tab(&mut widget);
        open_tab(&mut widget);
        let tab_ids = widget.tab_ids();

        // Act
        handle_key_event(&mut widget, ctrl('n'));

        // Assert
        assert_eq!(widget.selected_tab_id().as_deref(), Some(tab_ids[0].as_str()));
    }

    #[test]
    fn test_plain_keys_reach_the_prompt() {
        // Arrange
        let mut widget = ChatWidget::new(WidgetConfig::default());
        open_tab(&mut widget);

        // Act
        handle_key_event(&mut widget, KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE));
        handle_key_event(&mut widget, KeyEvent::new(KeyCode::Char('i'), KeyModifiers::NONE));

        // Assert
        let tab = widget.selected_tab().expect("tab should be selected");
        assert_eq!(tab.prompt_input().text_input().text_value(), "hi");
    }

    #[test]
    fn test_ctrl_u_votes_last_votable_answer() {
        // Arrange
        let mut widget = ChatWidget::new(WidgetConfig::default());
        open_tab(&mut widget);
        if let Some(tab) = widget.selected_tab_mut() {
            let mut answer = ChatItem::new(ChatItemType::Answer, "done");
            answer.can_be_voted = true;
            tab.chat_mut().insert_chat_item(answer);
        }

        // Act
        handle_key_event(&mut widget, ctrl('u'));

        // Assert
        let tab = widget.selected_tab().expect("tab should be selected");
        assert_eq!(tab.chat().cards()[0].vote_confirmation, Some(Vote::Upvote));
    }
}
