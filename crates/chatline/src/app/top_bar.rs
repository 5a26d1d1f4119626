use std::rc::Rc;

use crate::domain::command::{ChatItemButton, QuickActionCommand};
use crate::infra::event_bus::{EventBus, UiEvent};

/// Bar above the prompt listing pinned context items.
///
/// The bar is hidden while its title is empty.
pub struct PromptTopBar {
    bus: Rc<EventBus>,
    button: Option<ChatItemButton>,
    context_items: Vec<QuickActionCommand>,
    tab_id: String,
    title: String,
}

impl PromptTopBar {
    /// Creates a bar for `tab_id`.
    pub fn new(
        tab_id: impl Into<String>,
        bus: Rc<EventBus>,
        title: impl Into<String>,
        context_items: Vec<QuickActionCommand>,
        button: Option<ChatItemButton>,
    ) -> Self {
        Self {
            bus,
            button,
            context_items,
            tab_id: tab_id.into(),
            title: title.into(),
        }
    }

    /// Returns whether the bar is hidden.
    pub fn is_hidden(&self) -> bool {
        self.title.is_empty()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn context_items(&self) -> &[QuickActionCommand] {
        &self.context_items
    }

    pub fn button(&self) -> Option<&ChatItemButton> {
        self.button.as_ref()
    }

    /// Replaces the title.
    pub fn update_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Replaces the pinned items.
    pub fn update_context_items(&mut self, context_items: Vec<QuickActionCommand>) {
        self.context_items = context_items;
    }

    /// Replaces the trailing button.
    pub fn update_button(&mut self, button: Option<ChatItemButton>) {
        self.button = button;
    }

    /// Pins `item` unless an item with the same id is already pinned.
    pub fn add_context_pill(&mut self, item: &QuickActionCommand) -> bool {
        let is_duplicate = item.id.as_ref().is_some_and(|id| {
            self.context_items
                .iter()
                .any(|existing| existing.id.as_ref() == Some(id))
        });
        if is_duplicate {
            return false;
        }

        self.context_items.push(item.clone());
        tracing::debug!(tab_id = %self.tab_id, command = %item.command, "context pinned to top bar");
        self.bus.dispatch(&UiEvent::TopBarItemAdd {
            tab_id: self.tab_id.clone(),
            item: item.clone(),
        });

        true
    }

    /// Unpins the item whose id, or command when it has none, equals `key`.
    pub fn remove_context_pill(&mut self, key: &str) -> bool {
        let Some(index) = self
            .context_items
            .iter()
            .position(|item| item.id.as_deref().unwrap_or(&item.command) == key)
        else {
            return false;
        };

        let item = self.context_items.remove(index);
        self.bus.dispatch(&UiEvent::TopBarItemRemove {
            tab_id: self.tab_id.clone(),
            item,
        });

        true
    }

    /// Announces a click on the trailing button.
    pub fn button_click(&self) -> bool {
        let Some(button) = self.button.as_ref().filter(|button| !button.disabled) else {
            return false;
        };
        self.bus.dispatch(&UiEvent::TopBarButtonClick {
            tab_id: self.tab_id.clone(),
            button_id: button.id.clone(),
        });

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::event_bus::EventRecorder;

    fn top_bar() -> (PromptTopBar, EventRecorder) {
        let bus = Rc::new(EventBus::new());
        let recorder = EventRecorder::attach(&bus);
        let bar = PromptTopBar::new("tab-1", bus, "Context", Vec::new(), None);

        (bar, recorder)
    }

    #[test]
    fn test_add_context_pill_skips_duplicate_ids() {
        // Arrange
        let (mut bar, recorder) = top_bar();
        let item = QuickActionCommand::new("a.rs").id("a");

        // Act
        let first = bar.add_context_pill(&item);
        let second = bar.add_context_pill(&item);
        let without_id = bar.add_context_pill(&QuickActionCommand::new("b.rs"));

        // Assert
        assert!(first);
        assert!(!second);
        assert!(without_id);
        assert_eq!(bar.context_items().len(), 2);
        assert_eq!(recorder.take().len(), 2);
    }

    #[test]
    fn test_remove_context_pill_matches_id_or_command() {
        // Arrange
        let (mut bar, recorder) = top_bar();
        bar.update_context_items(vec![
            QuickActionCommand::new("a.rs").id("a"),
            QuickActionCommand::new("b.rs"),
        ]);

        // Act
        let removed_by_id = bar.remove_context_pill("a");
        let removed_by_command = bar.remove_context_pill("b.rs");
        let removed_missing = bar.remove_context_pill("c.rs");

        // Assert
        assert!(removed_by_id && removed_by_command && !removed_missing);
        assert!(bar.context_items().is_empty());
        assert_eq!(
            recorder.take()[1],
            UiEvent::TopBarItemRemove {
                tab_id: "tab-1".to_string(),
                item: QuickActionCommand::new("b.rs"),
            }
        );
    }

    #[test]
    fn test_empty_title_hides_bar() {
        // Arrange
        let (mut bar, _) = top_bar();

        // Act
        bar.update_title("");

        // Assert
        assert!(bar.is_hidden());
    }

    #[test]
    fn test_button_click_ignores_disabled_button() {
        // Arrange
        let (mut bar, recorder) = top_bar();
        bar.update_button(Some(ChatItemButton {
            id: "rules".to_string(),
            disabled: true,
            ..ChatItemButton::default()
        }));

        // Act
        let clicked = bar.button_click();

        // Assert
        assert!(!clicked);
        assert!(recorder.take().is_empty());
    }
}
