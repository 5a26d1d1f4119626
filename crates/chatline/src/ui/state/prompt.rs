use crate::domain::prompt::{UserPrompt, strip_code_fences};
use crate::ui::state::quick_pick::QuickPickSession;

/// Keyboard state of the command/context selector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SelectorState {
    #[default]
    Idle,
    /// A quick action is locked and waits for its typed argument.
    AwaitingConfirmation,
    QuickPickOpen(QuickPickSession),
}

impl SelectorState {
    /// Returns the open quick-pick session.
    pub fn session(&self) -> Option<&QuickPickSession> {
        match self {
            SelectorState::QuickPickOpen(session) => Some(session),
            SelectorState::Idle | SelectorState::AwaitingConfirmation => None,
        }
    }

    /// Returns the open quick-pick session mutably.
    pub fn session_mut(&mut self) -> Option<&mut QuickPickSession> {
        match self {
            SelectorState::QuickPickOpen(session) => Some(session),
            SelectorState::Idle | SelectorState::AwaitingConfirmation => None,
        }
    }
}

/// UI state for navigating previously sent prompts with `Up` and `Down`.
///
/// `selected_index == Some(entries.len())` is the unsent draft position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptHistoryState {
    /// Draft input captured before entering history navigation.
    pub draft: Option<UserPrompt>,
    /// Previously sent user prompts in chronological order.
    pub entries: Vec<UserPrompt>,
    /// Currently selected history entry index, if navigating.
    pub selected_index: Option<usize>,
}

impl PromptHistoryState {
    /// Creates history state from prior prompt entries.
    pub fn new(entries: Vec<UserPrompt>) -> Self {
        Self {
            draft: None,
            entries,
            selected_index: None,
        }
    }

    /// Appends a sent prompt when it is not empty.
    pub fn push(&mut self, entry: UserPrompt) {
        if !entry.is_empty() {
            self.entries.push(entry);
        }
    }

    /// Clears active history navigation and stored draft.
    pub fn reset_navigation(&mut self) {
        self.draft = None;
        self.selected_index = None;
    }

    /// Returns whether `Up` can move to an older entry.
    pub fn can_navigate_up(&self) -> bool {
        !self.entries.is_empty() && self.selected_index.is_none_or(|index| index > 0)
    }

    /// Returns whether `Down` can move towards the draft.
    pub fn can_navigate_down(&self) -> bool {
        self.selected_index
            .is_some_and(|index| index < self.entries.len())
    }

    /// Moves to the previous entry, snapshotting `current` as the draft when
    /// leaving the draft position.
    pub fn navigate_up(&mut self, current: UserPrompt) -> Option<UserPrompt> {
        if !self.can_navigate_up() {
            return None;
        }

        let index = self.selected_index.unwrap_or(self.entries.len());
        if index == self.entries.len() {
            self.draft = Some(current);
        }
        let next_index = index - 1;
        self.selected_index = Some(next_index);

        self.entries.get(next_index).map(restore_entry)
    }

    /// Moves to the next entry; reaching the end restores the draft exactly.
    pub fn navigate_down(&mut self) -> Option<UserPrompt> {
        if !self.can_navigate_down() {
            return None;
        }

        let next_index = self.selected_index.map_or(0, |index| index + 1);
        self.selected_index = Some(next_index);
        if next_index == self.entries.len() {
            return Some(self.draft.clone().unwrap_or_default());
        }

        self.entries.get(next_index).map(restore_entry)
    }
}

fn restore_entry(entry: &UserPrompt) -> UserPrompt {
    UserPrompt {
        input_text: entry.input_text.clone(),
        code_attachment: strip_code_fences(&entry.code_attachment),
        attachment_kind: entry.attachment_kind,
    }
}
