use crate::domain::command::{
    QuickActionCommand, QuickActionCommandGroup, QuickActionCommandsHeader, command_at,
    command_count,
};
use crate::domain::quick_pick::filter_quick_pick_items;
use crate::ui::state::overlay::QuickPickView;

/// Catalog a quick-pick session lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuickPickMode {
    /// `/` commands.
    QuickAction,
    /// `@` context items.
    Context,
}

/// Direction of a target move inside the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetDirection {
    Up,
    Down,
}

/// Transient state of an open quick-pick overlay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickPickSession {
    /// Source groups before filtering; replaced when descending into children.
    pub item_groups: Vec<QuickActionCommandGroup>,
    pub filtered_groups: Vec<QuickActionCommandGroup>,
    pub hidden: bool,
    pub mode: QuickPickMode,
    pub search_term: String,
    /// Highlighted command index across `filtered_groups`.
    pub target: Option<usize>,
    /// Whether the session was opened from the top bar title.
    pub top_bar_triggered: bool,
    /// Cursor offset captured when the session opened.
    pub trigger_anchor: usize,
    /// Offset of the trigger character, or of the first typed character for
    /// quick actions.
    pub trigger_index: usize,
}

impl QuickPickSession {
    /// Opens a session listing all of `item_groups`.
    pub fn new(
        mode: QuickPickMode,
        trigger_index: usize,
        trigger_anchor: usize,
        item_groups: Vec<QuickActionCommandGroup>,
    ) -> Self {
        Self {
            filtered_groups: item_groups.clone(),
            item_groups,
            hidden: false,
            mode,
            search_term: String::new(),
            target: None,
            top_bar_triggered: false,
            trigger_anchor,
            trigger_index,
        }
    }

    /// Marks the session as opened from the top bar.
    #[must_use]
    pub fn from_top_bar(mut self) -> Self {
        self.top_bar_triggered = true;
        self
    }

    /// Appends one character to the search term and refilters.
    pub fn push_char(&mut self, ch: char) {
        self.search_term.extend(ch.to_lowercase());
        self.refilter();
    }

    /// Removes the last search character and refilters.
    ///
    /// Returns `false` when the term was already empty.
    pub fn pop_char(&mut self) -> bool {
        if self.search_term.pop().is_none() {
            return false;
        }
        self.refilter();

        true
    }

    /// Replaces the search term and refilters.
    pub fn set_search_term(&mut self, search_term: &str) {
        self.search_term = search_term.to_lowercase();
        self.refilter();
    }

    /// Recomputes `filtered_groups`, hiding the overlay on an empty result.
    pub fn refilter(&mut self) {
        self.filtered_groups = filter_quick_pick_items(
            &self.item_groups,
            &self.search_term,
            self.top_bar_triggered,
        );
        self.target = None;
        self.hidden = self.item_count() == 0;
    }

    /// Replaces the source list with `children` of a selected item.
    pub fn descend(&mut self, children: Vec<QuickActionCommandGroup>) {
        self.filtered_groups = children.clone();
        self.item_groups = children;
        self.search_term.clear();
        self.target = None;
        self.hidden = false;
    }

    /// Returns the number of listed commands.
    pub fn item_count(&self) -> usize {
        command_count(&self.filtered_groups)
    }

    /// Moves the highlighted target, stopping at the list ends.
    pub fn move_target(&mut self, direction: TargetDirection) {
        let count = self.item_count();
        if count == 0 {
            self.target = None;

            return;
        }

        let last = count - 1;
        self.target = Some(match (direction, self.target) {
            (TargetDirection::Up, None) => last,
            (TargetDirection::Down, None) => 0,
            (TargetDirection::Up, Some(index)) => index.saturating_sub(1),
            (TargetDirection::Down, Some(index)) => (index + 1).min(last),
        });
    }

    /// Returns the highlighted command.
    pub fn target_command(&self) -> Option<&QuickActionCommand> {
        command_at(&self.filtered_groups, self.target?)
    }

    /// Returns the command at `index` in the listed order.
    pub fn command(&self, index: usize) -> Option<&QuickActionCommand> {
        command_at(&self.filtered_groups, index)
    }

    /// Builds the renderable view of this session.
    pub fn view(&self, header: Option<QuickActionCommandsHeader>) -> QuickPickView {
        QuickPickView {
            groups: self.filtered_groups.clone(),
            header,
            mode: self.mode,
            search_term: self.search_term.clone(),
            target: self.target,
        }
    }
}
