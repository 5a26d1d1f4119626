use crate::domain::command::{QuickActionCommandGroup, QuickActionCommandsHeader};
use crate::ui::state::quick_pick::QuickPickMode;

/// Where an overlay is attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayAnchor {
    /// Current cursor of the prompt input.
    Cursor,
    /// A context pill identified by its temporary id.
    Pill { temporary_id: String },
    /// The prompt input frame.
    PromptInput,
    /// The prompt top bar.
    TopBar,
}

/// Renderable quick-pick list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickPickView {
    pub groups: Vec<QuickActionCommandGroup>,
    pub header: Option<QuickActionCommandsHeader>,
    pub mode: QuickPickMode,
    pub search_term: String,
    pub target: Option<usize>,
}

/// Content hosted by an overlay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayContent {
    QuickPick(QuickPickView),
    CharacterIndicator { used: usize, max: usize },
    Card { text: String },
}

/// Copy of an open overlay used by renderers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlaySnapshot {
    pub anchor: OverlayAnchor,
    pub content: OverlayContent,
    pub hidden: bool,
}

/// Popup surface capability used by the prompt input.
///
/// Every operation is idempotent: closing a closed overlay or updating a
/// closed overlay does nothing.
pub trait Overlay {
    /// Opens the overlay, replacing anything it showed before.
    fn show(&mut self, content: OverlayContent, anchor: OverlayAnchor);

    /// Replaces the content of an open overlay.
    fn update_content(&mut self, content: OverlayContent);

    /// Hides or reveals an open overlay without closing it.
    fn toggle_hidden(&mut self, hidden: bool);

    /// Closes the overlay.
    fn close(&mut self);

    /// Returns whether the overlay is open, hidden or not.
    fn is_open(&self) -> bool;

    /// Returns a copy of the open overlay state.
    fn snapshot(&self) -> Option<OverlaySnapshot>;
}

/// In-memory overlay rendered by the terminal UI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlaySlot {
    state: Option<OverlaySnapshot>,
}

impl OverlaySlot {
    /// Creates a closed overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the overlay is open and not hidden.
    pub fn is_visible(&self) -> bool {
        self.state.as_ref().is_some_and(|state| !state.hidden)
    }

    /// Returns the current content when open.
    pub fn content(&self) -> Option<&OverlayContent> {
        self.state.as_ref().map(|state| &state.content)
    }
}

impl Overlay for OverlaySlot {
    fn show(&mut self, content: OverlayContent, anchor: OverlayAnchor) {
        self.state = Some(OverlaySnapshot {
            anchor,
            content,
            hidden: false,
        });
    }

    fn update_content(&mut self, content: OverlayContent) {
        if let Some(state) = &mut self.state {
            state.content = content;
        }
    }

    fn toggle_hidden(&mut self, hidden: bool) {
        if let Some(state) = &mut self.state {
            state.hidden = hidden;
        }
    }

    fn close(&mut self) {
        self.state = None;
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }

    fn snapshot(&self) -> Option<OverlaySnapshot> {
        self.state.clone()
    }
}
