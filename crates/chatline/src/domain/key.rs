use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key press delivered to the prompt input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub event: KeyEvent,
    /// Whether an input method composition is in progress.
    pub is_composing: bool,
}

impl KeyInput {
    /// Wraps a key event outside any composition.
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self {
            event: KeyEvent::new(code, modifiers),
            is_composing: false,
        }
    }

    /// Marks the key as part of an input method composition.
    #[must_use]
    pub fn composing(mut self) -> Self {
        self.is_composing = true;
        self
    }

    /// Returns the key code.
    pub fn code(&self) -> KeyCode {
        self.event.code
    }

    /// Returns whether Shift is held.
    pub fn shift(&self) -> bool {
        self.event.modifiers.contains(KeyModifiers::SHIFT)
    }

    /// Returns whether Alt is held.
    pub fn alt(&self) -> bool {
        self.event.modifiers.contains(KeyModifiers::ALT)
    }

    /// Returns whether Ctrl or Meta is held.
    pub fn command_modifier(&self) -> bool {
        self.event
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::META | KeyModifiers::SUPER)
    }

    /// Returns whether the key is Enter.
    pub fn is_enter(&self) -> bool {
        matches!(self.event.code, KeyCode::Enter | KeyCode::Char('\r' | '\n'))
    }

    /// Returns the typed character when the key produces text.
    pub fn printable_char(&self) -> Option<char> {
        match self.event.code {
            KeyCode::Char(ch) if !self.command_modifier() && !ch.is_control() => Some(ch),
            _ => None,
        }
    }

    /// Returns whether the key is `character` typed without Ctrl or Meta.
    pub fn is_char(&self, character: char) -> bool {
        self.event.code == KeyCode::Char(character) && !self.command_modifier()
    }

    /// Returns whether the key is Ctrl+`character`.
    pub fn is_ctrl_char(&self, character: char) -> bool {
        self.event.code == KeyCode::Char(character)
            && self.event.modifiers.contains(KeyModifiers::CONTROL)
    }
}
