use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::domain::document::PromptDocument;
use crate::ui::Component;
use crate::ui::util::{
    PROMPT_MAX_VISIBLE_LINES, PROMPT_PREFIX, calculate_input_viewport, compute_prompt_layout,
};

/// Bordered prompt editor with pills, placeholder and command chip.
pub struct PromptInputBox<'a> {
    attachment_lines: usize,
    command: Option<&'a str>,
    document: &'a PromptDocument,
    is_disabled: bool,
    is_focused: bool,
    placeholder: &'a str,
    title: &'a str,
}

impl<'a> PromptInputBox<'a> {
    /// Creates a prompt box rendering `document`.
    pub fn new(title: &'a str, document: &'a PromptDocument) -> Self {
        Self {
            attachment_lines: 0,
            command: None,
            document,
            is_disabled: false,
            is_focused: false,
            placeholder: "",
            title,
        }
    }

    /// Sets the input placeholder text.
    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Shows the quick action locked for the next send.
    #[must_use]
    pub fn command(mut self, command: Option<&'a str>) -> Self {
        self.command = command;
        self
    }

    /// Announces an attachment of `attachment_lines` lines below the input.
    #[must_use]
    pub fn attachment_lines(mut self, attachment_lines: usize) -> Self {
        self.attachment_lines = attachment_lines;
        self
    }

    /// Sets whether the terminal cursor is placed in the input.
    #[must_use]
    pub fn focused(mut self, is_focused: bool) -> Self {
        self.is_focused = is_focused;
        self
    }

    #[must_use]
    pub fn disabled(mut self, is_disabled: bool) -> Self {
        self.is_disabled = is_disabled;
        self
    }

    fn block(&self) -> Block<'a> {
        let border_color = if self.is_disabled {
            Color::DarkGray
        } else {
            Color::Cyan
        };
        let mut title = vec![Span::styled(
            self.title,
            Style::default().fg(border_color),
        )];
        if let Some(command) = self.command {
            title.push(Span::styled(
                format!(" {command} "),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(Line::from(title));
        if self.attachment_lines > 0 {
            block = block.title_bottom(Span::styled(
                format!(" attachment: {} lines ", self.attachment_lines),
                Style::default().fg(Color::Yellow),
            ));
        }

        block
    }
}

impl Component for PromptInputBox<'_> {
    fn render(&self, f: &mut Frame, area: Rect) {
        let block = self.block();

        if self.document.is_empty() {
            let display_lines = vec![Line::from(vec![
                Span::styled(
                    PROMPT_PREFIX,
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(self.placeholder, Style::default().fg(Color::DarkGray)),
            ])];

            f.render_widget(Clear, area);
            f.render_widget(Paragraph::new(display_lines).block(block), area);
            if self.is_focused {
                f.set_cursor_position((area.x.saturating_add(1 + 3), area.y.saturating_add(1)));
            }

            return;
        }

        let layout = compute_prompt_layout(self.document, area.width);
        let viewport_height = area
            .height
            .saturating_sub(2)
            .min(PROMPT_MAX_VISIBLE_LINES);
        let (scroll_offset, cursor_row) =
            calculate_input_viewport(layout.lines.len(), layout.cursor_y, viewport_height);
        let widget = Paragraph::new(layout.lines)
            .scroll((scroll_offset, 0))
            .block(block);

        f.render_widget(Clear, area);
        f.render_widget(widget, area);
        if self.is_focused {
            let max_x = area.width.saturating_sub(2);
            f.set_cursor_position((
                area.x.saturating_add(1).saturating_add(layout.cursor_x.min(max_x)),
                area.y.saturating_add(1).saturating_add(cursor_row),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Position;

    use super::*;

    #[test]
    fn test_builder_methods() {
        // Arrange
        let document = PromptDocument::with_text("hi");

        // Act
        let prompt = PromptInputBox::new(" Prompt ", &document)
            .placeholder("Ask something")
            .command(Some("/dev"))
            .attachment_lines(3)
            .focused(true)
            .disabled(false);

        // Assert
        assert_eq!(prompt.title, " Prompt ");
        assert_eq!(prompt.placeholder, "Ask something");
        assert_eq!(prompt.command, Some("/dev"));
        assert_eq!(prompt.attachment_lines, 3);
        assert!(prompt.is_focused);
        assert!(!prompt.is_disabled);
    }

    #[test]
    fn test_render_empty_prompt_shows_placeholder() {
        // Arrange
        let backend = TestBackend::new(50, 3);
        let mut terminal = Terminal::new(backend).expect("failed to create terminal");
        let document = PromptDocument::new();
        let prompt = PromptInputBox::new(" Prompt ", &document)
            .placeholder("Ask something")
            .focused(true);

        // Act
        terminal
            .draw(|f| {
                let area = f.area();
                prompt.render(f, area);
            })
            .expect("failed to draw");

        // Assert
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect();
        assert!(text.contains("Ask something"));
        assert!(text.contains("Prompt"));
    }

    #[test]
    fn test_render_places_cursor_after_text() {
        // Arrange
        let backend = TestBackend::new(30, 3);
        let mut terminal = Terminal::new(backend).expect("failed to create terminal");
        let document = PromptDocument::with_text("abc");
        let prompt = PromptInputBox::new(" Prompt ", &document)
            .command(Some("/dev"))
            .focused(true);

        // Act
        terminal
            .draw(|f| {
                let area = f.area();
                prompt.render(f, area);
            })
            .expect("failed to draw");

        // Assert
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect();
        assert!(text.contains("abc"));
        assert!(text.contains("/dev"));
        assert_eq!(
            terminal
                .get_cursor_position()
                .expect("cursor position should be readable"),
            Position::new(1 + 3 + 3, 1)
        );
    }
}
