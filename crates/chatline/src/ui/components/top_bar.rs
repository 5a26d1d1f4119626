use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::top_bar::PromptTopBar;
use crate::ui::Component;

/// One-line bar of pinned context items above the prompt.
pub struct TopBarLine<'a> {
    top_bar: &'a PromptTopBar,
}

impl<'a> TopBarLine<'a> {
    pub fn new(top_bar: &'a PromptTopBar) -> Self {
        Self { top_bar }
    }
}

impl Component for TopBarLine<'_> {
    fn render(&self, f: &mut Frame, area: Rect) {
        if self.top_bar.is_hidden() {
            return;
        }

        let mut spans = vec![Span::styled(
            format!(" {} ", self.top_bar.title()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )];
        for item in self.top_bar.context_items() {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                format!("@{}", item.command),
                Style::default().fg(Color::Black).bg(Color::Gray),
            ));
        }
        if let Some(button) = self.top_bar.button() {
            let text = button.text.as_deref().unwrap_or(&button.id);
            spans.push(Span::styled(
                format!("  [{text}]"),
                Style::default().fg(Color::Yellow),
            ));
        }

        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
