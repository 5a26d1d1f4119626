use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::ui::Component;
use crate::ui::util::truncate_to_width;

const MAX_TAB_TITLE_WIDTH: usize = 24;

/// Title of one open tab.
pub struct TabLabel {
    pub is_loading: bool,
    pub is_selected: bool,
    pub title: String,
}

/// Top status line listing the open tabs.
pub struct TabBar {
    labels: Vec<TabLabel>,
}

impl TabBar {
    pub fn new(labels: Vec<TabLabel>) -> Self {
        Self { labels }
    }
}

impl Component for TabBar {
    fn render(&self, f: &mut Frame, area: Rect) {
        let version = env!("CARGO_PKG_VERSION");
        let mut spans = vec![Span::styled(
            format!(" Chatline v{version} "),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )];

        for (index, label) in self.labels.iter().enumerate() {
            let title = if label.title.is_empty() {
                format!("Chat {}", index + 1)
            } else {
                truncate_to_width(&label.title, MAX_TAB_TITLE_WIDTH)
            };
            let marker = if label.is_loading { " …" } else { "" };
            let style = if label.is_selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };

            spans.push(Span::raw(" "));
            spans.push(Span::styled(format!(" {title}{marker} "), style));
        }

        let tab_bar = Paragraph::new(Line::from(spans))
            .style(Style::default().bg(Color::DarkGray).fg(Color::White));
        f.render_widget(tab_bar, area);
    }
}
