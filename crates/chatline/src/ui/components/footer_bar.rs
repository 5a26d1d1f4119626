use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use serde_json::Value;

use crate::app::prompt_controls::PromptControls;
use crate::ui::Component;

/// Characters used against the budget, shown once past the warning
/// threshold.
pub struct CharacterCount {
    pub max: usize,
    pub used: usize,
}

/// Controls line under the prompt: options, buttons, progress, send/stop
/// and the character indicator.
pub struct FooterBar<'a> {
    character_count: Option<CharacterCount>,
    controls: &'a PromptControls,
    send_text: &'a str,
    stop_text: &'a str,
}

impl<'a> FooterBar<'a> {
    pub fn new(controls: &'a PromptControls, send_text: &'a str, stop_text: &'a str) -> Self {
        Self {
            character_count: None,
            controls,
            send_text,
            stop_text,
        }
    }

    #[must_use]
    pub fn character_count(mut self, character_count: Option<CharacterCount>) -> Self {
        self.character_count = character_count;
        self
    }

    fn left_spans(&self) -> Vec<Span<'static>> {
        let mut spans = vec![Span::raw(" ")];

        for option in self.controls.options() {
            let title = option.title.as_deref().unwrap_or(&option.id);
            let value = match &option.value {
                Value::Bool(true) => "on".to_string(),
                Value::Bool(false) => "off".to_string(),
                Value::String(value) => value.clone(),
                Value::Null => "-".to_string(),
                value => value.to_string(),
            };
            spans.push(Span::styled(
                format!("{title}: {value}  "),
                Style::default().fg(Color::Gray),
            ));
        }

        for button in self.controls.buttons() {
            let text = button.text.as_deref().unwrap_or(&button.id);
            let style = if button.disabled {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Yellow)
            };
            spans.push(Span::styled(format!("[{text}] "), style));
        }

        if let Some(progress) = self.controls.progress() {
            let text = progress.text.as_deref().unwrap_or_default();
            let value = match progress.value {
                Some(value) if value >= 0 => format!(" {}%", value.min(100)),
                Some(_) => " …".to_string(),
                None => String::new(),
            };
            spans.push(Span::styled(
                format!("{text}{value} "),
                Style::default().fg(Color::Magenta),
            ));
        }

        spans
    }

    fn right_spans(&self) -> Vec<Span<'static>> {
        let mut spans = Vec::new();

        if let Some(count) = &self.character_count {
            let style = if count.used >= count.max {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Yellow)
            };
            spans.push(Span::styled(format!("{}/{}  ", count.used, count.max), style));
        }

        if self.controls.is_stop_visible() {
            spans.push(Span::styled(
                format!("[{}] ", self.stop_text),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        } else {
            let style = if self.controls.is_loading() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            };
            spans.push(Span::styled(format!("[{}] ", self.send_text), style));
        }

        spans
    }
}

impl Component for FooterBar<'_> {
    fn render(&self, f: &mut Frame, area: Rect) {
        let mut spans = self.left_spans();
        let right_spans = self.right_spans();
        let left_width: usize = spans.iter().map(Span::width).sum();
        let right_width: usize = right_spans.iter().map(Span::width).sum();
        let padding = usize::from(area.width).saturating_sub(left_width + right_width);

        spans.push(Span::raw(" ".repeat(padding)));
        spans.extend(right_spans);

        let footer = Paragraph::new(Line::from(spans))
            .style(Style::default().bg(Color::DarkGray).fg(Color::White));
        f.render_widget(footer, area);
    }
}
