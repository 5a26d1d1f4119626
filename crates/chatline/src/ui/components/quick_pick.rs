use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::domain::command::QuickActionCommand;
use crate::domain::quick_pick::highlight_match;
use crate::ui::Component;
use crate::ui::state::overlay::QuickPickView;
use crate::ui::state::quick_pick::QuickPickMode;

/// Command or context dropdown rendered above the prompt input.
pub struct QuickPickList<'a> {
    no_matches: &'a str,
    view: &'a QuickPickView,
}

impl<'a> QuickPickList<'a> {
    pub fn new(view: &'a QuickPickView, no_matches: &'a str) -> Self {
        Self { no_matches, view }
    }

    /// Returns the bordered height needed to list every row, capped at
    /// `max_height`.
    pub fn height(&self, max_height: u16) -> u16 {
        let (rows, _) = self.rows();

        u16::try_from(rows.len())
            .unwrap_or(u16::MAX)
            .saturating_add(2)
            .min(max_height)
    }

    fn title(&self) -> &'static str {
        match self.view.mode {
            QuickPickMode::QuickAction => " Quick actions ",
            QuickPickMode::Context => " Context ",
        }
    }

    /// Builds every row and the row index of the highlighted command.
    fn rows(&self) -> (Vec<Line<'static>>, Option<usize>) {
        let mut rows = Vec::new();
        let mut target_row = None;

        if let Some(header) = self.view.header.as_ref().filter(|header| header.has_content()) {
            if let Some(title) = &header.title {
                rows.push(Line::from(Span::styled(
                    title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
            }
            if let Some(description) = &header.description {
                rows.push(Line::from(Span::styled(
                    description.clone(),
                    Style::default().fg(Color::Gray),
                )));
            }
            if let Some(status) = &header.status {
                rows.push(Line::from(Span::styled(
                    status.clone(),
                    Style::default().fg(Color::Yellow),
                )));
            }
        }

        let mut command_index = 0;
        for group in &self.view.groups {
            let group_name = group
                .group_name
                .as_deref()
                .map(|name| name.trim_start_matches('#').trim())
                .filter(|name| !name.is_empty());
            if group_name.is_some() || !group.actions.is_empty() {
                let mut spans = vec![Span::styled(
                    group_name.unwrap_or_default().to_string(),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                )];
                for action in &group.actions {
                    let text = action.text.as_deref().unwrap_or(&action.id);
                    spans.push(Span::styled(
                        format!("  [{text}]"),
                        Style::default().fg(Color::Yellow),
                    ));
                }
                rows.push(Line::from(spans));
            }

            for command in &group.commands {
                let is_selected = self.view.target == Some(command_index);
                if is_selected {
                    target_row = Some(rows.len());
                }
                rows.push(self.command_row(command, is_selected));
                command_index += 1;
            }
        }

        if command_index == 0 {
            rows.push(Line::from(Span::styled(
                self.no_matches.to_string(),
                Style::default().fg(Color::DarkGray),
            )));
        }

        (rows, target_row)
    }

    fn command_row(&self, command: &QuickActionCommand, is_selected: bool) -> Line<'static> {
        let prefix = if is_selected { ">" } else { " " };
        let label_style = if command.disabled {
            Style::default().fg(Color::DarkGray)
        } else if is_selected {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let description_style = if is_selected {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let mut spans = vec![Span::styled(format!("{prefix} "), label_style)];
        let label = command.label.as_deref().unwrap_or(&command.command);
        for segment in highlight_match(label, &self.view.search_term) {
            let style = if segment.is_match {
                label_style.add_modifier(Modifier::UNDERLINED)
            } else {
                label_style
            };
            spans.push(Span::styled(segment.text, style));
        }
        if command.has_children() {
            spans.push(Span::styled(" \u{203a}", label_style));
        }

        let description = if command.disabled {
            command.disabled_text.as_deref()
        } else {
            command.description.as_deref()
        };
        if let Some(description) = description {
            spans.push(Span::styled(format!("  {description}"), description_style));
        }

        Line::from(spans)
    }
}

impl Component for QuickPickList<'_> {
    fn render(&self, f: &mut Frame, area: Rect) {
        let (rows, target_row) = self.rows();
        let inner_height = usize::from(area.height.saturating_sub(2));
        let scroll_offset = target_row
            .map_or(0, |row| (row + 1).saturating_sub(inner_height))
            .min(rows.len().saturating_sub(inner_height));

        let dropdown = Paragraph::new(rows)
            .scroll((u16::try_from(scroll_offset).unwrap_or(u16::MAX), 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(Span::styled(self.title(), Style::default().fg(Color::Cyan))),
            );

        f.render_widget(Clear, area);
        f.render_widget(dropdown, area);
    }
}
