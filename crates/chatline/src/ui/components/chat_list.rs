use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::chat_wrapper::ChatCard;
use crate::domain::chat_item::ChatItemType;
use crate::infra::event_bus::Vote;
use crate::ui::Component;
use crate::ui::util::wrap_text;

const STREAM_CURSOR: &str = "\u{258d}"; // ▍

/// Conversation panel of the selected tab.
pub struct ChatList<'a> {
    groups: Vec<Vec<&'a ChatCard>>,
    is_scroll_snapped: bool,
    thanks_for_voting: &'a str,
}

impl<'a> ChatList<'a> {
    pub fn new(groups: Vec<Vec<&'a ChatCard>>, thanks_for_voting: &'a str) -> Self {
        Self {
            groups,
            is_scroll_snapped: false,
            thanks_for_voting,
        }
    }

    /// Keeps the latest conversation turn pinned to the top of the panel.
    #[must_use]
    pub fn scroll_snapped(mut self, is_scroll_snapped: bool) -> Self {
        self.is_scroll_snapped = is_scroll_snapped;
        self
    }

    /// Builds the wrapped lines and the line index each group starts at.
    fn output_lines(&self, inner_width: usize) -> (Vec<Line<'static>>, Vec<usize>) {
        let mut lines = Vec::new();
        let mut group_starts = Vec::with_capacity(self.groups.len());

        for group in &self.groups {
            group_starts.push(lines.len());
            for card in group {
                lines.extend(self.card_lines(card, inner_width));
                lines.push(Line::from(""));
            }
        }

        (lines, group_starts)
    }

    fn card_lines(&self, card: &ChatCard, inner_width: usize) -> Vec<Line<'static>> {
        let item = &card.item;
        let (label, label_color) = match item.item_type {
            ChatItemType::Prompt => ("You", Color::Cyan),
            ChatItemType::SystemPrompt => ("System", Color::Magenta),
            ChatItemType::AiPrompt => ("Assistant prompt", Color::Yellow),
            ChatItemType::Directive => ("", Color::DarkGray),
            ChatItemType::Answer
            | ChatItemType::AnswerStream
            | ChatItemType::AnswerPart
            | ChatItemType::CodeResult => ("Assistant", Color::Green),
        };

        let mut lines = Vec::new();
        if !label.is_empty() {
            let mut header = vec![Span::styled(
                label,
                Style::default()
                    .fg(label_color)
                    .add_modifier(Modifier::BOLD),
            )];
            if let Some(title) = item.title.as_deref().filter(|title| !title.is_empty()) {
                header.push(Span::styled(
                    format!("  {title}"),
                    Style::default().fg(Color::Gray),
                ));
            }
            lines.push(Line::from(header));
        }

        let body_style = if item.item_type == ChatItemType::Directive {
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC)
        } else {
            Style::default()
        };
        let body = item.body.as_deref().unwrap_or_default();
        if !body.is_empty() {
            lines.extend(
                wrap_text(body, inner_width)
                    .into_iter()
                    .map(|line| Line::from(Span::styled(line, body_style))),
            );
        }

        if !card.is_stream_ended {
            lines.push(Line::from(Span::styled(
                STREAM_CURSOR,
                Style::default().fg(Color::Green),
            )));
        }

        if let Some(vote) = card.vote_confirmation {
            let icon = match vote {
                Vote::Upvote => "+",
                Vote::Downvote => "-",
            };
            lines.push(Line::from(Span::styled(
                format!("[{icon}] {}", self.thanks_for_voting),
                Style::default().fg(Color::DarkGray),
            )));
        } else if item.can_be_voted && card.is_stream_ended {
            lines.push(Line::from(Span::styled(
                "[+] Helpful  [-] Not helpful",
                Style::default().fg(Color::DarkGray),
            )));
        }

        lines
    }

    fn scroll_offset(&self, line_count: usize, group_starts: &[usize], inner_height: usize) -> u16 {
        let bottom_offset = line_count.saturating_sub(inner_height);
        let offset = if self.is_scroll_snapped {
            group_starts
                .last()
                .map_or(bottom_offset, |start| (*start).min(bottom_offset))
        } else {
            bottom_offset
        };

        u16::try_from(offset).unwrap_or(u16::MAX)
    }
}

impl Component for ChatList<'_> {
    fn render(&self, f: &mut Frame, area: Rect) {
        let inner_width = usize::from(area.width.saturating_sub(2));
        let inner_height = usize::from(area.height.saturating_sub(2));
        let (lines, group_starts) = self.output_lines(inner_width);
        let scroll_offset = self.scroll_offset(lines.len(), &group_starts, inner_height);

        let chat = Paragraph::new(lines).scroll((scroll_offset, 0)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(chat, area);
    }
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::domain::chat_item::ChatItem;

    fn card(item_type: ChatItemType, body: &str, is_stream_ended: bool) -> ChatCard {
        let mut card = ChatCard::from(ChatItem::new(item_type, body).message_id("m"));
        card.is_stream_ended = is_stream_ended;

        card
    }

    fn rendered_text(list: &ChatList<'_>, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("failed to create terminal");
        terminal
            .draw(|f| {
                let area = f.area();
                list.render(f, area);
            })
            .expect("failed to draw");

        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect()
    }

    #[test]
    fn test_chat_list_render_shows_prompt_and_streaming_answer() {
        // Arrange
        let prompt = card(ChatItemType::Prompt, "hello there", true);
        let answer = card(ChatItemType::AnswerStream, "general kenobi", false);
        let list = ChatList::new(vec![vec![&prompt, &answer]], "Thanks");

        // Act
        let text = rendered_text(&list, 40, 12);

        // Assert
        assert!(text.contains("You"));
        assert!(text.contains("hello there"));
        assert!(text.contains("Assistant"));
        assert!(text.contains(STREAM_CURSOR));
    }

    #[test]
    fn test_chat_list_render_shows_vote_confirmation() {
        // Arrange
        let mut answer = card(ChatItemType::Answer, "done", true);
        answer.item.can_be_voted = true;
        answer.vote_confirmation = Some(Vote::Upvote);
        let list = ChatList::new(vec![vec![&answer]], "Thanks for your feedback");

        // Act
        let text = rendered_text(&list, 40, 8);

        // Assert
        assert!(text.contains("[+] Thanks for your feedback"));
        assert!(!text.contains("Not helpful"));
    }

    #[test]
    fn test_scroll_offset_snaps_to_latest_group_start() {
        // Arrange
        let first = card(ChatItemType::Prompt, "first", true);
        let second = card(ChatItemType::Prompt, "second", true);
        let groups = vec![vec![&first], vec![&second]];
        let list = ChatList::new(groups.clone(), "Thanks").scroll_snapped(true);
        let unsnapped = ChatList::new(groups, "Thanks");

        // Act
        let (lines, group_starts) = list.output_lines(20);
        let snapped_offset = list.scroll_offset(lines.len(), &group_starts, 2);
        let bottom_offset = unsnapped.scroll_offset(lines.len(), &group_starts, 2);

        // Assert
        assert_eq!(group_starts, vec![0, 3]);
        assert_eq!(snapped_offset, 3);
        assert_eq!(bottom_offset, 4);
    }
}
