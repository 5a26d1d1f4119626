use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::domain::document::{LayoutUnit, PILL_TRAILING_SPACE, PromptDocument};

/// Prefix drawn before the first prompt line.
pub const PROMPT_PREFIX: &str = " › ";
/// Maximum number of visible prompt lines before the input scrolls.
pub const PROMPT_MAX_VISIBLE_LINES: u16 = 8;

/// Wrapped prompt lines with the cursor placement inside them.
pub struct PromptLayout {
    pub cursor_x: u16,
    pub cursor_y: u16,
    pub lines: Vec<Line<'static>>,
}

/// Returns the width available for prompt text inside a bordered block of
/// `area_width` columns.
pub fn prompt_wrap_width(area_width: u16) -> usize {
    usize::from(area_width.saturating_sub(2)).saturating_sub(PROMPT_PREFIX.width())
}

/// Renders `document` into styled lines, pills highlighted, and locates
/// the cursor relative to the block interior.
pub fn compute_prompt_layout(document: &PromptDocument, area_width: u16) -> PromptLayout {
    let layout = document.layout(prompt_wrap_width(area_width));
    let prefix_width = PROMPT_PREFIX.width();
    let pill_style = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let lines = layout
        .lines
        .iter()
        .enumerate()
        .map(|(index, units)| {
            let lead = if index == 0 {
                Span::styled(
                    PROMPT_PREFIX,
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::raw(" ".repeat(prefix_width))
            };
            let mut spans = vec![lead];
            let mut text = String::new();
            for unit in units {
                match unit {
                    LayoutUnit::Char(ch) => {
                        text.push(if *ch == PILL_TRAILING_SPACE { ' ' } else { *ch });
                    }
                    LayoutUnit::Pill(pill) => {
                        if !text.is_empty() {
                            spans.push(Span::raw(std::mem::take(&mut text)));
                        }
                        spans.push(Span::styled(pill.display_text(), pill_style));
                    }
                }
            }
            if !text.is_empty() {
                spans.push(Span::raw(text));
            }

            Line::from(spans)
        })
        .collect();

    PromptLayout {
        cursor_x: u16::try_from(prefix_width + layout.cursor_column).unwrap_or(u16::MAX),
        cursor_y: u16::try_from(layout.cursor_line).unwrap_or(u16::MAX),
        lines,
    }
}

/// Returns the bordered prompt height for `line_count` wrapped lines.
pub fn prompt_height(line_count: usize) -> u16 {
    u16::try_from(line_count)
        .unwrap_or(u16::MAX)
        .clamp(1, PROMPT_MAX_VISIBLE_LINES)
        .saturating_add(2)
}

/// Calculates the scroll offset and the visible cursor row so the cursor
/// stays inside a viewport of `viewport_height` lines.
pub fn calculate_input_viewport(
    total_line_count: usize,
    cursor_y: u16,
    viewport_height: u16,
) -> (u16, u16) {
    if viewport_height == 0 {
        return (0, 0);
    }

    let total_line_count = u16::try_from(total_line_count).unwrap_or(u16::MAX);
    let max_scroll = total_line_count.saturating_sub(viewport_height);
    let scroll_offset = cursor_y
        .saturating_sub(viewport_height.saturating_sub(1))
        .min(max_scroll);

    (scroll_offset, cursor_y.saturating_sub(scroll_offset))
}

/// Word-wraps `text` into lines no wider than `width` display columns.
///
/// Explicit newlines are kept and words longer than `width` stay whole.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut wrapped = Vec::new();
    for line in text.split('\n') {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            wrapped.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        let mut current_width = 0;
        for word in words {
            let word_width = word.width();
            let space_width = usize::from(current_width != 0);
            if current_width + space_width + word_width > width && !current_line.is_empty() {
                wrapped.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }
            current_line.push_str(word);
            current_width += word_width;
        }
        if !current_line.is_empty() {
            wrapped.push(current_line);
        }
    }

    wrapped
}

/// Truncates `text` to `max_width` display columns, appending `…` when cut.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    let mut truncated = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        truncated.push(ch);
        width += ch_width;
    }
    truncated.push('…');

    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{ContextPill, Segment};

    #[test]
    fn test_compute_prompt_layout_places_cursor_after_prefix() {
        // Arrange
        let document = PromptDocument::with_text("hello");

        // Act
        let layout = compute_prompt_layout(&document, 40);

        // Assert
        assert_eq!(layout.lines.len(), 1);
        assert_eq!(layout.cursor_x, 3 + 5);
        assert_eq!(layout.cursor_y, 0);
    }

    #[test]
    fn test_compute_prompt_layout_styles_pills() {
        // Arrange
        let mut document = PromptDocument::new();
        document.insert_pill(
            ContextPill {
                temporary_id: "p1".to_string(),
                command: "file.ts".to_string(),
                icon: None,
                description: None,
                pinnable: false,
            },
            0,
        );
        document.insert_at(document.len(), Segment::Text("x".to_string()));

        // Act
        let layout = compute_prompt_layout(&document, 40);

        // Assert
        let spans = &layout.lines[0].spans;
        assert_eq!(spans[1].content, "@file.ts");
        assert_eq!(spans[1].style.bg, Some(Color::Cyan));
        assert_eq!(spans[2].content, " x");
    }

    #[test]
    fn test_compute_prompt_layout_wraps_long_input() {
        // Arrange
        let document = PromptDocument::with_text(&"a".repeat(30));

        // Act
        let layout = compute_prompt_layout(&document, 15);

        // Assert
        assert_eq!(layout.lines.len(), 3);
        assert_eq!(layout.cursor_y, 2);
    }

    #[test]
    fn test_calculate_input_viewport_keeps_cursor_visible() {
        // Arrange
        let total_line_count = 12;

        // Act
        let top = calculate_input_viewport(total_line_count, 0, 8);
        let bottom = calculate_input_viewport(total_line_count, 11, 8);

        // Assert
        assert_eq!(top, (0, 0));
        assert_eq!(bottom, (4, 7));
    }

    #[test]
    fn test_prompt_height_is_clamped() {
        // Arrange
        let line_counts = [0, 3, 50];

        // Act
        let heights = line_counts.map(prompt_height);

        // Assert
        assert_eq!(heights, [3, 5, 10]);
    }

    #[test]
    fn test_wrap_text_breaks_on_words_and_keeps_blank_lines() {
        // Arrange
        let text = "one two three\n\nfour";

        // Act
        let lines = wrap_text(text, 8);

        // Assert
        assert_eq!(lines, vec!["one two", "three", "", "four"]);
    }

    #[test]
    fn test_truncate_to_width_appends_ellipsis() {
        // Arrange
        let text = "a long description";

        // Act
        let truncated = truncate_to_width(text, 7);

        // Assert
        assert_eq!(truncated, "a long…");
        assert_eq!(truncate_to_width("short", 7), "short");
    }
}
