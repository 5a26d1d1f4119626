use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Non-breaking space kept after every inserted pill.
pub const PILL_TRAILING_SPACE: char = '\u{a0}';

/// Atomic inline reference to a selected context item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextPill {
    /// Identifier generated at insertion time, unique per prompt input.
    pub temporary_id: String,
    /// Command text without the leading `@`.
    pub command: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub pinnable: bool,
}

impl ContextPill {
    /// Returns the pill length in logical characters, counting the `@`.
    pub fn logical_len(&self) -> usize {
        1 + self.command.chars().count()
    }

    /// Returns the pill as it appears in the logical text.
    pub fn display_text(&self) -> String {
        format!("@{}", self.command)
    }
}

/// One run of the prompt document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Pill(ContextPill),
}

impl Segment {
    /// Returns the segment length in logical characters.
    pub fn logical_len(&self) -> usize {
        match self {
            Segment::Text(text) => text.chars().count(),
            Segment::Pill(pill) => pill.logical_len(),
        }
    }
}

/// Segment-relative position inside a document.
///
/// For text runs `offset` counts characters into the run. For pills it is
/// `0` (before the pill) or `1` (after the pill).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentPointer {
    pub segment: usize,
    pub offset: usize,
}

/// Visual placement of the cursor used to gate history navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorPosition {
    /// One-based visual line holding the cursor.
    pub cursor_line: usize,
    pub total_lines: usize,
    pub is_at_the_beginning: bool,
    pub is_at_the_end: bool,
}

/// Renderable unit of a wrapped document line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutUnit<'a> {
    Char(char),
    Pill(&'a ContextPill),
}

/// Document wrapped into visual lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentLayout<'a> {
    pub lines: Vec<Vec<LayoutUnit<'a>>>,
    /// Zero-based visual line of the cursor.
    pub cursor_line: usize,
    /// Display column of the cursor on its line.
    pub cursor_column: usize,
}

/// Editable prompt content made of text runs and atomic context pills.
///
/// Offsets are measured in logical characters where a pill counts as
/// `@command`. The cursor never rests inside a pill.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptDocument {
    cursor: usize,
    segments: Vec<Segment>,
    selection_anchor: Option<usize>,
}

impl PromptDocument {
    /// Creates an empty document with the cursor at position `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a plain-text document with the cursor at the end.
    pub fn with_text(text: &str) -> Self {
        let mut document = Self::new();
        document.set_text(text);

        document
    }

    /// Returns the ordered segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the cursor offset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns the logical length of the document.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Segment::logical_len).sum()
    }

    /// Returns whether the document holds neither text nor pills.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the logical text with pills rendered as `@command`.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(run) => text.push_str(run),
                Segment::Pill(pill) => {
                    text.push('@');
                    text.push_str(&pill.command);
                }
            }
        }

        text
    }

    /// Returns the logical text inside `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> String {
        self.text()
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }

    /// Returns the logical character at `offset`, if any.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.text().chars().nth(offset)
    }

    /// Returns pills in document order.
    pub fn pills(&self) -> impl Iterator<Item = &ContextPill> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Pill(pill) => Some(pill),
            Segment::Text(_) => None,
        })
    }

    /// Returns pill ids in document order.
    pub fn pill_ids(&self) -> Vec<&str> {
        self.pills().map(|pill| pill.temporary_id.as_str()).collect()
    }

    /// Moves the cursor to `offset`, clamped and pushed past any pill.
    pub fn set_cursor(&mut self, offset: usize) {
        self.selection_anchor = None;
        self.cursor = self.snap_forward(offset.min(self.len()));
    }

    /// Returns the active selection as an ordered `(start, end)` range.
    pub fn selection(&self) -> Option<(usize, usize)> {
        let anchor = self.selection_anchor?;
        if anchor == self.cursor {
            return None;
        }

        Some((anchor.min(self.cursor), anchor.max(self.cursor)))
    }

    /// Selects `[start, end)`, widened to whole pills.
    pub fn select_range(&mut self, start: usize, end: usize) {
        let len = self.len();
        self.selection_anchor = Some(self.snap_backward(start.min(len)));
        self.cursor = self.snap_forward(end.min(len));
    }

    /// Selects the whole document.
    pub fn select_all(&mut self) {
        if self.is_empty() {
            return;
        }

        self.selection_anchor = Some(0);
        self.cursor = self.len();
    }

    /// Returns whether the entire non-empty document is selected.
    pub fn is_all_selected(&self) -> bool {
        !self.is_empty() && self.selection() == Some((0, self.len()))
    }

    /// Drops the selection anchor without moving the cursor.
    pub fn clear_selection(&mut self) {
        self.selection_anchor = None;
    }

    /// Inserts one character at the cursor, replacing any selection.
    pub fn insert_char(&mut self, ch: char) {
        let mut buffer = [0; 4];
        self.insert_text(ch.encode_utf8(&mut buffer));
    }

    /// Inserts `text` at the cursor, replacing any selection, and moves the
    /// cursor to the end of the inserted content.
    pub fn insert_text(&mut self, text: &str) {
        self.delete_selection();
        if text.is_empty() {
            return;
        }

        let offset = self.insert_at(self.cursor, Segment::Text(text.to_string()));
        self.cursor = offset + text.chars().count();
    }

    /// Splices `segment` in at `offset`, splitting a text run when needed.
    ///
    /// Offsets inside a pill resolve to the position after it. Returns the
    /// offset actually used. A cursor past that offset shifts right.
    pub fn insert_at(&mut self, offset: usize, segment: Segment) -> usize {
        let inserted_len = segment.logical_len();
        let (index, offset) = self.split_at(offset);
        self.segments.insert(index, segment);
        if self.cursor > offset {
            self.cursor += inserted_len;
        }
        self.normalize();

        offset
    }

    /// Inserts `pill` at `position`, replacing `[position, cursor)` when the
    /// cursor is past `position`.
    ///
    /// A trailing non-breaking space is added unless whitespace already
    /// follows the pill. The cursor lands after that whitespace.
    pub fn insert_pill(&mut self, pill: ContextPill, position: usize) {
        self.selection_anchor = None;
        let pill_len = pill.logical_len();

        if self.segments.is_empty() {
            self.segments.push(Segment::Pill(pill));
            self.segments
                .push(Segment::Text(PILL_TRAILING_SPACE.to_string()));
            self.cursor = pill_len + 1;

            return;
        }

        let position = position.min(self.len());
        if self.cursor > position {
            self.delete_range(position, self.cursor);
        }

        let (index, offset) = self.split_at(position);
        self.segments.insert(index, Segment::Pill(pill));
        let after_pill = offset + pill_len;
        if !self.char_at(after_pill).is_some_and(char::is_whitespace) {
            self.segments
                .insert(index + 1, Segment::Text(PILL_TRAILING_SPACE.to_string()));
        }
        self.normalize();
        self.cursor = after_pill + 1;
    }

    /// Removes `[start, end)`. Pills touched by the range are removed whole.
    pub fn delete_range(&mut self, start: usize, end: usize) {
        let len = self.len();
        let (mut start, mut end) = (start.min(len), end.min(len));
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        if start == end {
            return;
        }

        let mut position = 0;
        for segment in &self.segments {
            let segment_len = segment.logical_len();
            if matches!(segment, Segment::Pill(_)) && position < end && position + segment_len > start
            {
                start = start.min(position);
                end = end.max(position + segment_len);
            }
            position += segment_len;
        }

        let mut kept = Vec::with_capacity(self.segments.len());
        let mut position = 0;
        for segment in self.segments.drain(..) {
            let segment_start = position;
            let segment_end = position + segment.logical_len();
            position = segment_end;

            if segment_end <= start || segment_start >= end {
                kept.push(segment);

                continue;
            }

            if let Segment::Text(run) = segment {
                let remaining: String = run
                    .chars()
                    .enumerate()
                    .filter(|(index, _)| {
                        let offset = segment_start + index;

                        offset < start || offset >= end
                    })
                    .map(|(_, ch)| ch)
                    .collect();
                kept.push(Segment::Text(remaining));
            }
        }
        self.segments = kept;

        if self.cursor >= end {
            self.cursor -= end - start;
        } else if self.cursor > start {
            self.cursor = start;
        }
        self.selection_anchor = None;
        self.normalize();
    }

    /// Removes the active selection. Returns whether anything was removed.
    pub fn delete_selection(&mut self) -> bool {
        let Some((start, end)) = self.selection() else {
            self.selection_anchor = None;

            return false;
        };
        self.delete_range(start, end);

        true
    }

    /// Deletes the selection or the unit immediately before the cursor.
    pub fn delete_backward(&mut self) {
        if self.delete_selection() || self.cursor == 0 {
            return;
        }

        self.delete_range(self.cursor - 1, self.cursor);
    }

    /// Deletes the selection or the unit at the cursor.
    pub fn delete_forward(&mut self) {
        if self.delete_selection() {
            return;
        }

        self.delete_range(self.cursor, self.cursor + 1);
    }

    /// Removes the first occurrence of `keyword` inside a text run.
    ///
    /// Returns the offset where the keyword started.
    pub fn remove_first(&mut self, keyword: &str) -> Option<usize> {
        let keyword_len = keyword.chars().count();
        if keyword_len == 0 {
            return None;
        }

        let mut position = 0;
        let mut found = None;
        for segment in &self.segments {
            if let Segment::Text(run) = segment
                && let Some(byte_index) = run.find(keyword)
            {
                found = Some(position + run[..byte_index].chars().count());

                break;
            }
            position += segment.logical_len();
        }

        let start = found?;
        self.delete_range(start, start + keyword_len);

        Some(start)
    }

    /// Moves the cursor one unit to the left, skipping whole pills.
    pub fn move_left(&mut self) {
        self.selection_anchor = None;
        self.cursor = self.snap_backward(self.cursor.saturating_sub(1));
    }

    /// Moves the cursor one unit to the right, skipping whole pills.
    pub fn move_right(&mut self) {
        self.selection_anchor = None;
        self.cursor = self.snap_forward((self.cursor + 1).min(self.len()));
    }

    /// Moves the cursor to the start of the document.
    pub fn move_home(&mut self) {
        self.selection_anchor = None;
        self.cursor = 0;
    }

    /// Moves the cursor to the end of the document.
    pub fn move_end(&mut self) {
        self.selection_anchor = None;
        self.cursor = self.len();
    }

    /// Moves the cursor to the previous hard line while preserving column.
    pub fn move_up(&mut self) {
        self.selection_anchor = None;
        let chars: Vec<char> = self.text().chars().collect();
        let (line, column) = line_column(&chars, self.cursor);
        if line == 0 {
            self.cursor = 0;

            return;
        }

        let previous_start = nth_line_start(&chars, line - 1);
        let previous_len = line_len(&chars, previous_start);
        self.cursor = self.snap_backward(previous_start + column.min(previous_len));
    }

    /// Moves the cursor to the next hard line while preserving column.
    pub fn move_down(&mut self) {
        self.selection_anchor = None;
        let chars: Vec<char> = self.text().chars().collect();
        let (line, column) = line_column(&chars, self.cursor);
        let line_count = chars.iter().filter(|&&ch| ch == '\n').count() + 1;
        if line + 1 >= line_count {
            self.cursor = chars.len();

            return;
        }

        let next_start = nth_line_start(&chars, line + 1);
        let next_len = line_len(&chars, next_start);
        self.cursor = self.snap_backward(next_start + column.min(next_len));
    }

    /// Replaces the whole document with plain `text`, cursor at the end.
    pub fn set_text(&mut self, text: &str) {
        self.segments.clear();
        if !text.is_empty() {
            self.segments.push(Segment::Text(text.to_string()));
        }
        self.selection_anchor = None;
        self.cursor = self.len();
    }

    /// Removes all content.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.selection_anchor = None;
        self.cursor = 0;
    }

    /// Converts a segment pointer into a logical offset.
    pub fn offset_of(&self, pointer: DocumentPointer) -> usize {
        let before: usize = self
            .segments
            .iter()
            .take(pointer.segment)
            .map(Segment::logical_len)
            .sum();

        match self.segments.get(pointer.segment) {
            Some(Segment::Text(run)) => before + pointer.offset.min(run.chars().count()),
            Some(Segment::Pill(pill)) if pointer.offset > 0 => before + pill.logical_len(),
            Some(Segment::Pill(_)) | None => before,
        }
    }

    /// Converts a logical offset into a segment pointer.
    pub fn pointer_at(&self, offset: usize) -> DocumentPointer {
        let mut position = 0;
        for (index, segment) in self.segments.iter().enumerate() {
            let segment_len = segment.logical_len();
            match segment {
                Segment::Text(_) if offset <= position + segment_len => {
                    return DocumentPointer {
                        segment: index,
                        offset: offset - position,
                    };
                }
                Segment::Pill(_) if offset < position + segment_len => {
                    return DocumentPointer {
                        segment: index,
                        offset: usize::from(offset > position),
                    };
                }
                _ => {}
            }
            position += segment_len;
        }

        DocumentPointer {
            segment: self.segments.len(),
            offset: 0,
        }
    }

    /// Wraps the document into visual lines no wider than `wrap_width`
    /// columns. A width of `0` disables soft wrapping.
    pub fn layout(&self, wrap_width: usize) -> DocumentLayout<'_> {
        let mut builder = LayoutBuilder::new(wrap_width);
        let mut position = 0;

        for segment in &self.segments {
            match segment {
                Segment::Pill(pill) => {
                    builder.push(
                        LayoutUnit::Pill(pill),
                        pill.display_text().width(),
                        position == self.cursor,
                    );
                    position += pill.logical_len();
                }
                Segment::Text(run) => {
                    for ch in run.chars() {
                        if ch == '\n' {
                            builder.break_line(position == self.cursor);
                        } else {
                            builder.push(
                                LayoutUnit::Char(ch),
                                ch.width().unwrap_or(0),
                                position == self.cursor,
                            );
                        }
                        position += 1;
                    }
                }
            }
        }

        builder.finish()
    }

    /// Returns the visual line of the cursor relative to the document.
    ///
    /// The beginning and end flags mean the very first and very last
    /// position, not merely the first or last line.
    pub fn cursor_position(&self, wrap_width: usize) -> CursorPosition {
        let layout = self.layout(wrap_width);

        CursorPosition {
            cursor_line: layout.cursor_line + 1,
            total_lines: layout.lines.len(),
            is_at_the_beginning: self.cursor == 0,
            is_at_the_end: self.cursor == self.len(),
        }
    }

    fn split_at(&mut self, offset: usize) -> (usize, usize) {
        let mut position = 0;
        for index in 0..self.segments.len() {
            if position == offset {
                return (index, offset);
            }

            let segment_len = self.segments[index].logical_len();
            if offset < position + segment_len {
                let tail = match &mut self.segments[index] {
                    Segment::Text(run) => {
                        let byte_index = byte_offset_at(run, offset - position);

                        Some(run.split_off(byte_index))
                    }
                    Segment::Pill(_) => None,
                };

                return match tail {
                    Some(tail) => {
                        self.segments.insert(index + 1, Segment::Text(tail));

                        (index + 1, offset)
                    }
                    None => (index + 1, position + segment_len),
                };
            }
            position += segment_len;
        }

        (self.segments.len(), position)
    }

    fn pill_span_around(&self, offset: usize) -> Option<(usize, usize)> {
        let mut position = 0;
        for segment in &self.segments {
            let segment_len = segment.logical_len();
            if matches!(segment, Segment::Pill(_))
                && position < offset
                && offset < position + segment_len
            {
                return Some((position, position + segment_len));
            }
            position += segment_len;
        }

        None
    }

    fn snap_backward(&self, offset: usize) -> usize {
        self.pill_span_around(offset)
            .map_or(offset, |(start, _)| start)
    }

    fn snap_forward(&self, offset: usize) -> usize {
        self.pill_span_around(offset).map_or(offset, |(_, end)| end)
    }

    fn normalize(&mut self) {
        let mut normalized: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for segment in self.segments.drain(..) {
            match (normalized.last_mut(), segment) {
                (_, Segment::Text(run)) if run.is_empty() => {}
                (Some(Segment::Text(previous)), Segment::Text(run)) => previous.push_str(&run),
                (_, segment) => normalized.push(segment),
            }
        }
        self.segments = normalized;

        let len = self.len();
        self.cursor = self.cursor.min(len);
        if let Some(anchor) = self.selection_anchor {
            self.selection_anchor = Some(anchor.min(len));
        }
    }
}

struct LayoutBuilder<'a> {
    column: usize,
    cursor: Option<(usize, usize)>,
    lines: Vec<Vec<LayoutUnit<'a>>>,
    wrap_width: usize,
}

impl<'a> LayoutBuilder<'a> {
    fn new(wrap_width: usize) -> Self {
        Self {
            column: 0,
            cursor: None,
            lines: vec![Vec::new()],
            wrap_width,
        }
    }

    fn push(&mut self, unit: LayoutUnit<'a>, unit_width: usize, is_cursor: bool) {
        if self.wrap_width > 0 && self.column > 0 && self.column + unit_width > self.wrap_width {
            self.lines.push(Vec::new());
            self.column = 0;
        }
        if is_cursor {
            self.mark_cursor();
        }
        if let Some(line) = self.lines.last_mut() {
            line.push(unit);
        }
        self.column += unit_width;
    }

    fn break_line(&mut self, is_cursor: bool) {
        if is_cursor {
            self.mark_cursor();
        }
        self.lines.push(Vec::new());
        self.column = 0;
    }

    fn mark_cursor(&mut self) {
        if self.cursor.is_none() {
            self.cursor = Some((self.lines.len().saturating_sub(1), self.column));
        }
    }

    fn finish(mut self) -> DocumentLayout<'a> {
        self.mark_cursor();
        let (cursor_line, cursor_column) = self.cursor.unwrap_or_default();

        DocumentLayout {
            lines: self.lines,
            cursor_line,
            cursor_column,
        }
    }
}

fn byte_offset_at(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(index, _)| index)
}

fn line_column(chars: &[char], cursor: usize) -> (usize, usize) {
    let mut line = 0;
    let mut column = 0;

    for &ch in chars.iter().take(cursor) {
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }

    (line, column)
}

fn nth_line_start(chars: &[char], line: usize) -> usize {
    if line == 0 {
        return 0;
    }

    let mut current_line = 0;
    for (index, &ch) in chars.iter().enumerate() {
        if ch == '\n' {
            current_line += 1;
            if current_line == line {
                return index + 1;
            }
        }
    }

    chars.len()
}

fn line_len(chars: &[char], line_start: usize) -> usize {
    chars
        .iter()
        .skip(line_start)
        .take_while(|&&ch| ch != '\n')
        .count()
}
