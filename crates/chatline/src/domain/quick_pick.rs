use regex::RegexBuilder;

use crate::domain::command::{QuickActionCommand, QuickActionCommandGroup};

/// Icon used for the synthetic search-result group.
pub const SEARCH_GROUP_ICON: &str = "search";

/// Score of a match on the whole command text.
const SCORE_EXACT: u8 = 100;
const SCORE_PREFIX: u8 = 80;
const SCORE_WORD_START: u8 = 60;
const SCORE_CONTAINS: u8 = 40;
/// Score of a match found only through the regex fallback.
const SCORE_PATTERN: u8 = 20;

/// Piece of a command label split for rendering with highlighted matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightSegment {
    pub text: String,
    pub is_match: bool,
}

/// Filters grouped commands by `search_term`.
///
/// A blank term returns `groups` unchanged. Otherwise every command, including
/// nested children, is scored against the term and the matches are returned
/// as one search group ordered by score and then command text. The result is
/// stable under repeated filtering with the same term.
pub fn filter_quick_pick_items(
    groups: &[QuickActionCommandGroup],
    search_term: &str,
    hide_search_group_title: bool,
) -> Vec<QuickActionCommandGroup> {
    if search_term.trim().is_empty() {
        return groups.to_vec();
    }

    let pattern = RegexBuilder::new(search_term)
        .case_insensitive(true)
        .build()
        .ok();
    let mut matches: Vec<(u8, QuickActionCommand)> = Vec::new();
    for group in groups {
        for command in &group.commands {
            collect_matches(command, search_term, pattern.as_ref(), &mut matches);
        }
    }

    matches.sort_by(|(left_score, left), (right_score, right)| {
        right_score
            .cmp(left_score)
            .then_with(|| left.command.to_lowercase().cmp(&right.command.to_lowercase()))
            .then_with(|| left.description.cmp(&right.description))
    });

    let commands: Vec<QuickActionCommand> =
        matches.into_iter().map(|(_, command)| command).collect();
    let group_name =
        (!hide_search_group_title).then(|| format!("### {search_term}: ({})", commands.len()));

    vec![QuickActionCommandGroup {
        group_name,
        icon: Some(SEARCH_GROUP_ICON.to_string()),
        actions: Vec::new(),
        commands,
    }]
}

/// Scores `text` against `search_term`; `0` means no match.
///
/// The regex fallback treats the term as a case-insensitive pattern. An
/// invalid pattern never matches.
pub fn calculate_item_score(text: &str, search_term: &str) -> u8 {
    let pattern = RegexBuilder::new(search_term)
        .case_insensitive(true)
        .build()
        .ok();

    score_with_pattern(text, search_term, pattern.as_ref())
}

/// Splits `text` into highlighted and plain pieces for `search_term`.
///
/// Tries an exact, prefix, contains, then in-order character match. Returns
/// one plain piece when nothing matches.
pub fn highlight_match(text: &str, search_term: &str) -> Vec<HighlightSegment> {
    let chars: Vec<char> = text.chars().collect();
    let term: Vec<char> = search_term.to_lowercase().chars().collect();
    if term.is_empty() {
        return vec![plain(text)];
    }

    let lowered: Vec<char> = chars
        .iter()
        .map(|ch| ch.to_lowercase().next().unwrap_or(*ch))
        .collect();
    if let Some(start) = lowered.windows(term.len()).position(|window| window == term) {
        let end = start + term.len();

        return [
            (&chars[..start], false),
            (&chars[start..end], true),
            (&chars[end..], false),
        ]
        .into_iter()
        .filter(|(part, _)| !part.is_empty())
        .map(|(part, is_match)| HighlightSegment {
            text: part.iter().collect(),
            is_match,
        })
        .collect();
    }

    let mut flags = vec![false; chars.len()];
    let mut term_index = 0;
    for (index, ch) in lowered.iter().enumerate() {
        if term_index < term.len() && *ch == term[term_index] {
            flags[index] = true;
            term_index += 1;
        }
    }
    if term_index < term.len() {
        return vec![plain(text)];
    }

    let mut segments: Vec<HighlightSegment> = Vec::new();
    for (ch, is_match) in chars.into_iter().zip(flags) {
        match segments.last_mut() {
            Some(last) if last.is_match == is_match => last.text.push(ch),
            _ => segments.push(HighlightSegment {
                text: ch.to_string(),
                is_match,
            }),
        }
    }

    segments
}

fn collect_matches(
    command: &QuickActionCommand,
    search_term: &str,
    pattern: Option<&regex::Regex>,
    matches: &mut Vec<(u8, QuickActionCommand)>,
) {
    let score = score_with_pattern(&command.command, search_term, pattern);
    if score > 0 && !matches.iter().any(|(_, existing)| existing == command) {
        matches.push((score, command.clone()));
    }

    for child_group in &command.children {
        for child in &child_group.commands {
            collect_matches(child, search_term, pattern, matches);
        }
    }
}

fn score_with_pattern(text: &str, search_term: &str, pattern: Option<&regex::Regex>) -> u8 {
    let normalized_text = text.to_lowercase();
    let normalized_term = search_term.to_lowercase();

    if normalized_text == normalized_term {
        return SCORE_EXACT;
    }
    if normalized_text.starts_with(&normalized_term) {
        return SCORE_PREFIX;
    }
    if normalized_text
        .split(' ')
        .any(|word| word.starts_with(&normalized_term))
    {
        return SCORE_WORD_START;
    }
    if normalized_text.contains(&normalized_term) {
        return SCORE_CONTAINS;
    }
    if pattern.is_some_and(|pattern| pattern.is_match(text)) {
        return SCORE_PATTERN;
    }

    0
}

fn plain(text: &str) -> HighlightSegment {
    HighlightSegment {
        text: text.to_string(),
        is_match: false,
    }
}
