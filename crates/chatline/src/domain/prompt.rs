use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::command::QuickActionCommand;

/// Structured prompt dispatched when the user commits the input.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPrompt {
    pub prompt: String,
    /// HTML-escaped prompt with context mentions in bold markdown.
    pub escaped_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub context: Vec<QuickActionCommand>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// Format of an attachment pushed by the host.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentKind {
    #[default]
    Code,
    Markdown,
}

/// Prompt text and attachment as pushed onto the history ring.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPrompt {
    pub input_text: String,
    #[serde(default)]
    pub code_attachment: String,
    #[serde(default)]
    pub attachment_kind: AttachmentKind,
}

impl UserPrompt {
    /// Creates a history entry with a code attachment.
    pub fn new(input_text: impl Into<String>, code_attachment: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            code_attachment: code_attachment.into(),
            attachment_kind: AttachmentKind::Code,
        }
    }

    #[must_use]
    pub fn attachment_kind(mut self, attachment_kind: AttachmentKind) -> Self {
        self.attachment_kind = attachment_kind;
        self
    }

    /// Returns whether both the text and the attachment are empty.
    pub fn is_empty(&self) -> bool {
        self.input_text.is_empty() && self.code_attachment.is_empty()
    }
}

/// Escapes the characters that are significant in HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }

    escaped
}

/// Builds the escaped prompt: HTML-escaped text where every `@command` of
/// `context` is rendered as ` **@command**`.
pub fn escape_prompt(prompt: &str, context: &[QuickActionCommand]) -> String {
    let mut escaped = escape_html(prompt);
    let mut seen: Vec<&str> = Vec::new();
    for item in context {
        let command = item.command.trim_start_matches('@');
        if command.is_empty() || seen.contains(&command) {
            continue;
        }
        seen.push(command);

        let mention = escape_html(&format!("@{command}"));
        escaped = escaped.replace(&mention, &format!(" **{mention}**"));
    }

    escaped
}

/// Strips the outer fence pair from a restored attachment.
///
/// Only a trimmed attachment that opens and closes with the same marker is
/// unwrapped. Fences inside the body are kept.
pub fn strip_code_fences(attachment: &str) -> String {
    let trimmed = attachment.trim();
    for fence in ["~~~~~~~~~~", "```"] {
        if let Some(inner) = trimmed
            .strip_prefix(fence)
            .and_then(|rest| rest.strip_suffix(fence))
        {
            return inner.trim().to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_prompt_bolds_each_context_mention() {
        // Arrange
        let context = vec![QuickActionCommand::new("file.ts")];

        // Act
        let escaped = escape_prompt("explain @file.ts <now>", &context);

        // Assert
        assert_eq!(escaped, "explain  **@file.ts** &lt;now&gt;");
    }

    #[test]
    fn test_escape_prompt_bolds_repeated_context_once() {
        // Arrange
        let context = vec![
            QuickActionCommand::new("a"),
            QuickActionCommand::new("b"),
            QuickActionCommand::new("a"),
        ];

        // Act
        let escaped = escape_prompt("@a and @b", &context);

        // Assert
        assert_eq!(escaped, " **@a** and  **@b**");
    }

    #[test]
    fn test_strip_code_fences_removes_both_conventions() {
        // Arrange
        let attachment = "~~~~~~~~~~\nfn main() {}\n~~~~~~~~~~";
        let backtick = "```rust\nlet a = 1;\n```";

        // Act
        let stripped = (strip_code_fences(attachment), strip_code_fences(backtick));

        // Assert
        assert_eq!(stripped.0, "fn main() {}");
        assert_eq!(stripped.1, "rust\nlet a = 1;");
    }

    #[test]
    fn test_strip_code_fences_keeps_inner_and_unpaired_fences() {
        // Arrange
        let unfenced = "use ``` inside text";
        let nested = "~~~~~~~~~~\n```\nlet a = 1;\n```\n~~~~~~~~~~";
        let open_only = "```\nlet a = 1;";

        // Act
        let stripped = (
            strip_code_fences(unfenced),
            strip_code_fences(nested),
            strip_code_fences(open_only),
        );

        // Assert
        assert_eq!(stripped.0, "use ``` inside text");
        assert_eq!(stripped.1, "```\nlet a = 1;\n```");
        assert_eq!(stripped.2, "```\nlet a = 1;");
    }

    #[test]
    fn test_chat_prompt_serializes_camel_case() {
        // Arrange
        let prompt = ChatPrompt {
            prompt: "hi".to_string(),
            escaped_prompt: "hi".to_string(),
            ..ChatPrompt::default()
        };

        // Act
        let json = serde_json::to_value(&prompt).expect("prompt should serialize");

        // Assert
        assert_eq!(json["escapedPrompt"], "hi");
        assert!(json.get("command").is_none());
    }
}
