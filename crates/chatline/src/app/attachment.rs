use crate::domain::prompt::AttachmentKind;

/// Code or markdown block sent along with the next prompt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptAttachment {
    content: String,
    kind: AttachmentKind,
}

impl PromptAttachment {
    /// Creates an empty attachment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the attachment body.
    pub fn update(&mut self, content: &str, kind: AttachmentKind) {
        self.content = content.to_string();
        self.kind = kind;
    }

    /// Drops the attachment body.
    pub fn clear(&mut self) {
        self.content.clear();
        self.kind = AttachmentKind::default();
    }

    /// Returns the attachment body, empty when nothing is attached.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn kind(&self) -> AttachmentKind {
        self.kind
    }

    /// Returns whether nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns the body prepared for the outgoing prompt.
    ///
    /// Code is wrapped in a fence. Markdown is sent as is.
    pub fn prompt_text(&self) -> String {
        if self.content.is_empty() {
            return String::new();
        }

        match self.kind {
            AttachmentKind::Code => format!("\n~~~~~~~~~~\n{}\n~~~~~~~~~~", self.content),
            AttachmentKind::Markdown => format!("\n{}", self.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_text_fences_code_only() {
        // Arrange
        let mut code = PromptAttachment::new();
        code.update("let a = 1;", AttachmentKind::Code);
        let mut markdown = PromptAttachment::new();
        markdown.update("# Notes", AttachmentKind::Markdown);

        // Act
        let code_text = code.prompt_text();
        let markdown_text = markdown.prompt_text();

        // Assert
        assert_eq!(code_text, "\n~~~~~~~~~~\nlet a = 1;\n~~~~~~~~~~");
        assert_eq!(markdown_text, "\n# Notes");
    }

    #[test]
    fn test_clear_empties_attachment() {
        // Arrange
        let mut attachment = PromptAttachment::new();
        attachment.update("x", AttachmentKind::Markdown);

        // Act
        attachment.clear();

        // Assert
        assert!(attachment.is_empty());
        assert_eq!(attachment.prompt_text(), "");
        assert_eq!(attachment.kind(), AttachmentKind::Code);
    }
}
