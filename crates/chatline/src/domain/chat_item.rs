use serde::{Deserialize, Serialize};

/// Kind of a conversation card.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatItemType {
    Prompt,
    Directive,
    SystemPrompt,
    AiPrompt,
    #[default]
    Answer,
    AnswerStream,
    AnswerPart,
    CodeResult,
}

impl ChatItemType {
    /// Returns whether cards of this type keep receiving streamed updates.
    pub fn is_stream(self) -> bool {
        matches!(self, ChatItemType::AnswerStream | ChatItemType::AnswerPart)
    }

    /// Returns whether cards of this type snap the list to their top.
    pub fn snaps_to_top(self) -> bool {
        matches!(self, ChatItemType::Prompt | ChatItemType::SystemPrompt)
    }
}

/// One conversation card as pushed by the host.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatItem {
    #[serde(rename = "type")]
    pub item_type: ChatItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub can_be_voted: bool,
    #[serde(default)]
    pub snap_to_top: bool,
}

impl ChatItem {
    /// Creates a card of `item_type` with `body`.
    pub fn new(item_type: ChatItemType, body: impl Into<String>) -> Self {
        Self {
            item_type,
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Sets the message id.
    #[must_use]
    pub fn message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Merges the fields present in `update` into this card.
    pub fn apply(&mut self, update: &ChatItemUpdate) {
        if let Some(item_type) = update.item_type {
            self.item_type = item_type;
        }
        if let Some(message_id) = &update.message_id {
            self.message_id = Some(message_id.clone());
        }
        if let Some(body) = &update.body {
            self.body = Some(body.clone());
        }
        if let Some(title) = &update.title {
            self.title = Some(title.clone());
        }
        if let Some(can_be_voted) = update.can_be_voted {
            self.can_be_voted = can_be_voted;
        }
    }
}

/// Partial card update; absent fields keep their current value.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatItemUpdate {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ChatItemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_be_voted: Option<bool>,
}

impl ChatItemUpdate {
    /// Creates an update replacing only the body.
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_merges_only_present_fields() {
        // Arrange
        let mut item = ChatItem::new(ChatItemType::AnswerStream, "partial").message_id("m1");
        let update = ChatItemUpdate {
            item_type: Some(ChatItemType::Answer),
            body: Some("done".to_string()),
            ..ChatItemUpdate::default()
        };

        // Act
        item.apply(&update);

        // Assert
        assert_eq!(item.item_type, ChatItemType::Answer);
        assert_eq!(item.body.as_deref(), Some("done"));
        assert_eq!(item.message_id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_item_type_uses_kebab_case_names() {
        // Arrange
        let json = r#"{"type":"answer-stream","messageId":"m"}"#;

        // Act
        let item: ChatItem = serde_json::from_str(json).expect("item should parse");

        // Assert
        assert_eq!(item.item_type, ChatItemType::AnswerStream);
        assert!(item.item_type.is_stream());
        assert!(!ChatItemType::Answer.is_stream());
    }
}
