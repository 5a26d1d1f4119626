use serde::{Deserialize, Serialize};

/// Context command text that enables the image capability.
pub const IMAGE_CONTEXT_COMMAND: &str = "image";

/// One selectable entry of the `/` quick-action or `@` context catalogs.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActionCommand {
    /// Literal command text, for example `/dev` or `file.ts`.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Prompt placeholder shown while the command waits for its argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Nested groups opened instead of selecting this command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<QuickActionCommandGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<String>,
}

impl QuickActionCommand {
    /// Creates a command with only its literal text set.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Sets the command description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the command id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the command icon.
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the placeholder that makes the command wait for an argument.
    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Sets nested groups for drill-down selection.
    #[must_use]
    pub fn children(mut self, children: Vec<QuickActionCommandGroup>) -> Self {
        self.children = children;
        self
    }

    /// Returns whether selecting this command opens a nested list.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns whether two commands refer to the same context entry.
    ///
    /// Identity is the triple of command text, icon and description.
    pub fn same_identity(&self, other: &QuickActionCommand) -> bool {
        self.command == other.command
            && self.icon == other.icon
            && self.description == other.description
    }
}

/// Button rendered on a quick-pick group header.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAction {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Named, ordered block of commands shown in the quick-pick overlay.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActionCommandGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<GroupAction>,
    #[serde(default)]
    pub commands: Vec<QuickActionCommand>,
}

impl QuickActionCommandGroup {
    /// Creates an unnamed group holding `commands`.
    pub fn new(commands: Vec<QuickActionCommand>) -> Self {
        Self {
            commands,
            ..Self::default()
        }
    }

    /// Sets the group title.
    #[must_use]
    pub fn group_name(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }
}

/// Optional banner rendered above the quick-action list.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActionCommandsHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl QuickActionCommandsHeader {
    /// Returns whether the header carries anything worth rendering.
    pub fn has_content(&self) -> bool {
        self.title.is_some() || self.description.is_some()
    }
}

/// Clickable button described by the host, used by the prompt and top bar.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatItemButton {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// Counts every selectable command across `groups`, ignoring nested children.
pub fn command_count(groups: &[QuickActionCommandGroup]) -> usize {
    groups.iter().map(|group| group.commands.len()).sum()
}

/// Returns the `index`-th command across `groups` in render order.
pub fn command_at(groups: &[QuickActionCommandGroup], index: usize) -> Option<&QuickActionCommand> {
    groups
        .iter()
        .flat_map(|group| group.commands.iter())
        .nth(index)
}

/// Returns whether the catalog contains the `image` context command.
pub fn has_image_context(groups: &[QuickActionCommandGroup]) -> bool {
    groups
        .iter()
        .flat_map(|group| group.commands.iter())
        .any(|command| command.command.eq_ignore_ascii_case(IMAGE_CONTEXT_COMMAND))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_identity_ignores_id_and_label() {
        // Arrange
        let left = QuickActionCommand::new("file.ts").description("src").id("a");
        let right = QuickActionCommand::new("file.ts").description("src").id("b");

        // Act
        let is_same = left.same_identity(&right);

        // Assert
        assert!(is_same);
    }

    #[test]
    fn test_same_identity_detects_different_description() {
        // Arrange
        let left = QuickActionCommand::new("file.ts").description("src");
        let right = QuickActionCommand::new("file.ts").description("test");

        // Act
        let is_same = left.same_identity(&right);

        // Assert
        assert!(!is_same);
    }

    #[test]
    fn test_command_at_walks_groups_in_order() {
        // Arrange
        let groups = vec![
            QuickActionCommandGroup::new(vec![QuickActionCommand::new("/dev")]),
            QuickActionCommandGroup::new(vec![
                QuickActionCommand::new("/test"),
                QuickActionCommand::new("/doc"),
            ]),
        ];

        // Act
        let command = command_at(&groups, 2);

        // Assert
        assert_eq!(command.map(|command| command.command.as_str()), Some("/doc"));
        assert_eq!(command_count(&groups), 3);
    }

    #[test]
    fn test_has_image_context_matches_command_case_insensitively() {
        // Arrange
        let groups = vec![QuickActionCommandGroup::new(vec![QuickActionCommand::new(
            "Image",
        )])];

        // Act
        let enabled = has_image_context(&groups);

        // Assert
        assert!(enabled);
        assert!(!has_image_context(&[]));
    }

    #[test]
    fn test_deserialize_camel_case_catalog() {
        // Arrange
        let json = r#"{"groupName":"Files","commands":[{"command":"@file","disabledText":"n/a","children":[{"commands":[{"command":"a.rs"}]}]}]}"#;

        // Act
        let group: QuickActionCommandGroup =
            serde_json::from_str(json).expect("catalog should parse");

        // Assert
        assert_eq!(group.group_name.as_deref(), Some("Files"));
        assert_eq!(group.commands[0].disabled_text.as_deref(), Some("n/a"));
        assert!(group.commands[0].has_children());
    }

    #[test]
    fn test_header_has_content_requires_title_or_description() {
        // Arrange
        let empty = QuickActionCommandsHeader::default();
        let titled = QuickActionCommandsHeader {
            title: Some("New".to_string()),
            ..QuickActionCommandsHeader::default()
        };

        // Act
        let results = (empty.has_content(), titled.has_content());

        // Assert
        assert_eq!(results, (false, true));
    }
}
