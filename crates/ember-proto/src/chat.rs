//! JSON text components carried by chat and disconnect frames.

use serde::{Deserialize, Serialize};

/// A single JSON chat component with optional children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatComponent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<ChatComponent>,
}

impl ChatComponent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    pub fn append(mut self, child: ChatComponent) -> Self {
        self.extra.push(child);
        self
    }

    /// Serialize to the JSON string sent on the wire.
    pub fn to_json(&self) -> String {
        // Serializing plain strings/bools into a String cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"text\":\"\"}"))
    }

    /// Concatenated text of this component and its children.
    pub fn plain_text(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.extra {
            out.push_str(&child.plain_text());
        }
        out
    }
}

impl From<&str> for ChatComponent {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for ChatComponent {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_component_omits_empty_fields() {
        assert_eq!(ChatComponent::text("hi").to_json(), r#"{"text":"hi"}"#);
    }

    #[test]
    fn styled_component() {
        let c = ChatComponent::text("Steve")
            .color("yellow")
            .append(ChatComponent::text(" joined the game"));
        assert_eq!(
            c.to_json(),
            r#"{"text":"Steve","color":"yellow","extra":[{"text":" joined the game"}]}"#
        );
        assert_eq!(c.plain_text(), "Steve joined the game");
    }

    #[test]
    fn escapes_quotes() {
        let json = ChatComponent::text("say \"hi\"").to_json();
        let back: ChatComponent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text, "say \"hi\"");
    }
}
