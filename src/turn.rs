//! Conversation turns.
//!
//! A [`Turn`] serializes to exactly the chat message shape the upstream API expects, so the
//! same JSON is used on the wire and in the history log.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Result of a `tool_calls` request.
    Tool,
    /// Result of a legacy `function_call` request.
    Function,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Function => "function",
        };
        write!(f, "{}", name)
    }
}

/// Body of a turn: plain text, or text and image parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl TurnContent {
    /// Text portion of the content, with image parts omitted.
    pub fn text(&self) -> String {
        match self {
            TurnContent::Text(text) => text.clone(),
            TurnContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Number of image parts.
    pub fn image_count(&self) -> usize {
        match self {
            TurnContent::Text(_) => 0,
            TurnContent::Parts(parts) => parts
                .iter()
                .filter(|p| matches!(p, ContentPart::ImageUrl { .. }))
                .count(),
        }
    }
}

/// One part of a multi-part content body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name and raw JSON argument string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    /// Serialized as `null` when absent; assistant tool requests carry no content.
    #[serde(default)]
    pub content: Option<TurnContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Turn {
    fn with_content(role: Role, content: Option<TurnContent>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            function_call: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::with_content(Role::System, Some(TurnContent::Text(text.into())))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_content(Role::User, Some(TurnContent::Text(text.into())))
    }

    /// User turn carrying text and an attached image.
    pub fn user_with_image(text: impl Into<String>, image: &ImageAttachment) -> Self {
        let parts = vec![
            ContentPart::Text { text: text.into() },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            },
        ];
        Self::with_content(Role::User, Some(TurnContent::Parts(parts)))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_content(Role::Assistant, Some(TurnContent::Text(text.into())))
    }

    /// Assistant turn recording a `tool_calls` request.
    pub fn assistant_tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        let mut turn = Self::with_content(Role::Assistant, None);
        turn.tool_calls = calls;
        turn
    }

    /// Assistant turn recording a legacy `function_call` request.
    pub fn assistant_function_call(call: FunctionCall) -> Self {
        let mut turn = Self::with_content(Role::Assistant, None);
        turn.function_call = Some(call);
        turn
    }

    /// Result of a `tool_calls` entry.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut turn = Self::with_content(Role::Tool, Some(TurnContent::Text(content.into())));
        turn.tool_call_id = Some(tool_call_id.into());
        turn.name = Some(name.into());
        turn
    }

    /// Result of a legacy `function_call`.
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut turn = Self::with_content(Role::Function, Some(TurnContent::Text(content.into())));
        turn.name = Some(name.into());
        turn
    }

    /// Text content, empty when the turn has none.
    pub fn text(&self) -> String {
        self.content.as_ref().map(TurnContent::text).unwrap_or_default()
    }
}

/// An image attached to the user's message, held as PNG bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    png: Vec<u8>,
}

impl ImageAttachment {
    pub fn from_png(png: Vec<u8>) -> Self {
        Self { png }
    }

    pub fn len(&self) -> usize {
        self.png.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    /// Inline `data:` URL accepted by vision-capable models.
    pub fn data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }
}
