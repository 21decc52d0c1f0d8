//! Tools the model can call mid-answer.
//!
//! Every tool is declared once in [`TOOLS`]; the upstream declarations are built from that
//! table and invocations are parsed into a typed [`ToolCall`] before they run.

mod image_gen;
mod location;
mod weather;

pub use image_gen::{render_half_blocks, ImageGenerator};

use crate::config::ToolSettings;
use crate::error::{ChatlineError, Result};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

/// JSON type tag of a tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
}

impl ArgKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgKind::String => "string",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ArgKind::String => value.is_string(),
        }
    }
}

/// One declared argument.
#[derive(Debug)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub description: &'static str,
}

/// One declared tool.
#[derive(Debug)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
}

impl ToolSpec {
    /// JSON schema of the arguments; every declared argument is required.
    pub fn parameters(&self) -> Value {
        let properties: Map<String, Value> = self
            .args
            .iter()
            .map(|arg| {
                (
                    arg.name.to_string(),
                    serde_json::json!({
                        "type": arg.kind.as_str(),
                        "description": arg.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self.args.iter().map(|a| a.name).collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Upstream declaration for this tool.
    pub fn definition(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: self.name.to_string(),
                description: Some(self.description.to_string()),
                parameters: Some(self.parameters()),
                strict: None,
            },
        }
    }
}

/// Every tool this client knows how to run.
pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_time",
        description: "Gets the current local date and time",
        args: &[],
    },
    ToolSpec {
        name: "get_location_city",
        description: "Gets the city the user is currently in, based on their network location",
        args: &[],
    },
    ToolSpec {
        name: "get_weather",
        description: "Gets the current weather for a city",
        args: &[ArgSpec {
            name: "city",
            kind: ArgKind::String,
            description: "City whose weather to get",
        }],
    },
    ToolSpec {
        name: "generate_image",
        description:
            "Generates an image from a description and shows it to the user in their terminal",
        args: &[ArgSpec {
            name: "description",
            kind: ArgKind::String,
            description: "Detailed description of the image to generate",
        }],
    },
];

/// Look up a declared tool by name.
pub fn find_tool(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|t| t.name == name)
}

/// A parsed, validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    GetTime,
    GetLocationCity,
    GetWeather { city: String },
    GenerateImage { description: String },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::GetTime => "get_time",
            ToolCall::GetLocationCity => "get_location_city",
            ToolCall::GetWeather { .. } => "get_weather",
            ToolCall::GenerateImage { .. } => "generate_image",
        }
    }
}

/// Why a call's arguments were rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidArguments(pub String);

impl std::fmt::Display for InvalidArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate raw JSON arguments against a tool's declaration.
///
/// Empty arguments mean `{}`. Missing, undeclared and mistyped arguments are rejected.
pub fn validate_arguments(
    spec: &ToolSpec,
    arguments: &str,
) -> std::result::Result<Map<String, Value>, InvalidArguments> {
    let arguments = arguments.trim();
    let value: Value = if arguments.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(arguments)
            .map_err(|e| InvalidArguments(format!("arguments are not valid JSON ({})", e)))?
    };

    let Value::Object(map) = value else {
        return Err(InvalidArguments("arguments must be a JSON object".to_string()));
    };

    for arg in spec.args {
        match map.get(arg.name) {
            None => return Err(InvalidArguments(format!("missing '{}'", arg.name))),
            Some(v) if !arg.kind.accepts(v) => {
                return Err(InvalidArguments(format!(
                    "'{}' must be a {}",
                    arg.name,
                    arg.kind.as_str()
                )))
            }
            Some(_) => {}
        }
    }

    if let Some(extra) = map.keys().find(|k| !spec.args.iter().any(|a| a.name == k.as_str())) {
        return Err(InvalidArguments(format!("unexpected argument '{}'", extra)));
    }

    Ok(map)
}

/// Parse a tool call from its name and raw argument string.
///
/// The outer error is fatal (unknown tool); the inner one is reported back to the model.
pub fn parse_tool_call(
    name: &str,
    arguments: &str,
) -> Result<std::result::Result<ToolCall, InvalidArguments>> {
    let spec = find_tool(name).ok_or_else(|| ChatlineError::UnknownTool(name.to_string()))?;

    let args = match validate_arguments(spec, arguments) {
        Ok(args) => args,
        Err(e) => return Ok(Err(e)),
    };
    let string_arg = |key: &str| {
        args.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let call = match spec.name {
        "get_time" => ToolCall::GetTime,
        "get_location_city" => ToolCall::GetLocationCity,
        "get_weather" => ToolCall::GetWeather {
            city: string_arg("city"),
        },
        "generate_image" => ToolCall::GenerateImage {
            description: string_arg("description"),
        },
        other => return Err(ChatlineError::UnknownTool(other.to_string())),
    };
    Ok(Ok(call))
}

/// Work a tool leaves for the caller to perform once the call has finished.
#[derive(Debug, Clone)]
pub enum SideEffect {
    /// Show a generated image in the terminal.
    ShowImage {
        image: ::image::DynamicImage,
        description: String,
    },
}

/// Result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Text handed back to the model.
    pub content: String,
    /// Deferred action for the caller, if any.
    pub effect: Option<SideEffect>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            effect: None,
        }
    }
}

/// Current local time as a display string.
pub fn current_time() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

/// The set of tools offered to the model, with what they need to run.
pub struct ToolRegistry {
    enabled: Vec<&'static ToolSpec>,
    http: reqwest::Client,
    settings: ToolSettings,
    images: Option<ImageGenerator>,
}

impl ToolRegistry {
    /// Create a registry offering the tools enabled in `settings`.
    ///
    /// Unknown names in the enabled list are a configuration error.
    pub fn new(
        settings: ToolSettings,
        http: reqwest::Client,
        images: Option<ImageGenerator>,
    ) -> Result<Self> {
        let enabled = settings
            .enabled
            .iter()
            .map(|name| {
                find_tool(name).ok_or_else(|| {
                    ChatlineError::Config(format!("Unknown tool in tools.enabled: {}", name))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            enabled,
            http,
            settings,
            images,
        })
    }

    /// A registry that offers no tools.
    pub fn disabled(http: reqwest::Client) -> Self {
        Self {
            enabled: Vec::new(),
            http,
            settings: ToolSettings::default(),
            images: None,
        }
    }

    /// Names of the offered tools.
    pub fn names(&self) -> Vec<&'static str> {
        self.enabled.iter().map(|t| t.name).collect()
    }

    /// Upstream declarations of the offered tools.
    pub fn definitions(&self) -> Vec<ChatCompletionTool> {
        self.enabled.iter().map(|t| t.definition()).collect()
    }

    /// Run a tool by name with raw JSON arguments.
    ///
    /// Only a tool that was not offered is an error; every other failure becomes text.
    #[instrument(skip(self, arguments), fields(tool = %name))]
    pub async fn invoke(&self, name: &str, arguments: &str) -> Result<ToolOutput> {
        if !self.enabled.iter().any(|t| t.name == name) {
            return Err(ChatlineError::UnknownTool(name.to_string()));
        }

        let call = match parse_tool_call(name, arguments)? {
            Ok(call) => call,
            Err(e) => {
                debug!("Rejected arguments for {}: {}", name, e);
                return Ok(ToolOutput::text(format!("Invalid arguments for {}: {}", name, e)));
            }
        };

        info!("Calling tool {} with args: {}", name, arguments);
        Ok(self.execute(&call).await)
    }

    /// Execute a parsed tool call.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match call {
            ToolCall::GetTime => ToolOutput::text(current_time()),
            ToolCall::GetLocationCity => ToolOutput::text(
                location::lookup_city(&self.http, &self.settings.geolocation_url).await,
            ),
            ToolCall::GetWeather { city } => ToolOutput::text(
                weather::current_weather(
                    &self.http,
                    &self.settings.weather_url,
                    self.settings.weather_key().as_deref(),
                    self.settings.weather_units,
                    city,
                )
                .await,
            ),
            ToolCall::GenerateImage { description } => match &self.images {
                Some(generator) => generator.generate(description).await,
                None => ToolOutput::text(
                    "Image generation failed: image generation is not configured",
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(enabled: &[&str]) -> ToolRegistry {
        let settings = ToolSettings {
            enabled: enabled.iter().map(|s| s.to_string()).collect(),
            ..ToolSettings::default()
        };
        ToolRegistry::new(settings, reqwest::Client::new(), None).unwrap()
    }

    #[test]
    fn test_every_declared_tool_parses() {
        for spec in TOOLS {
            let args: Map<String, Value> = spec
                .args
                .iter()
                .map(|a| (a.name.to_string(), Value::String("x".to_string())))
                .collect();
            let call = parse_tool_call(spec.name, &Value::Object(args).to_string())
                .unwrap()
                .unwrap();
            assert_eq!(call.name(), spec.name);
        }
    }

    #[test]
    fn test_definitions_require_declared_args() {
        let spec = find_tool("get_weather").unwrap();
        let params = spec.parameters();
        assert_eq!(params["required"], serde_json::json!(["city"]));
        assert_eq!(params["properties"]["city"]["type"], "string");

        let def = serde_json::to_value(spec.definition()).unwrap();
        assert_eq!(def["type"], "function");
        assert_eq!(def["function"]["name"], "get_weather");
    }

    #[test]
    fn test_parse_no_argument_tool_accepts_empty_string() {
        assert_eq!(parse_tool_call("get_time", "").unwrap(), Ok(ToolCall::GetTime));
        assert_eq!(parse_tool_call("get_time", "{}").unwrap(), Ok(ToolCall::GetTime));
    }

    #[test]
    fn test_parse_weather() {
        let call = parse_tool_call("get_weather", r#"{"city": "Oslo"}"#).unwrap().unwrap();
        assert_eq!(
            call,
            ToolCall::GetWeather {
                city: "Oslo".to_string()
            }
        );
    }

    #[test]
    fn test_argument_validation_errors() {
        let missing = parse_tool_call("get_weather", "{}").unwrap().unwrap_err();
        assert!(missing.0.contains("missing 'city'"));

        let extra = parse_tool_call("get_time", r#"{"zone": "UTC"}"#).unwrap().unwrap_err();
        assert!(extra.0.contains("unexpected argument 'zone'"));

        let typed = parse_tool_call("get_weather", r#"{"city": 7}"#).unwrap().unwrap_err();
        assert!(typed.0.contains("must be a string"));

        let broken = parse_tool_call("get_weather", r#"{"city": "Os"#).unwrap().unwrap_err();
        assert!(broken.0.contains("not valid JSON"));

        let array = parse_tool_call("get_weather", "[1]").unwrap().unwrap_err();
        assert!(array.0.contains("JSON object"));
    }

    #[test]
    fn test_unknown_tool_is_fatal() {
        assert!(matches!(
            parse_tool_call("rm_rf", "{}"),
            Err(ChatlineError::UnknownTool(name)) if name == "rm_rf"
        ));
    }

    #[test]
    fn test_unknown_enabled_tool_is_config_error() {
        let settings = ToolSettings {
            enabled: vec!["teleport".to_string()],
            ..ToolSettings::default()
        };
        assert!(matches!(
            ToolRegistry::new(settings, reqwest::Client::new(), None),
            Err(ChatlineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invoke_get_time() {
        let registry = registry(&["get_time"]);
        let output = registry.invoke("get_time", "").await.unwrap();
        assert!(output.effect.is_none());
        let parsed = chrono::NaiveDateTime::parse_from_str(&output.content, "%Y-%m-%d %H:%M:%S%.f");
        assert!(parsed.is_ok());
    }

    #[tokio::test]
    async fn test_invoke_tool_not_offered_is_fatal() {
        let registry = registry(&["get_time"]);
        assert!(matches!(
            registry.invoke("get_weather", r#"{"city":"Oslo"}"#).await,
            Err(ChatlineError::UnknownTool(_))
        ));
        assert!(ToolRegistry::disabled(reqwest::Client::new()).definitions().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_bad_arguments_is_text() {
        let registry = registry(&["get_weather"]);
        let output = registry.invoke("get_weather", "{}").await.unwrap();
        assert_eq!(output.content, "Invalid arguments for get_weather: missing 'city'");
    }

    #[tokio::test]
    async fn test_generate_image_without_generator_is_text() {
        let registry = registry(&["generate_image"]);
        let output = registry
            .invoke("generate_image", r#"{"description": "a cat"}"#)
            .await
            .unwrap();
        assert!(output.content.starts_with("Image generation failed"));
        assert!(output.effect.is_none());
    }
}
