//! Client-facing configuration.
//!
//! Settings arrive as loose JSON under the `reactCompilerMarker` section of
//! `workspace/didChangeConfiguration`. A missing or malformed key falls back to
//! its default, while an explicit `null` (or empty string) emoji turns that hint
//! category off.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::helpers::emojis::{BLOCKED, SPARKLES};
use crate::hints::AnchorFallback;

pub const SETTINGS_SECTION: &str = "reactCompilerMarker";
pub const DEFAULT_PLUGIN_PATH: &str = "node_modules/babel-plugin-react-compiler";
pub const DEFAULT_HINT_FORMAT: &str = "{emoji}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub success_emoji: Option<String>,
    pub error_emoji: Option<String>,
    pub babel_plugin_path: String,
    pub hint_format: String,
    /// Hint column on lines with no recognizable declaration prefix.
    pub anchor_fallback: AnchorFallback,
    pub exclude_dirs: Option<Vec<String>>,
    pub include_extensions: Option<Vec<String>>,
    pub max_concurrency: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            success_emoji: Some(SPARKLES.to_string()),
            error_emoji: Some(BLOCKED.to_string()),
            babel_plugin_path: DEFAULT_PLUGIN_PATH.to_string(),
            hint_format: DEFAULT_HINT_FORMAT.to_string(),
            anchor_fallback: AnchorFallback::default(),
            exclude_dirs: None,
            include_extensions: None,
            max_concurrency: None,
        }
    }
}

/// Settings as sent by the client. `None` means the key was missing or could
/// not be read; for emojis, `Some(None)` means the client turned them off.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default, deserialize_with = "nullable_string")]
    success_emoji: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable_string")]
    error_emoji: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient")]
    babel_plugin_path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    hint_format: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    anchor_fallback: Option<AnchorFallback>,
    #[serde(default, deserialize_with = "string_list")]
    exclude_dirs: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_list")]
    include_extensions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    max_concurrency: Option<usize>,
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let defaults = Self::default();
        Self {
            success_emoji: raw.success_emoji.unwrap_or(defaults.success_emoji),
            error_emoji: raw.error_emoji.unwrap_or(defaults.error_emoji),
            babel_plugin_path: raw
                .babel_plugin_path
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.babel_plugin_path),
            hint_format: raw
                .hint_format
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.hint_format),
            anchor_fallback: raw.anchor_fallback.unwrap_or(defaults.anchor_fallback),
            exclude_dirs: raw.exclude_dirs,
            include_extensions: raw.include_extensions,
            max_concurrency: raw.max_concurrency.filter(|n| *n > 0),
        }
    }
}

impl Settings {
    /// Parse the settings object itself (not the enclosing section).
    pub fn from_value(value: &Value) -> Self {
        match RawSettings::deserialize(value) {
            Ok(raw) => raw.into(),
            Err(e) => {
                log::warn!("Ignoring unreadable settings: {e}");
                Self::default()
            }
        }
    }

    /// Pick our section out of a `didChangeConfiguration` payload. Returns `None`
    /// when the payload does not mention it, so the current settings stay.
    pub fn from_change(settings: &Value) -> Option<Self> {
        settings.get(SETTINGS_SECTION).map(Self::from_value)
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

fn nullable_string<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Some(None),
        Value::String(s) => Some((!s.is_empty()).then_some(s)),
        _ => None,
    })
}

/// Keeps the string entries of an array and skips anything else.
fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }))
}

/// Markup dialect used for hint tooltips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TooltipMarkup {
    #[default]
    Markdown,
    Html,
}

impl TooltipMarkup {
    /// Read `tooltipFormat` from the client's initialization options.
    pub fn from_initialization_options(options: Option<&Value>) -> Self {
        match options.and_then(|o| o.get("tooltipFormat")).and_then(Value::as_str) {
            Some("html") => Self::Html,
            _ => Self::Markdown,
        }
    }
}

/// What the connected editor can render, derived from its `clientInfo.name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientProfile {
    name: String,
}

impl ClientProfile {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.unwrap_or_default().to_lowercase(),
        }
    }

    fn is(&self, needle: &str) -> bool {
        self.name.contains(needle)
    }

    pub fn is_vscode(&self) -> bool {
        self.is("visual studio code")
    }

    pub fn is_neovim(&self) -> bool {
        self.is("neovim")
    }

    pub fn is_zed(&self) -> bool {
        self.is("zed")
    }

    /// Neovim and Zed render tooltips as plain text, so `command:` links are noise.
    pub fn supports_command_links(&self) -> bool {
        !self.is_neovim() && !self.is_zed()
    }

    pub fn supports_fix_with_ai(&self) -> bool {
        self.is_vscode() || self.is("cursor") || self.is("antigravity")
    }

    /// Hover duplicates inlay hint tooltips except where the client never shows
    /// those tooltips.
    pub fn hover_enabled(&self) -> bool {
        self.is_neovim()
    }
}
