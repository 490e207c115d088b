//! Diagnostic events reported by babel-plugin-react-compiler through its logger.
//!
//! The compiler's event payloads are loosely shaped (locations are sometimes a
//! marker string instead of a range, `detail` moved under `options` between
//! releases), so every field is optional and malformed sub-objects deserialize
//! to `None` instead of failing the whole event.

use serde::{Deserialize, Deserializer, Serialize};

/// The `kind` tag of a logger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    CompileSuccess,
    CompileError,
    CompileDiagnostic,
    PipelineError,
    Other(String),
}

impl From<String> for EventKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "CompileSuccess" => Self::CompileSuccess,
            "CompileError" => Self::CompileError,
            "CompileDiagnostic" => Self::CompileDiagnostic,
            "PipelineError" => Self::PipelineError,
            _ => Self::Other(kind),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::CompileSuccess => "CompileSuccess".to_string(),
            EventKind::CompileError => "CompileError".to_string(),
            EventKind::CompileDiagnostic => "CompileDiagnostic".to_string(),
            EventKind::PipelineError => "PipelineError".to_string(),
            EventKind::Other(kind) => kind,
        }
    }
}

/// Which bucket an event lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl EventKind {
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::CompileSuccess => Some(Outcome::Success),
            Self::CompileError | Self::CompileDiagnostic | Self::PipelineError => Some(Outcome::Failure),
            Self::Other(_) => None,
        }
    }
}

/// A point as emitted by Babel: 1-indexed line, 0-indexed column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<SourcePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<SourcePoint>,
}

impl SourceRange {
    pub fn start_line(&self) -> Option<u32> {
        self.start.and_then(|p| p.line)
    }

    fn has_position(&self) -> bool {
        self.start.is_some_and(|p| p.line.is_some()) || self.end.is_some_and(|p| p.line.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceRange>,
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<DetailEntry>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub options: Option<Box<EventDetail>>,
}

/// Zero-indexed line/character span of the exact failing sub-expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSpan {
    pub start_line: u32,
    pub start_character: u32,
    pub end_line: u32,
    pub end_character: u32,
}

impl EventDetail {
    /// The failure reason; newer compiler releases nest it under `options`.
    pub fn reason(&self) -> Option<&str> {
        self.options
            .as_ref()
            .and_then(|o| o.reason.as_deref())
            .or(self.reason.as_deref())
            .filter(|r| !r.is_empty())
    }

    pub fn description(&self) -> Option<&str> {
        self.options
            .as_ref()
            .and_then(|o| o.description.as_deref())
            .or(self.description.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// Location of the failing code, looked up from the most to the least
    /// specific place the compiler reports it.
    pub fn error_range(&self) -> Option<SourceRange> {
        let nested = self.options.as_deref();
        nested
            .and_then(|o| o.details.first())
            .and_then(|d| d.loc)
            .filter(SourceRange::has_position)
            .or_else(|| nested.and_then(|o| o.loc).filter(SourceRange::has_position))
            .or_else(|| self.details.first().and_then(|d| d.loc).filter(SourceRange::has_position))
            .or_else(|| self.loc.filter(SourceRange::has_position))
    }

    pub fn error_span(&self) -> Option<ErrorSpan> {
        let range = self.error_range()?;
        let start = range.start.unwrap_or_default();
        let end = range.end.unwrap_or(start);
        let start_line = start.line.unwrap_or(1).saturating_sub(1);
        Some(ErrorSpan {
            start_line,
            start_character: start.column.unwrap_or(0),
            end_line: end.line.map_or(start_line, |l| l.saturating_sub(1)),
            end_character: end.column.unwrap_or(0),
        })
    }
}

/// One fact the compiler reported about a single function or component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub fn_loc: Option<SourceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fn_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub detail: Option<EventDetail>,
}

impl DiagnosticEvent {
    pub fn outcome(&self) -> Option<Outcome> {
        self.kind.as_ref().and_then(EventKind::outcome)
    }

    /// 1-indexed line the function starts on.
    pub fn function_line(&self) -> Option<u32> {
        self.fn_loc.as_ref().and_then(SourceRange::start_line)
    }

    pub fn reason(&self) -> &str {
        self.detail
            .as_ref()
            .and_then(EventDetail::reason)
            .unwrap_or("Unknown reason")
    }

    pub fn description(&self) -> Option<&str> {
        self.detail.as_ref().and_then(EventDetail::description)
    }

    pub fn error_span(&self) -> Option<ErrorSpan> {
        self.detail.as_ref().and_then(EventDetail::error_span)
    }
}

/// Events produced by one compiler run, split by outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub successful_compilations: Vec<DiagnosticEvent>,
    pub failed_compilations: Vec<DiagnosticEvent>,
}

impl CompileResult {
    /// Sort raw logger events into the success and failure buckets. Events with
    /// an unrecognised or missing kind are dropped.
    pub fn partition(events: Vec<DiagnosticEvent>) -> Self {
        let mut result = Self::default();
        for event in events {
            match event.outcome() {
                Some(Outcome::Success) => result.successful_compilations.push(event),
                Some(Outcome::Failure) => result.failed_compilations.push(event),
                None => (),
            }
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.successful_compilations.is_empty() && self.failed_compilations.is_empty()
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// `null` or a malformed list reads as empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(lenient::<D, Vec<T>>(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> DiagnosticEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn partitions_events_by_kind() {
        let events = vec![
            event(json!({"kind": "CompileSuccess", "fnLoc": {"start": {"line": 1, "column": 0}}})),
            event(json!({"kind": "CompileError", "fnLoc": {"start": {"line": 4, "column": 0}}})),
            event(json!({"kind": "CompileDiagnostic"})),
            event(json!({"kind": "PipelineError"})),
            event(json!({"kind": "CompileSkip"})),
            event(json!({})),
        ];

        let result = CompileResult::partition(events);
        assert_eq!(result.successful_compilations.len(), 1);
        assert_eq!(result.failed_compilations.len(), 3);
    }

    #[test]
    fn string_locations_do_not_break_deserialization() {
        let parsed = event(json!({
            "kind": "CompileError",
            "fnLoc": "GeneratedSource",
            "detail": {"options": {"reason": "Ref access during render", "loc": "GeneratedSource"}}
        }));

        assert_eq!(parsed.fn_loc, None);
        assert_eq!(parsed.reason(), "Ref access during render");
        assert_eq!(parsed.error_span(), None);
    }

    #[test]
    fn null_lists_read_as_empty() {
        let parsed = event(json!({
            "kind": "CompileError",
            "detail": {"options": {"reason": "Hooks must be called unconditionally", "suggestions": null, "details": null}}
        }));
        assert_eq!(parsed.reason(), "Hooks must be called unconditionally");
    }

    #[test]
    fn missing_reason_falls_back() {
        let parsed = event(json!({"kind": "CompileError", "detail": {"options": {"reason": ""}}}));
        assert_eq!(parsed.reason(), "Unknown reason");
    }

    #[test]
    fn nested_detail_location_takes_precedence() {
        let parsed = event(json!({
            "kind": "CompileError",
            "detail": {
                "loc": {"start": {"line": 2, "column": 0}, "end": {"line": 2, "column": 4}},
                "options": {
                    "reason": "Mutating props",
                    "details": [
                        {"kind": "error", "loc": {"start": {"line": 7, "column": 3}, "end": {"line": 9, "column": 1}}}
                    ]
                }
            }
        }));

        assert_eq!(
            parsed.error_span(),
            Some(ErrorSpan {
                start_line: 6,
                start_character: 3,
                end_line: 8,
                end_character: 1,
            })
        );
    }

    #[test]
    fn unknown_kind_round_trips_as_string() {
        let kind: EventKind = serde_json::from_value(json!("Timing")).unwrap();
        assert_eq!(kind, EventKind::Other("Timing".to_string()));
        assert_eq!(serde_json::to_value(&kind).unwrap(), json!("Timing"));
    }
}
