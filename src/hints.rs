//! Hint projector.
//!
//! Turns compiler events into positioned editor annotations. Each successful
//! component gets its own hint; failures reported against the same function
//! are folded into a single hint so markers never stack on one line.

pub mod anchor;
pub mod tooltip;

use serde::Serialize;
use tower_lsp::lsp_types::{
    InlayHint, InlayHintKind, InlayHintLabel, InlayHintTooltip, MarkupContent, MarkupKind, Position,
};

use crate::compiler::DiagnosticEvent;
use crate::compiler::events::SourceRange;
use crate::settings::{ClientProfile, Settings, TooltipMarkup};

pub use anchor::AnchorFallback;
pub use tooltip::LinkOptions;

const ANONYMOUS: &str = "Component";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HintStatus {
    Compiled,
    Failed,
}

impl HintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HintStatus::Compiled => "compiled",
            HintStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    pub markup: TooltipMarkup,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub position: Position,
    pub label: String,
    pub tooltip: Tooltip,
    pub status: HintStatus,
    pub padding_left: bool,
}

impl Hint {
    /// HTML tooltips travel as markdown content, which permits inline HTML.
    pub fn to_inlay_hint(&self) -> InlayHint {
        InlayHint {
            position: self.position,
            label: InlayHintLabel::String(self.label.clone()),
            kind: Some(InlayHintKind::TYPE),
            text_edits: None,
            tooltip: Some(InlayHintTooltip::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: self.tooltip.value.clone(),
            })),
            padding_left: Some(self.padding_left),
            padding_right: None,
            data: None,
        }
    }
}

/// Everything about the client and document that shapes projected hints.
#[derive(Debug, Clone)]
pub struct HintConfig {
    /// `None` turns off hints for successful components.
    pub success_emoji: Option<String>,
    /// `None` turns off hints for failed components.
    pub error_emoji: Option<String>,
    pub label_template: String,
    pub markup: TooltipMarkup,
    pub anchor_fallback: AnchorFallback,
    pub links: LinkOptions,
    /// Passed through to fix-with-AI links.
    pub filename: String,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), TooltipMarkup::default(), &ClientProfile::default(), "")
    }
}

impl HintConfig {
    pub fn from_settings(
        settings: &Settings,
        markup: TooltipMarkup,
        client: &ClientProfile,
        filename: impl Into<String>,
    ) -> Self {
        let command_links = client.supports_command_links();
        Self {
            success_emoji: settings.success_emoji.clone(),
            error_emoji: settings.error_emoji.clone(),
            label_template: settings.hint_format.clone(),
            markup,
            anchor_fallback: settings.anchor_fallback,
            links: LinkOptions {
                command_links,
                fix_with_ai: command_links && client.supports_fix_with_ai(),
            },
            filename: filename.into(),
        }
    }

    fn label(&self, emoji: &str, name: &str, status: HintStatus) -> String {
        self.label_template
            .replace("{emoji}", emoji)
            .replace("{name}", name)
            .replace("{status}", status.as_str())
    }
}

pub fn project(
    document_text: &str,
    successful: &[DiagnosticEvent],
    failed: &[DiagnosticEvent],
    config: &HintConfig,
) -> Vec<Hint> {
    let lines = anchor::document_lines(document_text);
    let mut hints = Vec::new();

    if let Some(emoji) = config.success_emoji.as_deref() {
        for event in successful {
            let Some((position, name)) = locate(&lines, event, config.anchor_fallback) else {
                continue;
            };
            hints.push(Hint {
                position,
                label: config.label(emoji, name, HintStatus::Compiled),
                tooltip: Tooltip {
                    markup: config.markup,
                    value: tooltip::success(emoji, name, config.markup, config.links),
                },
                status: HintStatus::Compiled,
                padding_left: true,
            });
        }
    }

    if let Some(emoji) = config.error_emoji.as_deref() {
        for group in group_by_function(failed) {
            let Some((position, name)) = locate(&lines, group[0], config.anchor_fallback) else {
                continue;
            };
            hints.push(Hint {
                position,
                label: config.label(emoji, name, HintStatus::Failed),
                tooltip: Tooltip {
                    markup: config.markup,
                    value: tooltip::failures(emoji, name, &group, &config.filename, config.markup, config.links),
                },
                status: HintStatus::Failed,
                padding_left: true,
            });
        }
    }

    hints
}

/// Tooltip of the hint anchored on `line`, for clients that only show hovers.
pub fn hover_at(hints: &[Hint], line: u32) -> Option<&Tooltip> {
    hints
        .iter()
        .find(|hint| hint.position.line == line)
        .map(|hint| &hint.tooltip)
}

/// Anchor position and display name, or `None` when the event points outside
/// the document or at a component opted out with the disable comment. Events
/// without a function location anchor on the first line.
fn locate<'a>(
    lines: &[&str],
    event: &'a DiagnosticEvent,
    fallback: AnchorFallback,
) -> Option<(Position, &'a str)> {
    let line = event.function_line().unwrap_or(1).checked_sub(1)? as usize;
    let text = lines.get(line)?;
    if anchor::is_disabled(lines, line) {
        return None;
    }

    let name = event.fn_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(ANONYMOUS);
    let position = Position::new(line as u32, anchor::anchor_column(text, fallback));
    Some((position, name))
}

/// Failures keyed by function location, in order of first appearance.
fn group_by_function(failed: &[DiagnosticEvent]) -> Vec<Vec<&DiagnosticEvent>> {
    let mut keys: Vec<Option<SourceRange>> = Vec::new();
    let mut groups: Vec<Vec<&DiagnosticEvent>> = Vec::new();

    for event in failed {
        match keys.iter().position(|key| *key == event.fn_loc) {
            Some(index) => groups[index].push(event),
            None => {
                keys.push(event.fn_loc);
                groups.push(vec![event]);
            }
        }
    }
    groups
}
