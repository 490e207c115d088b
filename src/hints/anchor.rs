//! Placement of a hint on the line where a function starts.

use serde::{Deserialize, Serialize};

/// Declaration prefixes, most specific first. The first one found anywhere on
/// the line wins, so `export default function` beats the bare `function`.
pub const FUNCTION_PATTERNS: [&str; 8] = [
    "export default async function",
    "export default function",
    "export async function",
    "export function",
    "async function",
    "function",
    "export const",
    "const",
];

pub const DISABLE_COMMENT: &str = "react-compiler-marker-disable";

/// Where a hint goes when no declaration prefix is found on its line. Inline
/// hint renderers read best at the end of the line, gutter-style renderers at
/// the start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorFallback {
    #[default]
    LineEnd,
    LineStart,
}

/// Column, in UTF-16 code units, right after the matched declaration prefix.
pub fn anchor_column(line: &str, fallback: AnchorFallback) -> u32 {
    let line = line.trim_end();
    let matched = FUNCTION_PATTERNS
        .iter()
        .find_map(|pattern| line.find(pattern).map(|index| index + pattern.len()));

    match (matched, fallback) {
        (Some(end), _) => utf16_len(&line[..end]),
        (None, AnchorFallback::LineEnd) => utf16_len(line),
        (None, AnchorFallback::LineStart) => 0,
    }
}

/// Lines as an LSP client counts them: `\r\n`, `\n` and a lone `\r` all end a
/// line, and text after the last terminator (even empty) is one more line.
pub fn document_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(index) = rest.find(['\r', '\n']) {
        lines.push(&rest[..index]);
        let terminator = if rest[index..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[index + terminator..];
    }
    lines.push(rest);
    lines
}

/// Whether the line above `function_line` (0-indexed) opts the component out.
pub fn is_disabled(lines: &[&str], function_line: usize) -> bool {
    function_line
        .checked_sub(1)
        .and_then(|above| lines.get(above))
        .is_some_and(|line| line.trim().contains(DISABLE_COMMENT))
}

fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_declaration_prefix_wins() {
        let line = "export default function Foo() {";
        assert_eq!(
            anchor_column(line, AnchorFallback::LineEnd),
            "export default function".len() as u32
        );
    }

    #[test]
    fn each_prefix_anchors_after_itself() {
        let cases = [
            ("export default async function Page() {", "export default async function"),
            ("export async function load() {", "export async function"),
            ("export function Widget() {", "export function"),
            ("async function fetcher() {", "async function"),
            ("function Button() {", "function"),
            ("export const Card = () => {", "export const"),
            ("const List = memo(() => {", "const"),
        ];

        for (line, prefix) in cases {
            assert_eq!(
                anchor_column(line, AnchorFallback::LineEnd),
                prefix.len() as u32,
                "line: {line}"
            );
        }
    }

    #[test]
    fn indentation_is_counted() {
        assert_eq!(anchor_column("    function Inner() {", AnchorFallback::LineStart), 12);
    }

    #[test]
    fn unmatched_lines_use_the_fallback() {
        let line = "  (props) => {   ";
        assert_eq!(anchor_column(line, AnchorFallback::LineEnd), 14);
        assert_eq!(anchor_column(line, AnchorFallback::LineStart), 0);
    }

    #[test]
    fn columns_are_utf16_units() {
        // "é" is two bytes in UTF-8 but one UTF-16 unit.
        let line = "/* é */ function Foo() {";
        assert_eq!(anchor_column(line, AnchorFallback::LineEnd), 16);
    }

    #[test]
    fn every_lsp_line_terminator_splits() {
        assert_eq!(document_lines("a\r\nb\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(document_lines("a\r\rb"), vec!["a", "", "b"]);
        assert_eq!(document_lines("a\n"), vec!["a", ""]);
        assert_eq!(document_lines(""), vec![""]);
    }

    #[test]
    fn disable_comment_on_the_previous_line() {
        let lines = ["// react-compiler-marker-disable", "function Foo() {", "}"];
        assert!(is_disabled(&lines, 1));
        assert!(!is_disabled(&lines, 2));
        assert!(!is_disabled(&lines, 0));
    }
}
