//! Tooltip rendering for compiled and failed components.

use serde_json::json;

use crate::compiler::DiagnosticEvent;
use crate::helpers::emojis::PIN;
use crate::settings::TooltipMarkup;

const COMMAND_PREFIX: &str = "command:react-compiler-marker";

/// Which `command:` links a tooltip may carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkOptions {
    pub command_links: bool,
    pub fix_with_ai: bool,
}

struct Writer {
    markup: TooltipMarkup,
    out: String,
}

impl Writer {
    fn new(markup: TooltipMarkup) -> Self {
        Self {
            markup,
            out: String::new(),
        }
    }

    fn text(&mut self, text: &str) -> &mut Self {
        match self.markup {
            TooltipMarkup::Markdown => self.out.push_str(text),
            TooltipMarkup::Html => self.out.push_str(&escape_html(text)),
        }
        self
    }

    fn bold(&mut self, text: &str) -> &mut Self {
        match self.markup {
            TooltipMarkup::Markdown => self.out.push_str(&format!("**{text}**")),
            TooltipMarkup::Html => self.out.push_str(&format!("<b>{}</b>", escape_html(text))),
        }
        self
    }

    fn link(&mut self, label: &str, target: &str) -> &mut Self {
        match self.markup {
            TooltipMarkup::Markdown => self.out.push_str(&format!("[{label}]({target})")),
            TooltipMarkup::Html => self
                .out
                .push_str(&format!("<a href=\"{}\">{}</a>", escape_html(target), escape_html(label))),
        }
        self
    }

    fn paragraph_break(&mut self) -> &mut Self {
        match self.markup {
            TooltipMarkup::Markdown => self.out.push_str("\n\n"),
            TooltipMarkup::Html => self.out.push_str("<br><br>"),
        }
        self
    }

    fn divider(&mut self) -> &mut Self {
        match self.markup {
            TooltipMarkup::Markdown => self.out.push_str("\n\n---\n\n"),
            TooltipMarkup::Html => self.out.push_str("<hr>"),
        }
        self
    }

    fn finish(self) -> String {
        self.out
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn command(name: &str, args: Option<serde_json::Value>) -> String {
    match args {
        Some(args) => format!(
            "{COMMAND_PREFIX}.{name}?{}",
            urlencoding::encode(&args.to_string())
        ),
        None => format!("{COMMAND_PREFIX}.{name}"),
    }
}

pub fn success(emoji: &str, name: &str, markup: TooltipMarkup, links: LinkOptions) -> String {
    let mut w = Writer::new(markup);
    w.text(emoji)
        .text(" ")
        .bold(name)
        .text(" has been auto-memoized by React Compiler.");

    if links.command_links {
        w.paragraph_break()
            .link("Preview compiled output", &command("previewCompiled", None));
    }
    w.finish()
}

/// One tooltip for every failure reported against the same function.
pub fn failures(
    emoji: &str,
    name: &str,
    events: &[&DiagnosticEvent],
    filename: &str,
    markup: TooltipMarkup,
    links: LinkOptions,
) -> String {
    let mut w = Writer::new(markup);
    w.text(emoji)
        .text(" ")
        .bold(name)
        .text(" hasn't been memoized by React Compiler.");

    for (i, event) in events.iter().enumerate() {
        if i == 0 {
            w.paragraph_break();
        } else {
            w.divider();
        }
        failure_section(&mut w, event, filename, links);
    }
    w.finish()
}

fn failure_section(w: &mut Writer, event: &DiagnosticEvent, filename: &str, links: LinkOptions) {
    let reason = event.reason();
    w.bold("Reason:").text(" ").text(reason);

    if let Some(description) = event.description() {
        w.paragraph_break().text(description);
    }

    let Some(span) = event.error_span() else {
        return;
    };

    let location = if span.start_line == span.end_line {
        format!("{PIN} Line {}", span.start_line + 1)
    } else {
        format!("{PIN} Lines {}-{}", span.start_line + 1, span.end_line + 1)
    };
    w.paragraph_break();

    if links.command_links {
        let reveal = json!({
            "start": {"line": span.start_line, "character": span.start_character},
            "end": {"line": span.end_line, "character": span.end_character},
        });
        w.link(&location, &command("revealSelection", Some(reveal)));
    } else {
        w.text(&location);
    }

    if links.command_links && links.fix_with_ai {
        let fix = json!({
            "reason": reason,
            "filename": filename,
            "startLine": span.start_line,
            "endLine": span.end_line,
        });
        w.text(" ").link("Fix with AI", &command("fixWithAI", Some(fix)));
    }
}
