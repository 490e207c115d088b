//! `workspace/executeCommand` handlers.
//!
//! Every command answers with a JSON object carrying `success`; failures add an
//! `error` message instead of surfacing as protocol errors.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower_lsp::lsp_types::Url;
use tower_lsp::lsp_types::notification::Notification;

use super::state::ServerState;
use crate::helpers;
use crate::report::{self, Progress, ReportOptions};

pub const ACTIVATE: &str = "react-compiler-marker/activate";
pub const DEACTIVATE: &str = "react-compiler-marker/deactivate";
pub const GET_COMPILED_OUTPUT: &str = "react-compiler-marker/getCompiledOutput";
pub const CHECK_ONCE: &str = "react-compiler-marker/checkOnce";
pub const GENERATE_REPORT: &str = "react-compiler-marker/generateReport";

pub const COMMANDS: [&str; 5] = [ACTIVATE, DEACTIVATE, GET_COMPILED_OUTPUT, CHECK_ONCE, GENERATE_REPORT];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProgressParams {
    pub report_id: Value,
    pub processed: usize,
    pub total: usize,
}

pub enum ReportProgress {}

impl Notification for ReportProgress {
    type Params = ReportProgressParams;
    const METHOD: &'static str = "react-compiler-marker/reportProgress";
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportArgs {
    root: Option<PathBuf>,
    report_id: Option<Value>,
    max_concurrency: Option<usize>,
    include_extensions: Option<Vec<String>>,
    exclude_dirs: Option<Vec<String>>,
}

/// Result of a command plus whether the client should re-request hints.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub response: Value,
    pub refresh_hints: bool,
}

impl CommandOutcome {
    fn reply(response: Value) -> Self {
        Self {
            response,
            refresh_hints: false,
        }
    }

    fn refreshing(response: Value) -> Self {
        Self {
            response,
            refresh_hints: true,
        }
    }
}

fn failure(message: impl std::fmt::Display) -> Value {
    json!({ "success": false, "error": message.to_string() })
}

pub async fn execute(
    state: &Arc<ServerState>,
    command: &str,
    arguments: Vec<Value>,
    progress: mpsc::UnboundedSender<ReportProgressParams>,
) -> CommandOutcome {
    match command {
        ACTIVATE | DEACTIVATE => {
            let activated = command == ACTIVATE;
            state.set_activated(activated);
            CommandOutcome::refreshing(json!({ "success": true, "activated": activated }))
        }
        CHECK_ONCE => CommandOutcome::refreshing(json!({ "success": true })),
        GET_COMPILED_OUTPUT => CommandOutcome::reply(compiled_output(state, arguments).await),
        GENERATE_REPORT => CommandOutcome::reply(generate_report(state, arguments, progress).await),
        _ => CommandOutcome::reply(failure("Unknown command")),
    }
}

async fn compiled_output(state: &Arc<ServerState>, arguments: Vec<Value>) -> Value {
    let Some(raw) = arguments.first().and_then(Value::as_str) else {
        return failure("No URI provided");
    };
    let Ok(uri) = Url::parse(raw) else {
        return failure(format!("Invalid URI: {raw}"));
    };
    let Some(document) = state.documents.get(uri.as_str()) else {
        return failure("Document not found");
    };

    let adapter = state.adapter.clone();
    let location = state.plugin_location();
    let filename = helpers::uri_to_file_name(&uri);
    let compiled =
        tokio::task::spawn_blocking(move || adapter.compiled_output(&document.text, &filename, &location)).await;

    match compiled {
        Ok(Ok(code)) => json!({ "success": true, "code": code }),
        Ok(Err(e)) => failure(e),
        Err(e) => failure(format!("Compilation task failed: {e}")),
    }
}

async fn generate_report(
    state: &Arc<ServerState>,
    arguments: Vec<Value>,
    progress: mpsc::UnboundedSender<ReportProgressParams>,
) -> Value {
    let args = match arguments.into_iter().next() {
        None | Some(Value::Null) => ReportArgs::default(),
        Some(value) => match serde_json::from_value::<ReportArgs>(value) {
            Ok(args) => args,
            Err(e) => return failure(format!("Invalid report options: {e}")),
        },
    };

    let Some(root) = args.root.clone().or_else(|| state.session().workspace_root) else {
        return failure("No workspace folder available");
    };

    let settings = state.settings();
    let options = ReportOptions {
        root: root.clone(),
        plugin_path_hint: settings.babel_plugin_path,
        max_concurrency: args.max_concurrency.or(settings.max_concurrency),
        include_extensions: args.include_extensions.or(settings.include_extensions),
        exclude_dirs: args.exclude_dirs.or(settings.exclude_dirs),
    };
    log::info!("Generating report for {}", root.display());

    let adapter = state.adapter.clone();
    let report_id = args.report_id;
    let scan = tokio::task::spawn_blocking(move || {
        let forward = |p: Progress| {
            if let Some(report_id) = &report_id {
                let _ = progress.send(ReportProgressParams {
                    report_id: report_id.clone(),
                    processed: p.processed,
                    total: p.total,
                });
            }
        };
        report::generate_report(&adapter, &options, &forward)
    })
    .await;

    match scan {
        Ok(Ok(report)) => {
            log::info!(
                "Report generated: scanned={} files={} success={} failed={}",
                report.totals.files_scanned,
                report.totals.files_with_results,
                report.totals.success_count,
                report.totals.failed_count
            );
            json!({ "success": true, "report": report })
        }
        Ok(Err(e)) => {
            log::error!("Report generation failed: {e:#}");
            failure(e)
        }
        Err(e) => failure(format!("Report task failed: {e}")),
    }
}
