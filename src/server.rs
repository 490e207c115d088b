//! Language server front end.
//!
//! Translates LSP traffic into calls on [`ServerState`] and pushes results
//! (hint refreshes, report progress, log lines) back to the client.

pub mod commands;
pub mod state;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

pub use state::{ServerConfig, ServerState};

use crate::settings::Settings;

pub struct ReactCompilerServer {
    client: Client,
    state: Arc<ServerState>,
}

impl ReactCompilerServer {
    pub fn new(client: Client, state: ServerState) -> Self {
        Self {
            client,
            state: Arc::new(state),
        }
    }

    async fn log(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.client.log_message(MessageType::INFO, message).await;
    }

    async fn refresh_hints(&self) {
        if let Err(e) = self.client.inlay_hint_refresh().await {
            log::debug!("Inlay hint refresh failed: {e}");
        }
    }

    /// Forward report progress to the client until the sender side is dropped.
    fn spawn_progress_forwarder(&self) -> mpsc::UnboundedSender<commands::ReportProgressParams> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        tokio::spawn(async move {
            while let Some(params) = rx.recv().await {
                client.send_notification::<commands::ReportProgress>(params).await;
            }
        });
        tx
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for ReactCompilerServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let session = self.state.initialize(&params);
        let hover = session.profile.hover_enabled();

        self.log(format!(
            "Client connected: {} (tooltipFormat: {:?}, hover: {}, workspace: {})",
            params
                .client_info
                .as_ref()
                .map_or("Unknown", |info| info.name.as_str()),
            session.markup,
            if hover { "enabled" } else { "disabled" },
            session
                .workspace_root
                .as_ref()
                .map_or("none".to_string(), |root| root.display().to_string()),
        ))
        .await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                inlay_hint_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(hover)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: commands::COMMANDS.iter().map(|c| c.to_string()).collect(),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "React Compiler Marker LSP".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.log("React Compiler Marker LSP Server initialized").await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.state
            .sync_document(&document.uri, &document.language_id, document.version, &document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole text.
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let document = params.text_document;
        self.state
            .sync_document(&document.uri, "", document.version, &change.text);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.state.documents.on_close(params.text_document.uri.as_str());
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        if let Some(settings) = Settings::from_change(&params.settings) {
            if self.state.apply_settings(settings) {
                self.log("babel-plugin-react-compiler path changed, cleared cached results")
                    .await;
            }
        }
        self.refresh_hints().await;
    }

    async fn inlay_hint(&self, params: InlayHintParams) -> Result<Option<Vec<InlayHint>>> {
        let uri = params.text_document.uri;
        log::debug!("Process inlay hints for {uri}");

        let Some(hints) = self.state.hints(&uri).await else {
            return Ok(None);
        };
        let range = params.range;
        Ok(Some(
            hints
                .iter()
                .filter(|hint| (range.start.line..=range.end.line).contains(&hint.position.line))
                .map(|hint| hint.to_inlay_hint())
                .collect(),
        ))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params;
        let tooltip = self
            .state
            .hover(&position.text_document.uri, position.position.line)
            .await;

        Ok(tooltip.map(|tooltip| Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: tooltip.value,
            }),
            range: None,
        }))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        let progress = self.spawn_progress_forwarder();
        let outcome = commands::execute(&self.state, &params.command, params.arguments, progress).await;

        if outcome.refresh_hints {
            self.refresh_hints().await;
        }
        Ok(Some(outcome.response))
    }
}
