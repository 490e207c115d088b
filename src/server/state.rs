//! Per-connection server state.
//!
//! Everything mutable lives here rather than in globals, so each server
//! instance (and each test) gets its own documents, cache and timers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tower_lsp::lsp_types::{InitializeParams, Url};

use crate::compiler::node::NodeBackend;
use crate::compiler::{CompileResult, CompilerAdapter, PluginLocation};
use crate::debounce::{self, Debouncer};
use crate::documents::{DocumentStore, SyncAction};
use crate::helpers;
use crate::hints::{self, Hint, HintConfig, Tooltip};
use crate::settings::{ClientProfile, Settings, TooltipMarkup};

/// Language ids the compiler understands.
pub const SUPPORTED_LANGUAGES: [&str; 4] = ["javascript", "typescript", "javascriptreact", "typescriptreact"];

pub const HINT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub node: PathBuf,
    pub bundled_plugin: Option<PathBuf>,
    pub debounce: Duration,
    pub hint_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node: PathBuf::from("node"),
            bundled_plugin: None,
            debounce: debounce::DEFAULT_DELAY,
            hint_timeout: HINT_TIMEOUT,
        }
    }
}

/// What we learned about the client during `initialize`.
#[derive(Debug, Clone, Default)]
pub struct ClientSession {
    pub workspace_root: Option<PathBuf>,
    pub profile: ClientProfile,
    pub markup: TooltipMarkup,
}

pub struct ServerState {
    pub documents: DocumentStore,
    pub adapter: Arc<CompilerAdapter>,
    debouncer: Debouncer<Vec<Hint>>,
    settings: Mutex<Settings>,
    session: Mutex<ClientSession>,
    activated: AtomicBool,
    config: ServerConfig,
}

impl ServerState {
    pub fn new(adapter: Arc<CompilerAdapter>, config: ServerConfig) -> Self {
        Self {
            documents: DocumentStore::new(),
            adapter,
            debouncer: Debouncer::new(),
            settings: Mutex::new(Settings::default()),
            session: Mutex::new(ClientSession::default()),
            activated: AtomicBool::new(true),
            config,
        }
    }

    /// State backed by the node compiler bridge.
    pub fn with_node_backend(config: ServerConfig) -> Self {
        let backend = Arc::new(NodeBackend::new(config.node.clone()));
        let adapter = Arc::new(CompilerAdapter::new(backend, config.bundled_plugin.clone()));
        Self::new(adapter, config)
    }

    pub fn initialize(&self, params: &InitializeParams) -> ClientSession {
        let root_uri = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| &folder.uri)
            .or(params.root_uri.as_ref());

        let session = ClientSession {
            workspace_root: root_uri.and_then(helpers::workspace_root_from_uri),
            profile: ClientProfile::new(params.client_info.as_ref().map(|info| info.name.as_str())),
            markup: TooltipMarkup::from_initialization_options(params.initialization_options.as_ref()),
        };
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = session.clone();
        session
    }

    pub fn session(&self) -> ClientSession {
        self.session.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the settings. Returns whether the plugin path changed, in which
    /// case cached results were dropped.
    pub fn apply_settings(&self, settings: Settings) -> bool {
        let mut current = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        let plugin_changed = current.babel_plugin_path != settings.babel_plugin_path;
        *current = settings;
        if plugin_changed {
            self.adapter.clear_cache();
        }
        plugin_changed
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }

    pub fn set_activated(&self, activated: bool) {
        self.activated.store(activated, Ordering::SeqCst);
    }

    pub fn plugin_location(&self) -> PluginLocation {
        PluginLocation::new(self.session().workspace_root, self.settings().babel_plugin_path)
    }

    pub fn sync_document(&self, uri: &Url, language_id: &str, version: i32, text: &str) -> SyncAction {
        let action = self.documents.on_open_or_change(uri.as_str(), language_id, version, text);
        match action {
            SyncAction::Suppressed => log::debug!("{uri}: content unchanged, skipping"),
            SyncAction::Initialized => log::debug!("{uri}: opened at version {version}"),
            SyncAction::Updated(version) => log::debug!("{uri}: now at version {version}"),
        }
        action
    }

    /// Hint inputs for an open, supported document while the server is active.
    fn hint_job(&self, uri: &Url) -> Option<HintJob> {
        if !self.is_activated() {
            return None;
        }
        let document = self.documents.get(uri.as_str())?;
        if !SUPPORTED_LANGUAGES.contains(&document.language_id.as_str()) {
            return None;
        }

        let session = self.session();
        let settings = self.settings();
        let filename = helpers::uri_to_file_name(uri);
        Some(HintJob {
            adapter: self.adapter.clone(),
            config: HintConfig::from_settings(&settings, session.markup, &session.profile, filename.clone()),
            location: PluginLocation::new(session.workspace_root, settings.babel_plugin_path),
            text: document.text,
            filename,
        })
    }

    /// Debounced hints for `uri`. `None` means no hints right now: inactive,
    /// unknown document, superseded by a newer request, or timed out.
    pub async fn hints(&self, uri: &Url) -> Option<Vec<Hint>> {
        let job = self.hint_job(uri)?;
        let scheduled = self
            .debouncer
            .schedule(uri.as_str(), move || Ok(job.run()), self.config.debounce);

        match tokio::time::timeout(self.config.hint_timeout, scheduled).await {
            Ok(hints) => hints,
            Err(_) => {
                log::warn!("Timed out computing hints for {uri}");
                None
            }
        }
    }

    /// Tooltip of the hint on `line`, computed without debouncing.
    pub async fn hover(&self, uri: &Url, line: u32) -> Option<Tooltip> {
        let job = self.hint_job(uri)?;
        let hints = tokio::task::spawn_blocking(move || job.run()).await.ok()?;
        hints::hover_at(&hints, line).cloned()
    }
}

struct HintJob {
    adapter: Arc<CompilerAdapter>,
    config: HintConfig,
    location: PluginLocation,
    text: Arc<str>,
    filename: String,
}

impl HintJob {
    fn run(self) -> Vec<Hint> {
        let CompileResult {
            successful_compilations,
            failed_compilations,
        } = self.adapter.check(&self.text, &self.filename, &self.location);
        hints::project(&self.text, &successful_compilations, &failed_compilations, &self.config)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::compiler::testing::{FakeBackend, plugin_dir, success_event};
    use crate::compiler::{CompileOutput, CompileRequest};
    use serde_json::json;
    use tower_lsp::lsp_types::{ClientInfo, WorkspaceFolder};

    pub(crate) fn test_state(root: &std::path::Path) -> ServerState {
        let backend = FakeBackend::new(|request: &CompileRequest<'_>| {
            let events = request
                .source
                .lines()
                .enumerate()
                .filter(|(_, line)| line.contains("function"))
                .map(|(i, _)| success_event(i as u32 + 1, "Widget"))
                .collect();
            Ok(CompileOutput {
                code: Some(format!("// compiled\n{}", request.source)),
                events,
            })
        });
        let config = ServerConfig {
            debounce: Duration::from_millis(10),
            ..ServerConfig::default()
        };
        let state = ServerState::new(Arc::new(CompilerAdapter::new(Arc::new(backend), None)), config);
        state.initialize(&InitializeParams {
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: Url::from_directory_path(root).unwrap(),
                name: "app".to_string(),
            }]),
            client_info: Some(ClientInfo {
                name: "Visual Studio Code".to_string(),
                version: None,
            }),
            ..InitializeParams::default()
        });
        state
    }

    pub(crate) fn open(state: &ServerState, root: &std::path::Path, name: &str, text: &str) -> Url {
        let uri = Url::from_file_path(root.join(name)).unwrap();
        state.sync_document(&uri, "typescriptreact", 1, text);
        uri
    }

    #[test]
    fn initialize_reads_client_details() {
        let (dir, _) = plugin_dir();
        let state = test_state(dir.path());
        let session = state.session();

        assert_eq!(session.workspace_root.as_deref(), Some(dir.path()));
        assert!(session.profile.is_vscode());
        assert_eq!(session.markup, TooltipMarkup::Markdown);
    }

    #[test]
    fn html_markup_from_initialization_options() {
        let state = ServerState::with_node_backend(ServerConfig::default());
        let session = state.initialize(&InitializeParams {
            initialization_options: Some(json!({"tooltipFormat": "html"})),
            ..InitializeParams::default()
        });
        assert_eq!(session.markup, TooltipMarkup::Html);
        assert_eq!(session.workspace_root, None);
    }

    #[tokio::test]
    async fn hints_for_an_open_document() {
        let (dir, _) = plugin_dir();
        let state = test_state(dir.path());
        let uri = open(&state, dir.path(), "Widget.tsx", "export function Widget() { return null; }");

        let hints = state.hints(&uri).await.unwrap();
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].position.character, "export function".len() as u32);
    }

    #[tokio::test]
    async fn no_hints_when_deactivated_or_unsupported() {
        let (dir, _) = plugin_dir();
        let state = test_state(dir.path());
        let uri = open(&state, dir.path(), "Widget.tsx", "function Widget() {}");

        state.set_activated(false);
        assert!(state.hints(&uri).await.is_none());
        state.set_activated(true);

        let css = Url::from_file_path(dir.path().join("styles.css")).unwrap();
        state.sync_document(&css, "css", 1, "function {}");
        assert!(state.hints(&css).await.is_none());

        let unknown = Url::from_file_path(dir.path().join("Closed.tsx")).unwrap();
        assert!(state.hints(&unknown).await.is_none());
    }

    #[tokio::test]
    async fn hover_returns_the_tooltip_on_the_line() {
        let (dir, _) = plugin_dir();
        let state = test_state(dir.path());
        let uri = open(&state, dir.path(), "Widget.tsx", "import x from 'x';\nfunction Widget() {}");

        let tooltip = state.hover(&uri, 1).await.unwrap();
        assert!(tooltip.value.contains("auto-memoized"));
        assert!(state.hover(&uri, 0).await.is_none());
    }

    #[test]
    fn changing_the_plugin_path_clears_cached_results() {
        let (dir, location) = plugin_dir();
        let state = test_state(dir.path());
        state.adapter.check("function A() {}", "A.tsx", &location);
        assert_eq!(state.adapter.cache().len(), 1);

        assert!(!state.apply_settings(Settings::default()));
        assert_eq!(state.adapter.cache().len(), 1);

        let moved = Settings {
            babel_plugin_path: "vendor/compiler".to_string(),
            ..Settings::default()
        };
        assert!(state.apply_settings(moved));
        assert!(state.adapter.cache().is_empty());
    }
}
