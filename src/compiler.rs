//! Compiler adapter.
//!
//! Wraps babel-plugin-react-compiler behind a [`CompilerBackend`] and isolates the
//! rest of the server from its failure modes. The diagnostics path never fails:
//! plugin resolution problems and compiler crashes are logged (throttled) and turn
//! into an empty [`CompileResult`]. The compiled-output path reports a typed
//! [`CompilerError`] instead, since its caller shows the message to the user.

pub mod events;
pub mod node;
pub mod resolve;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::cache::ResultCache;
use crate::helpers::ThrottledLog;

pub use events::{CompileResult, DiagnosticEvent, EventKind};
pub use resolve::{PluginLocation, PluginResolution, PluginSource, ResolveAttempt, resolve_plugin};

/// Whether the compiler should only report diagnostics or also generate code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    Diagnostics,
    Emit,
}

#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub source: &'a str,
    pub filename: &'a str,
    pub plugin_path: &'a Path,
    pub workspace_root: Option<&'a Path>,
    pub mode: EmitMode,
}

/// Raw result of one compiler run.
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    pub code: Option<String>,
    pub events: Vec<DiagnosticEvent>,
}

/// Something that can run the compiler on a buffer.
pub trait CompilerBackend: Send + Sync {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompilerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerError {
    PluginNotFound { attempts: Vec<ResolveAttempt> },
    Spawn { program: String, message: String },
    /// Parsing or transforming threw inside the compiler.
    Bridge { message: String },
    InvalidOutput { message: String },
    NoOutput,
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerError::PluginNotFound { attempts } => {
                write!(f, "babel-plugin-react-compiler is not available")?;
                for attempt in attempts {
                    write!(f, "; {attempt}")?;
                }
                Ok(())
            }
            CompilerError::Spawn { program, message } => write!(f, "Could not run {program}: {message}"),
            CompilerError::Bridge { message } => write!(
                f,
                "Failed to compile the file. Please check the file content. {message}"
            ),
            CompilerError::InvalidOutput { message } => write!(f, "{message}"),
            CompilerError::NoOutput => write!(f, "Compilation produced no output"),
        }
    }
}

impl std::error::Error for CompilerError {}

pub struct CompilerAdapter {
    backend: Arc<dyn CompilerBackend>,
    bundled_plugin: Option<PathBuf>,
    cache: ResultCache<CompileResult>,
    last_resolved: Mutex<Option<PathBuf>>,
    resolve_log: ThrottledLog,
    compile_log: ThrottledLog,
}

impl CompilerAdapter {
    pub fn new(backend: Arc<dyn CompilerBackend>, bundled_plugin: Option<PathBuf>) -> Self {
        Self {
            backend,
            bundled_plugin,
            cache: ResultCache::default(),
            last_resolved: Mutex::new(None),
            resolve_log: ThrottledLog::default(),
            compile_log: ThrottledLog::default(),
        }
    }

    pub fn with_log_cooldown(mut self, cooldown: std::time::Duration) -> Self {
        self.resolve_log = ThrottledLog::new(cooldown);
        self.compile_log = ThrottledLog::new(cooldown);
        self
    }

    pub fn cache(&self) -> &ResultCache<CompileResult> {
        &self.cache
    }

    /// Drop memoized results, e.g. after the plugin path setting changed.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Resolve the plugin and clear the cache if it now lives somewhere else.
    pub fn resolve(&self, location: &PluginLocation) -> Result<PathBuf, CompilerError> {
        match resolve_plugin(location, self.bundled_plugin.as_deref()) {
            PluginResolution::Found { path, source } => {
                let mut last = self.last_resolved.lock().unwrap_or_else(|e| e.into_inner());
                if last.as_ref() != Some(&path) {
                    if last.is_some() {
                        log::info!(
                            "babel-plugin-react-compiler moved to {} ({:?}), clearing cached results",
                            path.display(),
                            source
                        );
                        self.cache.clear();
                    }
                    *last = Some(path.clone());
                }
                Ok(path)
            }
            PluginResolution::NotFound { attempts } => Err(CompilerError::PluginNotFound { attempts }),
        }
    }

    /// Diagnostics for one buffer. Never fails; problems are logged and yield an
    /// empty result.
    pub fn check(&self, text: &str, filename: &str, location: &PluginLocation) -> CompileResult {
        let plugin_path = match self.resolve(location) {
            Ok(path) => path,
            Err(e) => {
                self.resolve_log.error(format!("Failed to load babel-plugin-react-compiler: {e}"));
                return CompileResult::default();
            }
        };

        if let Some(cached) = self.cache.get(text, filename) {
            return cached;
        }

        match self.run_diagnostics(text, filename, &plugin_path, location.workspace_root.as_deref()) {
            Ok(result) => {
                self.cache.set(text, filename, result.clone());
                result
            }
            Err(e) => {
                self.compile_log.error(format!("Error checking React Compiler for {filename}: {e}"));
                CompileResult::default()
            }
        }
    }

    /// Diagnostics against an already resolved plugin, bypassing the cache.
    /// Used by the workspace scanner, which records failures per file.
    pub fn run_diagnostics(
        &self,
        text: &str,
        filename: &str,
        plugin_path: &Path,
        workspace_root: Option<&Path>,
    ) -> Result<CompileResult, CompilerError> {
        let output = self.backend.compile(&CompileRequest {
            source: text,
            filename,
            plugin_path,
            workspace_root,
            mode: EmitMode::Diagnostics,
        })?;

        if output.code.is_none() {
            return Err(CompilerError::NoOutput);
        }

        Ok(CompileResult::partition(output.events))
    }

    /// Full compilation, returning the generated code.
    pub fn compiled_output(
        &self,
        text: &str,
        filename: &str,
        location: &PluginLocation,
    ) -> Result<String, CompilerError> {
        let plugin_path = self.resolve(location)?;
        let output = self.backend.compile(&CompileRequest {
            source: text,
            filename,
            plugin_path: &plugin_path,
            workspace_root: location.workspace_root.as_deref(),
            mode: EmitMode::Emit,
        })?;

        output.code.ok_or(CompilerError::NoOutput)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Backend that answers from a closure and counts invocations.
    pub struct FakeBackend<F> {
        respond: F,
        pub calls: AtomicUsize,
    }

    impl<F> FakeBackend<F>
    where
        F: Fn(&CompileRequest<'_>) -> Result<CompileOutput, CompilerError> + Send + Sync,
    {
        pub fn new(respond: F) -> Self {
            Self {
                respond,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl<F> CompilerBackend for FakeBackend<F>
    where
        F: Fn(&CompileRequest<'_>) -> Result<CompileOutput, CompilerError> + Send + Sync,
    {
        fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompilerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)(request)
        }
    }

    pub fn success_event(line: u32, name: &str) -> DiagnosticEvent {
        serde_json::from_value(serde_json::json!({
            "kind": "CompileSuccess",
            "fnLoc": {"start": {"line": line, "column": 0}, "end": {"line": line + 2, "column": 1}},
            "fnName": name,
        }))
        .unwrap()
    }

    pub fn failure_event(line: u32, name: &str, reason: &str) -> DiagnosticEvent {
        serde_json::from_value(serde_json::json!({
            "kind": "CompileError",
            "fnLoc": {"start": {"line": line, "column": 0}, "end": {"line": line + 2, "column": 1}},
            "fnName": name,
            "detail": {"options": {"reason": reason}},
        }))
        .unwrap()
    }

    /// A directory that exists, usable as a resolved plugin path.
    pub fn plugin_dir() -> (tempfile::TempDir, PluginLocation) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/babel-plugin-react-compiler")).unwrap();
        let location = PluginLocation::new(
            Some(dir.path().to_path_buf()),
            "node_modules/babel-plugin-react-compiler",
        );
        (dir, location)
    }
}
