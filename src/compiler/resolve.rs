use std::fmt;
use std::path::{Path, PathBuf};

/// Where a resolved plugin came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginSource {
    /// `babelPluginPath` under the workspace root.
    Workspace,
    /// The copy shipped alongside the server.
    Bundled,
}

/// One resolution attempt that did not produce a usable plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveAttempt {
    pub source: PluginSource,
    pub path: Option<PathBuf>,
    pub reason: String,
}

impl fmt::Display for ResolveAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            PluginSource::Workspace => "workspace",
            PluginSource::Bundled => "bundled",
        };
        match &self.path {
            Some(path) => write!(f, "{source} ({}): {}", path.display(), self.reason),
            None => write!(f, "{source}: {}", self.reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginResolution {
    Found { path: PathBuf, source: PluginSource },
    NotFound { attempts: Vec<ResolveAttempt> },
}

/// Where to look for babel-plugin-react-compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginLocation {
    pub workspace_root: Option<PathBuf>,
    pub plugin_path_hint: String,
}

impl PluginLocation {
    pub fn new(workspace_root: Option<PathBuf>, plugin_path_hint: impl Into<String>) -> Self {
        Self {
            workspace_root,
            plugin_path_hint: plugin_path_hint.into(),
        }
    }
}

/// Resolve the plugin: first the workspace-relative hint, then the bundled copy.
/// Both attempts are recorded when neither yields an existing path.
pub fn resolve_plugin(location: &PluginLocation, bundled: Option<&Path>) -> PluginResolution {
    let mut attempts = Vec::new();

    match &location.workspace_root {
        Some(root) => {
            let candidate = root.join(&location.plugin_path_hint);
            if candidate.exists() {
                return PluginResolution::Found {
                    path: candidate,
                    source: PluginSource::Workspace,
                };
            }
            attempts.push(ResolveAttempt {
                source: PluginSource::Workspace,
                path: Some(candidate),
                reason: "path does not exist".to_string(),
            });
        }
        None => attempts.push(ResolveAttempt {
            source: PluginSource::Workspace,
            path: None,
            reason: "no workspace folder".to_string(),
        }),
    }

    match bundled {
        Some(path) if path.exists() => {
            return PluginResolution::Found {
                path: path.to_path_buf(),
                source: PluginSource::Bundled,
            };
        }
        Some(path) => attempts.push(ResolveAttempt {
            source: PluginSource::Bundled,
            path: Some(path.to_path_buf()),
            reason: "path does not exist".to_string(),
        }),
        None => attempts.push(ResolveAttempt {
            source: PluginSource::Bundled,
            path: None,
            reason: "no bundled plugin configured".to_string(),
        }),
    }

    PluginResolution::NotFound { attempts }
}
