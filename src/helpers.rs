use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tower_lsp::lsp_types::Url;

pub mod emojis {
    pub const SPARKLES: &str = "✨";
    pub const BLOCKED: &str = "🚫";
    pub const PIN: &str = "📍";
}

/// Digest of a text buffer, used for change detection and cache keys.
pub type ContentDigest = blake3::Hash;

pub fn compute_string_hash(text: &str) -> ContentDigest {
    blake3::hash(text.as_bytes())
}

/// The filename handed to the compiler for a document URI. `file://` URIs map to
/// their filesystem path; anything else (untitled buffers, virtual schemes) keeps
/// its URI path so cache keys stay distinct per document.
pub fn uri_to_file_name(uri: &Url) -> String {
    match uri.to_file_path() {
        Ok(path) => path.to_string_lossy().to_string(),
        Err(_) => uri.path().to_string(),
    }
}

pub fn workspace_root_from_uri(uri: &Url) -> Option<std::path::PathBuf> {
    uri.to_file_path().ok()
}

/// Lowercased extension including the leading dot, e.g. `.tsx`.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Rate-limited error log. Each warning site owns one instance so a compiler that
/// fails on every keystroke does not flood the log.
pub struct ThrottledLog {
    cooldown: Duration,
    last_fired: Mutex<Option<Instant>>,
}

impl ThrottledLog {
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: Mutex::new(None),
        }
    }

    /// Returns true when the cooldown has elapsed and the caller may log.
    pub fn should_fire(&self) -> bool {
        let mut last_fired = self.last_fired.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match *last_fired {
            Some(last) if now.duration_since(last) < self.cooldown => false,
            _ => {
                *last_fired = Some(now);
                true
            }
        }
    }

    pub fn error(&self, message: impl Display) {
        if self.should_fire() {
            log::error!("{message}");
        }
    }
}

impl Default for ThrottledLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COOLDOWN)
    }
}
