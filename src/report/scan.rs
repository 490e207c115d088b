use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashSet;
use rayon::ThreadPoolBuilder;

use crate::helpers;

pub const DEFAULT_EXTENSIONS: [&str; 6] = [".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs"];
pub const DEFAULT_EXCLUDES: [&str; 8] = [
    "node_modules",
    ".git",
    "dist",
    "build",
    "out",
    "coverage",
    ".next",
    ".turbo",
];

/// Source files under `root`, skipping excluded directory names at any depth.
/// Unreadable directories are skipped along with everything below them.
pub fn list_source_files(root: &Path, extensions: &AHashSet<String>, excludes: &AHashSet<String>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "Could not read directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();

            if file_type.is_dir() {
                let excluded = entry.file_name().to_str().is_some_and(|name| excludes.contains(name));
                if !excluded {
                    stack.push(path);
                }
            } else if file_type.is_file()
                && helpers::dotted_extension(&path).is_some_and(|ext| extensions.contains(&ext))
            {
                files.push(path);
            }
        }
    }

    files
}

/// Run `worker` over `items` on `limit` threads (at least one, at most one per
/// item). Workers claim the next index from a shared cursor until none are
/// left; results come back in input order.
pub fn map_with_concurrency<T, R, F>(items: &[T], limit: usize, worker: F) -> anyhow::Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let workers = limit.min(items.len()).max(1);
    let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
    let cursor = AtomicUsize::new(0);
    let slots: Vec<Mutex<Option<R>>> = items.iter().map(|_| Mutex::new(None)).collect();

    pool.scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|_| {
                loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = items.get(index) else {
                        break;
                    };
                    let result = worker(item);
                    *slots[index].lock().unwrap_or_else(|e| e.into_inner()) = Some(result);
                }
            });
        }
    });

    Ok(slots
        .into_iter()
        .filter_map(|slot| slot.into_inner().unwrap_or_else(|e| e.into_inner()))
        .collect())
}

/// Default worker count: all cores but one, for the editor.
pub fn default_concurrency() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> AHashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "export {};").unwrap();
    }

    #[test]
    fn walks_nested_folders_and_honors_excludes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/App.tsx");
        touch(dir.path(), "src/components/Button.JSX");
        touch(dir.path(), "src/styles.css");
        touch(dir.path(), "node_modules/react/index.js");
        touch(dir.path(), "packages/ui/dist/bundle.js");

        let mut files = list_source_files(dir.path(), &set(&DEFAULT_EXTENSIONS), &set(&DEFAULT_EXCLUDES));
        files.sort();

        let relative: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("src/App.tsx"),
                PathBuf::from("src/components/Button.JSX"),
            ]
        );
    }

    #[test]
    fn custom_extensions_narrow_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.ts");
        touch(dir.path(), "b.tsx");

        let files = list_source_files(dir.path(), &set(&[".tsx"]), &set(&[]));
        assert_eq!(files, vec![dir.path().join("b.tsx")]);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = list_source_files(&dir.path().join("nope"), &set(&DEFAULT_EXTENSIONS), &set(&[]));
        assert!(files.is_empty());
    }

    #[test]
    fn results_keep_input_order() {
        let items: Vec<usize> = (0..100).collect();
        let results = map_with_concurrency(&items, 4, |n| n * 2).unwrap();
        assert_eq!(results, items.iter().map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn every_item_is_processed_exactly_once() {
        let calls = AtomicUsize::new(0);
        let items = vec![(); 37];
        let results = map_with_concurrency(&items, 64, |_| calls.fetch_add(1, Ordering::SeqCst)).unwrap();

        assert_eq!(results.len(), 37);
        assert_eq!(calls.load(Ordering::SeqCst), 37);
    }

    #[test]
    fn zero_limit_still_uses_one_worker() {
        let results = map_with_concurrency(&[1, 2, 3], 0, |n| n + 1).unwrap();
        assert_eq!(results, vec![2, 3, 4]);
    }
}
