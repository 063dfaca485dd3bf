//! Indexed-file catalog and its grouped display view.
//!
//! The list is always refetched and replaced wholesale, never patched.
//! Grouping is a pure derivation over whatever list is current:
//!
//! ```text
//! repoA/x.md, repoA/y.md, standalone.txt
//!   └─▶ repoA:   [x.md, y.md]
//!       uploads: [standalone.txt]
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::models::IndexedFile;
use crate::service::{bounded, DocService};

/// Group for paths without a `/`.
pub const SENTINEL_GROUP: &str = "uploads";
pub const DEFAULT_GROUP_DISPLAY_LIMIT: usize = 10;

/// Grouping key of a path: its first segment, or [`SENTINEL_GROUP`].
pub fn group_key(path: &str) -> &str {
    match path.split_once('/') {
        Some((first, _)) => first,
        None => SENTINEL_GROUP,
    }
}

/// One display group. `shown` is capped; `total` is not.
#[derive(Debug, Clone, PartialEq)]
pub struct FileGroup<'a> {
    pub name: &'a str,
    pub shown: Vec<&'a IndexedFile>,
    pub total: usize,
}

impl FileGroup<'_> {
    pub fn remaining(&self) -> usize {
        self.total - self.shown.len()
    }

    /// `"+N more files"` when the group was capped.
    pub fn more_label(&self) -> Option<String> {
        match self.remaining() {
            0 => None,
            n => Some(format!("+{} more files", n)),
        }
    }
}

/// Group `files` by first path segment.
///
/// Groups appear in order of first occurrence and files keep their list
/// order within a group. At most `limit` files are shown per group.
pub fn group_files(files: &[IndexedFile], limit: usize) -> Vec<FileGroup<'_>> {
    let mut groups: Vec<FileGroup<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for file in files {
        let key = group_key(&file.path);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(FileGroup {
                name: key,
                shown: Vec::new(),
                total: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total += 1;
        if group.shown.len() < limit {
            group.shown.push(file);
        }
    }

    groups
}

/// Catalog contents as seen by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogView {
    files: Vec<IndexedFile>,
    pending: usize,
    generation: u64,
}

impl CatalogView {
    pub fn files(&self) -> &[IndexedFile] {
        &self.files
    }

    /// True while any fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    pub fn groups(&self, limit: usize) -> Vec<FileGroup<'_>> {
        group_files(&self.files, limit)
    }
}

pub struct FileCatalog {
    service: Arc<dyn DocService>,
    call_timeout: Duration,
    state: watch::Sender<CatalogView>,
}

/// Decrements the outstanding-fetch count even if the load is cancelled.
struct PendingGuard<'a>(&'a watch::Sender<CatalogView>);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|s| s.pending = s.pending.saturating_sub(1));
    }
}

impl FileCatalog {
    pub fn new(service: Arc<dyn DocService>, call_timeout: Duration) -> Self {
        let (tx, _rx) = watch::channel(CatalogView::default());
        Self {
            service,
            call_timeout,
            state: tx,
        }
    }

    pub fn view(&self) -> CatalogView {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogView> {
        self.state.subscribe()
    }

    /// Fetch the file list and replace the stored one.
    ///
    /// Failures are logged and leave the previous list in place. When
    /// loads overlap, only the most recently started one may store its
    /// list. Returns whether the list was replaced.
    pub async fn load_catalog(&self) -> bool {
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            s.pending += 1;
            generation = s.generation;
        });
        let _pending = PendingGuard(&self.state);

        match bounded(self.call_timeout, self.service.list_files()).await {
            Ok(files) => {
                let count = files.len();
                let applied = self.state.send_if_modified(|s| {
                    if s.generation != generation {
                        return false;
                    }
                    s.files = files;
                    true
                });
                if applied {
                    tracing::info!("catalog refreshed: {} files", count);
                } else {
                    tracing::debug!("discarded stale catalog fetch #{}", generation);
                }
                applied
            }
            Err(e) => {
                tracing::warn!("Failed to load files: {}", e);
                false
            }
        }
    }
}
