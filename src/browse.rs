//! Directory listing over an active share session
//!
//! A listing resolves the browse target, drops hidden entries, sorts
//! what is left by creation time (newest first) and projects each
//! survivor for display. Results are cached while anyone still holds a
//! [`Listing`] and for a grace window after the last one is dropped;
//! only successful listings enter the cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::{BrowseError, TransportError};
use crate::session::{SessionSlot, ShareSession};
use crate::share::{RemoteEntry, ShareConnection};

/// Root listing index probed when no explicit path is given
const DEFAULT_ROOT_INDEX: usize = 1;

/// Substring probed for when picking the target subdirectory
const DEFAULT_MARKER: &str = "Sample";

/// Which directory a listing operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseTarget {
    /// An explicit path below the share root
    Path(PathBuf),
    /// Walk the share root: take the entry at `root_index`, list it and
    /// pick its first subdirectory whose name contains `marker`
    Probe { root_index: usize, marker: String },
}

impl Default for BrowseTarget {
    fn default() -> Self {
        Self::Probe {
            root_index: DEFAULT_ROOT_INDEX,
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

/// Display-ready projection of one remote entry
#[derive(Debug, Clone, PartialEq)]
pub struct ShareEntry {
    /// Name exactly as the share reports it
    pub name: String,
    /// Name with the first letter uppercased and the last character
    /// dropped
    pub title: String,
    pub is_dir: bool,
    /// `"1 item"` / `"N items"` for directories, empty for files
    pub item_count: String,
    /// Remote path, the handle for later operations on this entry
    pub path: PathBuf,
}

/// A cached listing lease.
///
/// The cache stays warm while at least one `Listing` is alive and for
/// the grace window after the last one goes away.
pub struct Listing {
    entries: Arc<Vec<ShareEntry>>,
    _lease: Lease,
}

impl std::fmt::Debug for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listing")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl Listing {
    pub fn entries(&self) -> &[ShareEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::ops::Deref for Listing {
    type Target = [ShareEntry];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

#[derive(Debug)]
struct CacheState {
    entries: Arc<Vec<ShareEntry>>,
    active: usize,
    released_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct CacheShared {
    state: Mutex<Option<CacheState>>,
}

struct Lease {
    cache: Arc<CacheShared>,
}

impl Lease {
    fn new(cache: &Arc<CacheShared>) -> Self {
        Self {
            cache: Arc::clone(cache),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut guard = self.cache.state.lock();
        if let Some(state) = guard.as_mut() {
            state.active = state.active.saturating_sub(1);
            if state.active == 0 {
                state.released_at = Some(Instant::now());
            }
        }
    }
}

/// Lists and projects the contents of the browse target.
#[derive(Debug)]
pub struct Browser {
    slot: Arc<SessionSlot>,
    target: BrowseTarget,
    cache: Arc<CacheShared>,
    grace: Duration,
    selection: Mutex<Option<ShareEntry>>,
}

impl Browser {
    pub fn new(slot: Arc<SessionSlot>) -> Self {
        Self {
            slot,
            target: BrowseTarget::default(),
            cache: Arc::new(CacheShared::default()),
            grace: ClientConfig::default().listing_grace(),
            selection: Mutex::new(None),
        }
    }

    pub fn with_config(slot: Arc<SessionSlot>, config: &ClientConfig) -> Self {
        let mut browser = Self::new(slot);
        browser.grace = config.listing_grace();
        browser
    }

    /// Replace the browse target. Intended for construction time; the
    /// cache starts out empty either way.
    pub fn target(mut self, target: BrowseTarget) -> Self {
        self.target = target;
        self
    }

    /// Remember an entry for a later [`fetch_selected`] call
    ///
    /// [`fetch_selected`]: crate::fetch::Fetcher::fetch_selected
    pub fn select(&self, entry: ShareEntry) {
        *self.selection.lock() = Some(entry);
    }

    pub fn clear_selection(&self) {
        *self.selection.lock() = None;
    }

    pub fn selected(&self) -> Option<ShareEntry> {
        self.selection.lock().clone()
    }

    /// The entries of the browse target, via the cache when it is warm.
    ///
    /// Failures are never cached; the next call runs the listing again.
    pub async fn entries(&self) -> Result<Listing, BrowseError> {
        {
            let mut guard = self.cache.state.lock();
            if let Some(state) = guard.as_mut() {
                let reusable = state.active > 0
                    || state
                        .released_at
                        .is_some_and(|at| at.elapsed() < self.grace);
                if reusable {
                    state.active += 1;
                    state.released_at = None;
                    return Ok(Listing {
                        entries: Arc::clone(&state.entries),
                        _lease: Lease::new(&self.cache),
                    });
                }
            }
        }

        let session = self.slot.current().ok_or(BrowseError::NotConnected)?;
        let entries = Arc::new(self.fetch_listing(session.as_ref()).await?);

        let mut guard = self.cache.state.lock();
        *guard = Some(CacheState {
            entries: Arc::clone(&entries),
            active: 1,
            released_at: None,
        });
        Ok(Listing {
            entries,
            _lease: Lease::new(&self.cache),
        })
    }

    async fn fetch_listing(
        &self,
        session: &ShareSession,
    ) -> Result<Vec<ShareEntry>, BrowseError> {
        let conn = session.connection();
        let dir = self.resolve_target(conn).await?;

        let raw = conn
            .list_dir(&dir)
            .await
            .map_err(|e| listing_error(&dir, e))?;
        let visible = visible_sorted(raw);

        let mut entries = Vec::with_capacity(visible.len());
        for remote in visible {
            entries.push(project(conn, remote).await?);
        }
        Ok(entries)
    }

    /// Resolve the target to a concrete directory path.
    async fn resolve_target(
        &self,
        conn: &dyn ShareConnection,
    ) -> Result<PathBuf, BrowseError> {
        match &self.target {
            BrowseTarget::Path(path) => Ok(path.clone()),
            BrowseTarget::Probe { root_index, marker } => {
                let root_path = Path::new("/");
                let root = conn
                    .list_dir(root_path)
                    .await
                    .map_err(|e| listing_error(root_path, e))?;
                let anchor = root.get(*root_index).ok_or(BrowseError::TargetNotFound)?;

                let children = conn
                    .list_dir(&anchor.path)
                    .await
                    .map_err(|e| listing_error(&anchor.path, e))?;
                let target = children
                    .iter()
                    .find(|child| child.is_dir && child.name.contains(marker.as_str()))
                    .ok_or(BrowseError::TargetNotFound)?;
                Ok(target.path.clone())
            }
        }
    }
}

/// Drop hidden entries and order the rest newest first. Entries without
/// a creation stamp go last; ties keep the share's order.
fn visible_sorted(mut raw: Vec<RemoteEntry>) -> Vec<RemoteEntry> {
    raw.retain(|entry| !entry.name.starts_with('.'));
    raw.sort_by(|a, b| b.created.cmp(&a.created));
    raw
}

async fn project(
    conn: &dyn ShareConnection,
    remote: RemoteEntry,
) -> Result<ShareEntry, BrowseError> {
    let item_count = if remote.is_dir {
        let children = conn
            .list_dir(&remote.path)
            .await
            .map_err(|e| listing_error(&remote.path, e))?;
        format_item_count(children.len())
    } else {
        String::new()
    };

    Ok(ShareEntry {
        title: display_title(&remote.name),
        name: remote.name,
        is_dir: remote.is_dir,
        item_count,
        path: remote.path,
    })
}

fn listing_error(path: &Path, e: TransportError) -> BrowseError {
    if e.is_not_found() {
        BrowseError::TargetNotFound
    } else {
        warn!("Listing {} failed: {}", path.display(), e);
        BrowseError::Listing
    }
}

/// Uppercase the first letter and drop the final character. Names of a
/// single character come out empty.
pub fn display_title(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut title: String = first.to_uppercase().collect();
    title.extend(chars);
    title.pop();
    title
}

fn format_item_count(count: usize) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}
