//! Common test utilities

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use skylight::{
    BrowseTarget, Browser, Connector, Credentials, Fetcher, MemoryShare, SessionSlot,
    SharedSessionSlot, StagingArea,
};

pub const USER: &str = "maia";
pub const PASSWORD: &str = "hunter2";
pub const ADDRESS: &str = "192.168.7.2/library";

/// Test environment with an in-memory share and an isolated staging dir
pub struct TestEnvironment {
    pub share: MemoryShare,
    pub slot: SharedSessionSlot,
    pub staging_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let share = MemoryShare::new();
        share.add_user(USER, PASSWORD);
        Self {
            share,
            slot: Arc::new(SessionSlot::new()),
            staging_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn connector(&self) -> Connector {
        Connector::new(Arc::new(self.share.clone()))
    }

    pub async fn connect(&self) {
        self.connector()
            .connect_into(&self.slot, ADDRESS, &Credentials::new(USER, PASSWORD))
            .await
            .expect("login should be accepted");
    }

    /// Browser over an explicit directory
    pub fn browser_at(&self, path: &str) -> Browser {
        Browser::new(Arc::clone(&self.slot)).target(BrowseTarget::Path(path.into()))
    }

    /// Browser with the default probe target
    pub fn probing_browser(&self) -> Browser {
        Browser::new(Arc::clone(&self.slot))
    }

    pub fn fetcher(&self) -> Fetcher {
        Fetcher::with_staging(
            Arc::clone(&self.slot),
            StagingArea::new(self.staging_dir.path()),
        )
    }

    /// Number of files currently in the staging dir
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic timestamp n seconds after the epoch
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
}

/// The standard share layout used across suites.
///
/// Root (in share order): `Incoming`, `Shows`, `Archive`. The probe
/// anchor is `Shows` (index 1); its only marker match is the directory
/// `Sample Clips`, which holds a mix of stamped files, a subdirectory
/// and hidden entries.
pub fn sample_tree(share: &MemoryShare) {
    share.add_dir("/Incoming");
    share.add_dir("/Shows");
    share.add_dir("/Archive");

    share.add_file("/Shows/Sample list.txt", b"not a directory");
    share.add_dir("/Shows/Raw Takes");
    share.add_dir("/Shows/Sample Clips");

    share.add_file("/Shows/Sample Clips/sunrise.mp4", &[0xAB; 2048]);
    share.stamp("/Shows/Sample Clips/sunrise.mp4", ts(300));

    share.add_dir("/Shows/Sample Clips/drafts");
    share.stamp("/Shows/Sample Clips/drafts", ts(250));
    share.add_file("/Shows/Sample Clips/drafts/one.txt", b"1");
    share.add_file("/Shows/Sample Clips/drafts/two.txt", b"2");
    share.add_file("/Shows/Sample Clips/drafts/.hidden", b"x");

    share.add_file("/Shows/Sample Clips/ledger.txt", b"totals");
    share.stamp("/Shows/Sample Clips/ledger.txt", ts(200));

    share.add_file("/Shows/Sample Clips/harbor.mov", &[0x11; 96]);
    share.stamp("/Shows/Sample Clips/harbor.mov", ts(100));

    share.add_dir("/Shows/Sample Clips/.thumbs");
    share.stamp("/Shows/Sample Clips/.thumbs", ts(400));
    share.add_file("/Shows/Sample Clips/.checksums", b"deadbeef");
}
