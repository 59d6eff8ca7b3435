//! File transfer from a share to the staging area
//!
//! A transfer is a cold stream: nothing touches the share until the
//! first poll. Progress comes out as one state per copied chunk, the
//! terminal state is either the staged path or a generic failure, and
//! an optional cancellation token stops the copy between chunks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browse::{Browser, ShareEntry};
use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::session::{SessionSlot, ShareSession};
use crate::staging::StagingArea;

/// Bytes copied per chunk; one progress state is emitted per chunk
pub const CHUNK_SIZE: usize = 1024;

/// Observable states of one transfer
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    /// Percent of the remote size written locally, 0 to 100
    Downloading(f32),
    /// Transfer finished; the staged file lives at this path
    Completed(PathBuf),
    /// Transfer broke. The cause is logged where it happened and the
    /// partial file is removed.
    Failed,
}

/// Streams files off the active session into the staging area.
#[derive(Debug)]
pub struct Fetcher {
    slot: Arc<SessionSlot>,
    staging: StagingArea,
}

impl Fetcher {
    pub fn new(slot: Arc<SessionSlot>) -> Self {
        Self {
            slot,
            staging: StagingArea::default(),
        }
    }

    pub fn with_config(slot: Arc<SessionSlot>, config: &ClientConfig) -> Self {
        let staging = match &config.staging_dir {
            Some(dir) => StagingArea::new(dir),
            None => StagingArea::default(),
        };
        Self { slot, staging }
    }

    pub fn with_staging(slot: Arc<SessionSlot>, staging: StagingArea) -> Self {
        Self { slot, staging }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Start a transfer for one entry.
    ///
    /// The local path is claimed before the stream exists, so staging
    /// problems surface as an error here rather than inside the stream.
    pub async fn fetch(
        &self,
        entry: &ShareEntry,
    ) -> Result<BoxStream<'static, FetchState>, FetchError> {
        self.fetch_with_cancel(entry, CancellationToken::new())
            .await
    }

    /// Like [`fetch`], with a token that stops the copy between chunks.
    /// A cancelled transfer removes its partial file and ends without a
    /// terminal state.
    ///
    /// [`fetch`]: Fetcher::fetch
    pub async fn fetch_with_cancel(
        &self,
        entry: &ShareEntry,
        cancel: CancellationToken,
    ) -> Result<BoxStream<'static, FetchState>, FetchError> {
        let session = self.slot.current().ok_or(FetchError::NotConnected)?;
        let local_path =
            self.staging
                .allocate(&entry.name)
                .await
                .map_err(|source| FetchError::Staging {
                    name: entry.name.clone(),
                    source,
                })?;

        Ok(transfer_stream(session, entry.path.clone(), local_path, cancel).boxed())
    }

    /// Transfer whatever the browser has selected. With no selection the
    /// returned stream completes without emitting anything.
    pub async fn fetch_selected(
        &self,
        browser: &Browser,
    ) -> Result<BoxStream<'static, FetchState>, FetchError> {
        match browser.selected() {
            Some(entry) => Ok(self.fetch(&entry).await?),
            None => {
                debug!("No entry selected; nothing to fetch");
                Ok(stream::empty().boxed())
            }
        }
    }
}

fn transfer_stream(
    session: Arc<ShareSession>,
    remote_path: PathBuf,
    local_path: PathBuf,
    cancel: CancellationToken,
) -> impl Stream<Item = FetchState> + Send {
    stream! {
        let conn = session.connection();

        let total = match conn.file_size(&remote_path).await {
            Ok(total) => total,
            Err(e) => {
                warn!("Sizing {} failed: {}", remote_path.display(), e);
                discard_partial(&local_path).await;
                yield FetchState::Failed;
                return;
            }
        };

        let mut reader = match conn.open_read(&remote_path).await {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Opening {} failed: {}", remote_path.display(), e);
                discard_partial(&local_path).await;
                yield FetchState::Failed;
                return;
            }
        };

        let mut writer = match File::create(&local_path).await {
            Ok(writer) => writer,
            Err(e) => {
                warn!("Creating {} failed: {}", local_path.display(), e);
                discard_partial(&local_path).await;
                yield FetchState::Failed;
                return;
            }
        };

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut done: u64 = 0;

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Transfer of {} cancelled", remote_path.display());
                    drop(writer);
                    discard_partial(&local_path).await;
                    return;
                }
                read = reader.read(&mut buf) => read,
            };

            match read {
                Ok(0) => break,
                Ok(n) => {
                    if let Err(e) = writer.write_all(&buf[..n]).await {
                        warn!("Writing {} failed: {}", local_path.display(), e);
                        drop(writer);
                        discard_partial(&local_path).await;
                        yield FetchState::Failed;
                        return;
                    }
                    done += n as u64;
                    if total > 0 {
                        yield FetchState::Downloading(percent(done, total));
                    }
                }
                Err(e) => {
                    warn!("Reading {} failed: {}", remote_path.display(), e);
                    drop(writer);
                    discard_partial(&local_path).await;
                    yield FetchState::Failed;
                    return;
                }
            }
        }

        if let Err(e) = writer.flush().await {
            warn!("Flushing {} failed: {}", local_path.display(), e);
            drop(writer);
            discard_partial(&local_path).await;
            yield FetchState::Failed;
            return;
        }

        info!(
            "Downloaded {} to {}",
            remote_path.display(),
            local_path.display()
        );
        yield FetchState::Completed(local_path.clone());
    }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Removing partial file {} failed: {}", path.display(), e);
        }
    }
}

fn percent(done: u64, total: u64) -> f32 {
    ((done as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32
}
