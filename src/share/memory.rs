//! In-memory share backend
//!
//! A [`ShareTransport`] over an in-memory directory tree. Listings come
//! back in insertion order, every node carries a creation stamp, and
//! reads can be poisoned to fail mid-stream, which makes this backend
//! the fixture for exercising the client layer without a server.

use std::path::{Component, Path};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::TransportError;

use super::transport::{
    Credentials, MountOptions, RemoteEntry, ShareConnection, ShareReader, ShareTransport, ShareUrl,
};

#[derive(Debug)]
struct FileData {
    content: Vec<u8>,
    fail_after: Option<usize>,
}

/// One node of the tree. A node with file data is a file; everything
/// else is a directory. Children keep insertion order.
#[derive(Debug)]
struct Node {
    created: Option<DateTime<Utc>>,
    file: Option<FileData>,
    children: Vec<(String, Node)>,
}

impl Node {
    fn dir(created: Option<DateTime<Utc>>) -> Self {
        Self {
            created,
            file: None,
            children: Vec::new(),
        }
    }

    fn is_dir(&self) -> bool {
        self.file.is_none()
    }
}

#[derive(Debug)]
struct Inner {
    users: Mutex<Vec<(String, String)>>,
    root: Mutex<Node>,
    unreachable: AtomicBool,
    connect_delay: Mutex<Option<Duration>>,
    last_mount: Mutex<Option<MountOptions>>,
    list_calls: AtomicUsize,
}

/// In-memory share. Cloning is cheap and clones observe the same tree,
/// user table and counters.
#[derive(Debug, Clone)]
pub struct MemoryShare {
    inner: Arc<Inner>,
}

impl Default for MemoryShare {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryShare {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                users: Mutex::new(Vec::new()),
                root: Mutex::new(Node::dir(None)),
                unreachable: AtomicBool::new(false),
                connect_delay: Mutex::new(None),
                last_mount: Mutex::new(None),
                list_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Accept this username/password pair at connect time
    pub fn add_user(&self, username: &str, password: &str) -> &Self {
        self.inner
            .users
            .lock()
            .push((username.to_string(), password.to_string()));
        self
    }

    /// Create a directory, making intermediate directories as needed
    pub fn add_dir(&self, path: &str) -> &Self {
        let mut root = self.inner.root.lock();
        let node = ensure(&mut root, Path::new(path));
        node.file = None;
        node.created = Some(Utc::now());
        self
    }

    /// Create a file with the given contents, making parent directories
    /// as needed
    pub fn add_file(&self, path: &str, content: &[u8]) -> &Self {
        let mut root = self.inner.root.lock();
        let node = ensure(&mut root, Path::new(path));
        node.file = Some(FileData {
            content: content.to_vec(),
            fail_after: None,
        });
        node.created = Some(Utc::now());
        self
    }

    /// Override the creation stamp of an existing node
    pub fn stamp(&self, path: &str, created: DateTime<Utc>) -> &Self {
        let mut root = self.inner.root.lock();
        let node = ensure(&mut root, Path::new(path));
        node.created = Some(created);
        self
    }

    /// Clear the creation stamp of an existing node
    pub fn clear_stamp(&self, path: &str) -> &Self {
        let mut root = self.inner.root.lock();
        let node = ensure(&mut root, Path::new(path));
        node.created = None;
        self
    }

    /// Make reads of this file fail once the given number of bytes has
    /// been served
    pub fn poison_read(&self, path: &str, fail_after: usize) -> &Self {
        let mut root = self.inner.root.lock();
        let node = ensure(&mut root, Path::new(path));
        if let Some(file) = node.file.as_mut() {
            file.fail_after = Some(fail_after);
        }
        self
    }

    /// Make every connect attempt fail as unreachable
    pub fn set_unreachable(&self, unreachable: bool) -> &Self {
        self.inner.unreachable.store(unreachable, Ordering::Relaxed);
        self
    }

    /// Delay connect attempts by this long before answering
    pub fn set_connect_delay(&self, delay: Duration) -> &Self {
        *self.inner.connect_delay.lock() = Some(delay);
        self
    }

    /// Mount options seen by the most recent connect attempt
    pub fn last_mount(&self) -> Option<MountOptions> {
        self.inner.last_mount.lock().clone()
    }

    /// Number of directory listings served since creation
    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ShareTransport for MemoryShare {
    async fn connect(
        &self,
        url: &ShareUrl,
        credentials: &Credentials,
        options: &MountOptions,
    ) -> Result<Box<dyn ShareConnection>, TransportError> {
        let delay = *self.inner.connect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        *self.inner.last_mount.lock() = Some(options.clone());

        if self.inner.unreachable.load(Ordering::Relaxed) {
            return Err(TransportError::Unreachable(format!("no route to {url}")));
        }

        let accepted = self.inner.users.lock().iter().any(|(user, pass)| {
            *user == credentials.username && pass == credentials.password.expose_secret()
        });
        if !accepted {
            return Err(TransportError::AccessDenied(format!(
                "invalid credentials for '{}'",
                credentials.username
            )));
        }

        Ok(Box::new(MemoryConnection {
            inner: Arc::clone(&self.inner),
        }))
    }
}

#[derive(Debug)]
struct MemoryConnection {
    inner: Arc<Inner>,
}

#[async_trait]
impl ShareConnection for MemoryConnection {
    async fn list_dir(&self, path: &Path) -> Result<Vec<RemoteEntry>, TransportError> {
        self.inner.list_calls.fetch_add(1, Ordering::Relaxed);

        let root = self.inner.root.lock();
        let node = find(&root, path).ok_or_else(|| TransportError::NotFound {
            path: path.to_path_buf(),
        })?;
        if !node.is_dir() {
            return Err(TransportError::Protocol(format!(
                "not a directory: {}",
                path.display()
            )));
        }

        Ok(node
            .children
            .iter()
            .map(|(name, child)| RemoteEntry {
                name: name.clone(),
                path: path.join(name),
                is_dir: child.is_dir(),
                size: child.file.as_ref().map_or(0, |f| f.content.len() as u64),
                created: child.created,
            })
            .collect())
    }

    async fn file_size(&self, path: &Path) -> Result<u64, TransportError> {
        let root = self.inner.root.lock();
        let node = find(&root, path).ok_or_else(|| TransportError::NotFound {
            path: path.to_path_buf(),
        })?;
        match &node.file {
            Some(file) => Ok(file.content.len() as u64),
            None => Err(TransportError::Protocol(format!(
                "not a file: {}",
                path.display()
            ))),
        }
    }

    async fn open_read(&self, path: &Path) -> Result<ShareReader, TransportError> {
        let root = self.inner.root.lock();
        let node = find(&root, path).ok_or_else(|| TransportError::NotFound {
            path: path.to_path_buf(),
        })?;
        match &node.file {
            Some(file) => Ok(Box::new(MemReader {
                data: file.content.clone(),
                pos: 0,
                fail_after: file.fail_after,
            })),
            None => Err(TransportError::Protocol(format!(
                "not a file: {}",
                path.display()
            ))),
        }
    }
}

/// Reader over a snapshot of a file's contents. A poisoned file serves
/// bytes up to its limit and then errors instead of reaching EOF.
struct MemReader {
    data: Vec<u8>,
    pos: usize,
    fail_after: Option<usize>,
}

impl AsyncRead for MemReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();

        if let Some(limit) = this.fail_after {
            if this.pos >= limit {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "share read interrupted",
                )));
            }
        }

        let remaining = &this.data[this.pos..];
        if remaining.is_empty() {
            return Poll::Ready(Ok(()));
        }

        let mut take = remaining.len().min(buf.remaining());
        if let Some(limit) = this.fail_after {
            take = take.min(limit - this.pos);
        }
        buf.put_slice(&remaining[..take]);
        this.pos += take;
        Poll::Ready(Ok(()))
    }
}

fn segments(path: &Path) -> impl Iterator<Item = String> + '_ {
    path.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    })
}

/// Walk to a node, creating missing directories along the way
fn ensure<'a>(mut node: &'a mut Node, path: &Path) -> &'a mut Node {
    for segment in segments(path) {
        let idx = match node.children.iter().position(|(name, _)| *name == segment) {
            Some(idx) => idx,
            None => {
                node.children.push((segment, Node::dir(None)));
                node.children.len() - 1
            }
        };
        node = &mut node.children[idx].1;
    }
    node
}

fn find<'a>(mut node: &'a Node, path: &Path) -> Option<&'a Node> {
    for segment in segments(path) {
        node = node
            .children
            .iter()
            .find(|(name, _)| *name == segment)
            .map(|(_, child)| child)?;
    }
    Some(node)
}
