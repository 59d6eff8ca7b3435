//! Protocol seam between the client layer and a share backend
//!
//! The wire protocol is not implemented here. A backend supplies the
//! [`ShareTransport`] handshake and the [`ShareConnection`] operations;
//! everything above this seam works purely in terms of [`RemoteEntry`]
//! metadata and [`ShareReader`] byte streams.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::io::AsyncRead;

use crate::error::TransportError;

/// Share URL derived from a raw server address.
///
/// The address is embedded verbatim; no escaping or validation happens
/// on this side of the seam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareUrl(String);

impl ShareUrl {
    pub fn from_address(address: &str) -> Self {
        Self(format!("smb://{address}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Login identity for a share.
///
/// The password stays wrapped; a transport exposes it only at the point
/// of authentication.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Mount options applied to every connection.
///
/// The dialect and namespace choices are hard-coded at their defaults;
/// the struct exists so transports receive them explicitly rather than
/// as ambient globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Negotiate the modern dialect family instead of the legacy one
    pub enable_smb2: bool,
    /// Resolve distributed-namespace referrals during traversal
    pub resolve_dfs: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            enable_smb2: true,
            resolve_dfs: false,
        }
    }
}

/// Metadata for one remote file or directory
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
}

/// Reader over a remote file's contents
pub type ShareReader = Box<dyn AsyncRead + Send + Unpin>;

/// Handshake side of a share backend
#[async_trait]
pub trait ShareTransport: Send + Sync {
    /// Authenticate against the share root. The mount options apply for
    /// the lifetime of the returned connection.
    async fn connect(
        &self,
        url: &ShareUrl,
        credentials: &Credentials,
        options: &MountOptions,
    ) -> Result<Box<dyn ShareConnection>, TransportError>;
}

/// Authenticated operations against a share root.
///
/// Paths are rooted at the share: `/` is the root directory the
/// connection was established for.
#[async_trait]
pub trait ShareConnection: Send + Sync {
    /// List the entries directly inside a directory
    async fn list_dir(&self, path: &Path) -> Result<Vec<RemoteEntry>, TransportError>;

    /// Size in bytes of a remote file
    async fn file_size(&self, path: &Path) -> Result<u64, TransportError>;

    /// Open a remote file for sequential reading
    async fn open_read(&self, path: &Path) -> Result<ShareReader, TransportError>;
}
