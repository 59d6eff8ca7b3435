//! Authenticated share session and the slot that holds it

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::share::{ShareConnection, ShareUrl};

/// Authenticated handle to a share root, reused by every listing and
/// transfer until replaced.
pub struct ShareSession {
    connection: Box<dyn ShareConnection>,
    url: ShareUrl,
    established_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShareSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareSession")
            .field("url", &self.url)
            .field("established_at", &self.established_at)
            .finish_non_exhaustive()
    }
}

impl ShareSession {
    pub fn new(connection: Box<dyn ShareConnection>, url: ShareUrl) -> Self {
        Self {
            connection,
            url,
            established_at: Utc::now(),
        }
    }

    pub fn connection(&self) -> &dyn ShareConnection {
        self.connection.as_ref()
    }

    pub fn url(&self) -> &ShareUrl {
        &self.url
    }

    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }
}

/// Holder for the at-most-one active session.
///
/// Connect installs into the slot on success and leaves it untouched on
/// failure; listings and transfers read it on demand. Operations that
/// started against an earlier session keep their own `Arc` and finish
/// against the session they started with.
#[derive(Debug, Default)]
pub struct SessionSlot {
    current: RwLock<Option<Arc<ShareSession>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active session
    pub fn install(&self, session: Arc<ShareSession>) {
        *self.current.write() = Some(session);
    }

    /// The active session, if one has been established
    pub fn current(&self) -> Option<Arc<ShareSession>> {
        self.current.read().clone()
    }

    /// Drop the active session
    pub fn clear(&self) {
        *self.current.write() = None;
    }

    pub fn is_connected(&self) -> bool {
        self.current.read().is_some()
    }
}

/// Thread-safe handle to a session slot
pub type SharedSessionSlot = Arc<SessionSlot>;
