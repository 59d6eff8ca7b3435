//! # skylight
//!
//! Async client layer for browsing and fetching files from SMB-style
//! network shares. The wire protocol itself is delegated to a pluggable
//! transport; skylight supplies everything between the protocol and a
//! UI: session establishment, directory listing with display
//! projection, and chunked downloads with progress.
//!
//! ## Features
//!
//! - **Sessions**: one-shot authentication against `smb://<address>`
//!   with a handshake timeout; the session lands in a [`SessionSlot`]
//!   shared by every later operation, and a failed login never disturbs
//!   an installed session.
//! - **Listings**: resolve a [`BrowseTarget`] (explicit path, or the
//!   index-and-marker probe), hide dot-entries, sort newest first and
//!   project names for display. Results stay cached while a [`Listing`]
//!   is held and for a short grace window afterwards.
//! - **Transfers**: cold progress streams in fixed 1024-byte chunks
//!   with an explicit [`CancellationToken`], staged into a collision-free
//!   temp directory.
//! - **Transport seam**: implement [`ShareTransport`] /
//!   [`ShareConnection`] to plug in a real protocol stack; the bundled
//!   [`MemoryShare`] backend serves tests and examples without a server.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use skylight::{
//!     Browser, Connector, Credentials, FetchState, Fetcher, MemoryShare, SessionSlot,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(MemoryShare::new());
//! let slot = Arc::new(SessionSlot::new());
//!
//! let connector = Connector::new(transport);
//! connector
//!     .connect_into(&slot, "192.168.1.20/media", &Credentials::new("guest", "guest"))
//!     .await?;
//!
//! let browser = Browser::new(Arc::clone(&slot));
//! let listing = browser.entries().await?;
//! for entry in listing.entries() {
//!     println!("{}  {}", entry.title, entry.item_count);
//! }
//!
//! let fetcher = Fetcher::new(Arc::clone(&slot));
//! if let Some(first) = listing.entries().first() {
//!     let mut transfer = fetcher.fetch(first).await?;
//!     while let Some(state) = transfer.next().await {
//!         match state {
//!             FetchState::Downloading(pct) => println!("{pct:.0}%"),
//!             FetchState::Completed(path) => println!("saved to {}", path.display()),
//!             FetchState::Failed => eprintln!("transfer failed"),
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod browse;
pub mod config;
pub mod connect;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod session;
pub mod share;
pub mod staging;

// Re-export commonly used types
pub use browse::{BrowseTarget, Browser, Listing, ShareEntry, display_title};
pub use config::ClientConfig;
pub use connect::Connector;
pub use error::{BrowseError, ConfigError, ConnectError, FetchError, TransportError};
pub use fetch::{CHUNK_SIZE, FetchState, Fetcher};
pub use logging::init_logging;
pub use session::{SessionSlot, ShareSession, SharedSessionSlot};
pub use share::{
    Credentials, MemoryShare, MountOptions, RemoteEntry, ShareConnection, ShareReader,
    ShareTransport, ShareUrl,
};
pub use staging::StagingArea;

// The cancellation handle accepted by transfer operations
pub use tokio_util::sync::CancellationToken;
