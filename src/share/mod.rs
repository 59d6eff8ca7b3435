//! Share transport seam and the in-memory reference backend

pub mod memory;
pub mod transport;

pub use memory::MemoryShare;
pub use transport::{
    Credentials, MountOptions, RemoteEntry, ShareConnection, ShareReader, ShareTransport, ShareUrl,
};
