//! # shelf-fs
//!
//! Filesystem layer for Shelf: turns an untrusted request path into a
//! confined, canonical location under the storage root, and recovers the
//! HTTP content headers an upstream proxy stored in extended attributes.
//!
//! Everything in this crate performs blocking syscalls. Async callers should
//! run it on the blocking pool (`tokio::task::spawn_blocking`).

pub mod entry;
pub mod metadata;
pub mod resolver;

pub use entry::{ServedFile, open_entry};
pub use metadata::{Absent, AttributeNames, FileMetadata, ResponseHeaders};
pub use resolver::{Rejection, ResolvedPath, StorageRoot, resolve};
