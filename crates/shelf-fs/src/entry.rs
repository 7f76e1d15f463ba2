//! Opening a requested entry for streaming.

use crate::metadata::{AttributeNames, FileMetadata, ResponseHeaders};
use crate::resolver::{resolve, ResolvedPath, StorageRoot};
use shelf_common::error::{GatewayError, GatewayResult};
use std::fs::{self, File};
use std::io;
use std::time::SystemTime;

/// A regular file, opened and ready to stream, with its recovered headers.
///
/// The handle closes when this value (or whatever takes ownership of
/// `file`) is dropped.
#[derive(Debug)]
pub struct ServedFile {
    pub path: ResolvedPath,
    pub file: File,
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub headers: ResponseHeaders,
}

/// Resolve `request_path`, check it names a regular file, recover its
/// headers and open it.
///
/// Errors: [`GatewayError::PathRejected`] for rejected paths,
/// [`GatewayError::EntryNotFound`] for anything that is not an existing
/// regular file, [`GatewayError::Io`] for other filesystem failures.
pub fn open_entry(
    root: &StorageRoot,
    request_path: &str,
    names: &AttributeNames,
) -> GatewayResult<ServedFile> {
    let path = resolve(root, request_path).inspect_err(|reason| {
        tracing::warn!(request_path, %reason, "Rejected request path");
    })?;

    // Canonical, so this never follows a link.
    let stat = fs::metadata(path.as_path()).map_err(not_found_or_io)?;
    if !stat.is_file() {
        // Directories and special files are indistinguishable from absence.
        return Err(GatewayError::EntryNotFound);
    }

    let headers = ResponseHeaders::from_metadata(FileMetadata::read(path.as_path(), names));

    let file = File::open(path.as_path()).map_err(not_found_or_io)?;
    // The entry may have been replaced since the stat above.
    let stat = file.metadata()?;
    if !stat.is_file() {
        return Err(GatewayError::EntryNotFound);
    }

    Ok(ServedFile {
        path,
        file,
        len: stat.len(),
        modified: stat.modified().ok(),
        headers,
    })
}

fn not_found_or_io(e: io::Error) -> GatewayError {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => GatewayError::EntryNotFound,
        _ => GatewayError::Io(e),
    }
}
