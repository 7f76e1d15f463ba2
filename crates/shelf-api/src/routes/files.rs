//! File serving.
//!
//! `GET /*path` — resolves the path under the storage root and streams the
//! file with the content headers recovered from its extended attributes.
//! `HEAD` is answered by the same handler without a body.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use shelf_common::error::{GatewayError, GatewayResult};
use shelf_fs::{open_entry, ServedFile};
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(serve_root))
        .route("/{*path}", get(serve_file))
}

/// The root is a directory and is never served, but it still goes through
/// resolution so the response matches any other directory.
async fn serve_root(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> GatewayResult<Response> {
    serve(state, String::new(), headers).await
}

async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> GatewayResult<Response> {
    serve(state, path, headers).await
}

async fn serve(
    state: Arc<AppState>,
    path: String,
    request_headers: HeaderMap,
) -> GatewayResult<Response> {
    // Resolution, stat, xattr reads and open all block.
    let served = tokio::task::spawn_blocking(move || {
        open_entry(&state.root, &path, &state.attributes)
    })
    .await
    .map_err(|e| GatewayError::Internal(anyhow::Error::new(e)))??;

    let ServedFile {
        path,
        file,
        len,
        modified,
        headers: content_headers,
    } = served;

    let mut headers = HeaderMap::new();
    content_headers.apply(&mut headers);
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(modified) = modified {
        if let Ok(v) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
            headers.insert(header::LAST_MODIFIED, v);
        }
        if let Ok(v) = HeaderValue::from_str(&etag(modified, len)) {
            headers.insert(header::ETAG, v);
        }
    }

    let mut file = tokio::fs::File::from_std(file);

    if let Some((start, end)) = parse_range(request_headers.get(header::RANGE), len)? {
        let length = end - start + 1;
        tracing::debug!(path = %path.as_path().display(), start, end, length, "Serving byte range");
        file.seek(SeekFrom::Start(start)).await?;
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        if let Ok(v) = HeaderValue::from_str(&format!("bytes {start}-{end}/{len}")) {
            headers.insert(header::CONTENT_RANGE, v);
        }
        let body = Body::from_stream(ReaderStream::new(file.take(length)));
        return Ok((StatusCode::PARTIAL_CONTENT, headers, body).into_response());
    }

    tracing::debug!(path = %path.as_path().display(), size = len, "Serving file");
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Weak validator derived from modification time and size.
fn etag(modified: SystemTime, len: u64) -> String {
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("W/\"{nanos:x}-{len:x}\"")
}

/// Parse a single `bytes=` range into inclusive `(start, end)` offsets.
///
/// Malformed headers and multi-range requests are ignored (`Ok(None)`), so the
/// whole file is served. A well-formed range that cannot be satisfied is an
/// error.
fn parse_range(value: Option<&HeaderValue>, file_size: u64) -> GatewayResult<Option<(u64, u64)>> {
    let Some(range) = value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("bytes="))
    else {
        return Ok(None);
    };
    if range.contains(',') {
        return Ok(None);
    }
    let Some((start_part, end_part)) = range.split_once('-') else {
        return Ok(None);
    };
    let (start_part, end_part) = (start_part.trim(), end_part.trim());
    let unsatisfiable = GatewayError::RangeNotSatisfiable { len: file_size };

    if start_part.is_empty() {
        // Suffix range: the last `n` bytes.
        let Ok(suffix) = end_part.parse::<u64>() else {
            return Ok(None);
        };
        if suffix == 0 || file_size == 0 {
            return Err(unsatisfiable);
        }
        return Ok(Some((file_size.saturating_sub(suffix), file_size - 1)));
    }

    let Ok(start) = start_part.parse::<u64>() else {
        return Ok(None);
    };
    let end = if end_part.is_empty() {
        u64::MAX
    } else {
        match end_part.parse::<u64>() {
            Ok(end) if end >= start => end,
            _ => return Ok(None),
        }
    };
    if start >= file_size {
        return Err(unsatisfiable);
    }
    Ok(Some((start, end.min(file_size - 1))))
}
