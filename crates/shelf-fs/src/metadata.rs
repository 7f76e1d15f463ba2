//! Content headers recovered from extended attributes.
//!
//! The upstream proxy stores `content-type`, `cache-control` and
//! `content-disposition` as extended attributes on every object it writes.
//! Each lookup is independent and yields `Result<HeaderValue, Absent>`;
//! [`ResponseHeaders::from_metadata`] turns the three results into concrete
//! headers.
//!
//! Fallback policy:
//! - no usable `content-type`: the metadata is treated as untrustworthy as a
//!   whole. The response becomes `application/octet-stream`, `no-cache`,
//!   `inline`, and the other two attributes are never read.
//! - `cache-control` unavailable: `max-age=31536000, immutable`.
//! - `content-disposition` unavailable: `inline`.

use axum::http::{header, HeaderMap, HeaderValue};
use std::io;
use std::path::Path;

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
pub const UNTRUSTED_CACHE_CONTROL: &str = "no-cache";
pub const DEFAULT_CACHE_CONTROL: &str = "max-age=31536000, immutable";
pub const DEFAULT_CONTENT_DISPOSITION: &str = "inline";

/// Fully-qualified attribute names, e.g. `user.user.content-type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNames {
    pub content_type: String,
    pub cache_control: String,
    pub content_disposition: String,
}

impl AttributeNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            content_type: format!("{prefix}content-type"),
            cache_control: format!("{prefix}cache-control"),
            content_disposition: format!("{prefix}content-disposition"),
        }
    }
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self::with_prefix("user.user.")
    }
}

/// Why an attribute could not be used. Always recovered through a fallback.
#[derive(Debug, thiserror::Error)]
pub enum Absent {
    #[error("attribute is not set")]
    Missing,

    /// Includes filesystems without extended attribute support.
    #[error("attribute could not be read: {0}")]
    Unreadable(#[from] io::Error),

    #[error("attribute value is not valid UTF-8")]
    NotUtf8,

    #[error("attribute value is not a legal header value")]
    InvalidHeader,

    #[error("not read because content-type is unavailable")]
    Skipped,
}

/// Read one attribute as a header value. Values are passed through verbatim,
/// including the empty string.
pub fn read_attribute(path: &Path, name: &str) -> Result<HeaderValue, Absent> {
    let raw = xattr::get(path, name)?.ok_or(Absent::Missing)?;
    let text = String::from_utf8(raw).map_err(|_| Absent::NotUtf8)?;
    HeaderValue::from_str(&text).map_err(|_| Absent::InvalidHeader)
}

/// The three attribute lookups for one file.
#[derive(Debug)]
pub struct FileMetadata {
    pub content_type: Result<HeaderValue, Absent>,
    pub cache_control: Result<HeaderValue, Absent>,
    pub content_disposition: Result<HeaderValue, Absent>,
}

impl FileMetadata {
    /// Look up the attributes of `path`. The secondary attributes are only
    /// consulted when `content-type` is usable.
    pub fn read(path: &Path, names: &AttributeNames) -> Self {
        let content_type = read_attribute(path, &names.content_type);
        let metadata = if content_type.is_ok() {
            Self {
                content_type,
                cache_control: read_attribute(path, &names.cache_control),
                content_disposition: read_attribute(path, &names.content_disposition),
            }
        } else {
            Self {
                content_type,
                cache_control: Err(Absent::Skipped),
                content_disposition: Err(Absent::Skipped),
            }
        };

        for (name, lookup) in [
            (&names.content_type, &metadata.content_type),
            (&names.cache_control, &metadata.cache_control),
            (&names.content_disposition, &metadata.content_disposition),
        ] {
            if let Err(reason) = lookup {
                tracing::debug!(path = %path.display(), attribute = %name, %reason, "Attribute unavailable, using fallback");
            }
        }

        metadata
    }
}

/// Headers every successful file response carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub content_type: HeaderValue,
    pub cache_control: HeaderValue,
    pub content_disposition: HeaderValue,
}

impl ResponseHeaders {
    /// Apply the fallback policy. Pure: depends only on the three lookups.
    pub fn from_metadata(metadata: FileMetadata) -> Self {
        let FileMetadata {
            content_type,
            cache_control,
            content_disposition,
        } = metadata;

        match content_type {
            Err(_) => Self {
                content_type: HeaderValue::from_static(FALLBACK_CONTENT_TYPE),
                cache_control: HeaderValue::from_static(UNTRUSTED_CACHE_CONTROL),
                content_disposition: HeaderValue::from_static(DEFAULT_CONTENT_DISPOSITION),
            },
            Ok(content_type) => Self {
                content_type,
                cache_control: cache_control
                    .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CACHE_CONTROL)),
                content_disposition: content_disposition
                    .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_DISPOSITION)),
            },
        }
    }

    /// Write the content headers plus `X-Content-Type-Options: nosniff`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(header::CONTENT_TYPE, self.content_type.clone());
        headers.insert(header::CACHE_CONTROL, self.cache_control.clone());
        headers.insert(header::CONTENT_DISPOSITION, self.content_disposition.clone());
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn present(value: &'static str) -> Result<HeaderValue, Absent> {
        Ok(HeaderValue::from_static(value))
    }

    #[test]
    fn test_all_attributes_used_verbatim() {
        let headers = ResponseHeaders::from_metadata(FileMetadata {
            content_type: present("image/png"),
            cache_control: present("public, max-age=60"),
            content_disposition: present("attachment; filename=\"cat.png\""),
        });
        assert_eq!(headers.content_type, "image/png");
        assert_eq!(headers.cache_control, "public, max-age=60");
        assert_eq!(headers.content_disposition, "attachment; filename=\"cat.png\"");
    }

    #[test]
    fn test_missing_content_type_discards_everything_else() {
        let headers = ResponseHeaders::from_metadata(FileMetadata {
            content_type: Err(Absent::Missing),
            cache_control: present("public, max-age=60"),
            content_disposition: present("attachment"),
        });
        assert_eq!(headers.content_type, FALLBACK_CONTENT_TYPE);
        assert_eq!(headers.cache_control, "no-cache");
        assert_eq!(headers.content_disposition, "inline");
    }

    #[test]
    fn test_missing_cache_control_defaults_to_immutable() {
        let headers = ResponseHeaders::from_metadata(FileMetadata {
            content_type: present("text/csv"),
            cache_control: Err(Absent::Missing),
            content_disposition: present("attachment"),
        });
        assert_eq!(headers.content_type, "text/csv");
        assert_eq!(headers.cache_control, "max-age=31536000, immutable");
        assert_eq!(headers.content_disposition, "attachment");

        let headers = ResponseHeaders::from_metadata(FileMetadata {
            content_type: present("text/csv"),
            cache_control: Err(Absent::Missing),
            content_disposition: Err(Absent::NotUtf8),
        });
        assert_eq!(headers.content_disposition, "inline");
    }

    #[test]
    fn test_empty_content_type_is_passed_through() {
        let headers = ResponseHeaders::from_metadata(FileMetadata {
            content_type: present(""),
            cache_control: Err(Absent::Missing),
            content_disposition: Err(Absent::Missing),
        });
        assert_eq!(headers.content_type, "");
        assert_eq!(headers.cache_control, DEFAULT_CACHE_CONTROL);
    }

    #[test]
    fn test_apply_always_adds_nosniff() {
        let headers = ResponseHeaders::from_metadata(FileMetadata {
            content_type: Err(Absent::Skipped),
            cache_control: Err(Absent::Skipped),
            content_disposition: Err(Absent::Skipped),
        });
        let mut map = HeaderMap::new();
        headers.apply(&mut map);
        assert_eq!(map.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(map.get(header::CONTENT_TYPE).unwrap(), FALLBACK_CONTENT_TYPE);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_attribute_names_use_prefix() {
        let names = AttributeNames::default();
        assert_eq!(names.content_type, "user.user.content-type");
        assert_eq!(names.cache_control, "user.user.cache-control");
        assert_eq!(names.content_disposition, "user.user.content-disposition");
        assert_eq!(AttributeNames::with_prefix("user.").content_type, "user.content-type");
    }

    /// Returns false (and the caller skips) when the scratch filesystem has no
    /// `user.*` xattr support.
    fn set_attr(path: &Path, name: &str, value: &[u8]) -> bool {
        match xattr::set(path, name, value) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("skipping: cannot set {name} on scratch file ({e})");
                false
            }
        }
    }

    #[test]
    fn test_read_without_attributes_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain.bin");
        fs::write(&file, b"\x00\x01").unwrap();

        let metadata = FileMetadata::read(&file, &AttributeNames::default());
        assert!(metadata.content_type.is_err());
        assert!(matches!(metadata.cache_control, Err(Absent::Skipped)));
        assert!(matches!(metadata.content_disposition, Err(Absent::Skipped)));
    }

    #[test]
    fn test_read_recovers_stored_attributes() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("q1.csv");
        fs::write(&file, "a,b\n").unwrap();
        let names = AttributeNames::default();
        if !set_attr(&file, &names.content_type, b"text/csv") {
            return;
        }

        let metadata = FileMetadata::read(&file, &names);
        assert_eq!(metadata.content_type.as_ref().unwrap(), "text/csv");
        assert!(matches!(metadata.cache_control, Err(Absent::Missing)));
        assert!(matches!(metadata.content_disposition, Err(Absent::Missing)));

        let headers = ResponseHeaders::from_metadata(metadata);
        assert_eq!(headers.cache_control, DEFAULT_CACHE_CONTROL);
        assert_eq!(headers.content_disposition, DEFAULT_CONTENT_DISPOSITION);
    }

    #[test]
    fn test_secondary_attributes_ignored_without_content_type() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("orphan.bin");
        fs::write(&file, b"x").unwrap();
        let names = AttributeNames::default();
        if !set_attr(&file, &names.cache_control, b"public, max-age=60") {
            return;
        }

        let headers = ResponseHeaders::from_metadata(FileMetadata::read(&file, &names));
        assert_eq!(headers.content_type, FALLBACK_CONTENT_TYPE);
        assert_eq!(headers.cache_control, UNTRUSTED_CACHE_CONTROL);
    }

    #[test]
    fn test_unusable_values_count_as_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("odd.txt");
        fs::write(&file, b"x").unwrap();
        let names = AttributeNames::default();
        if !set_attr(&file, &names.content_type, b"text/plain") {
            return;
        }
        assert!(set_attr(&file, &names.cache_control, &[0xff, 0xfe]));
        assert!(set_attr(&file, &names.content_disposition, b"inline\r\nSet-Cookie: a=b"));

        let metadata = FileMetadata::read(&file, &names);
        assert!(matches!(metadata.cache_control, Err(Absent::NotUtf8)));
        assert!(matches!(metadata.content_disposition, Err(Absent::InvalidHeader)));
    }
}
