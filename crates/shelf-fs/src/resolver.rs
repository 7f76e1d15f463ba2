//! Confined path resolution.
//!
//! A request path is joined onto the storage root and canonicalized one
//! component at a time, following symbolic links exactly as the kernel
//! would. Plain missing components are kept literally so that a missing file
//! can still be reported as "not found" downstream, but a dangling link, an
//! untraversable component or a link loop rejects the request outright.
//!
//! The canonical result must be the root or a component-wise descendant of
//! it (`Path::starts_with`), so `/data2` never passes for a root of `/data`.

use shelf_common::error::GatewayError;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Same limit Linux applies (`MAXSYMLINKS`) before failing with `ELOOP`.
const MAX_SYMLINK_EXPANSIONS: usize = 40;

/// The directory every served file must live under.
///
/// Canonicalized once at startup; clones share the same path.
#[derive(Debug, Clone)]
pub struct StorageRoot(Arc<PathBuf>);

impl StorageRoot {
    /// Canonicalize `path` and check it is a directory.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let canonical = fs::canonicalize(path.as_ref())?;
        if !fs::metadata(&canonical)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", canonical.display()),
            ));
        }
        Ok(Self(Arc::new(canonical)))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// A canonical path proven to be the storage root or one of its descendants.
///
/// Only [`resolve`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Why a request path was refused.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("path escapes the storage root")]
    Escapes,

    #[error("symbolic link {} points to a missing target", link.display())]
    BrokenLink { link: PathBuf },

    #[error("too many levels of symbolic links")]
    SymlinkLoop,

    #[error("cannot traverse {}: {source}", path.display())]
    Untraversable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<Rejection> for GatewayError {
    fn from(rejection: Rejection) -> Self {
        GatewayError::PathRejected {
            reason: rejection.to_string(),
        }
    }
}

/// Resolve an already percent-decoded request path against `root`.
///
/// Leading separators are ignored: `/etc/passwd` means `<root>/etc/passwd`.
/// An empty path (or `/`) resolves to the root itself.
pub fn resolve(root: &StorageRoot, request_path: &str) -> Result<ResolvedPath, Rejection> {
    let relative: PathBuf = Path::new(request_path)
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();

    let canonical = canonicalize_lenient(&root.path().join(relative))?;

    if canonical.starts_with(root.path()) {
        Ok(ResolvedPath(canonical))
    } else {
        Err(Rejection::Escapes)
    }
}

enum Part {
    Parent,
    Name(OsString),
}

struct Step {
    part: Part,
    /// Link whose target produced this step, if any.
    via_link: Option<Arc<PathBuf>>,
}

fn steps(path: &Path, via_link: Option<Arc<PathBuf>>) -> Vec<Step> {
    path.components()
        .filter_map(|c| match c {
            Component::ParentDir => Some(Part::Parent),
            Component::Normal(name) => Some(Part::Name(name.to_os_string())),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => None,
        })
        .map(|part| Step {
            part,
            via_link: via_link.clone(),
        })
        .collect()
}

/// Canonicalize an absolute path, keeping plain missing components literally.
fn canonicalize_lenient(path: &Path) -> Result<PathBuf, Rejection> {
    let mut resolved = PathBuf::from(Component::RootDir.as_os_str());
    let mut pending: VecDeque<Step> = steps(path, None).into();
    let mut expansions = 0;

    while let Some(Step { part, via_link }) = pending.pop_front() {
        let name = match part {
            Part::Parent => {
                resolved.pop();
                continue;
            }
            Part::Name(name) => name,
        };

        let candidate = resolved.join(&name);
        match fs::symlink_metadata(&candidate) {
            Ok(meta) if meta.file_type().is_symlink() => {
                expansions += 1;
                if expansions > MAX_SYMLINK_EXPANSIONS {
                    return Err(Rejection::SymlinkLoop);
                }
                let target = fs::read_link(&candidate).map_err(|source| Rejection::Untraversable {
                    path: candidate.clone(),
                    source,
                })?;
                if target.is_absolute() {
                    resolved = PathBuf::from(Component::RootDir.as_os_str());
                }
                // Relative targets continue from the link's own directory,
                // which is what `resolved` still holds.
                let link = Arc::new(candidate);
                for step in steps(&target, Some(link)).into_iter().rev() {
                    pending.push_front(step);
                }
            }
            Ok(_) => resolved = candidate,
            Err(e) if e.kind() == io::ErrorKind::NotFound => match via_link {
                Some(link) => {
                    return Err(Rejection::BrokenLink {
                        link: link.as_ref().clone(),
                    });
                }
                None => resolved = candidate,
            },
            Err(source) => {
                return Err(Rejection::Untraversable {
                    path: candidate,
                    source,
                });
            }
        }
    }

    Ok(resolved)
}
