//! Containment-checked static asset serving from a public directory.

use crate::http::Response;
use axum::http::{HeaderValue, StatusCode};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct StaticAssets {
    root: PathBuf,
}

impl StaticAssets {
    /// Creates assets served from given directory, which must exist.
    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    /// Canonical root directory.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a request path to a regular file, provided it lies within the root after resolving
    /// `..` segments and symlinks.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            return None;
        }

        let candidate = self.root.join(relative).canonicalize().ok()?;
        (candidate.starts_with(&self.root) && candidate.is_file()).then_some(candidate)
    }

    /// Reads a resolved file into a response, with content type guessed from the extension.
    pub fn serve(&self, file: &Path) -> io::Result<Response> {
        let contents = fs::read(file)?;
        let mime = mime_guess::from_path(file).first_or_octet_stream();
        let content_type = HeaderValue::from_str(mime.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

        Ok(Response::new(StatusCode::OK, content_type, contents))
    }
}
