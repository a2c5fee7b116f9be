//! Output records and URI minting for produced files.
//!
//! A produced file is identified three ways: its absolute path, its size, and
//! a URI a host application can hand to other components. URIs are derived
//! purely from the path and the configured application id.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// A successfully produced output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoOutput {
    pub id: String,
    pub path: PathBuf,
    pub uri: String,
    pub size_bytes: u64,
}

/// Mints URIs for output files.
///
/// With an application id, files under a registered root become
/// `content://<app_id>.fileprovider/<root name>/<relative path>`. Everything
/// else gets a `file://` URI.
#[derive(Debug, Clone, Default)]
pub struct OutputLocator {
    app_id: Option<String>,
    roots: Vec<(String, PathBuf)>,
}

impl OutputLocator {
    #[must_use]
    pub fn new(app_id: Option<String>) -> Self {
        Self {
            app_id,
            roots: Vec::new(),
        }
    }

    /// Registers a directory that content URIs may be minted under.
    #[must_use]
    pub fn with_root(mut self, name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.roots.push((name.into(), dir.into()));
        self
    }

    #[must_use]
    pub fn uri_for(&self, path: &Path) -> String {
        if let Some(app_id) = &self.app_id {
            for (name, root) in &self.roots {
                if let Ok(relative) = path.strip_prefix(root) {
                    let mut segments = vec![name.clone()];
                    segments.extend(relative.components().filter_map(|c| match c {
                        Component::Normal(s) => Some(percent_encode(&s.to_string_lossy())),
                        _ => None,
                    }));
                    return format!("content://{app_id}.fileprovider/{}", segments.join("/"));
                }
            }
        }
        file_uri(path)
    }

    #[must_use]
    pub fn locate(&self, id: impl Into<String>, path: &Path, size_bytes: u64) -> VideoOutput {
        VideoOutput {
            id: id.into(),
            path: path.to_path_buf(),
            uri: self.uri_for(path),
            size_bytes,
        }
    }
}

fn file_uri(path: &Path) -> String {
    let encoded: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(percent_encode(&s.to_string_lossy())),
            _ => None,
        })
        .collect();
    format!("file:///{}", encoded.join("/"))
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn percent_encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_uri_without_app_id() {
        let locator = OutputLocator::new(None).with_root("output", "/data/out");
        assert_eq!(locator.uri_for(Path::new("/data/out/final.mp4")), "file:///data/out/final.mp4");
    }

    #[test]
    fn content_uri_under_registered_root() {
        let locator = OutputLocator::new(Some("org.example.reels".to_string()))
            .with_root("output", "/data/out");
        assert_eq!(
            locator.uri_for(Path::new("/data/out/concat/final 1.mp4")),
            "content://org.example.reels.fileprovider/output/concat/final%201.mp4"
        );
        // Outside every root.
        assert_eq!(locator.uri_for(Path::new("/tmp/x.mp4")), "file:///tmp/x.mp4");
    }

    #[test]
    fn locate_is_deterministic() {
        let locator = OutputLocator::new(Some("a.b".to_string())).with_root("cache", "/c");
        let first = locator.locate("id", Path::new("/c/x.mp4"), 42);
        let second = locator.locate("id", Path::new("/c/x.mp4"), 42);
        assert_eq!(first, second);
        assert_eq!(first.size_bytes, 42);
        assert_eq!(first.uri, "content://a.b.fileprovider/cache/x.mp4");
    }
}
