use std::collections::HashSet;

use opendal::Buffer;
use tracing::{debug, info, warn};

use crate::{
    key::{normalize_path, remote_key},
    RemoteStore,
};

/// Manifest is the list of paths published by the previous deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<String>,
}

impl Manifest {
    /// Parse a newline-delimited manifest.
    ///
    /// Empty lines (including the one produced by a trailing newline) are
    /// dropped, `\r\n` line endings are accepted and entries are normalized.
    pub fn parse(bs: &[u8]) -> Self {
        let entries = String::from_utf8_lossy(bs)
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .map(normalize_path)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Manifest { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| entry == path)
    }

    /// Return the candidates that are not listed in this manifest, keeping
    /// their order.
    pub fn difference(&self, candidates: &[String]) -> Vec<String> {
        let known: HashSet<&str> = self.entries.iter().map(String::as_str).collect();
        candidates
            .iter()
            .filter(|path| !known.contains(normalize_path(path)))
            .cloned()
            .collect()
    }
}

impl From<Buffer> for Manifest {
    fn from(bs: Buffer) -> Self {
        Manifest::parse(&bs.to_vec())
    }
}

/// Resolve which candidates still need to be uploaded.
///
/// Without a manifest path every candidate is returned. Otherwise the
/// manifest is fetched from `prefix/manifest_path` and its entries are
/// removed from the candidates. Any fetch failure, a missing manifest
/// included, falls back to uploading everything.
pub async fn resolve(
    store: &dyn RemoteStore,
    bucket: &str,
    prefix: &str,
    candidates: &[String],
    manifest_path: Option<&str>,
) -> Vec<String> {
    let Some(manifest_path) = manifest_path else {
        return candidates.to_vec();
    };

    let key = remote_key(prefix, manifest_path);
    debug!(bucket, key = %key, "downloading manifest for differential upload");

    match store.fetch_object(bucket, &key).await.map(Manifest::from) {
        Ok(manifest) => {
            let files = manifest.difference(candidates);
            info!(
                key = %key,
                listed = manifest.len(),
                candidates = candidates.len(),
                remaining = files.len(),
                "manifest found, differential upload applied"
            );
            files
        }
        Err(err) => {
            warn!(key = %key, error = %err, "manifest not available, uploading all files");
            candidates.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use opendal::{Error, ErrorKind, Result};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ObjectMetadata;

    /// Store that only knows a fixed set of objects.
    struct ReadOnlyStore {
        objects: HashMap<String, Result<Buffer>>,
    }

    impl ReadOnlyStore {
        fn new() -> Self {
            ReadOnlyStore {
                objects: HashMap::new(),
            }
        }

        fn with(mut self, key: &str, content: Result<Buffer>) -> Self {
            self.objects.insert(key.to_string(), content);
            self
        }
    }

    #[async_trait]
    impl RemoteStore for ReadOnlyStore {
        async fn fetch_object(&self, _: &str, key: &str) -> Result<Buffer> {
            match self.objects.get(key) {
                Some(Ok(bs)) => Ok(bs.clone()),
                Some(Err(err)) => Err(Error::new(err.kind(), err.to_string())),
                None => Err(Error::new(ErrorKind::NotFound, "no such object")),
            }
        }

        async fn put_object(&self, _: &str, _: &str, _: Buffer, _: &ObjectMetadata) -> Result<()> {
            panic!("resolver must never write");
        }
    }

    fn paths(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(b"a.js\r\n./b.css\n\nimg/logo.png\n");
        assert_eq!(manifest.entries(), paths(&["a.js", "b.css", "img/logo.png"]));
        assert!(manifest.contains("b.css"));
        assert!(!manifest.contains("B.css"));
        assert!(Manifest::parse(b"").is_empty());
    }

    #[test]
    fn test_difference_is_case_sensitive() {
        let manifest = Manifest::parse(b"a.js\nIndex.html");
        let left = manifest.difference(&paths(&["a.js", "index.html", "c.css"]));
        assert_eq!(left, paths(&["index.html", "c.css"]));
    }

    #[test]
    fn test_difference_ignores_path_spelling() {
        let manifest = Manifest::parse(b"a.js\nassets/b.css");
        let left = manifest.difference(&paths(&["./a.js", "/assets/b.css", "c.css"]));
        assert_eq!(left, paths(&["c.css"]));
    }

    #[tokio::test]
    async fn test_resolve_without_manifest() {
        let store = ReadOnlyStore::new();
        let candidates = paths(&["a.js", "b.css"]);

        let files = resolve(&store, "bucket", "", &candidates, None).await;
        assert_eq!(files, candidates);
    }

    #[tokio::test]
    async fn test_resolve_with_manifest() {
        let store =
            ReadOnlyStore::new().with("release/manifest.txt", Ok(Buffer::from("a.js\n")));
        let candidates = paths(&["a.js", "b.css", "manifest.txt"]);

        let files =
            resolve(&store, "bucket", "release", &candidates, Some("manifest.txt")).await;
        assert_eq!(files, paths(&["b.css", "manifest.txt"]));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_on_missing_manifest() {
        let store = ReadOnlyStore::new();
        let candidates = paths(&["a.js", "b.css", "manifest.txt"]);

        let files = resolve(&store, "bucket", "", &candidates, Some("manifest.txt")).await;
        assert_eq!(files, candidates);
    }

    #[tokio::test]
    async fn test_resolve_falls_back_on_transport_error() {
        let store = ReadOnlyStore::new().with(
            "manifest.txt",
            Err(Error::new(ErrorKind::PermissionDenied, "denied")),
        );
        let candidates = paths(&["a.js"]);

        let files = resolve(&store, "bucket", "", &candidates, Some("manifest.txt")).await;
        assert_eq!(files, candidates);
    }
}
