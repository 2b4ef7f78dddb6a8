use std::{collections::HashSet, path::PathBuf};

use serde::Deserialize;

use crate::{key::normalize_path, DEFAULT_CACHE_CONTROL_SECONDS};

/// Options of a single upload batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// Local directory every file path is relative to.
    pub base_dir: PathBuf,
    pub bucket: String,
    /// Key prefix prepended to every uploaded path.
    pub prefix: String,
    pub acl: Option<String>,
    /// Paths whose content is already gzip compressed.
    #[serde(rename = "gzipped_file_paths")]
    pub gzipped_paths: HashSet<String>,
    #[serde(rename = "cache_control")]
    pub cache_control_seconds: u64,
    /// Path of the manifest listing the files of this deploy.
    ///
    /// When set, the previous manifest is used to skip unchanged files and
    /// the local one is always uploaded.
    pub manifest_path: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        UploadOptions {
            base_dir: PathBuf::from("."),
            bucket: String::new(),
            prefix: String::new(),
            acl: None,
            gzipped_paths: HashSet::new(),
            cache_control_seconds: DEFAULT_CACHE_CONTROL_SECONDS,
            manifest_path: None,
        }
    }
}

impl UploadOptions {
    pub fn new(base_dir: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        UploadOptions {
            base_dir: base_dir.into(),
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    pub fn with_gzipped_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gzipped_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cache_control_seconds(mut self, seconds: u64) -> Self {
        self.cache_control_seconds = seconds;
        self
    }

    pub fn with_manifest_path(mut self, path: impl Into<String>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }

    /// Whether `path` is listed as gzipped, however either side is spelled.
    pub fn is_gzipped(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.gzipped_paths
            .iter()
            .any(|gzipped| normalize_path(gzipped) == path)
    }
}
