use std::{collections::HashSet, fmt, sync::Arc};

use anyhow::{anyhow, Context as _, Result};
use opendal::{Buffer, Operator};
use tokio::{runtime::Handle, task::JoinSet};
use tracing::{debug, info, warn};

use crate::{
    key::{normalize_path, remote_key},
    manifest, RemoteStore, UploadError, UploadOptions, UploadSpec,
};

/// Result of uploading one file: its relative path, or why it failed.
pub type UploadOutcome = std::result::Result<String, UploadError>;

/// Uploader is the main entry point for differential uploads.
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn RemoteStore>,
}

impl fmt::Debug for Uploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uploader").finish_non_exhaustive()
    }
}

impl Uploader {
    /// Create a new uploader on top of the given store.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Uploader { store }
    }

    /// Create a new uploader writing through an opendal operator.
    pub fn from_operator(op: Operator) -> Self {
        Uploader::new(Arc::new(op))
    }

    /// Upload `files` as described by `opts`.
    ///
    /// Paths are normalized relative to `opts.base_dir` and de-duplicated.
    /// Files listed in the previous manifest are skipped and the manifest
    /// itself is always uploaded. Every file is sent by its own task; a
    /// failing file shows up in the report without stopping the others.
    ///
    /// Must be called within a tokio runtime. Only an upload task that can't
    /// be joined fails the whole batch. Dropping the returned future aborts
    /// all uploads still in flight.
    pub async fn upload<I, S>(&self, files: I, opts: &UploadOptions) -> Result<UploadReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let handle = Handle::try_current().context("upload requires a tokio runtime")?;

        let mut seen = HashSet::new();
        let candidates: Vec<String> = files
            .into_iter()
            .map(|path| normalize_path(path.as_ref()).to_string())
            .filter(|path| seen.insert(path.clone()))
            .collect();
        let manifest_path = opts.manifest_path.as_deref().map(normalize_path);

        let mut files = manifest::resolve(
            self.store.as_ref(),
            &opts.bucket,
            &opts.prefix,
            &candidates,
            manifest_path,
        )
        .await;
        if let Some(manifest_path) = manifest_path {
            if !files.iter().any(|path| path == manifest_path) {
                files.push(manifest_path.to_string());
            }
        }

        info!(
            bucket = %opts.bucket,
            prefix = %opts.prefix,
            files = files.len(),
            "uploading files"
        );

        let opts = Arc::new(opts.clone());
        let mut tasks = JoinSet::new();
        for path in files {
            let store = self.store.clone();
            let opts = opts.clone();
            tasks.spawn_on(
                async move { upload_file(store.as_ref(), &opts, path).await },
                &handle,
            );
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(outcome) = tasks.join_next().await {
            outcomes.push(outcome.context("upload task did not run to completion")?);
        }

        Ok(UploadReport { outcomes })
    }
}

async fn upload_file(
    store: &dyn RemoteStore,
    opts: &UploadOptions,
    path: String,
) -> UploadOutcome {
    let bs = match tokio::fs::read(opts.base_dir.join(&path)).await {
        Ok(bs) => bs,
        Err(source) => {
            warn!(path = %path, error = %source, "failed to read file");
            return Err(UploadError::Read { path, source });
        }
    };

    let spec = UploadSpec::derive(&path, opts.is_gzipped(&path), opts.cache_control_seconds);
    let metadata = spec.to_object_metadata(opts.acl.as_deref());
    let key = remote_key(&opts.prefix, &path);

    match store
        .put_object(&opts.bucket, &key, Buffer::from(bs), &metadata)
        .await
    {
        Ok(()) => {
            debug!(key = %key, content_type = %metadata.content_type, "uploaded");
            Ok(path)
        }
        Err(source) => {
            warn!(key = %key, error = %source, "failed to upload file");
            Err(UploadError::Transport { path, source })
        }
    }
}

/// UploadReport collects the outcome of every file in a batch.
///
/// Outcomes are in no particular order.
#[derive(Debug)]
pub struct UploadReport {
    outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn outcomes(&self) -> &[UploadOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<UploadOutcome> {
        self.outcomes
    }

    /// Paths that were uploaded successfully.
    pub fn uploaded(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| o.as_deref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &UploadError> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_ok())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Treat any failed file as a failure of the whole batch.
    ///
    /// Returns the uploaded paths when every file made it.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_success() {
            return Ok(self.outcomes.into_iter().flatten().collect());
        }

        let total = self.outcomes.len();
        let failed: Vec<String> = self.failures().map(|e| e.path().to_string()).collect();
        let first = self
            .outcomes
            .into_iter()
            .find_map(|o| o.err())
            .map(anyhow::Error::new)
            .unwrap_or_else(|| anyhow!("unknown failure"));

        Err(first.context(format!(
            "{} of {} files failed to upload: {}",
            failed.len(),
            total,
            failed.join(", ")
        )))
    }
}
