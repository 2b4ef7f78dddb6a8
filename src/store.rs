use async_trait::async_trait;
use opendal::{Buffer, Error, ErrorKind, Operator, Result};
use tracing::debug;

/// Metadata attached to every object written by the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub cache_control: String,
    pub acl: Option<String>,
    pub content_encoding: Option<String>,
}

/// RemoteStore is the object storage the uploader talks to.
///
/// Implementations are shared between all upload tasks of a batch, so they
/// must be safe to call concurrently. A missing object must be reported as
/// [`ErrorKind::NotFound`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the whole content of `key` in `bucket`.
    async fn fetch_object(&self, bucket: &str, key: &str) -> Result<Buffer>;

    /// Write `body` to `key` in `bucket`, replacing any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Buffer,
        metadata: &ObjectMetadata,
    ) -> Result<()>;
}

/// An operator is bound to a single bucket at build time, the bucket
/// argument is only checked against it.
#[async_trait]
impl RemoteStore for Operator {
    async fn fetch_object(&self, bucket: &str, key: &str) -> Result<Buffer> {
        check_bucket(self, bucket)?;
        self.read(key).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Buffer,
        metadata: &ObjectMetadata,
    ) -> Result<()> {
        check_bucket(self, bucket)?;

        let cap = self.info().full_capability();
        let mut fut = self.write_with(key, body);
        if cap.write_with_content_type {
            fut = fut.content_type(&metadata.content_type);
        } else {
            let content_type = &metadata.content_type;
            debug!(key, content_type = %content_type, "content type unsupported, skipped");
        }
        if cap.write_with_cache_control {
            fut = fut.cache_control(&metadata.cache_control);
        } else {
            let cache_control = &metadata.cache_control;
            debug!(key, cache_control = %cache_control, "cache control unsupported, skipped");
        }
        if let Some(encoding) = &metadata.content_encoding {
            if cap.write_with_content_encoding {
                fut = fut.content_encoding(encoding);
            } else {
                debug!(key, encoding = %encoding, "content encoding unsupported, skipped");
            }
        }
        if let Some(acl) = &metadata.acl {
            // Operators carry no per-object ACL, the service config decides.
            debug!(key, acl = %acl, "acl is left to service configuration");
        }

        fut.await?;
        Ok(())
    }
}

fn check_bucket(op: &Operator, bucket: &str) -> Result<()> {
    let info = op.info();
    let name = info.name();
    if !name.is_empty() && !bucket.is_empty() && name != bucket {
        return Err(Error::new(
            ErrorKind::ConfigInvalid,
            "operator is bound to another bucket",
        )
        .with_context("operator", name)
        .with_context("bucket", bucket));
    }
    Ok(())
}
