mod error;
pub use error::UploadError;

mod key;
pub use key::{normalize_path, remote_key};

mod manifest;
pub use manifest::{resolve, Manifest};

mod metadata;
pub use metadata::{cache_control, UploadSpec, DEFAULT_CACHE_CONTROL_SECONDS};

mod options;
pub use options::UploadOptions;

mod store;
pub use store::{ObjectMetadata, RemoteStore};

mod uploader;
pub use uploader::{UploadOutcome, UploadReport, Uploader};
