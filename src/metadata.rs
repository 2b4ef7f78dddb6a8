use mime_guess::Mime;

use crate::ObjectMetadata;

/// Two years, the default cache period for uploaded objects.
pub const DEFAULT_CACHE_CONTROL_SECONDS: u64 = 60 * 60 * 24 * 365 * 2;

/// UploadSpec is the transfer metadata derived for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSpec {
    pub content_type: String,
    pub cache_control: String,
    pub content_encoding: Option<&'static str>,
}

impl UploadSpec {
    /// Derive the spec of `path` from its extension.
    ///
    /// Textual types get `; charset=utf-8` appended, unknown extensions are
    /// sent as `application/octet-stream`.
    pub fn derive(path: &str, gzipped: bool, cache_control_seconds: u64) -> Self {
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let mut content_type = mime.essence_str().to_string();
        if let Some(charset) = charset(&mime) {
            content_type.push_str("; charset=");
            content_type.push_str(&charset.to_lowercase());
        }

        UploadSpec {
            content_type,
            cache_control: cache_control(cache_control_seconds),
            content_encoding: gzipped.then_some("gzip"),
        }
    }

    pub fn to_object_metadata(&self, acl: Option<&str>) -> ObjectMetadata {
        ObjectMetadata {
            content_type: self.content_type.clone(),
            cache_control: self.cache_control.clone(),
            acl: acl.map(str::to_string),
            content_encoding: self.content_encoding.map(str::to_string),
        }
    }
}

/// Render the `cache-control` header for the given lifetime.
pub fn cache_control(seconds: u64) -> String {
    format!("max-age={seconds}, public")
}

fn charset(mime: &Mime) -> Option<&'static str> {
    match (mime.type_().as_str(), mime.subtype().as_str()) {
        ("text", _) | ("application", "javascript" | "json") => Some("UTF-8"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_cache_control_is_two_years() {
        assert_eq!(DEFAULT_CACHE_CONTROL_SECONDS, 63_072_000);
        assert_eq!(cache_control(DEFAULT_CACHE_CONTROL_SECONDS), "max-age=63072000, public");
    }

    #[test]
    fn test_derive_gzipped_html() {
        let spec = UploadSpec::derive("x.html", true, DEFAULT_CACHE_CONTROL_SECONDS);
        assert_eq!(
            spec,
            UploadSpec {
                content_type: "text/html; charset=utf-8".to_string(),
                cache_control: "max-age=63072000, public".to_string(),
                content_encoding: Some("gzip"),
            }
        );
    }

    #[test]
    fn test_derive_content_type() {
        let cases = [
            ("assets/app.css", "text/css; charset=utf-8"),
            ("data/config.json", "application/json; charset=utf-8"),
            ("img/logo.png", "image/png"),
            ("LICENSE", "application/octet-stream"),
            ("blob.unknownext", "application/octet-stream"),
        ];

        for (path, expected) in cases {
            let spec = UploadSpec::derive(path, false, 60);
            assert_eq!(spec.content_type, expected, "{path}");
            assert_eq!(spec.cache_control, "max-age=60, public");
            assert_eq!(spec.content_encoding, None);
        }
    }

    #[test]
    fn test_to_object_metadata() {
        let spec = UploadSpec::derive("index.html", false, 300);
        let metadata = spec.to_object_metadata(Some("public-read"));

        assert_eq!(
            metadata,
            ObjectMetadata {
                content_type: "text/html; charset=utf-8".to_string(),
                cache_control: "max-age=300, public".to_string(),
                acl: Some("public-read".to_string()),
                content_encoding: None,
            }
        );
    }
}
