/// Normalize a file path to the form used for reads, keys and lookups.
///
/// Leading `./` and `/` are stripped so the path always stays relative to
/// the base directory. Nothing else is rewritten.
pub fn normalize_path(path: &str) -> &str {
    let mut path = path;
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            return path;
        }
    }
}

/// Build the object key for `path` under `prefix`.
///
/// `path` is normalized first; distinct normalized paths never end up on
/// the same key.
pub fn remote_key(prefix: &str, path: &str) -> String {
    let path = normalize_path(path);
    let prefix = prefix.trim_end_matches('/');

    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{prefix}/{path}")
    }
}
