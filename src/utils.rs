//! Utility functions for file names and path manipulation

use std::path::{Path, PathBuf};

/// Prefix of generated names for requests whose file name sanitizes to nothing
const PLACEHOLDER_PREFIX: &str = "material";

/// Suffix of in-flight partial files
const PARTIAL_SUFFIX: &str = "part";

/// Make a caller-supplied name safe to use as a single path component
///
/// Path separators (`/` and `\`) are replaced with `_` and surrounding
/// whitespace is trimmed. Names that end up empty, `.` or `..` are replaced by a
/// generated placeholder.
///
/// # Examples
///
/// ```
/// use material_dl::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("  Calculus Notes.pdf "), "Calculus Notes.pdf");
/// assert_eq!(sanitize_file_name("a/b.pdf"), "a_b.pdf");
/// assert!(sanitize_file_name("   ").starts_with("material-"));
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim();

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        placeholder_file_name()
    } else {
        trimmed.to_string()
    }
}

/// Generated name used when a request has no usable file name
pub fn placeholder_file_name() -> String {
    format!(
        "{}-{}",
        PLACEHOLDER_PREFIX,
        chrono::Utc::now().timestamp_millis()
    )
}

/// Whether `reference` is a fully-qualified `http://` or `https://` URL
///
/// The scheme comparison is case-insensitive and a host is required, so
/// storage paths such as `https-notes/file.pdf` are not mistaken for URLs.
pub fn is_absolute_url(reference: &str) -> bool {
    let reference = reference.trim();
    let lower = reference.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return false;
    }
    url::Url::parse(reference)
        .map(|u| u.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Hidden, uniquely named sibling of `final_path` that a transfer writes into
///
/// Living in the same directory keeps the final rename atomic.
pub fn partial_path_for(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(placeholder_file_name);
    let nonce: u32 = rand::random();
    final_path.with_file_name(format!(".{}.{:08x}.{}", name, nonce, PARTIAL_SUFFIX))
}

/// Remove a partial file, ignoring a file that was never created
pub async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove partial file")
        }
    }
}
