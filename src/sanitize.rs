use crate::validation::ValidationError;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const MAX_STEM_LEN: usize = 50;

/// Derive a storage-safe, collision-resistant name from a client-supplied
/// filename. Directory components are dropped, characters outside
/// [A-Za-z0-9._-] are removed, the stem is capped, and a unix-millis
/// timestamp plus a random token is prefixed so concurrent uploads of the
/// same file cannot collide.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");

    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_matches('.');

    let (stem, extension) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, Some(ext)),
        _ => (cleaned, None),
    };
    let stem: String = stem.chars().filter(|c| *c != '.').take(MAX_STEM_LEN).collect();
    let stem = if stem.is_empty() { "upload" } else { &stem };

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let token = format!("{:08x}", rand::random::<u32>());

    match extension {
        Some(ext) => format!("{}_{}_{}.{}", timestamp, token, stem, ext.to_lowercase()),
        None => format!("{}_{}_{}", timestamp, token, stem),
    }
}

/// Join a sanitized name with the upload directory, guaranteeing the result
/// stays inside that directory. The name must be a single normal path
/// component; anything else (separators, `..`, absolute prefixes) fails.
pub fn resolve_in_upload_dir(upload_dir: &Path, name: &str) -> Result<PathBuf, ValidationError> {
    let candidate = Path::new(name);
    let mut components = candidate.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(upload_dir.join(name)),
        _ => Err(ValidationError::UnsafePath),
    }
}
