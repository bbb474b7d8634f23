//! Small shared helpers: stable workbook ids, short random object names,
//! path rendering.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

/// Crockford-ish alphabet without the ambiguous 0/1/l/o glyphs.
const SHORT_ID_ALPHABET: &[u8] = b"23456789abcdefghijkmnpqrstuvwxyz";

const WORKBOOK_ID_TOKEN_LEN: usize = 10;

pub fn system_time_to_datetime(time: SystemTime) -> Option<DateTime<Utc>> {
    Some(DateTime::<Utc>::from(time))
}

/// Stable workbook id derived from path, size, and mtime. Ids change when
/// the file changes, which is what callers want: a saved edit invalidates
/// any id the agent still holds.
pub fn hash_path_metadata(path: &Path, metadata: &Metadata) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(metadata.len().to_le_bytes());
    if let Ok(modified) = metadata.modified()
        && let Some(dt) = system_time_to_datetime(modified)
    {
        hasher.update(dt.to_rfc3339_opts(SecondsFormat::Micros, true).as_bytes());
    }
    let digest: [u8; 32] = hasher.finalize().into();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let mut value = u64::from_be_bytes(bytes);

    let mut token = String::with_capacity(WORKBOOK_ID_TOKEN_LEN);
    for _ in 0..WORKBOOK_ID_TOKEN_LEN {
        let idx = (value >> 59) as usize & 31;
        token.push(SHORT_ID_ALPHABET[idx] as char);
        value <<= 5;
    }
    format!("wb-{token}")
}

pub fn make_short_workbook_id(canonical_id: &str) -> String {
    canonical_id
        .strip_prefix("wb-")
        .unwrap_or(canonical_id)
        .to_string()
}

pub fn path_to_forward_slashes(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw.contains('\\') {
        raw.replace('\\', "/")
    } else {
        raw.into_owned()
    }
}

/// Short random suffix for generated object names (tables, pivot anchors).
pub fn make_short_random_id(prefix: &str, len: usize) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..SHORT_ID_ALPHABET.len());
            SHORT_ID_ALPHABET[idx] as char
        })
        .collect();
    if prefix.is_empty() {
        suffix
    } else {
        format!("{prefix}-{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_ids_are_stable_for_an_unchanged_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"contents").unwrap();
        let metadata = std::fs::metadata(tmp.path()).unwrap();

        let first = hash_path_metadata(tmp.path(), &metadata);
        let second = hash_path_metadata(tmp.path(), &metadata);
        assert_eq!(first, second);
        assert!(first.starts_with("wb-"));
        assert_eq!(first.len(), 3 + 10);
    }

    #[test]
    fn short_id_strips_the_prefix() {
        assert_eq!(make_short_workbook_id("wb-abcdefghij"), "abcdefghij");
        assert_eq!(make_short_workbook_id("raw"), "raw");
    }

    #[test]
    fn random_ids_carry_the_prefix_and_length() {
        let id = make_short_random_id("tbl", 6);
        assert!(id.starts_with("tbl-"));
        assert_eq!(id.len(), 4 + 6);

        let bare = make_short_random_id("", 4);
        assert_eq!(bare.len(), 4);
    }

    #[test]
    fn forward_slash_paths_are_untouched() {
        assert_eq!(
            path_to_forward_slashes(Path::new("reports/q1.xlsx")),
            "reports/q1.xlsx"
        );
    }
}
