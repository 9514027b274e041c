//! Store-key construction from a node path, and path normalisation for the group
//! hierarchy (spec §4.9).

use crate::error::{ZarrError, ZarrResult};
use crate::storage::{StorageError, StoreKey};

/// The store key suffix under which an array descriptor is persisted.
pub const ARRAY_DESCRIPTOR_KEY: &str = ".zarray";
/// The store key suffix under which a group descriptor is persisted.
pub const GROUP_DESCRIPTOR_KEY: &str = ".zgroup";
/// The store key suffix under which attributes are persisted.
pub const ATTRIBUTES_KEY: &str = ".zattrs";

/// Join a node's path prefix with a fixed suffix into a store key.
///
/// # Errors
/// Returns [`ZarrError::Storage`] if the resulting key is invalid.
pub fn node_key(path: &str, suffix: &str) -> ZarrResult<StoreKey> {
    let full = if path.is_empty() {
        suffix.to_string()
    } else {
        format!("{path}/{suffix}")
    };
    StoreKey::new(full).map_err(|e| ZarrError::Storage(StorageError::from(e)))
}

/// Normalise a user-supplied path (spec §4.9): convert backslashes to slashes, strip
/// leading/trailing slashes, collapse repeated slashes, and reject `.`/`..` segments.
///
/// # Errors
/// Returns [`ZarrError::InvalidPath`] if any segment is `.` or `..`.
pub fn normalize_path(path: &str) -> ZarrResult<String> {
    let replaced = path.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in replaced.split('/') {
        if segment.is_empty() {
            continue;
        }
        if segment == "." || segment == ".." {
            return Err(ZarrError::InvalidPath(path.to_string()));
        }
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

/// Join a (possibly empty) normalised parent path with a single child name, itself
/// normalised and validated.
///
/// # Errors
/// Returns [`ZarrError::InvalidPath`] if `name` is empty, or contains `.`/`..` segments.
pub fn join(parent: &str, name: &str) -> ZarrResult<String> {
    let name = normalize_path(name)?;
    if name.is_empty() {
        return Err(ZarrError::InvalidPath(name));
    }
    if parent.is_empty() {
        Ok(name)
    } else {
        Ok(format!("{parent}/{name}"))
    }
}

/// The immediate child name of `path` relative to `parent`, or `None` if `path` is not a
/// strict descendant of `parent`.
#[must_use]
pub fn immediate_child<'a>(parent: &str, path: &'a str) -> Option<&'a str> {
    let rest = if parent.is_empty() {
        path
    } else {
        path.strip_prefix(parent)?.strip_prefix('/')?
    };
    if rest.is_empty() {
        return None;
    }
    Some(rest.split('/').next().unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes_and_repeats() {
        assert_eq!(normalize_path(r"a\b//c/").unwrap(), "a/b/c");
    }

    #[test]
    fn rejects_dot_segments() {
        assert!(normalize_path("a/../b").is_err());
        assert!(normalize_path("./a").is_err());
    }

    #[test]
    fn node_key_joins_prefix() {
        let key = node_key("foo/bar", ARRAY_DESCRIPTOR_KEY).unwrap();
        assert_eq!(key.as_str(), "foo/bar/.zarray");
        let root = node_key("", ARRAY_DESCRIPTOR_KEY).unwrap();
        assert_eq!(root.as_str(), ".zarray");
    }

    #[test]
    fn immediate_child_finds_direct_descendant() {
        assert_eq!(immediate_child("foo", "foo/bar/baz"), Some("bar"));
        assert_eq!(immediate_child("", "foo/bar"), Some("foo"));
        assert_eq!(immediate_child("foo", "other/bar"), None);
        assert_eq!(immediate_child("foo", "foo"), None);
    }
}
