//! JSON Pointer (RFC 6901) segment escaping and navigation.

use serde_json::Value;

use crate::error::PatchError;

/// Escapes a raw object key for use as one JSON Pointer segment: `~` becomes
/// `~0` and `/` becomes `~1`. Order matters — `~` must be escaped first or
/// a literal `~1` in the key would be mistaken for an escaped `/`.
pub fn escape_segment(raw: &str) -> String {
    raw.replace('~', "~0").replace('/', "~1")
}

/// Reverses [`escape_segment`].
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Splits a JSON Pointer (e.g. `/board/1/1`) into unescaped segments. The
/// empty pointer `""` (document root) yields no segments.
pub fn split(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer.trim_start_matches('/').split('/').map(unescape_segment).collect()
}

/// Joins a parent pointer and one raw (unescaped) key into a child pointer.
pub fn join(parent: &str, key: &str) -> String {
    format!("{parent}/{}", escape_segment(key))
}

/// Resolves a pointer to an immutable reference into `root`.
pub fn resolve<'a>(root: &'a Value, pointer: &str) -> Result<&'a Value, PatchError> {
    let mut current = root;
    for segment in split(pointer) {
        current = step(current, &segment)?;
    }
    Ok(current)
}

fn step<'a>(value: &'a Value, segment: &str) -> Result<&'a Value, PatchError> {
    match value {
        Value::Object(map) => map.get(segment).ok_or_else(|| PatchError::PathNotFound(segment.to_string())),
        Value::Array(arr) => {
            let index = parse_index(segment, arr.len(), false)?;
            arr.get(index).ok_or_else(|| PatchError::IndexOutOfRange(segment.to_string()))
        }
        _ => Err(PatchError::PathNotFound(segment.to_string())),
    }
}

/// Resolves the parent container and final key/index of `pointer`. Returns
/// `None` for the root pointer, which has no parent.
pub fn split_parent(pointer: &str) -> Option<(String, String)> {
    let mut segments = split(pointer);
    let last = segments.pop()?;
    let parent = segments.into_iter().fold(String::new(), |acc, seg| join(&acc, &seg));
    Some((parent, last))
}

/// Parses an array index segment. When `for_insert` is true, `"-"` is
/// accepted and mapped to `len` (append); otherwise `"-"` is invalid.
pub fn parse_index(segment: &str, len: usize, for_insert: bool) -> Result<usize, PatchError> {
    if segment == "-" {
        return if for_insert {
            Ok(len)
        } else {
            Err(PatchError::InvalidPointer(segment.to_string()))
        };
    }
    segment.parse::<usize>().map_err(|_| PatchError::InvalidPointer(segment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_segment_handles_tilde_and_slash() {
        assert_eq!(escape_segment("a/b"), "a~1b");
        assert_eq!(escape_segment("a~b"), "a~0b");
        assert_eq!(escape_segment("a~/b"), "a~0~1b");
    }

    #[test]
    fn test_unescape_segment_reverses_escape() {
        assert_eq!(unescape_segment("a~1b"), "a/b");
        assert_eq!(unescape_segment("a~0b"), "a~b");
    }

    #[test]
    fn test_split_handles_root_and_nested_pointer() {
        assert!(split("").is_empty());
        assert_eq!(split("/board/1/1"), vec!["board", "1", "1"]);
        assert_eq!(split("/a~1b"), vec!["a/b"]);
    }

    #[test]
    fn test_resolve_navigates_object_and_array() {
        let value = serde_json::json!({"board": [["X", null], [null, "O"]]});
        let resolved = resolve(&value, "/board/1/1").unwrap();
        assert_eq!(resolved, "O");
    }

    #[test]
    fn test_resolve_missing_path_errors() {
        let value = serde_json::json!({"a": 1});
        assert!(resolve(&value, "/b").is_err());
    }

    #[test]
    fn test_split_parent_separates_last_segment() {
        let (parent, key) = split_parent("/board/1/1").unwrap();
        assert_eq!(parent, "/board/1");
        assert_eq!(key, "1");
    }

    #[test]
    fn test_split_parent_of_root_is_none() {
        assert!(split_parent("").is_none());
    }
}
