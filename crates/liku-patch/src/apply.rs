//! Applying an RFC 6902 patch to a JSON value.

use serde_json::Value;

use crate::error::PatchError;
use crate::op::PatchOp;
use crate::pointer::{self, parse_index};

/// Applies `patch` to `source`, returning a new value. `source` is never
/// mutated — every operation works against a deep-cloned copy.
pub fn apply(source: &Value, patch: &[PatchOp]) -> Result<Value, PatchError> {
    let mut doc = source.clone();
    for op in patch {
        apply_one(&mut doc, op)?;
    }
    Ok(doc)
}

fn apply_one(doc: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    match op {
        PatchOp::Add { path, value } => add(doc, path, value.clone()),
        PatchOp::Remove { path } => remove(doc, path).map(|_| ()),
        PatchOp::Replace { path, value } => {
            remove(doc, path)?;
            add(doc, path, value.clone())
        }
        PatchOp::Move { from, path } => {
            let value = remove(doc, from)?;
            add(doc, path, value)
        }
        PatchOp::Copy { from, path } => {
            let value = pointer::resolve(doc, from)?.clone();
            add(doc, path, value)
        }
        PatchOp::Test { path, value } => {
            let actual = pointer::resolve(doc, path)?;
            if actual == value {
                Ok(())
            } else {
                Err(PatchError::TestFailed(path.clone()))
            }
        }
    }
}

fn add(doc: &mut Value, path: &str, value: Value) -> Result<(), PatchError> {
    let Some((parent_path, key)) = pointer::split_parent(path) else {
        *doc = value;
        return Ok(());
    };
    let parent = resolve_mut(doc, &parent_path)?;
    match parent {
        Value::Object(map) => {
            map.insert(pointer::unescape_segment(&key), value);
            Ok(())
        }
        Value::Array(arr) => {
            let index = parse_index(&key, arr.len(), true)?;
            if index > arr.len() {
                return Err(PatchError::IndexOutOfRange(key));
            }
            arr.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::ParentNotFound(parent_path)),
    }
}

fn remove(doc: &mut Value, path: &str) -> Result<Value, PatchError> {
    let Some((parent_path, key)) = pointer::split_parent(path) else {
        return Ok(std::mem::replace(doc, Value::Null));
    };
    let parent = resolve_mut(doc, &parent_path)?;
    match parent {
        Value::Object(map) => {
            map.remove(&pointer::unescape_segment(&key)).ok_or_else(|| PatchError::PathNotFound(path.to_string()))
        }
        Value::Array(arr) => {
            let index = parse_index(&key, arr.len(), false)?;
            if index >= arr.len() {
                return Err(PatchError::IndexOutOfRange(path.to_string()));
            }
            Ok(arr.remove(index))
        }
        _ => Err(PatchError::ParentNotFound(parent_path)),
    }
}

fn resolve_mut<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Value, PatchError> {
    let mut current = doc;
    for segment in pointer::split(path) {
        current = match current {
            Value::Object(map) => map.get_mut(&segment).ok_or_else(|| PatchError::ParentNotFound(segment.clone()))?,
            Value::Array(arr) => {
                let index = parse_index(&segment, arr.len(), false)?;
                arr.get_mut(index).ok_or_else(|| PatchError::IndexOutOfRange(segment.clone()))?
            }
            _ => return Err(PatchError::ParentNotFound(segment)),
        };
    }
    Ok(current)
}
