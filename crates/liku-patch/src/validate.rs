//! Pre-application validation of a patch against a document, without
//! mutating anything.

use serde_json::Value;

use crate::error::PatchError;
use crate::op::PatchOp;
use crate::pointer;

/// Checks that every operation in `patch` could be applied to `source`
/// without actually applying it: `remove`/`replace` targets exist,
/// `add`'s parent exists, `move`/`copy` sources exist, `test` deep-equals.
pub fn validate(source: &Value, patch: &[PatchOp]) -> Result<(), PatchError> {
    for op in patch {
        validate_one(source, op)?;
    }
    Ok(())
}

fn validate_one(doc: &Value, op: &PatchOp) -> Result<(), PatchError> {
    match op {
        PatchOp::Remove { path } | PatchOp::Replace { path, .. } => {
            pointer::resolve(doc, path).map(|_| ())
        }
        PatchOp::Add { path, .. } => {
            let Some((parent, _)) = pointer::split_parent(path) else {
                return Ok(());
            };
            pointer::resolve(doc, &parent).map(|_| ())
        }
        PatchOp::Move { from, .. } | PatchOp::Copy { from, .. } => pointer::resolve(doc, from).map(|_| ()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use serde_json::json;

    #[test]
    fn test_validate_accepts_any_diff_output() {
        let source = json!({"a": 1, "b": [1, 2]});
        let target = json!({"a": 2, "b": [1, 2, 3], "c": true});
        let ops = diff(&source, &target);
        assert!(validate(&source, &ops).is_ok());
    }

    #[test]
    fn test_validate_rejects_remove_of_missing_path() {
        let source = json!({"a": 1});
        let patch = [PatchOp::Remove { path: "/missing".into() }];
        assert!(validate(&source, &patch).is_err());
    }

    #[test]
    fn test_validate_rejects_add_with_missing_parent() {
        let source = json!({"a": 1});
        let patch = [PatchOp::Add { path: "/missing/child".into(), value: json!(1) }];
        assert!(validate(&source, &patch).is_err());
    }

    #[test]
    fn test_validate_accepts_add_at_root_level() {
        let source = json!({"a": 1});
        let patch = [PatchOp::Add { path: "/b".into(), value: json!(2) }];
        assert!(validate(&source, &patch).is_ok());
    }
}
