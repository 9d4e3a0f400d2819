use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One RFC 6902 patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Move { path, .. }
            | Self::Copy { path, .. }
            | Self::Test { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_op_serializes_with_op_tag() {
        let op = PatchOp::Replace { path: "/a".into(), value: Value::from(1) };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "replace");
        assert_eq!(json["path"], "/a");
        assert_eq!(json["value"], 1);
    }

    #[test]
    fn test_patch_op_remove_has_no_value_field() {
        let op = PatchOp::Remove { path: "/a".into() };
        let json = serde_json::to_value(&op).unwrap();
        assert!(json.get("value").is_none());
    }

    #[test]
    fn test_patch_op_round_trips_through_json() {
        let op = PatchOp::Move { from: "/a".into(), path: "/b".into() };
        let bytes = serde_json::to_vec(&op).unwrap();
        let decoded: PatchOp = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, op);
    }
}
