//! Producing an RFC 6902 patch from two JSON values.

use serde_json::Value;

use crate::op::PatchOp;
use crate::pointer::join;

/// Strategy used to diff two JSON arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayDiffStrategy {
    /// Removes from end to start, then element-wise replaces, then
    /// appended adds. Cheap, produces more ops on reordered arrays.
    IndexBased,
    /// Longest-common-subsequence based. Minimizes op count on arrays
    /// larger than [`DiffOptions::lcs_threshold`] elements on each side.
    Lcs,
}

/// Tunables for [`diff`].
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    pub array_strategy: ArrayDiffStrategy,
    /// Object/array recursion depth beyond which a whole-value `replace`
    /// is emitted instead of descending further.
    pub max_depth: usize,
    /// Minimum length on both sides before [`ArrayDiffStrategy::Lcs`] is
    /// actually used in place of index-based diffing.
    pub lcs_threshold: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { array_strategy: ArrayDiffStrategy::IndexBased, max_depth: 10, lcs_threshold: 5 }
    }
}

/// Computes the patch that transforms `source` into `target`.
pub fn diff(source: &Value, target: &Value) -> Vec<PatchOp> {
    diff_with(source, target, DiffOptions::default())
}

/// Like [`diff`] but with explicit [`DiffOptions`].
pub fn diff_with(source: &Value, target: &Value, options: DiffOptions) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_value(source, target, "", 0, &options, &mut ops);
    ops
}

fn diff_value(source: &Value, target: &Value, path: &str, depth: usize, options: &DiffOptions, ops: &mut Vec<PatchOp>) {
    if source == target {
        return;
    }
    match (source, target) {
        (Value::Object(_), Value::Object(_)) if depth < options.max_depth => {
            diff_object(source.as_object().unwrap(), target.as_object().unwrap(), path, depth, options, ops);
        }
        (Value::Array(a), Value::Array(b)) if depth < options.max_depth => {
            diff_array(a, b, path, depth, options, ops);
        }
        _ => ops.push(PatchOp::Replace { path: path.to_string(), value: target.clone() }),
    }
}

fn diff_object(
    source: &serde_json::Map<String, Value>,
    target: &serde_json::Map<String, Value>,
    path: &str,
    depth: usize,
    options: &DiffOptions,
    ops: &mut Vec<PatchOp>,
) {
    for key in source.keys() {
        if !target.contains_key(key) {
            ops.push(PatchOp::Remove { path: join(path, key) });
        }
    }
    for (key, target_value) in target {
        match source.get(key) {
            None => ops.push(PatchOp::Add { path: join(path, key), value: target_value.clone() }),
            Some(source_value) => {
                diff_value(source_value, target_value, &join(path, key), depth + 1, options, ops);
            }
        }
    }
}

fn diff_array(source: &[Value], target: &[Value], path: &str, depth: usize, options: &DiffOptions, ops: &mut Vec<PatchOp>) {
    let use_lcs = options.array_strategy == ArrayDiffStrategy::Lcs
        && source.len() > options.lcs_threshold
        && target.len() > options.lcs_threshold;

    if use_lcs {
        diff_array_lcs(source, target, path, ops);
        return;
    }

    let common_len = source.len().min(target.len());

    // Removes from end to start so earlier indices stay valid.
    for index in (target.len()..source.len()).rev() {
        ops.push(PatchOp::Remove { path: format!("{path}/{index}") });
    }

    // Element-wise replaces (may recurse into nested structures).
    for index in 0..common_len {
        diff_value(&source[index], &target[index], &format!("{path}/{index}"), depth + 1, options, ops);
    }

    // Appended adds, in order.
    for value in &target[common_len..] {
        ops.push(PatchOp::Add { path: format!("{path}/-"), value: value.clone() });
    }
}

/// Classic LCS-backed array diff: walks the longest-common-subsequence
/// table backward, emitting `remove` for source-only runs and `add` for
/// target-only runs. Produces fewer ops than index-based diffing when
/// the arrays share a long common subsequence that isn't a shared prefix.
fn diff_array_lcs(source: &[Value], target: &[Value], path: &str, ops: &mut Vec<PatchOp>) {
    let n = source.len();
    let m = target.len();
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if source[i] == target[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut removes = Vec::new();
    let mut adds = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < n && j < m {
        if source[i] == target[j] {
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            removes.push(i);
            i += 1;
        } else {
            adds.push((i, target[j].clone()));
            j += 1;
        }
    }
    while i < n {
        removes.push(i);
        i += 1;
    }
    while j < m {
        adds.push((n, target[j].clone()));
        j += 1;
    }

    for index in removes.into_iter().rev() {
        ops.push(PatchOp::Remove { path: format!("{path}/{index}") });
    }
    for (index, value) in adds {
        let target_path = if index >= source.len() { format!("{path}/-") } else { format!("{path}/{index}") };
        ops.push(PatchOp::Add { path: target_path, value });
    }
}
