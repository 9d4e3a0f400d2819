//! Patch-vs-full-snapshot fallback decision.
//!
//! A patch that's nearly as large as the full state it would replace isn't
//! worth the round trip of apply-on-the-client risk; the broadcaster falls
//! back to sending the whole state instead.

/// Tunables for [`should_send_full_snapshot`].
#[derive(Debug, Clone, Copy)]
pub struct FallbackThresholds {
    /// Fall back once `patch_size / full_state_size` exceeds this ratio.
    pub size_ratio: f64,
    /// Fall back once the patch carries more than this many operations.
    pub op_count_cap: usize,
}

impl Default for FallbackThresholds {
    fn default() -> Self {
        Self { size_ratio: 0.5, op_count_cap: 100 }
    }
}

/// Decides whether to send a full snapshot instead of `op_count` patch
/// operations serializing to `patch_size` bytes, against a full state that
/// would serialize to `full_state_size` bytes.
pub fn should_send_full_snapshot(
    patch_size: usize,
    full_state_size: usize,
    op_count: usize,
    thresholds: FallbackThresholds,
) -> bool {
    if full_state_size == 0 {
        return false;
    }
    let ratio = patch_size as f64 / full_state_size as f64;
    ratio > thresholds.size_ratio || op_count > thresholds.op_count_cap
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_patch_does_not_fall_back() {
        assert!(!should_send_full_snapshot(10, 1000, 1, FallbackThresholds::default()));
    }

    #[test]
    fn test_patch_over_ratio_falls_back() {
        assert!(should_send_full_snapshot(600, 1000, 1, FallbackThresholds::default()));
    }

    #[test]
    fn test_patch_at_exact_ratio_does_not_fall_back() {
        assert!(!should_send_full_snapshot(500, 1000, 1, FallbackThresholds::default()));
    }

    #[test]
    fn test_op_count_over_cap_falls_back_even_if_small() {
        assert!(should_send_full_snapshot(10, 10_000, 101, FallbackThresholds::default()));
    }
}
