//! Short, human-readable match codes.

use rand::Rng;

const PREFIX: &str = "LIKU-";
const SUFFIX_LEN: usize = 5;
/// Excludes `O`, `0`, `I`, `1` so a spoken or handwritten code never has an
/// ambiguous character.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates one fresh match code, e.g. `LIKU-7F3QD`.
pub fn generate() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char).collect();
    format!("{PREFIX}{suffix}")
}

/// Normalizes a user-supplied code for case-insensitive, whitespace-tolerant
/// comparison against a stored code.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_has_the_expected_prefix_and_length() {
        let code = generate();
        assert!(code.starts_with(PREFIX));
        assert_eq!(code.len(), PREFIX.len() + SUFFIX_LEN);
    }

    #[test]
    fn test_generate_never_contains_ambiguous_characters() {
        for _ in 0..200 {
            let code = generate();
            for forbidden in ['O', '0', 'I', '1'] {
                assert!(!code.contains(forbidden), "code {code} contains ambiguous char {forbidden}");
            }
        }
    }

    #[test]
    fn test_normalize_folds_case_and_trims_whitespace() {
        assert_eq!(normalize("  liku-7f3qd \n"), "LIKU-7F3QD");
    }
}
