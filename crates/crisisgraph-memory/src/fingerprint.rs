//! Scenario fingerprints and bag-of-words tokens.

use ring::digest::{digest, SHA256};
use std::collections::HashSet;

/// Hex characters kept from the digest.
const FINGERPRINT_LEN: usize = 16;

/// Lowercase and collapse all whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable fingerprint of the normalized scenario: truncated hex SHA-256.
pub fn fingerprint(text: &str) -> String {
    let hash = digest(&SHA256, normalize(text).as_bytes());
    let mut hex = String::with_capacity(FINGERPRINT_LEN);
    for byte in hash.as_ref().iter().take(FINGERPRINT_LEN / 2) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Lowercased whitespace-separated words. No stemming, punctuation stays attached.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_ignores_case_and_spacing() {
        assert_eq!(normalize("  Data   BREACH\n at\tAcme "), "data breach at acme");
        assert_eq!(fingerprint("Data breach at Acme"), fingerprint("data   breach\nat ACME"));
    }

    #[test]
    fn fingerprint_is_short_hex() {
        let fp = fingerprint("hello");
        assert_eq!(fp.len(), 16);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        // sha256("hello") = 2cf24dba5fb0a30e...
        assert_eq!(fp, "2cf24dba5fb0a30e");
        assert_ne!(fingerprint("hello"), fingerprint("hello world"));
    }

    #[test]
    fn tokens_are_a_set() {
        let t = tokenize("Delay delay the NOTICE, delay");
        assert_eq!(t.len(), 3);
        assert!(t.contains("notice,"));
    }
}
