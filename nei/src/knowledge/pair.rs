//! Unordered name pairs and their canonical key.

use serde::{Deserialize, Serialize};

const PAIR_KEY_SEPARATOR: &str = "||";

/// Canonical identifier for an unordered pair: both names trimmed, sorted,
/// joined with `||`. `pair_key(a, b) == pair_key(b, a)` for all inputs.
pub fn pair_key(a: &str, b: &str) -> String {
    let (x, y) = (a.trim(), b.trim());
    if x <= y {
        format!("{}{}{}", x, PAIR_KEY_SEPARATOR, y)
    } else {
        format!("{}{}{}", y, PAIR_KEY_SEPARATOR, x)
    }
}

/// An unordered pair of item names, stored in the order it was first seen.
///
/// Serialized as a two-element array (`["Water", "Fire"]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipePair(pub String, pub String);

impl RecipePair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        RecipePair(a.into(), b.into())
    }

    /// True when this pair is `(a, b)` in either order.
    pub fn matches(&self, a: &str, b: &str) -> bool {
        (self.0 == a && self.1 == b) || (self.0 == b && self.1 == a)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0 == name || self.1 == name
    }

    /// The other half of the pair, if `name` is one of its members.
    pub fn partner_of(&self, name: &str) -> Option<&str> {
        if self.0 == name {
            Some(self.1.as_str())
        } else if self.1 == name {
            Some(self.0.as_str())
        } else {
            None
        }
    }

    pub fn key(&self) -> String {
        pair_key(&self.0, &self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_order_independent() {
        let names = ["Water", "Fire", "fire", " Steam ", "", "Lava"];
        for a in names {
            for b in names {
                assert_eq!(pair_key(a, b), pair_key(b, a));
            }
        }
        assert_eq!(pair_key("Water", "Fire"), "Fire||Water");
        assert_eq!(pair_key(" Steam", "Air "), "Air||Steam");
    }

    #[test]
    fn test_recipe_pair_matches_either_order() {
        let pair = RecipePair::new("Water", "Lava");
        assert!(pair.matches("Lava", "Water"));
        assert!(!pair.matches("Water", "Water"));
        assert_eq!(pair.partner_of("Lava"), Some("Water"));
        assert_eq!(pair.partner_of("Fire"), None);
    }

    #[test]
    fn test_self_pair_partner() {
        let pair = RecipePair::new("Fire", "Fire");
        assert_eq!(pair.partner_of("Fire"), Some("Fire"));
    }
}
