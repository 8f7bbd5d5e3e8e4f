//! Weighted-random pair selection.
//!
//! An item is eligible when the host currently shows it, it is not a bare
//! number, it is not restricted, and it has not come back "Nothing" too often.
//! The first item is drawn by weight over all eligible items; the second is
//! drawn over eligible items never paired with the first before, falling back
//! to the whole eligible set when that leaves nothing.

use crate::config::SelectionConfig;
use crate::knowledge::{ItemRecord, KnowledgeBase};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;

static NUMBER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());

pub fn is_number_name(name: &str) -> bool {
    NUMBER_NAME.is_match(name.trim())
}

/// Case-insensitive, whitespace-trimmed membership test.
pub fn is_restricted(name: &str, restricted: &[String]) -> bool {
    let needle = name.trim().to_lowercase();
    restricted
        .iter()
        .any(|r| r.trim().to_lowercase() == needle)
}

/// `max(0, (ingredient + 1) - 0.5 * fail - 0.05 * dupe)`
pub fn weight(item: &ItemRecord) -> f64 {
    let w = (item.times_ingredient as f64 + 1.0)
        - 0.5 * item.times_fail as f64
        - 0.05 * item.times_dupe as f64;
    w.max(0.0)
}

/// Cumulative-weight draw. Returns 0 when every weight is zero.
pub fn weighted_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0;
    }
    let mut r = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if r < *w {
            return i;
        }
        r -= w;
    }
    0
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionFilter {
    pub restricted: Vec<String>,
    pub exclude_numeric: bool,
    pub nothing_threshold: u64,
}

impl Default for SelectionFilter {
    fn default() -> Self {
        Self::from_config(&SelectionConfig::default(), Vec::new())
    }
}

impl SelectionFilter {
    pub fn from_config(config: &SelectionConfig, restricted: Vec<String>) -> Self {
        Self {
            restricted,
            exclude_numeric: config.exclude_numeric,
            nothing_threshold: config.nothing_threshold,
        }
    }

    pub fn allows(&self, item: &ItemRecord, visible: &HashSet<String>) -> bool {
        visible.contains(&item.name)
            && !(self.exclude_numeric && is_number_name(&item.name))
            && !is_restricted(&item.name, &self.restricted)
            && item.times_nothing < self.nothing_threshold
    }
}

/// Eligible records in knowledge-base order.
pub fn eligible<'a>(
    kb: &'a KnowledgeBase,
    visible: &HashSet<String>,
    filter: &SelectionFilter,
) -> Vec<&'a ItemRecord> {
    kb.items().filter(|item| filter.allows(item, visible)).collect()
}

fn draw<'a, R: Rng + ?Sized>(pool: &[&'a ItemRecord], rng: &mut R) -> &'a ItemRecord {
    let weights: Vec<f64> = pool.iter().map(|item| weight(item)).collect();
    pool[weighted_index(&weights, rng)]
}

/// Next pair to try, or `None` when nothing is eligible.
pub fn select_pair<R: Rng + ?Sized>(
    kb: &KnowledgeBase,
    visible: &HashSet<String>,
    filter: &SelectionFilter,
    rng: &mut R,
) -> Option<(String, String)> {
    let items = eligible(kb, visible, filter);
    if items.is_empty() {
        return None;
    }

    let first = draw(&items, rng);
    let related = kb.related_to(&first.name);
    let mut pool: Vec<&ItemRecord> = items
        .iter()
        .copied()
        .filter(|item| item.name != first.name && !related.contains(&item.name))
        .collect();
    if pool.is_empty() {
        pool = items;
    }
    let second = draw(&pool, rng);

    Some((first.name.clone(), second.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Outcome;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn visible(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn record(ingredient: u64, fail: u64, dupe: u64) -> ItemRecord {
        let mut item = ItemRecord::new("x");
        item.times_ingredient = ingredient;
        item.times_fail = fail;
        item.times_dupe = dupe;
        item
    }

    #[test]
    fn test_weight_formula() {
        assert_eq!(weight(&record(0, 0, 0)), 1.0);
        assert_eq!(weight(&record(3, 0, 0)), 4.0);
        assert_eq!(weight(&record(0, 1, 0)), 0.5);
        assert!((weight(&record(1, 1, 10)) - 1.0).abs() < 1e-9);
        assert_eq!(weight(&record(0, 4, 0)), 0.0);
        assert_eq!(weight(&record(0, 100, 100)), 0.0);
        for i in 0..5 {
            for f in 0..5 {
                for d in 0..30 {
                    assert!(weight(&record(i, f, d)) >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_weighted_index_degenerate_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(weighted_index(&[10.0, 0.0, 0.0], &mut rng), 0);
            assert_eq!(weighted_index(&[0.0, 0.0, 0.0], &mut rng), 0);
            assert_eq!(weighted_index(&[0.0, 0.0, 2.0], &mut rng), 2);
        }
        assert_eq!(weighted_index(&[], &mut rng), 0);
    }

    #[test]
    fn test_number_names() {
        for name in ["1", "-3", "2.5", "-0.75", " 42 "] {
            assert!(is_number_name(name), "{}", name);
        }
        for name in ["Water", "1a", "1.", ".5", "3 Musketeers", ""] {
            assert!(!is_number_name(name), "{}", name);
        }
    }

    #[test]
    fn test_restricted_match_is_case_insensitive() {
        let restricted = vec![" lava ".to_string()];
        assert!(is_restricted("Lava", &restricted));
        assert!(is_restricted("LAVA  ", &restricted));
        assert!(!is_restricted("Lava Lamp", &restricted));
    }

    #[test]
    fn test_never_selects_ineligible_items() {
        let mut kb = KnowledgeBase::new();
        kb.merge_observed(["Water", "Fire", "42", "Lava", "Dust", "Hidden"]);
        kb.ensure_item("Dust").times_nothing = 2;
        let shown = visible(&["Water", "Fire", "42", "Lava", "Dust"]);
        let filter = SelectionFilter {
            restricted: vec!["lava".to_string()],
            ..SelectionFilter::default()
        };

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let (a, b) = select_pair(&kb, &shown, &filter, &mut rng).unwrap();
            for name in [&a, &b] {
                assert!(name == "Water" || name == "Fire", "unexpected {}", name);
            }
        }
    }

    #[test]
    fn test_nothing_threshold_is_configurable() {
        let mut kb = KnowledgeBase::new();
        kb.ensure_item("Dust").times_nothing = 2;
        let shown = visible(&["Dust"]);
        assert!(select_pair(&kb, &shown, &SelectionFilter::default(), &mut StdRng::seed_from_u64(1)).is_none());

        let lenient = SelectionFilter {
            nothing_threshold: 3,
            ..SelectionFilter::default()
        };
        let pick = select_pair(&kb, &shown, &lenient, &mut StdRng::seed_from_u64(1));
        assert_eq!(pick, Some(("Dust".to_string(), "Dust".to_string())));
    }

    #[test]
    fn test_empty_eligible_set_is_no_pick() {
        let mut kb = KnowledgeBase::new();
        kb.merge_observed(["Water"]);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(select_pair(&kb, &HashSet::new(), &SelectionFilter::default(), &mut rng).is_none());
    }

    #[test]
    fn test_two_items_pair_with_each_other() {
        let mut kb = KnowledgeBase::new();
        kb.merge_observed(["Water", "Fire"]);
        let shown = visible(&["Water", "Fire"]);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let (a, b) = select_pair(&kb, &shown, &SelectionFilter::default(), &mut rng).unwrap();
            let mut pair = [a, b];
            pair.sort();
            assert_eq!(pair, ["Fire".to_string(), "Water".to_string()]);
        }
    }

    #[test]
    fn test_related_partners_are_avoided() {
        let mut kb = KnowledgeBase::new();
        kb.merge_observed(["Water", "Fire", "Earth"]);
        kb.apply_outcome("Water", "Fire", &Outcome::Nothing);
        kb.apply_outcome("Water", "Earth", &Outcome::Nothing);
        let shown = visible(&["Water", "Fire", "Earth"]);
        let filter = SelectionFilter {
            nothing_threshold: 10,
            ..SelectionFilter::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let (a, b) = select_pair(&kb, &shown, &filter, &mut rng).unwrap();
            if a == "Fire" {
                assert_eq!(b, "Earth");
            }
            if a == "Earth" {
                assert_eq!(b, "Fire");
            }
            if a == "Water" {
                // Every other item is related, so the full set is used.
                assert!(["Water", "Fire", "Earth"].contains(&b.as_str()));
            }
        }
    }
}
