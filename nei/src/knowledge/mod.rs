//! Knowledge base: every known item, its discovery statistics, known recipe
//! pairs and pairs known to combine into nothing.
//!
//! Invariants:
//! - Records are never deleted and counters never decrease.
//! - A product returned by the oracle is not promoted to a record until the
//!   host surface shows it (see [`KnowledgeBase::merge_observed`]). The host is
//!   the source of truth for "this item exists"; the oracle only tells us how
//!   items relate.
//! - Failed pairs and per-item recipes are unordered and never duplicated.

pub mod pair;

pub use pair::{pair_key, RecipePair};

use crate::error::EngineResult;
use crate::storage::{self, KeyValueStore, KEY_RECIPES_DB};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Product name the oracle uses for "these two do not combine".
pub const NOTHING: &str = "Nothing";

/// Starter elements used when neither the store nor the host offers any.
pub const DEFAULT_SEEDS: [&str; 4] = ["Water", "Fire", "Wind", "Earth"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(alias = "product")]
    pub name: String,
    #[serde(default, alias = "emoji")]
    pub icon: String,
    #[serde(default, alias = "timesIngredient")]
    pub times_ingredient: u64,
    #[serde(default, alias = "timesFail")]
    pub times_fail: u64,
    #[serde(default, alias = "timesDupe")]
    pub times_dupe: u64,
    #[serde(default, alias = "timesNothing")]
    pub times_nothing: u64,
    #[serde(default)]
    pub recipes: Vec<RecipePair>,
}

impl ItemRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: String::new(),
            times_ingredient: 0,
            times_fail: 0,
            times_dupe: 0,
            times_nothing: 0,
            recipes: Vec::new(),
        }
    }

    pub fn has_recipe(&self, a: &str, b: &str) -> bool {
        self.recipes.iter().any(|r| r.matches(a, b))
    }
}

/// What the oracle said a pair combines into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Nothing,
    Product { name: String, icon: String },
}

impl Outcome {
    /// Empty results and the literal `"Nothing"` both mean no combination.
    pub fn from_result(result: &str, icon: &str) -> Self {
        if result.trim().is_empty() || result == NOTHING {
            Outcome::Nothing
        } else {
            Outcome::Product {
                name: result.to_string(),
                icon: icon.to_string(),
            }
        }
    }

    pub fn product(&self) -> Option<&str> {
        match self {
            Outcome::Nothing => None,
            Outcome::Product { name, .. } => Some(name.as_str()),
        }
    }
}

/// How an outcome was classified against the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Nothing,
    /// Product already has a record.
    Duplicate,
    /// Product has no record yet.
    Novel,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    items: IndexMap<String, ItemRecord>,
    failed_pairs: Vec<RecipePair>,
}

/// On-store shape of the knowledge base.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RecipesDb {
    #[serde(default)]
    items: Vec<ItemRecord>,
    #[serde(default, alias = "failedRecipes")]
    failed_recipes: Vec<RecipePair>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the store; a missing key yields an empty knowledge base.
    pub fn load(store: &dyn KeyValueStore) -> EngineResult<Self> {
        let db: RecipesDb = storage::load_value(store, KEY_RECIPES_DB)?.unwrap_or_default();
        let mut kb = KnowledgeBase::new();
        for item in db.items {
            // First record wins if a hand-edited store repeats a name.
            kb.items.entry(item.name.clone()).or_insert(item);
        }
        for failed in db.failed_recipes {
            if !kb.is_failed_pair(&failed.0, &failed.1) {
                kb.failed_pairs.push(failed);
            }
        }
        debug!(
            "[KnowledgeBase] loaded {} items, {} failed pairs",
            kb.items.len(),
            kb.failed_pairs.len()
        );
        Ok(kb)
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> EngineResult<()> {
        let db = RecipesDb {
            items: self.items.values().cloned().collect(),
            failed_recipes: self.failed_pairs.clone(),
        };
        storage::save_value(store, KEY_RECIPES_DB, &db)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ItemRecord> {
        self.items.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn failed_pairs(&self) -> &[RecipePair] {
        &self.failed_pairs
    }

    pub fn is_failed_pair(&self, a: &str, b: &str) -> bool {
        self.failed_pairs.iter().any(|p| p.matches(a, b))
    }

    /// Existing record for `name`, or a fresh one with zeroed counters.
    pub fn ensure_item(&mut self, name: &str) -> &mut ItemRecord {
        self.items
            .entry(name.to_string())
            .or_insert_with(|| ItemRecord::new(name))
    }

    /// Create records for names the host shows that we do not know yet.
    /// Existing counters are left untouched. Returns how many were added.
    pub fn merge_observed<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || self.items.contains_key(name) {
                continue;
            }
            self.ensure_item(name);
            added += 1;
        }
        added
    }

    /// Populate an empty knowledge base from the host's visible names (up to
    /// `limit`), or from `seeds` when the host shows nothing.
    pub fn seed_if_empty(&mut self, visible: &[String], seeds: &[String], limit: usize) -> usize {
        if !self.items.is_empty() {
            return 0;
        }
        if visible.is_empty() {
            self.merge_observed(seeds.iter().take(limit))
        } else {
            self.merge_observed(visible.iter().take(limit))
        }
    }

    /// Every name ever paired with `name` in a known recipe or a failed pair.
    pub fn related_to(&self, name: &str) -> HashSet<String> {
        self.items
            .values()
            .flat_map(|item| item.recipes.iter())
            .chain(self.failed_pairs.iter())
            .filter_map(|pair| pair.partner_of(name))
            .map(str::to_string)
            .collect()
    }

    /// Apply the statistics update for querying `(a, b)`.
    ///
    /// - Nothing: fail and nothing counters for both, failed pair recorded once.
    /// - Known product: dupe counter for both, recipe added to the product once,
    ///   product icon backfilled if it has none.
    /// - Unknown product: ingredient counter for both; no record is created for
    ///   the product.
    pub fn apply_outcome(&mut self, a: &str, b: &str, outcome: &Outcome) -> OutcomeKind {
        self.ensure_item(a);
        self.ensure_item(b);

        match outcome {
            Outcome::Nothing => {
                self.bump(a, |it| {
                    it.times_fail += 1;
                    it.times_nothing += 1;
                });
                self.bump(b, |it| {
                    it.times_fail += 1;
                    it.times_nothing += 1;
                });
                if !self.is_failed_pair(a, b) {
                    self.failed_pairs.push(RecipePair::new(a, b));
                }
                OutcomeKind::Nothing
            }
            Outcome::Product { name, icon } => match self.items.get_mut(name.as_str()) {
                Some(existing) => {
                    if !existing.has_recipe(a, b) {
                        existing.recipes.push(RecipePair::new(a, b));
                    }
                    if existing.icon.is_empty() && !icon.is_empty() {
                        existing.icon = icon.clone();
                    }
                    self.bump(a, |it| it.times_dupe += 1);
                    self.bump(b, |it| it.times_dupe += 1);
                    OutcomeKind::Duplicate
                }
                None => {
                    self.bump(a, |it| it.times_ingredient += 1);
                    self.bump(b, |it| it.times_ingredient += 1);
                    OutcomeKind::Novel
                }
            },
        }
    }

    /// Apply an outcome and persist before returning. A failed write is
    /// reported, but the in-memory update stands.
    pub fn record_outcome(
        &mut self,
        store: &dyn KeyValueStore,
        a: &str,
        b: &str,
        outcome: &Outcome,
    ) -> EngineResult<OutcomeKind> {
        let kind = self.apply_outcome(a, b, outcome);
        self.save(store)?;
        Ok(kind)
    }

    fn bump(&mut self, name: &str, f: impl FnOnce(&mut ItemRecord)) {
        if let Some(item) = self.items.get_mut(name) {
            f(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn steam() -> Outcome {
        Outcome::from_result("Steam", "💨")
    }

    #[test]
    fn test_ensure_item_is_idempotent() {
        let mut kb = KnowledgeBase::new();
        kb.ensure_item("Water").times_fail = 3;
        let again = kb.ensure_item("Water");
        assert_eq!(again.times_fail, 3);
        assert_eq!(kb.len(), 1);
    }

    #[test]
    fn test_outcome_from_result() {
        assert_eq!(Outcome::from_result("", ""), Outcome::Nothing);
        assert_eq!(Outcome::from_result("Nothing", "x"), Outcome::Nothing);
        assert_eq!(steam().product(), Some("Steam"));
    }

    #[test]
    fn test_nothing_outcome_counts_and_failed_pair_once() {
        let store = MemoryStore::new();
        let mut kb = KnowledgeBase::new();
        let kind = kb
            .record_outcome(&store, "Water", "Fire", &Outcome::Nothing)
            .unwrap();
        assert_eq!(kind, OutcomeKind::Nothing);
        for name in ["Water", "Fire"] {
            let item = kb.get(name).unwrap();
            assert_eq!(item.times_fail, 1);
            assert_eq!(item.times_nothing, 1);
        }

        kb.record_outcome(&store, "Fire", "Water", &Outcome::Nothing)
            .unwrap();
        assert_eq!(kb.failed_pairs().len(), 1);
        assert!(kb.is_failed_pair("Fire", "Water"));
    }

    #[test]
    fn test_novel_product_is_not_promoted() {
        let store = MemoryStore::new();
        let mut kb = KnowledgeBase::new();
        let kind = kb.record_outcome(&store, "Water", "Fire", &steam()).unwrap();
        assert_eq!(kind, OutcomeKind::Novel);
        assert_eq!(kb.get("Water").unwrap().times_ingredient, 1);
        assert_eq!(kb.get("Fire").unwrap().times_ingredient, 1);
        assert!(!kb.contains("Steam"));
    }

    #[test]
    fn test_duplicate_product_adds_recipe_once() {
        let store = MemoryStore::new();
        let mut kb = KnowledgeBase::new();
        kb.ensure_item("Steam");
        for _ in 0..3 {
            let kind = kb.record_outcome(&store, "Water", "Lava", &steam()).unwrap();
            assert_eq!(kind, OutcomeKind::Duplicate);
        }
        kb.record_outcome(&store, "Lava", "Water", &steam()).unwrap();

        let steam_item = kb.get("Steam").unwrap();
        assert_eq!(steam_item.recipes, vec![RecipePair::new("Water", "Lava")]);
        assert_eq!(steam_item.icon, "💨");
        assert_eq!(kb.get("Water").unwrap().times_dupe, 4);
        assert_eq!(kb.get("Lava").unwrap().times_dupe, 4);
    }

    #[test]
    fn test_icon_is_not_overwritten() {
        let mut kb = KnowledgeBase::new();
        kb.ensure_item("Steam").icon = "☁".to_string();
        kb.apply_outcome("Water", "Lava", &steam());
        assert_eq!(kb.get("Steam").unwrap().icon, "☁");
    }

    #[test]
    fn test_merge_observed_keeps_counters() {
        let mut kb = KnowledgeBase::new();
        kb.ensure_item("Water").times_dupe = 7;
        let added = kb.merge_observed(["Water", "Fire", "  ", "Fire"]);
        assert_eq!(added, 1);
        assert_eq!(kb.get("Water").unwrap().times_dupe, 7);
        assert!(kb.contains("Fire"));
    }

    #[test]
    fn test_seed_if_empty_prefers_visible_names() {
        let seeds: Vec<String> = DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect();
        let mut kb = KnowledgeBase::new();
        assert_eq!(kb.seed_if_empty(&[], &seeds, 50), 4);

        let mut kb = KnowledgeBase::new();
        let visible = vec!["Lava".to_string(), "Stone".to_string()];
        assert_eq!(kb.seed_if_empty(&visible, &seeds, 1), 1);
        assert!(kb.contains("Lava"));
        assert_eq!(kb.seed_if_empty(&visible, &seeds, 50), 0);
    }

    #[test]
    fn test_related_to_collects_recipes_and_failures() {
        let mut kb = KnowledgeBase::new();
        kb.ensure_item("Steam");
        kb.apply_outcome("Water", "Fire", &steam());
        kb.apply_outcome("Water", "Earth", &Outcome::Nothing);
        kb.apply_outcome("Wind", "Fire", &Outcome::Nothing);

        let related = kb.related_to("Water");
        assert_eq!(related.len(), 2);
        assert!(related.contains("Fire"));
        assert!(related.contains("Earth"));
        assert!(kb.related_to("Lava").is_empty());
    }

    #[test]
    fn test_load_backfills_legacy_fields() {
        let store = MemoryStore::new();
        let legacy = serde_json::json!({
            "items": [
                {"product": "Water", "emoji": "💧", "timesIngredient": 2, "timesFail": 1, "timesDupe": 0, "recipes": []},
                {"product": "Steam", "emoji": "", "recipes": [["Water", "Fire"]]}
            ],
            "failedRecipes": [["Water", "Earth"], ["Earth", "Water"]]
        });
        storage::save_value(&store, KEY_RECIPES_DB, &legacy).unwrap();

        let kb = KnowledgeBase::load(&store).unwrap();
        let water = kb.get("Water").unwrap();
        assert_eq!(water.icon, "💧");
        assert_eq!(water.times_ingredient, 2);
        assert_eq!(water.times_nothing, 0);
        assert!(kb.get("Steam").unwrap().has_recipe("Fire", "Water"));
        assert_eq!(kb.failed_pairs().len(), 1);
    }

    #[test]
    fn test_save_and_load_preserves_order() {
        let store = MemoryStore::new();
        let mut kb = KnowledgeBase::new();
        kb.merge_observed(["Water", "Fire", "Earth"]);
        kb.save(&store).unwrap();
        let loaded = KnowledgeBase::load(&store).unwrap();
        assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["Water", "Fire", "Earth"]);
    }
}
