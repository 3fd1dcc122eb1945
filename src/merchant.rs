//! Prefix index over merchant names for autocomplete.
//!
//! Every node keeps the full set of merchants reachable below it, so a lookup
//! costs one step per prefix character plus the size of the answer, whatever
//! the size of the directory.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog;
use crate::error::DirectoryError;

/// Number of suggestions returned when the caller does not ask for a limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Lookup key for a merchant name or a query prefix.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrieNode {
    children: IndexMap<char, TrieNode>,
    is_end_of_word: bool,
    merchants: IndexSet<String>,
}

impl TrieNode {
    pub fn child(&self, key: char) -> Option<&TrieNode> {
        self.children.get(&key)
    }

    pub fn children(&self) -> impl Iterator<Item = (char, &TrieNode)> {
        self.children.iter().map(|(key, child)| (*key, child))
    }

    pub fn is_end_of_word(&self) -> bool {
        self.is_end_of_word
    }

    /// Original-case names of every merchant whose folded name starts with
    /// the prefix leading to this node.
    pub fn merchants(&self) -> impl Iterator<Item = &str> {
        self.merchants.iter().map(String::as_str)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MerchantDirectory {
    root: TrieNode,
}

impl MerchantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory bootstrapped with every merchant of the seed catalog.
    pub fn seeded() -> Self {
        let mut directory = Self::new();
        for merchant in catalog::merchants() {
            directory.insert(merchant);
        }
        debug!(merchants = directory.len(), "seeded merchant directory");
        directory
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    pub fn insert(&mut self, merchant: &str) {
        let mut current = &mut self.root;
        current.merchants.insert(merchant.to_owned());
        for key in fold_case(merchant).chars() {
            current = current.children.entry(key).or_default();
            current.merchants.insert(merchant.to_owned());
        }
        current.is_end_of_word = true;
    }

    fn find(&self, prefix: &str) -> Option<&TrieNode> {
        let mut current = &self.root;
        for key in fold_case(prefix).chars() {
            current = current.children.get(&key)?;
        }
        Some(current)
    }

    /// Up to `limit` merchants starting with `prefix`, ignoring case.
    ///
    /// Results come back in insertion order, not ranked. An unknown prefix
    /// yields nothing.
    pub fn search(&self, prefix: &str, limit: usize) -> Vec<&str> {
        match self.find(prefix) {
            Some(node) => node.merchants().take(limit).collect(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, merchant: &str) -> bool {
        self.find(merchant)
            .is_some_and(|node| node.is_end_of_word && node.merchants.contains(merchant))
    }

    pub fn len(&self) -> usize {
        self.root.merchants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.merchants.is_empty()
    }

    pub fn serialize(&self) -> Result<String, DirectoryError> {
        serde_json::to_string(self).map_err(DirectoryError::Encode)
    }

    pub fn deserialize(snapshot: &str) -> Result<Self, DirectoryError> {
        let mut deserializer = serde_json::Deserializer::from_str(snapshot);
        // Nesting grows with the longest merchant name
        deserializer.disable_recursion_limit();
        let directory = <Self as Deserialize>::deserialize(&mut deserializer)
            .map_err(DirectoryError::Malformed)?;
        deserializer.end().map_err(DirectoryError::Malformed)?;
        Ok(directory)
    }

    /// Restores a cached snapshot, falling back to a freshly seeded directory
    /// when there is none or it cannot be decoded.
    pub fn restore_or_seed(snapshot: Option<&str>) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::seeded();
        };
        match Self::deserialize(snapshot) {
            Ok(directory) => directory,
            Err(err) => {
                warn!(error = %err, "discarding merchant snapshot, reseeding");
                Self::seeded()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(merchants: &[&str]) -> MerchantDirectory {
        let mut directory = MerchantDirectory::new();
        for merchant in merchants {
            directory.insert(merchant);
        }
        directory
    }

    #[test]
    fn prefix_search_ignores_case() {
        let directory = directory(&["Starbucks", "Star Market"]);

        assert_eq!(directory.search("sta", 10), vec!["Starbucks", "Star Market"]);
        assert_eq!(directory.search("STARB", 10), vec!["Starbucks"]);
        assert_eq!(directory.search("star ", 10), vec!["Star Market"]);
        assert!(directory.search("xyz", 10).is_empty());
    }

    #[test]
    fn search_respects_limit() {
        let directory = directory(&["Shell", "Safeway", "Sam's Club", "Subway"]);

        assert_eq!(directory.search("s", 2), vec!["Shell", "Safeway"]);
        assert!(directory.search("s", 0).is_empty());
    }

    #[test]
    fn empty_prefix_lists_everything() {
        let directory = directory(&["Uber", "Lyft"]);
        assert_eq!(directory.search("", 10), vec!["Uber", "Lyft"]);
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut once = directory(&["Costco"]);
        let twice = directory(&["Costco", "Costco"]);
        assert_eq!(once, twice);

        once.insert("Costco");
        assert_eq!(once.search("c", 10), vec!["Costco"]);
    }

    #[test]
    fn keeps_distinct_casings() {
        let directory = directory(&["ARCO", "Arco"]);

        assert_eq!(directory.search("arco", 10), vec!["ARCO", "Arco"]);
        assert!(directory.contains("Arco"));
        assert!(!directory.contains("arco"));
    }

    #[test]
    fn nodes_track_word_ends() {
        let directory = directory(&["BP", "BPX"]);
        let b = directory.root().child('b').unwrap();
        let bp = b.child('p').unwrap();

        assert!(!b.is_end_of_word());
        assert!(bp.is_end_of_word());
        assert_eq!(bp.merchants().collect::<Vec<_>>(), vec!["BP", "BPX"]);
        assert_eq!(bp.children().map(|(key, _)| key).collect::<Vec<_>>(), vec!['x']);
    }

    #[test]
    fn snapshot_round_trips() {
        let original = directory(&["Whole Foods", "Walmart", "Netflix", "Disney+"]);
        let snapshot = original.serialize().unwrap();
        let restored = MerchantDirectory::deserialize(&snapshot).unwrap();

        assert_eq!(restored, original);
        assert_eq!(restored.serialize().unwrap(), snapshot);
        for prefix in ["", "w", "wh", "n", "disney+", "q"] {
            assert_eq!(restored.search(prefix, 10), original.search(prefix, 10));
        }
    }

    #[test]
    fn snapshot_format_is_nested_nodes() {
        let snapshot = directory(&["76"]).serialize().unwrap();
        assert_eq!(
            snapshot,
            r#"{"children":{"7":{"children":{"6":{"children":{},"isEndOfWord":true,"merchants":["76"]}},"isEndOfWord":false,"merchants":["76"]}},"isEndOfWord":false,"merchants":["76"]}"#
        );
    }

    #[test]
    fn restored_directory_accepts_inserts() {
        let snapshot = directory(&["Hulu"]).serialize().unwrap();
        let mut restored = MerchantDirectory::deserialize(&snapshot).unwrap();
        restored.insert("HBO Max");

        assert_eq!(restored.search("h", 10), vec!["Hulu", "HBO Max"]);
    }

    #[test]
    fn long_names_survive_snapshot() {
        let name = "A".repeat(100);
        let snapshot = directory(&[name.as_str()]).serialize().unwrap();
        let restored = MerchantDirectory::deserialize(&snapshot).unwrap();

        assert_eq!(restored.search(&name[..80], 1), vec![name.as_str()]);
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        assert!(matches!(
            MerchantDirectory::deserialize("{\"children\":"),
            Err(DirectoryError::Malformed(_))
        ));
        assert!(matches!(
            MerchantDirectory::deserialize(
                r#"{"children":{},"isEndOfWord":false,"merchants":[]} trailing"#
            ),
            Err(DirectoryError::Malformed(_))
        ));
    }

    #[test]
    fn restore_falls_back_to_seed() {
        let seeded = MerchantDirectory::seeded();

        assert_eq!(MerchantDirectory::restore_or_seed(None), seeded);
        assert_eq!(MerchantDirectory::restore_or_seed(Some("not json")), seeded);

        let cached = directory(&["Lyft"]).serialize().unwrap();
        let restored = MerchantDirectory::restore_or_seed(Some(cached.as_str()));
        assert_eq!(restored.len(), 1);
    }
}
