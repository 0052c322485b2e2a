use anyhow::{Result, bail};
use indexmap::IndexMap;

use crate::tokens::{align_token_lists, compute_combinations};

/// Find-combination to replace-combination, kept in generation order.
///
/// Substitution walks the entries in this order, so it is part of the
/// contract rather than an accident of hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementMap {
    entries: IndexMap<String, String>,
}

impl ReplacementMap {
    /// Re-inserting a key keeps its first position and takes the new value.
    pub fn insert(&mut self, find: String, replace: String) {
        self.entries.insert(find, replace);
    }

    pub fn get(&self, find: &str) -> Option<&str> {
        self.entries.get(find).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries whose key occurs somewhere in `text`, in map order.
    pub fn matched_in(&self, text: &str) -> ReplacementMap {
        let entries = self
            .entries
            .iter()
            .filter(|(key, _)| !key.is_empty() && text.contains(key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ReplacementMap { entries }
    }

    /// Replaces every occurrence of every key, one key at a time in map order.
    pub fn apply(&self, text: &str) -> String {
        self.apply_counted(text).0
    }

    /// Like [`apply`](Self::apply), also returning how many substitutions were made.
    ///
    /// Each key is counted against the text as it stands when that key runs.
    pub fn apply_counted(&self, text: &str) -> (String, usize) {
        let mut out = text.to_string();
        let mut count = 0;
        for (key, value) in &self.entries {
            if key.is_empty() {
                continue;
            }
            let hits = out.matches(key.as_str()).count();
            if hits == 0 {
                continue;
            }
            count += hits;
            out = out.replace(key.as_str(), value);
        }
        (out, count)
    }
}

impl FromIterator<(String, String)> for ReplacementMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = ReplacementMap::default();
        for (find, replace) in iter {
            map.insert(find, replace);
        }
        map
    }
}

pub fn validate_inputs(find: &[String], replace: &[String]) -> Result<()> {
    if find.is_empty() {
        bail!("at least one find token is required");
    }
    if replace.len() > find.len() {
        bail!(
            "The number of replace tokens must not exceed the number of find tokens. \
             Try concatenating the replace tokens."
        );
    }
    Ok(())
}

pub fn build_replacement_map(find: &[String], replace: &[String]) -> Result<ReplacementMap> {
    let (find, replace) = align_token_lists(find.to_vec(), replace.to_vec());
    let find_combinations = compute_combinations(&find);
    let replace_combinations = compute_combinations(&replace);

    if find_combinations.len() != replace_combinations.len() {
        bail!(
            "internal error: {} find combinations but {} replace combinations",
            find_combinations.len(),
            replace_combinations.len()
        );
    }

    Ok(find_combinations
        .into_iter()
        .zip(replace_combinations)
        .collect())
}
