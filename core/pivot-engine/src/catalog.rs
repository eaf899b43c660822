//! FILENAME: core/pivot-engine/src/catalog.rs
//! Index Entry Catalog - the universe of header values per axis.
//!
//! Tracks, for every axis, the distinct values seen ("index entries") and, for
//! composite axis groups such as the object classes of a relationship class,
//! the valid value combinations ("tuple entries"). Entries may exist without
//! any data: an object with no parameter values still needs a header.

use std::collections::BTreeSet;

use datamodel::{ScalarValue, Tuple};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Ordered axis names spanned by one tuple entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AxisGroup(Vec<String>);

impl AxisGroup {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        AxisGroup(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every axis of the group is among `axes`.
    pub fn covered_by(&self, axes: &[String]) -> bool {
        self.0.iter().all(|name| axes.contains(name))
    }
}

/// Values that appeared and disappeared between two entry sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDiff<T: Ord> {
    pub added: BTreeSet<T>,
    pub removed: BTreeSet<T>,
}

impl<T: Ord> Default for EntryDiff<T> {
    fn default() -> Self {
        EntryDiff {
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }
}

impl<T: Ord> EntryDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes the incremental change from `old` to `new` so that dependent
/// lists (filter menus) can be patched instead of rebuilt.
pub fn diff_after_edit<T: Ord + Clone>(old: &BTreeSet<T>, new: &BTreeSet<T>) -> EntryDiff<T> {
    EntryDiff {
        added: new.difference(old).cloned().collect(),
        removed: old.difference(new).cloned().collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEntryCatalog {
    index_entries: FxHashMap<String, BTreeSet<ScalarValue>>,
    tuple_entries: FxHashMap<AxisGroup, BTreeSet<Tuple>>,
}

impl IndexEntryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `axis` known even if it has no entries yet.
    pub fn declare_axis(&mut self, axis: &str) {
        self.index_entries.entry(axis.to_string()).or_default();
    }

    /// Makes `group` known even if it has no tuples yet.
    pub fn declare_group(&mut self, group: AxisGroup) {
        self.tuple_entries.entry(group).or_default();
    }

    /// Merges values into an axis. Returns the values that were new.
    pub fn register<I>(&mut self, axis: &str, values: I) -> BTreeSet<ScalarValue>
    where
        I: IntoIterator<Item = ScalarValue>,
    {
        let entries = self.index_entries.entry(axis.to_string()).or_default();
        values
            .into_iter()
            .filter(|value| entries.insert(value.clone()))
            .collect()
    }

    /// Merges composite tuples into a group. Returns the tuples that were new.
    pub fn register_tuple<I>(&mut self, group: &AxisGroup, tuples: I) -> BTreeSet<Tuple>
    where
        I: IntoIterator<Item = Tuple>,
    {
        let entries = self.tuple_entries.entry(group.clone()).or_default();
        tuples
            .into_iter()
            .filter(|tuple| entries.insert(tuple.clone()))
            .collect()
    }

    /// Drops `values` from an axis unless they are still `in_use` by some
    /// remaining row key. Returns what was actually removed.
    pub fn remove<'a, I>(
        &mut self,
        axis: &str,
        values: I,
        in_use: &BTreeSet<ScalarValue>,
    ) -> BTreeSet<ScalarValue>
    where
        I: IntoIterator<Item = &'a ScalarValue>,
    {
        let Some(entries) = self.index_entries.get_mut(axis) else {
            return BTreeSet::new();
        };
        values
            .into_iter()
            .filter(|value| !in_use.contains(*value) && entries.remove(*value))
            .cloned()
            .collect()
    }

    /// Tuple counterpart of [`remove`](Self::remove).
    pub fn remove_tuple<'a, I>(
        &mut self,
        group: &AxisGroup,
        tuples: I,
        in_use: &BTreeSet<Tuple>,
    ) -> BTreeSet<Tuple>
    where
        I: IntoIterator<Item = &'a Tuple>,
    {
        let Some(entries) = self.tuple_entries.get_mut(group) else {
            return BTreeSet::new();
        };
        tuples
            .into_iter()
            .filter(|tuple| !in_use.contains(*tuple) && entries.remove(*tuple))
            .cloned()
            .collect()
    }

    pub fn entries(&self, axis: &str) -> Option<&BTreeSet<ScalarValue>> {
        self.index_entries.get(axis)
    }

    pub fn tuples(&self, group: &AxisGroup) -> Option<&BTreeSet<Tuple>> {
        self.tuple_entries.get(group)
    }

    pub fn contains(&self, axis: &str, value: &ScalarValue) -> bool {
        self.index_entries
            .get(axis)
            .is_some_and(|entries| entries.contains(value))
    }

    pub fn contains_tuple(&self, group: &AxisGroup, tuple: &Tuple) -> bool {
        self.tuple_entries
            .get(group)
            .is_some_and(|entries| entries.contains(tuple))
    }

    pub fn axes(&self) -> impl Iterator<Item = &String> {
        self.index_entries.keys()
    }

    pub fn groups(&self) -> impl Iterator<Item = &AxisGroup> {
        self.tuple_entries.keys()
    }

    /// Synthesizes the default index on the scalar-index axis when the axis
    /// has no entries, so a frozen slice stays selectable. Returns true when
    /// the default was added.
    pub fn ensure_default_index(&mut self, index_axis: &str, default: i64) -> bool {
        let entries = self.index_entries.entry(index_axis.to_string()).or_default();
        if entries.is_empty() {
            entries.insert(ScalarValue::Integer(default));
            true
        } else {
            false
        }
    }

    /// Per-axis values present here but absent from `baseline`.
    pub fn added_since(&self, baseline: &IndexEntryCatalog) -> FxHashMap<String, BTreeSet<ScalarValue>> {
        Self::delta(&self.index_entries, &baseline.index_entries)
    }

    /// Per-axis values present in `baseline` but absent here.
    pub fn removed_since(&self, baseline: &IndexEntryCatalog) -> FxHashMap<String, BTreeSet<ScalarValue>> {
        Self::delta(&baseline.index_entries, &self.index_entries)
    }

    pub fn added_tuples_since(&self, baseline: &IndexEntryCatalog) -> FxHashMap<AxisGroup, BTreeSet<Tuple>> {
        Self::delta(&self.tuple_entries, &baseline.tuple_entries)
    }

    pub fn removed_tuples_since(&self, baseline: &IndexEntryCatalog) -> FxHashMap<AxisGroup, BTreeSet<Tuple>> {
        Self::delta(&baseline.tuple_entries, &self.tuple_entries)
    }

    fn delta<K, T>(
        from: &FxHashMap<K, BTreeSet<T>>,
        minus: &FxHashMap<K, BTreeSet<T>>,
    ) -> FxHashMap<K, BTreeSet<T>>
    where
        K: Clone + Eq + std::hash::Hash,
        T: Clone + Ord,
    {
        let mut out = FxHashMap::default();
        for (key, entries) in from {
            let diff: BTreeSet<T> = match minus.get(key) {
                Some(other) => entries.difference(other).cloned().collect(),
                None => entries.clone(),
            };
            if !diff.is_empty() {
                out.insert(key.clone(), diff);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamodel::tuple;

    fn values(items: &[&str]) -> BTreeSet<ScalarValue> {
        items.iter().map(|s| ScalarValue::text(*s)).collect()
    }

    #[test]
    fn test_register_reports_only_new_values() {
        let mut catalog = IndexEntryCatalog::new();
        let added = catalog.register("unit", values(&["u1", "u2"]));
        assert_eq!(added, values(&["u1", "u2"]));
        let added = catalog.register("unit", values(&["u2", "u3"]));
        assert_eq!(added, values(&["u3"]));
        assert_eq!(catalog.entries("unit"), Some(&values(&["u1", "u2", "u3"])));
    }

    #[test]
    fn test_remove_keeps_values_still_in_use() {
        let mut catalog = IndexEntryCatalog::new();
        catalog.register("unit", values(&["u1", "u2"]));
        let removed = catalog.remove("unit", &values(&["u1", "u2"]), &values(&["u2"]));
        assert_eq!(removed, values(&["u1"]));
        assert!(catalog.contains("unit", &ScalarValue::text("u2")));
        assert!(!catalog.contains("unit", &ScalarValue::text("u1")));
    }

    #[test]
    fn test_tuple_entries() {
        let group = AxisGroup::new(["a", "b"]);
        let mut catalog = IndexEntryCatalog::new();
        catalog.register_tuple(&group, [tuple!("x", "y"), tuple!("x", "z")]);
        assert!(catalog.contains_tuple(&group, &tuple!("x", "y")));

        let in_use: BTreeSet<Tuple> = [tuple!("x", "z")].into_iter().collect();
        let doomed = [tuple!("x", "y"), tuple!("x", "z")];
        let removed = catalog.remove_tuple(&group, &doomed, &in_use);
        assert_eq!(removed.into_iter().collect::<Vec<_>>(), vec![tuple!("x", "y")]);
    }

    #[test]
    fn test_diff_after_edit() {
        let diff = diff_after_edit(&values(&["a", "b"]), &values(&["b", "c"]));
        assert_eq!(diff.added, values(&["c"]));
        assert_eq!(diff.removed, values(&["a"]));
        assert!(diff_after_edit(&values(&["a"]), &values(&["a"])).is_empty());
    }

    #[test]
    fn test_default_index_only_when_empty() {
        let mut catalog = IndexEntryCatalog::new();
        assert!(catalog.ensure_default_index("db index", 1));
        assert!(catalog.contains("db index", &ScalarValue::Integer(1)));

        let mut catalog = IndexEntryCatalog::new();
        catalog.register("db index", [ScalarValue::Integer(3)]);
        assert!(!catalog.ensure_default_index("db index", 1));
        assert!(!catalog.contains("db index", &ScalarValue::Integer(1)));
    }

    #[test]
    fn test_deltas_against_baseline() {
        let group = AxisGroup::new(["a", "b"]);
        let mut baseline = IndexEntryCatalog::new();
        baseline.register("a", values(&["x"]));
        baseline.register_tuple(&group, [tuple!("x", "y")]);

        let mut current = baseline.clone();
        current.register("a", values(&["w"]));
        current.remove("a", &values(&["x"]), &BTreeSet::new());
        current.register_tuple(&group, [tuple!("w", "y")]);

        assert_eq!(current.added_since(&baseline)["a"], values(&["w"]));
        assert_eq!(current.removed_since(&baseline)["a"], values(&["x"]));
        assert!(current.added_tuples_since(&baseline)[&group].contains(&tuple!("w", "y")));
        assert!(current.removed_tuples_since(&baseline).is_empty());
    }
}
