//! String interning for profile frame names.
//!
//! Package, class, method, and file names repeat across nearly every
//! sample in a rollup period. The interner stores each distinct string
//! once and hands out dense `u32` indices, so the tree merger compares
//! integers instead of strings.

use std::collections::HashMap;

/// Append-only string table with dense indices.
///
/// **Public** - owned by each aggregation instance (never process-wide),
/// so concurrent rollups do not interfere.
///
/// Indices are stable for the lifetime of one instance and never reused.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    /// Interned strings in insertion order; position is the index
    names: Vec<String>,

    /// Reverse lookup from string to index
    lookup: HashMap<String, u32>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its index.
    ///
    /// Re-interning an already-known string returns the original index.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), id);
        id
    }

    /// Resolve an index back to its string.
    pub fn get(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Merge an incoming table (in its wire form, an ordered name list)
    /// into this one.
    ///
    /// Returns the index-remapping array: `remap[i]` is the index in
    /// `self` of the string that held index `i` in the incoming table.
    pub fn remap_from(&mut self, incoming: &[String]) -> Vec<u32> {
        incoming.iter().map(|name| self.intern(name)).collect()
    }

    /// Ordered view of all interned names (the table's wire form).
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedupes() {
        let mut table = NameTable::new();
        let a = table.intern("com.example");
        let b = table.intern("Widget");
        let a2 = table.intern("com.example");

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_get_round_trip() {
        let mut table = NameTable::new();
        let id = table.intern("render");
        assert_eq!(table.get(id), Some("render"));
        assert_eq!(table.get(999), None);
    }

    #[test]
    fn test_remap_from_reuses_existing_indices() {
        let mut table = NameTable::new();
        table.intern("alpha"); // 0
        table.intern("beta"); // 1

        let incoming = vec!["beta".to_string(), "gamma".to_string()];
        let remap = table.remap_from(&incoming);

        assert_eq!(remap, vec![1, 2]);
        assert_eq!(table.get(2), Some("gamma"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_indices_are_stable() {
        let mut table = NameTable::new();
        let id = table.intern("first");
        for i in 0..100 {
            table.intern(&format!("filler-{i}"));
        }
        assert_eq!(table.intern("first"), id);
    }
}
