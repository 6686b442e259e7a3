//! In-memory embedding store.
//!
//! A [`Gallery`] is one immutable batch of enrolled profiles: each entry
//! pairs an identifier with its embedding and its full profile record, so
//! the two can never drift apart. The [`EmbeddingStore`] holds the current
//! gallery behind a read-write lock and swaps it wholesale on every load.
//! Readers take an `Arc` snapshot and scan it without holding the lock, so
//! a concurrent load never changes a gallery that is being matched against.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::embedding::Embedding;
use crate::profile::Profile;

/// One enrolled identity.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub id: String,
    pub embedding: Embedding,
    pub profile: Profile,
}

/// An insertion-ordered set of enrolled identities, unique by id.
#[derive(Debug, Default, Clone)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
    index: HashMap<String, usize>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry.
    ///
    /// Re-inserting an id replaces its embedding and profile (last write
    /// wins) but keeps its original position.
    pub fn insert(&mut self, id: String, embedding: Embedding, profile: Profile) {
        match self.index.get(&id) {
            Some(&pos) => {
                let entry = &mut self.entries[pos];
                entry.embedding = embedding;
                entry.profile = profile;
            }
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push(GalleryEntry {
                    id,
                    embedding,
                    profile,
                });
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&GalleryEntry> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &GalleryEntry> {
        self.entries.iter()
    }

    /// Profiles in insertion order.
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.entries.iter().map(|e| &e.profile)
    }

    /// Dimensionality shared by every stored embedding, if any are stored.
    pub fn dim(&self) -> Option<usize> {
        self.entries.first().map(|e| e.embedding.dim())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared, replace-only holder of the current gallery.
#[derive(Debug, Default)]
pub struct EmbeddingStore {
    current: RwLock<Arc<Gallery>>,
}

impl EmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The gallery as of now. Stays valid even if the store is replaced.
    pub fn snapshot(&self) -> Arc<Gallery> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Swap in a new gallery in one step, dropping the old one.
    pub fn replace(&self, gallery: Gallery) {
        let gallery = Arc::new(gallery);
        match self.current.write() {
            Ok(mut guard) => *guard = gallery,
            Err(poisoned) => *poisoned.into_inner() = gallery,
        }
    }

    pub fn clear(&self) {
        self.replace(Gallery::new());
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(id: &str, name: &str) -> Profile {
        serde_json::from_value(json!({"publicIdentifier": id, "fullName": name})).unwrap()
    }

    #[test]
    fn test_gallery_insertion_order() {
        let mut g = Gallery::new();
        g.insert("b".into(), vec![1.0].into(), profile("b", "B"));
        g.insert("a".into(), vec![2.0].into(), profile("a", "A"));
        let ids: Vec<&str> = g.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(g.dim(), Some(1));
    }

    #[test]
    fn test_gallery_last_write_wins_keeps_position() {
        let mut g = Gallery::new();
        g.insert("a".into(), vec![1.0].into(), profile("a", "Old"));
        g.insert("b".into(), vec![2.0].into(), profile("b", "B"));
        g.insert("a".into(), vec![3.0].into(), profile("a", "New"));

        assert_eq!(g.len(), 2);
        let first = g.iter().next().unwrap();
        assert_eq!(first.id, "a");
        assert_eq!(first.embedding.as_slice(), &[3.0]);
        assert_eq!(g.get("a").unwrap().profile.display_name(), Some("New"));
        assert_eq!(g.profiles().count(), 2);
    }

    #[test]
    fn test_store_starts_empty() {
        let store = EmbeddingStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_replace_drops_previous_entries() {
        let store = EmbeddingStore::new();
        let mut first = Gallery::new();
        first.insert("a".into(), vec![1.0].into(), profile("a", "A"));
        first.insert("b".into(), vec![1.0].into(), profile("b", "B"));
        store.replace(first);
        assert_eq!(store.len(), 2);

        let mut second = Gallery::new();
        second.insert("c".into(), vec![1.0].into(), profile("c", "C"));
        store.replace(second);

        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert!(!snap.contains("a"));
        assert!(snap.contains("c"));
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let store = EmbeddingStore::new();
        let mut g = Gallery::new();
        g.insert("a".into(), vec![1.0].into(), profile("a", "A"));
        store.replace(g);

        let snap = store.snapshot();
        store.clear();
        assert!(store.is_empty());
        assert!(snap.contains("a"));
    }

    #[test]
    fn test_independent_stores() {
        let one = EmbeddingStore::new();
        let two = EmbeddingStore::new();
        let mut g = Gallery::new();
        g.insert("a".into(), vec![1.0].into(), profile("a", "A"));
        one.replace(g);
        assert_eq!(one.len(), 1);
        assert!(two.is_empty());
    }
}
