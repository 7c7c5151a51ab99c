/// In-memory catalog store, optionally loaded from a JSON file
use std::collections::HashSet;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::core::catalog::{CatalogStore, Clue, ClueId, Word, WordId};
use crate::core::error::{CatalogError, Result};

/// Words held in memory, in insertion order.
///
/// The file format is a JSON array of words:
/// `[{ "id": 1, "text": "ember", "clues": [{ "id": 1, "text": "..." }] }]`
pub struct MemoryStore {
    words: RwLock<Vec<Word>>,
}

impl MemoryStore {
    /// Rejects duplicate word ids, and clue ids used more than once anywhere
    /// in the catalog. A clue id shared between two words would make the
    /// answer check report a decoy as correct.
    pub fn new(words: Vec<Word>) -> Result<Self> {
        let mut word_ids = HashSet::new();
        let mut clue_ids = HashSet::new();
        for word in &words {
            if !word_ids.insert(word.id) {
                return Err(CatalogError::storage(format!("duplicate word id {}", word.id)));
            }
            claim_clue_ids(word, &mut clue_ids)?;
        }
        Ok(Self { words: RwLock::new(words) })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let words: Vec<Word> = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), words = words.len(), "catalog file parsed");
        Self::new(words)
    }

    /// Appends a word at the end of catalog order, under the same id rules
    /// as [`MemoryStore::new`].
    pub fn insert(&self, word: Word) -> Result<()> {
        let mut words = self
            .words
            .write()
            .map_err(|_| CatalogError::storage("catalog lock poisoned"))?;
        if words.iter().any(|w| w.id == word.id) {
            return Err(CatalogError::storage(format!("duplicate word id {}", word.id)));
        }
        let mut clue_ids: HashSet<ClueId> =
            words.iter().flat_map(|w| w.clues.iter().map(|c| c.id)).collect();
        claim_clue_ids(&word, &mut clue_ids)?;
        words.push(word);
        Ok(())
    }

    /// Removes a word, shifting later words down one offset.
    pub fn remove(&self, id: WordId) -> Result<Option<Word>> {
        let mut words = self
            .words
            .write()
            .map_err(|_| CatalogError::storage("catalog lock poisoned"))?;
        Ok(words
            .iter()
            .position(|w| w.id == id)
            .map(|at| words.remove(at)))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Word>>> {
        self.words
            .read()
            .map_err(|_| CatalogError::storage("catalog lock poisoned"))
    }
}

fn claim_clue_ids(word: &Word, taken: &mut HashSet<ClueId>) -> Result<()> {
    for clue in &word.clues {
        if !taken.insert(clue.id) {
            return Err(CatalogError::storage(format!(
                "clue id {} in word {} is already in use",
                clue.id, word.id
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn count_words(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn count_clues(&self) -> Result<usize> {
        Ok(self.read()?.iter().map(|w| w.clues.len()).sum())
    }

    async fn word_at(&self, offset: usize) -> Result<Word> {
        self.read()?
            .get(offset)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("word", format!("offset {offset}")))
    }

    async fn clue_at_excluding(&self, excluded: WordId, offset: usize) -> Result<Clue> {
        self.read()?
            .iter()
            .filter(|w| w.id != excluded)
            .flat_map(|w| w.clues.iter())
            .nth(offset)
            .cloned()
            .ok_or_else(|| {
                CatalogError::not_found("clue", format!("offset {offset} excluding word {excluded}"))
            })
    }

    async fn has_clue(&self, word: WordId, clue: ClueId) -> Result<bool> {
        Ok(self
            .read()?
            .iter()
            .any(|w| w.id == word && w.clues.iter().any(|c| c.id == clue)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        { "id": 10, "text": "anvil", "clues": [{ "id": 1, "text": "Smithing block" }] },
        { "id": 20, "text": "lantern", "clues": [
            { "id": 2, "text": "Portable light" },
            { "id": 3, "text": "Glass lamp case" }
        ] },
        { "id": 30, "text": "moss", "clues": [{ "id": 7, "text": "Soft green growth" }] }
    ]"#;

    fn parsed() -> MemoryStore {
        MemoryStore::new(serde_json::from_str(SAMPLE).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn excluding_skips_the_target_word() {
        let store = parsed();
        // clues outside word 20, in catalog order: (10,1), (30,7)
        assert_eq!(store.clue_at_excluding(20, 0).await.unwrap().text, "Smithing block");
        assert_eq!(store.clue_at_excluding(20, 1).await.unwrap().id, 7);
        assert!(matches!(
            store.clue_at_excluding(20, 2).await,
            Err(CatalogError::NotFound { what: "clue", .. })
        ));
    }

    #[tokio::test]
    async fn counts_follow_the_data() {
        let store = parsed();
        assert_eq!(store.count_words().await.unwrap(), 3);
        assert_eq!(store.count_clues().await.unwrap(), 4);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let twice = vec![
            Word { id: 1, text: "a".into(), clues: vec![] },
            Word { id: 1, text: "b".into(), clues: vec![] },
        ];
        assert!(matches!(MemoryStore::new(twice), Err(CatalogError::Storage(_))));

        let clash = Word {
            id: 2,
            text: "c".into(),
            clues: vec![
                Clue { id: 5, text: "x".into() },
                Clue { id: 5, text: "y".into() },
            ],
        };
        assert!(MemoryStore::new(vec![clash]).is_err());
    }

    #[test]
    fn clue_ids_are_unique_across_words() {
        let ember = Word { id: 1, text: "ember".into(), clues: vec![Clue { id: 1, text: "Glowing coal".into() }] };
        let quill = Word { id: 2, text: "quill".into(), clues: vec![Clue { id: 1, text: "Feather pen".into() }] };
        assert!(matches!(
            MemoryStore::new(vec![ember.clone(), quill.clone()]),
            Err(CatalogError::Storage(_))
        ));

        let store = MemoryStore::new(vec![ember]).unwrap();
        assert!(matches!(store.insert(quill), Err(CatalogError::Storage(_))));
        let fixed = Word { id: 2, text: "quill".into(), clues: vec![Clue { id: 2, text: "Feather pen".into() }] };
        store.insert(fixed).unwrap();
    }

    #[tokio::test]
    async fn remove_shifts_later_offsets() {
        let store = parsed();
        assert_eq!(store.remove(20).unwrap().map(|w| w.text), Some("lantern".to_string()));
        assert_eq!(store.remove(20).unwrap(), None);
        assert_eq!(store.word_at(1).await.unwrap().text, "moss");
        assert_eq!(store.count_clues().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_a_storage_error() {
        let err = MemoryStore::load("does/not/exist.json").await.err().unwrap();
        assert!(matches!(err, CatalogError::Storage(_)));
    }

    #[tokio::test]
    async fn bundled_catalog_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/words.json");
        let store = MemoryStore::load(path).await.unwrap();
        assert!(store.count_words().await.unwrap() >= 2);
    }
}
