//! Word catalog: the records a quiz draws from and the read-only handle the
//! rest of the crate queries.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::Result;

pub type WordId = u32;
pub type ClueId = u32;

/// One definition-style hint. Its id only means something next to its word id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub id: ClueId,
    pub text: String,
}

/// A word together with the clues that belong to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub text: String,
    #[serde(default)]
    pub clues: Vec<Clue>,
}

/// Access patterns a backing store has to answer.
///
/// Offsets are zero-based positions in store order; the order itself carries
/// no meaning.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn count_words(&self) -> Result<usize>;

    async fn count_clues(&self) -> Result<usize>;

    /// Word at `offset`, with all of its clues. `NotFound` past the end.
    async fn word_at(&self, offset: usize) -> Result<Word>;

    /// Clue at `offset` among the clues of every word except `excluded`.
    async fn clue_at_excluding(&self, excluded: WordId, offset: usize) -> Result<Clue>;

    /// Whether `clue` belongs to `word`. A miss is `Ok(false)`.
    async fn has_clue(&self, word: WordId, clue: ClueId) -> Result<bool>;
}

#[async_trait]
impl<S: CatalogStore + ?Sized> CatalogStore for Arc<S> {
    async fn count_words(&self) -> Result<usize> {
        (**self).count_words().await
    }

    async fn count_clues(&self) -> Result<usize> {
        (**self).count_clues().await
    }

    async fn word_at(&self, offset: usize) -> Result<Word> {
        (**self).word_at(offset).await
    }

    async fn clue_at_excluding(&self, excluded: WordId, offset: usize) -> Result<Clue> {
        (**self).clue_at_excluding(excluded, offset).await
    }

    async fn has_clue(&self, word: WordId, clue: ClueId) -> Result<bool> {
        (**self).has_clue(word, clue).await
    }
}

/// Immutable catalog handle.
///
/// Word and clue counts are read once in [`Catalog::open`] and never
/// refreshed. If the store changes afterwards the counts go stale; a later
/// `open` sees the new numbers.
pub struct Catalog<S> {
    store: S,
    words: usize,
    clues: usize,
}

impl<S: CatalogStore> Catalog<S> {
    pub async fn open(store: S) -> Result<Self> {
        let words = store.count_words().await?;
        let clues = store.count_clues().await?;
        info!(words, clues, "catalog opened");
        Ok(Self { store, words, clues })
    }

    pub fn count_words(&self) -> usize {
        self.words
    }

    pub fn count_clues(&self) -> usize {
        self.clues
    }

    pub async fn word_at(&self, offset: usize) -> Result<Word> {
        self.store.word_at(offset).await
    }

    pub async fn clue_at_excluding(&self, excluded: WordId, offset: usize) -> Result<Clue> {
        self.store.clue_at_excluding(excluded, offset).await
    }

    /// Answer check: true iff the clue is one of the word's own clues.
    pub async fn find_clue(&self, word: WordId, clue: ClueId) -> Result<bool> {
        self.store.has_clue(word, clue).await
    }
}
