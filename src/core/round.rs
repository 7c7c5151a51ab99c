//! Quiz round builder.
//!
//! A round is one target word plus a shuffled list of clues: one of the
//! word's own clues and `decoys` clues drawn from other words. The round
//! does not record which clue is correct; answers are checked against the
//! catalog with [`Catalog::find_clue`].

use tracing::debug;

use crate::core::catalog::{Catalog, CatalogStore, Clue, WordId};
use crate::core::dice::Dice;
use crate::core::error::{CatalogError, Result};

/// Default decoy count per round.
pub const DEFAULT_DECOYS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub word_id: WordId,
    pub word: String,
    /// Presentation order, `1 + decoys` long.
    pub clues: Vec<Clue>,
}

/// Builds one round. All or nothing: any failed fetch fails the round.
///
/// Decoys are drawn independently, so the same decoy can show up twice.
pub async fn build_round<S, D>(catalog: &Catalog<S>, dice: &mut D, decoys: usize) -> Result<Round>
where
    S: CatalogStore,
    D: Dice + Send,
{
    if catalog.count_words() == 0 {
        return Err(CatalogError::EmptyCatalog("no words"));
    }

    let target = catalog.word_at(dice.below(catalog.count_words())).await?;
    if target.clues.is_empty() {
        return Err(CatalogError::EmptyCatalog("selected word has no clues"));
    }

    let mut clues = Vec::with_capacity(1 + decoys);
    clues.push(target.clues[dice.below(target.clues.len())].clone());

    if decoys > 0 {
        // Size of the "every other word" clue pool, from the cached count.
        let pool = catalog.count_clues().saturating_sub(target.clues.len());
        if pool == 0 {
            return Err(CatalogError::EmptyCatalog("no clues outside the selected word"));
        }
        for _ in 0..decoys {
            let decoy = catalog.clue_at_excluding(target.id, dice.below(pool)).await?;
            clues.push(decoy);
        }
    }

    let clues = shuffle(clues, dice);
    debug!(word_id = target.id, clues = clues.len(), "round built");

    Ok(Round { word_id: target.id, word: target.text, clues })
}

fn shuffle<T, D: Dice>(items: Vec<T>, dice: &mut D) -> Vec<T> {
    let perm = dice.permutation(items.len());
    let mut slots: Vec<Option<T>> = (0..items.len()).map(|_| None).collect();
    for (item, to) in items.into_iter().zip(perm) {
        slots[to] = Some(item);
    }
    slots.into_iter().flatten().collect()
}
