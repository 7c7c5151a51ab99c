pub mod catalog;
pub mod dice;
pub mod error;
pub mod progress;
pub mod round;
pub mod store;

pub use catalog::{Catalog, CatalogStore, Clue, ClueId, Word, WordId};
pub use dice::{Dice, RandomDice};
pub use error::{CatalogError, Result};
pub use progress::{PlayerProgress, ProgressView};
pub use round::{build_round, Round};
pub use store::MemoryStore;
