/// JSON messages exchanged between the quiz host and its clients
use serde::{Deserialize, Serialize};

use crate::core::catalog::{Clue, ClueId, WordId};
use crate::core::progress::ProgressView;
use crate::core::round::Round;

/// Client to host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Opens or resumes a session (the id plays the role of a cookie)
    Hello { session: Option<String> },
    /// Human check token
    Verify { token: String },
    NextRound,
    Answer { word_id: WordId, clue_id: ClueId },
    Leave,
}

/// Host to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    Welcome {
        name: String,
        version: String,
        session: String,
        verified: bool,
        progress: ProgressView,
    },
    Verification { verified: bool },
    Round(RoundView),
    Outcome { correct: bool, progress: ProgressView },
    /// The session was purged while idle; the client should say Hello again
    SessionExpired,
    Error(String),
}

/// A built round joined with the player's progress. Carries no hint about
/// which clue is correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub word_id: WordId,
    pub word: String,
    pub clues: Vec<Clue>,
    pub progress: ProgressView,
}

impl RoundView {
    pub fn new(round: Round, progress: ProgressView) -> Self {
        Self {
            word_id: round.word_id,
            word: round.word,
            clues: round.clues,
            progress,
        }
    }
}
