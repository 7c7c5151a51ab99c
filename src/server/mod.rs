pub mod protocol;
pub mod session;
pub mod websocket;

pub use protocol::{ClientMessage, RoundView, ServerMessage};
pub use session::{Session, SessionId, SessionStore};
pub use websocket::{QuizHost, QuizServer, ServerConfig, GAME_NAME};
