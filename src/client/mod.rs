pub mod app;
pub mod websocket_client;

pub use app::QuizApp;
pub use websocket_client::QuizClient;
