pub mod core;
pub mod server;
pub mod client;

// Re-export for convenience
pub use crate::core::{build_round, Catalog, CatalogError, MemoryStore, PlayerProgress, Round};
pub use crate::server::{QuizServer, ServerConfig};
