//! Worker task bodies: the concrete handlers bound into the task runtime.
//! Each implements [`crate::queue::Task`] and is registered under a
//! fixed name at startup.

pub mod analyze_game;
pub mod batch_analyze;
pub mod import_games;

pub use analyze_game::AnalyzeGameTask;
pub use batch_analyze::BatchAnalyzeTask;
pub use import_games::ImportGamesTask;

pub const IMPORT_GAMES: &str = "import_games";
pub const ANALYZE_GAME: &str = "analyze_game";
pub const BATCH_ANALYZE: &str = "batch_analyze";
