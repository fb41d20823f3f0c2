pub mod database;
pub mod games;
pub mod jobs;
pub mod moves;
pub mod openings;
pub mod user_stats;
pub mod users;

pub use database::Database;
pub use games::{GameRepository, NewGame};
pub use jobs::JobRepository;
pub use moves::MoveRepository;
pub use openings::OpeningRepository;
pub use user_stats::UserStatsRepository;
pub use users::UserRepository;

use sqlx::SqlitePool;

/// Bundle of repositories sharing one connection pool — handed to dispatch
/// handlers and worker tasks as a single `Arc<Repos>`.
#[derive(Clone)]
pub struct Repos {
    pub users: std::sync::Arc<UserRepository>,
    pub games: std::sync::Arc<GameRepository>,
    pub moves: std::sync::Arc<MoveRepository>,
    pub jobs: std::sync::Arc<JobRepository>,
    pub openings: std::sync::Arc<OpeningRepository>,
    pub user_stats: std::sync::Arc<UserStatsRepository>,
}

impl Repos {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: std::sync::Arc::new(UserRepository::new(pool.clone())),
            games: std::sync::Arc::new(GameRepository::new(pool.clone())),
            moves: std::sync::Arc::new(MoveRepository::new(pool.clone())),
            jobs: std::sync::Arc::new(JobRepository::new(pool.clone())),
            openings: std::sync::Arc::new(OpeningRepository::new(pool.clone())),
            user_stats: std::sync::Arc::new(UserStatsRepository::new(pool)),
        }
    }
}
