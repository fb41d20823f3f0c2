pub mod game;
pub mod job;
pub mod opening;
pub mod user;

pub use game::{AnalysisState, Game, GameResultKind, Move, Provider};
pub use job::{Job, JobKind, JobStatus};
pub use opening::Opening;
pub use user::{User, UserStats};
