//! Durable task queue: a `tasks` table acts as the broker. A fixed pool of
//! Tokio workers per named queue polls for pending rows, claims one at a
//! time, and runs the bound handler — at-least-once delivery, JSON
//! arguments, no automatic retry (the handler records its own failure via
//! the job row).

pub mod registry;
pub mod worker;

pub use registry::{Task, TaskRegistry};
pub use worker::{DbTaskQueue, QueueError};

pub const IMPORTS_QUEUE: &str = "imports";
pub const DEFAULT_QUEUE: &str = "default";
