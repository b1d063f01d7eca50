//! Evaluation engine, report text and polling

pub mod cache;
pub mod engine;
pub mod report;
pub mod scheduler;

pub use cache::{BaselineCache, BaselineKey};
pub use engine::{EvaluationOutcome, Evaluator};
pub use scheduler::{shutdown_on_ctrl_c, Scheduler};
