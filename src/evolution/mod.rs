pub mod config;
pub mod engine;
pub mod evolver;
pub mod gate;
pub mod journal;
pub mod judge;
pub mod prompt;
pub mod report;
pub mod smoother;
