pub mod context;
pub mod parallel;
pub mod progress;
pub mod types;

pub mod archive;
pub mod dashboard;
pub mod install;
pub mod provision;
pub mod security;
pub mod system;
pub mod update;

pub use context::RunwayContext;
pub use types::*;
