use error::RunwayError;

pub mod archive;
pub mod command;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod package;
pub mod paths;
pub mod security;
pub mod system;

pub type RunwayResult<T> = std::result::Result<T, RunwayError>;
