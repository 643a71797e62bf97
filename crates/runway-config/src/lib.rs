pub mod config;
pub mod error;
pub mod packages;
pub mod security;
pub mod system;

#[cfg(test)]
pub mod test_utils;
