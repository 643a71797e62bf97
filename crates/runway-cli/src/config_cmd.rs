use std::path::Path;

use nu_ansi_term::Color::{Blue, Green};
use runway_config::config::{config_path, generate_default_config, get_config};
use runway_core::RunwayResult;
use tracing::info;

use crate::utils::{json_output, print_json, Colored, Icons};

pub fn init_config(path: Option<&Path>, force: bool) -> RunwayResult<()> {
    let path = generate_default_config(path, force)?;
    info!(
        "{} Default configuration written to {}",
        Colored(Green, Icons::CHECK),
        Colored(Blue, path.display())
    );
    Ok(())
}

pub fn show_path() -> RunwayResult<()> {
    let path = config_path();
    if json_output() {
        return print_json(&serde_json::json!({
            "path": path,
            "exists": path.is_file(),
        }));
    }

    if path.is_file() {
        info!("{}", path.display());
    } else {
        info!("{} (not created yet, using defaults)", path.display());
    }
    Ok(())
}

pub fn show_config() -> RunwayResult<()> {
    print_json(&get_config())
}

/// The configuration was already loaded and validated; reaching here means
/// it is valid.
pub fn validate_config() -> RunwayResult<()> {
    let path = config_path();
    if json_output() {
        return print_json(&serde_json::json!({ "path": path, "valid": true }));
    }
    if !path.is_file() {
        info!(
            "{} No configuration file at {}, the defaults are in effect",
            Colored(Green, Icons::CHECK),
            Colored(Blue, path.display())
        );
        return Ok(());
    }
    info!(
        "{} {} is valid",
        Colored(Green, Icons::CHECK),
        Colored(Blue, path.display())
    );
    Ok(())
}
