use nu_ansi_term::Color::{Blue, Cyan, Green, Red, Yellow};
use runway_core::{error::RunwayError, package, RunwayResult};
use runway_operations::{install as ops, InstallReport, RunwayContext};
use tabled::builder::Builder;
use tracing::info;

use crate::utils::{json_output, print_json, render_table, Colored, Icons};

/// Installs named packages plus every package of the given categories. With
/// neither, all enabled categories are installed.
pub fn install(
    ctx: &RunwayContext,
    packages: &[String],
    categories: &[String],
) -> RunwayResult<()> {
    let report = if packages.is_empty() {
        if categories.is_empty() {
            info!("No packages given, installing every enabled category");
        }
        ops::install_categories(ctx, categories)?
    } else {
        let mut pkgs = packages.to_vec();
        if !categories.is_empty() {
            pkgs.extend(ops::resolve_categories(ctx, categories)?);
        }
        ops::install_packages(ctx, &pkgs)?
    };
    print_install_report(&report)?;

    if report.is_success() {
        Ok(())
    } else {
        Err(RunwayError::Custom(format!(
            "{} of {} packages failed to install",
            report.failed.len(),
            report.installed.len() + report.failed.len()
        )))
    }
}

pub fn remove(ctx: &RunwayContext, packages: &[String]) -> RunwayResult<()> {
    let report = ops::remove_packages(ctx, packages)?;

    if json_output() {
        return print_json(&report);
    }

    for pkg in &report.not_installed {
        info!("{} {} is not installed", Colored(Yellow, Icons::WARNING), Colored(Blue, pkg));
    }
    if !report.removed.is_empty() {
        info!(
            "{} Removed {}",
            Colored(Green, Icons::CHECK),
            Colored(Cyan, report.removed.join(" "))
        );
    }
    Ok(())
}

fn print_install_report(report: &InstallReport) -> RunwayResult<()> {
    if json_output() {
        return print_json(report);
    }

    if !report.failed.is_empty() {
        info!("\nFailed packages:");
        for failed in &report.failed {
            info!(
                "  {} {}: {}",
                Icons::ARROW,
                Colored(Blue, &failed.name),
                Colored(Red, &failed.error)
            );
        }
    }

    info!(
        "\n{} {} installed, {} already present, {} failed",
        if report.is_success() {
            Colored(Green, Icons::CHECK)
        } else {
            Colored(Red, Icons::CROSS)
        },
        Colored(Green, report.installed.len()),
        Colored(Yellow, report.skipped.len()),
        Colored(Red, report.failed.len())
    );
    Ok(())
}

pub fn display_categories(ctx: &RunwayContext) -> RunwayResult<()> {
    let categories = package::categories(&ctx.config().packages);

    if json_output() {
        return print_json(&categories);
    }

    let mut builder = Builder::new();
    builder.push_record(["Key", "Name", "Packages"]);
    for category in &categories {
        let key = if category.enabled {
            Colored(Cyan, &category.key).to_string()
        } else {
            Colored(Yellow, format!("{} (empty)", category.key)).to_string()
        };
        builder.push_record([key, category.name.clone(), category.packages.join(" ")]);
    }

    info!("\n{}", render_table(builder, "Package Categories"));
    info!(
        "Install one with {}",
        Colored(Green, "runway install --category <KEY>")
    );
    Ok(())
}
