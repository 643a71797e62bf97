use nu_ansi_term::Color::{Blue, Cyan, Green, Red, Yellow};
use runway_core::{error::RunwayError, RunwayResult};
use runway_operations::{archive as ops, RunwayContext};
use runway_utils::bytes::format_bytes;
use tabled::builder::Builder;
use tracing::info;

use crate::{
    cli::ArchiveAction,
    utils::{json_output, key_value_table, print_json, print_list, render_table, Colored, Icons},
};

pub async fn run_archive(ctx: &RunwayContext, action: &ArchiveAction) -> RunwayResult<()> {
    match action {
        ArchiveAction::Extract { archive, output } => {
            let output = ops::extract(ctx, archive, output.as_deref())?;
            if json_output() {
                return print_json(&serde_json::json!({ "output": output }));
            }
            info!(
                "{} Extracted to {}",
                Colored(Green, Icons::CHECK),
                Colored(Blue, output.display())
            );
            Ok(())
        }
        ArchiveAction::ExtractAll { archives, output } => {
            let report = ops::extract_all(ctx, archives, output).await?;
            if json_output() {
                print_json(&report)?;
            } else {
                info!(
                    "{} {} extracted, {} failed",
                    Colored(Green, Icons::CHECK),
                    Colored(Green, report.completed),
                    Colored(Red, report.failed.len())
                );
                for failed in &report.failed {
                    info!(
                        "  {} {}: {}",
                        Icons::ARROW,
                        Colored(Blue, &failed.name),
                        Colored(Red, &failed.error)
                    );
                }
            }
            if report.is_success() {
                Ok(())
            } else {
                Err(RunwayError::Custom(format!(
                    "{} archives failed to extract",
                    report.failed.len()
                )))
            }
        }
        ArchiveAction::Create {
            output,
            format,
            files,
        } => {
            ops::create(ctx, files, output, format)?;
            if json_output() {
                return print_json(&serde_json::json!({ "output": output, "format": format }));
            }
            info!(
                "{} Created {}",
                Colored(Green, Icons::CHECK),
                Colored(Blue, output.display())
            );
            Ok(())
        }
        ArchiveAction::Info { archive } => {
            let info = ops::info(ctx, archive)?;
            if json_output() {
                return print_json(&info);
            }

            let format = info
                .format
                .map_or_else(|| "unknown".to_string(), |f| f.to_string());
            let valid = if info.is_valid {
                format!("{} yes", Colored(Green, Icons::CHECK))
            } else {
                format!("{} no", Colored(Red, Icons::CROSS))
            };
            let table = key_value_table(
                "Archive",
                [
                    ("Path".to_string(), info.path.display().to_string()),
                    ("Size".to_string(), format_bytes(info.size, 2)),
                    ("Format".to_string(), format),
                    ("Valid".to_string(), valid),
                    ("Entries".to_string(), info.contents.len().to_string()),
                ],
            );
            info!("\n{table}");
            if !info.contents.is_empty() {
                print_list("Contents:", &info.contents);
            }
            Ok(())
        }
        ArchiveAction::Tools => {
            let tools = ops::tools(ctx);
            if json_output() {
                return print_json(&tools);
            }

            let mut builder = Builder::new();
            for (tool, present) in &tools {
                let status = if *present {
                    format!("{} installed", Colored(Green, Icons::CHECK))
                } else {
                    format!("{} missing", Colored(Yellow, Icons::WARNING))
                };
                builder.push_record([Colored(Cyan, tool).to_string(), status]);
            }
            info!("\n{}", render_table(builder, "Archive Tools"));
            Ok(())
        }
        ArchiveAction::Formats => {
            let formats = ops::formats();
            if json_output() {
                return print_json(&formats);
            }
            print_list("Supported formats:", &formats);
            Ok(())
        }
    }
}
