use std::{
    fmt::Display,
    io::Write,
    sync::{LazyLock, PoisonError, RwLock},
};

use nu_ansi_term::Color;
use runway_core::{
    error::{ErrorContext, RunwayError},
    RunwayResult,
};
use runway_operations::{StepOutcome, StepReport};
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{peaker::PriorityMax, themes::BorderCorrection, Panel, Style, Width},
};
use tracing::info;

pub struct Icons;

impl Icons {
    pub const ARROW: &str = "→";
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const SKIP: &str = "○";
    pub const WARNING: &str = "⚠";
}

pub fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));
pub static PROGRESS: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));
pub static JSON: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(false));

fn read_flag(flag: &RwLock<bool>) -> bool {
    *flag.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_flag(flag: &RwLock<bool>, value: bool) {
    *flag.write().unwrap_or_else(PoisonError::into_inner) = value;
}

pub fn progress_enabled() -> bool {
    read_flag(&PROGRESS)
}

pub fn json_output() -> bool {
    read_flag(&JSON)
}

pub fn interactive_ask(ques: &str) -> RunwayResult<String> {
    print!("{ques}");

    std::io::stdout()
        .flush()
        .with_context(|| "flushing stdout stream".to_string())?;

    let mut response = String::new();
    std::io::stdin()
        .read_line(&mut response)
        .with_context(|| "reading input from stdin".to_string())?;

    Ok(response.trim().to_owned())
}

pub fn confirm_action(message: &str) -> RunwayResult<bool> {
    let response = interactive_ask(&format!("{} [y/N]: ", message))?;
    Ok(matches!(response.to_lowercase().as_str(), "y" | "yes"))
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if read_flag(&COLOR) {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> RunwayResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| RunwayError::Custom(err.to_string()))?;
    println!("{json}");
    Ok(())
}

/// Renders two-column rows as a rounded table under `title`.
pub fn key_value_table<K, V>(title: &str, rows: impl IntoIterator<Item = (K, V)>) -> String
where
    K: Into<String>,
    V: Into<String>,
{
    let mut builder = Builder::new();
    for (key, value) in rows {
        builder.push_record([key.into(), value.into()]);
    }
    render_table(builder, title)
}

pub fn render_table(builder: Builder, title: &str) -> String {
    builder
        .build()
        .with(Panel::header(title))
        .with(Style::rounded())
        .with(BorderCorrection {})
        .with(Width::wrap(term_width()).priority(PriorityMax::default()))
        .to_string()
}

fn step_status(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Completed => format!("{} done", Colored(Color::Green, Icons::CHECK)),
        StepOutcome::Skipped(reason) => {
            format!("{} {}", Colored(Color::Yellow, Icons::SKIP), reason)
        }
        StepOutcome::Failed(error) => format!("{} {}", Colored(Color::Red, Icons::CROSS), error),
    }
}

/// Prints step reports as a table (or JSON) and turns failures into an error
/// so the process exits non-zero.
pub fn finish_steps(title: &str, reports: &[StepReport]) -> RunwayResult<()> {
    if json_output() {
        print_json(&reports)?;
    } else if !reports.is_empty() {
        let table = key_value_table(
            title,
            reports
                .iter()
                .map(|report| (report.step.clone(), step_status(&report.outcome))),
        );
        info!("\n{table}");
    }

    let failed: Vec<&str> = reports
        .iter()
        .filter(|report| report.is_failed())
        .map(|report| report.step.as_str())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(RunwayError::Custom(format!(
            "{} failed: {}",
            if failed.len() == 1 { "step" } else { "steps" },
            failed.join(", ")
        )))
    }
}

/// Logs a bulleted list under a heading.
pub fn print_list<T: Display>(heading: &str, items: &[T]) {
    info!("{}", Colored(Color::Cyan, heading));
    for item in items {
        info!("  {} {}", Icons::ARROW, item);
    }
}
