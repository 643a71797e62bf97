use std::{env, sync::Arc};

use clap::Parser;
use cli::{Args, Commands, ConfigAction, SecurityAction};
use logging::setup_logging;
use progress::{spawn_event_handler, ProgressGuard};
use runway_config::config::{self, get_config, set_config_path};
use runway_core::{
    command::{CommandExecutor, RecordingExecutor, SystemExecutor},
    error::{ErrorContext, RunwayError},
    RunwayResult,
};
use runway_events::EventSinkHandle;
use runway_operations::RunwayContext;
use runway_utils::{path::resolve_path, system::is_root};
use tracing::debug;
use utils::{print_list, progress_enabled, set_flag, COLOR, JSON, PROGRESS};

mod archive;
mod cli;
mod config_cmd;
mod dashboard;
mod install;
mod logging;
mod progress;
mod provision;
mod security;
mod system;
mod update;
mod utils;

/// Builds the context for a command. In dry-run mode commands are recorded
/// instead of executed; the recorder is handed back so they can be listed.
fn create_context(
    dry_run: bool,
) -> (
    RunwayContext,
    Option<ProgressGuard>,
    Option<Arc<RecordingExecutor>>,
) {
    let config = get_config();
    let show_progress = config.show_progress && progress_enabled();

    let recorder = dry_run.then(|| Arc::new(RecordingExecutor::new()));
    let executor: Arc<dyn CommandExecutor> = match &recorder {
        Some(recorder) => recorder.clone(),
        None => Arc::new(SystemExecutor),
    };

    let (events, guard) = if show_progress {
        let (sink, receiver) = runway_events::ChannelSink::new();
        let events: EventSinkHandle = Arc::new(sink);
        (events, Some(spawn_event_handler(receiver)))
    } else {
        let events: EventSinkHandle = Arc::new(runway_events::NullSink);
        (events, None)
    };

    let ctx = RunwayContext::new(config, events, executor).with_dry_run(dry_run);
    (ctx, guard, recorder)
}

/// Commands that change the host need root, unless they only record.
fn needs_root(command: &Commands) -> bool {
    match command {
        Commands::Update { .. }
        | Commands::Install { .. }
        | Commands::Remove { .. }
        | Commands::Clean
        | Commands::System { .. }
        | Commands::Provision { .. } => true,
        Commands::Security { action } => *action != SecurityAction::Audit,
        _ => false,
    }
}

async fn handle_cli() -> RunwayResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    set_flag(&COLOR, !args.no_color);
    set_flag(&PROGRESS, !args.no_progress && !args.json);
    set_flag(&JSON, args.json);

    if let Some(ref c) = args.config {
        let path = resolve_path(c)?;
        let path = if path.is_absolute() {
            path
        } else {
            env::current_dir()
                .with_context(|| "retrieving current directory".into())?
                .join(path)
        };
        set_config_path(Some(path));
    }

    let dry_run = args.dry_run;
    let command = args.command.unwrap_or(Commands::Dashboard);

    // These must work even when the current file does not parse.
    if let Commands::Config { action } = &command {
        match action {
            ConfigAction::Init { path, force } => {
                return config_cmd::init_config(path.as_deref(), *force);
            }
            ConfigAction::Path => return config_cmd::show_path(),
            ConfigAction::Show | ConfigAction::Validate => {}
        }
    }

    config::init()?;

    if needs_root(&command) && !dry_run && !is_root() {
        return Err(RunwayError::NotRoot);
    }

    let (ctx, progress_guard, recorder) = create_context(dry_run);

    let result = match &command {
        Commands::Dashboard => dashboard::display_dashboard(&ctx),
        Commands::Info => dashboard::display_info(&ctx),
        Commands::Update { attach } => update::update_packages(&ctx, *attach),
        Commands::Install {
            packages,
            categories,
        } => install::install(&ctx, packages, categories),
        Commands::Remove { packages } => install::remove(&ctx, packages),
        Commands::Categories => install::display_categories(&ctx),
        Commands::Updates => update::display_updates(&ctx),
        Commands::Clean => update::clean(&ctx),
        Commands::System { action } => system::run_system(&ctx, *action),
        Commands::Security { action } => security::run_security(&ctx, *action),
        Commands::Provision {
            skip_update,
            skip_packages,
            skip_system,
            skip_security,
            categories,
        } => {
            let plan = runway_operations::ProvisionPlan {
                update: !skip_update,
                packages: !skip_packages,
                system: !skip_system,
                security: !skip_security,
                categories: categories.clone(),
            };
            provision::run_provision(&ctx, &plan, args.yes)
        }
        Commands::Archive { action } => archive::run_archive(&ctx, action).await,
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => config_cmd::show_config(),
                ConfigAction::Validate => config_cmd::validate_config(),
                ConfigAction::Init { .. } | ConfigAction::Path => Ok(()),
            }
        }
    };

    // Drop the context first to close the event channel, then join the
    // progress thread so every queued event is rendered.
    drop(ctx);
    if let Some(guard) = progress_guard {
        guard.finish();
    }
    progress::stop();

    if let Some(recorder) = recorder {
        let calls = recorder.calls();
        debug!("dry run recorded {} commands", calls.len());
        if !calls.is_empty() {
            print_list("Commands that would run:", &calls);
        }
    }

    result
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
