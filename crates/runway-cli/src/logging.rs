use std::{env, fmt::Write as _};

use nu_ansi_term::Color::{Blue, DarkGray, Magenta, Red, Yellow};
use tracing::{field::Field, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields, MakeWriter,
    },
    registry::LookupSpan,
    EnvFilter,
};

use crate::{cli::Args, utils::Colored};

/// Overrides the verbosity flags with a full filter, e.g.
/// `RUNWAY_LOG=runway_core::command=trace`.
const LOG_ENV: &str = "RUNWAY_LOG";

/// Message plus the structured fields runway attaches to its events
/// (`command`, `package`, `manager`, ...).
#[derive(Default)]
struct EventFields {
    message: Option<String>,
    command: Option<String>,
    extra: Vec<(&'static str, String)>,
}

impl tracing::field::Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "command" => self.command = Some(value.to_string()),
            name => self.extra.push((name, value.to_string())),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{value:?}")),
            "command" => self.command = Some(format!("{value:?}")),
            name => self.extra.push((name, format!("{value:?}"))),
        }
    }
}

impl EventFields {
    /// Line body. INFO output is for humans and stays bare; more verbose
    /// levels show the command and the remaining fields.
    fn render(self, level: Level) -> String {
        let mut line = self.message.unwrap_or_default();
        if level == Level::INFO {
            return line;
        }

        if let Some(command) = self.command {
            if !line.is_empty() {
                line.push_str(": ");
            }
            line.push_str(&command);
        }
        if !self.extra.is_empty() {
            let mut fields = String::new();
            for (name, value) in &self.extra {
                let _ = write!(fields, " {name}={value}");
            }
            let _ = write!(line, "{}", Colored(DarkGray, fields));
        }
        line
    }
}

/// Prints INFO bare and tags every other level.
pub struct RunwayFormatter;

impl<S, N> FormatEvent<S, N> for RunwayFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let level = *event.metadata().level();
        let mut fields = EventFields::default();
        event.record(&mut fields);

        match level {
            Level::TRACE => write!(writer, "{} ", Colored(Magenta, "[TRACE]")),
            Level::DEBUG => write!(writer, "{} ", Colored(Blue, "[DEBUG]")),
            Level::INFO => Ok(()),
            Level::WARN => write!(writer, "{} ", Colored(Yellow, "[WARN]")),
            Level::ERROR => write!(writer, "{} ", Colored(Red, "[ERROR]")),
        }?;

        writeln!(writer, "{}", fields.render(level))
    }
}

/// Hands out [`ProgressAwareWriter`]s; INFO goes to stdout, the rest to stderr.
struct ProgressAwareMakeWriter;

/// Buffers one event and prints it with the progress bars paused, so
/// provisioning output never tears a spinner line.
struct ProgressAwareWriter {
    buffer: Vec<u8>,
    to_stderr: bool,
}

impl std::io::Write for ProgressAwareWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for ProgressAwareWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let output = String::from_utf8_lossy(&self.buffer);
        let output = output.trim_end_matches('\n');
        crate::progress::suspend(|| {
            if self.to_stderr {
                eprintln!("{output}");
            } else {
                println!("{output}");
            }
        });
    }
}

impl<'a> MakeWriter<'a> for ProgressAwareMakeWriter {
    type Writer = ProgressAwareWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressAwareWriter {
            buffer: Vec::new(),
            to_stderr: false,
        }
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        ProgressAwareWriter {
            buffer: Vec::new(),
            to_stderr: meta.level() != &Level::INFO,
        }
    }
}

pub fn filter_level(args: &Args) -> Level {
    if args.quiet {
        Level::ERROR
    } else if args.verbose >= 2 {
        Level::TRACE
    } else if args.verbose == 1 {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// `RUNWAY_LOG` when set and valid, otherwise every runway crate at the
/// level picked by `-v`/`-q`.
fn env_filter(args: &Args, from_env: Option<String>) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("runway={}", filter_level(args))))
}

pub fn setup_logging(args: &Args) {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter(args, env::var(LOG_ENV).ok()))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(ProgressAwareMakeWriter)
        .compact()
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(RunwayFormatter).finish())
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber was already installed");
    }
}
