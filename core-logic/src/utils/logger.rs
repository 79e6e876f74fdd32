use anyhow::{Context, Result};
use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use std::path::Path;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Per-wallet verdict lines.
pub const WALLET_RESULT_TARGET: &str = "wallet_result";
/// End-of-run totals.
pub const RUN_SUMMARY_TARGET: &str = "run_summary";

/// Installs the global subscriber: an hourly rolling file under `logs_dir`
/// plus a colored console layer. The returned guard flushes the file writer
/// on drop and must live as long as `main`.
pub fn setup_logger(logs_dir: impl AsRef<Path>) -> Result<WorkerGuard> {
    let logs_dir = logs_dir.as_ref();
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create logs directory {}", logs_dir.display()))?;

    let file_appender = tracing_appender::rolling::hourly(logs_dir, "monad-stats");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File: every verdict and summary, WARN for the rest
    let file_filter = Targets::new()
        .with_target(WALLET_RESULT_TARGET, Level::INFO)
        .with_target(RUN_SUMMARY_TARGET, Level::INFO)
        .with_default(Level::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    // Console: the progress bar prints verdicts, so only summaries and errors here
    let console_filter = Targets::new()
        .with_target(RUN_SUMMARY_TARGET, Level::INFO)
        .with_default(Level::ERROR);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

/// Highlights the SUCCESS / FAILED verdict words.
fn colorize_verdict(msg: &str) -> String {
    let green = Style::new().fg(Color::LightGreen).bold();
    let red = Style::new().fg(Color::LightRed).bold();
    msg.replace("SUCCESS", &green.paint("SUCCESS").to_string())
        .replace("FAILED", &red.paint("FAILED").to_string())
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = event_message(event);
        let level = *event.metadata().level();
        let time = Style::new()
            .dimmed()
            .paint(Local::now().format("%H:%M:%S").to_string());

        if level <= Level::WARN {
            let tag = if level == Level::ERROR {
                Color::LightRed.bold().paint("ERROR")
            } else {
                Color::Yellow.bold().paint("WARN")
            };
            writeln!(writer, "{} {} {}", time, tag, msg)
        } else {
            writeln!(writer, "{} {}", time, colorize_verdict(&msg))
        }
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let meta = event.metadata();

        write!(writer, "{} [{}] {}", timestamp, meta.level(), meta.target())?;
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, " {}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<tracing_subscriber::fmt::FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{}}}", fields)?;
                    }
                }
            }
        }
        writeln!(writer, ": {}", event_message(event))
    }
}
