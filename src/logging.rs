//! File-backed logging for a build run.
//!
//! Every line has the form `HH:MM:SS.mmm LEVEL: message`. The subscriber is
//! installed as the default for the calling thread only; the returned guard
//! must be kept alive for as long as the run logs.

use anyhow::Context;
use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

/// Verbosity accepted by `--log-level`, most verbose first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
  All,
  Garbage,
  Trace,
  Debug,
  Info,
  #[default]
  Warning,
  Error,
  Critical,
  Quiet,
}

impl LogLevel {
  pub fn filter(self) -> LevelFilter {
    use LogLevel::*;
    match self {
      All | Garbage | Trace => LevelFilter::TRACE,
      Debug => LevelFilter::DEBUG,
      Info => LevelFilter::INFO,
      Warning => LevelFilter::WARN,
      Error | Critical => LevelFilter::ERROR,
      Quiet => LevelFilter::OFF,
    }
  }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid log level '{0}'")]
pub struct ParseLevelError(Box<str>);

impl FromStr for LogLevel {
  type Err = ParseLevelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    use LogLevel::*;
    Ok(match &*s.to_ascii_lowercase() {
      "all" => All,
      "garbage" => Garbage,
      "trace" => Trace,
      "debug" => Debug,
      "info" => Info,
      "warning" => Warning,
      "error" => Error,
      "critical" => Critical,
      "quiet" => Quiet,
      _ => return Err(ParseLevelError(s.into())),
    })
  }
}

fn level_name(level: &Level) -> &'static str {
  match *level {
    Level::WARN => "WARNING",
    _ => level.as_str(),
  }
}

struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
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
    let now = Local::now().format("%H:%M:%S%.3f");
    write!(writer, "{now} {}: ", level_name(event.metadata().level()))?;
    ctx.field_format().format_fields(writer.by_ref(), event)?;
    writeln!(writer)
  }
}

/// Starts logging to `path`. An unrecognised `level` falls back to
/// `warning`, and the fallback itself is logged as an error.
pub fn init(path: &Path, level: &str) -> anyhow::Result<DefaultGuard> {
  let parsed = level.parse::<LogLevel>();
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("unable to open log file {}", path.display()))?;

  let layer = tracing_subscriber::fmt::layer()
    .with_ansi(false)
    .with_writer(Mutex::new(file))
    .event_format(LineFormat);
  let subscriber = tracing_subscriber::registry()
    .with(parsed.clone().unwrap_or_default().filter())
    .with(layer);
  let guard = tracing::subscriber::set_default(subscriber);

  if let Err(e) = parsed {
    tracing::error!("{e}, falling back to 'warning'");
  }
  Ok(guard)
}
