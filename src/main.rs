mod build;
mod command;
mod config;
mod error;
mod logging;
mod sdist;
mod util;
mod version;

use build::Platform;
use clap::{CommandFactory, Parser};
use command::{Runner, System};
use config::Config;
use console::style;
use error::Fatal;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info};

fn run(config: &Config, runner: &dyn Runner) -> anyhow::Result<()> {
  let platform: Platform = config.platform().ok_or(Fatal::MissingPlatform)?.parse()?;
  let artifacts = platform.build(config, runner)?;
  segment_info!("Collecting artifacts:", "{}", config.artifact_dir.display());
  build::collect_artifacts(&artifacts, &config.artifact_dir)?;
  info!("Done!");
  Ok(())
}

/// Reports validation problems or runs the build. Returns the exit status.
fn execute(
  config: &Config,
  problems: &[String],
  runner: &dyn Runner,
  stderr: &mut dyn Write,
) -> io::Result<u8> {
  if !problems.is_empty() {
    for problem in problems {
      error!("{problem}");
      writeln!(stderr, "{} {problem}", style("error:").red().bold())?;
    }
    return Ok(1);
  }

  if let Err(e) = run(config, runner) {
    error!("{e:#}");
    writeln!(stderr, "{} {e:#}", style("error:").red().bold())?;
    writeln!(stderr, "{}", Config::command().render_help())?;
    return Ok(1);
  }
  Ok(0)
}

fn main() -> ExitCode {
  let config = Config::parse();
  let problems = config::setup(&config);

  let _log = match logging::init(&config.log_file, &config.log_level) {
    Ok(guard) => guard,
    Err(e) => {
      eprintln!("{} {e:#}", style("error:").red().bold());
      return ExitCode::FAILURE;
    }
  };

  let code = execute(&config, &problems, &System, &mut io::stderr()).unwrap_or(1);
  ExitCode::from(code)
}
