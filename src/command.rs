use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::Duration;
use tracing::{debug, error, info};

const SPINNER_STYLE: &str = "{spinner:.cyan} {prefix:.bold} {wide_msg}";

/// Captured result of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
  pub stdout: String,
  pub stderr: String,
  pub code: i32,
}

impl Output {
  pub fn success(&self) -> bool {
    self.code == 0
  }
}

/// Runs external commands. Build routines only see this trait, so tests can
/// stand in for yum, python and rpmbuild.
pub trait Runner {
  /// Runs `args[0]` with the remaining arguments to completion. `dir`
  /// becomes the child's working directory.
  fn output(&self, args: &[String], dir: Option<&Path>) -> anyhow::Result<Output>;
}

fn exit_code(status: ExitStatus) -> i32 {
  status
    .code()
    .or_else(|| status.signal().map(|s| -s))
    .unwrap_or(-1)
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl Runner for System {
  fn output(&self, args: &[String], dir: Option<&Path>) -> anyhow::Result<Output> {
    let (program, rest) = args.split_first().context("empty command line")?;
    let mut cmd = Command::new(program);
    cmd.args(rest);
    if let Some(dir) = dir {
      cmd.current_dir(dir);
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template(SPINNER_STYLE) {
      pb.set_style(style);
    }
    pb.set_prefix("running");
    pb.set_message(args.join(" "));
    pb.enable_steady_tick(Duration::from_millis(100));

    let output = cmd.output();
    pb.finish_and_clear();
    let output = output.with_context(|| format!("failed to execute `{program}`"))?;

    Ok(Output {
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
      code: exit_code(output.status),
    })
  }
}

/// Runs a command and logs what happened. The exit code is left for the
/// caller to judge.
pub fn run_command(
  runner: &dyn Runner,
  args: &[String],
  dir: Option<&Path>,
) -> anyhow::Result<Output> {
  info!("Running command: {args:?}");
  let output = runner.output(args, dir)?;
  if !output.stdout.is_empty() {
    debug!("Command output: \n{}", output.stdout);
  }
  if !output.stderr.is_empty() {
    error!("{}", output.stderr);
  }
  info!("Return code: {}", output.code);
  Ok(output)
}

/// Builds an owned argument list from string slices.
pub fn argv<I, S>(args: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  args.into_iter().map(Into::into).collect()
}
