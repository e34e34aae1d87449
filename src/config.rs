use clap::Parser;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Builds a Salt package for the host platform.
///
/// WARNING: the destination and artifact directories are removed
/// recursively before every run.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
  /// Platform ('os' grain)
  #[arg(long)]
  pub platform: Option<String>,

  /// Source directory. Must be a git checkout
  #[arg(long, default_value = "/testing")]
  pub source_dir: PathBuf,

  /// Destination directory, will be removed if it exists prior to running
  #[arg(long, default_value = "/tmp/saltpkg")]
  pub dest_dir: PathBuf,

  /// Location where build artifacts should be placed
  #[arg(long, default_value = "/tmp/build_artifacts")]
  pub artifact_dir: PathBuf,

  /// Log results to a file
  #[arg(long, default_value = "/tmp/salt-buildpackage.log")]
  pub log_file: PathBuf,

  /// Control verbosity of logging: all, debug, error, critical, garbage,
  /// info, quiet, trace or warning
  #[arg(long, default_value = "warning")]
  pub log_level: String,

  /// Spec file to use as a template to build RPM
  #[arg(
    long = "spec",
    default_value = "/tmp/salt.spec",
    help_heading = "RPM-specific Options"
  )]
  pub spec_file: PathBuf,
}

impl Config {
  pub fn platform(&self) -> Option<&str> {
    self.platform.as_deref().filter(|p| !p.is_empty())
  }
}

#[derive(Debug, Error)]
pub enum DirProblem {
  #[error("Unable to remove pre-existing {kind} directory {}: {source}", .path.display())]
  Remove {
    kind: &'static str,
    path: PathBuf,
    source: io::Error,
  },
  #[error("Unable to create {kind} directory {}: {source}", .path.display())]
  Create {
    kind: &'static str,
    path: PathBuf,
    source: io::Error,
  },
}

/// Removes `path` if present and creates it afresh. Creation is attempted
/// even when removal failed, so both problems can be reported.
pub fn recreate_dir(path: &Path, kind: &'static str) -> Vec<DirProblem> {
  let mut problems = vec![];
  match fs::remove_dir_all(path) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    // A file in the way is reported by the creation step.
    Err(e) if e.raw_os_error() == Some(libc::ENOTDIR) => {}
    Err(source) => problems.push(DirProblem::Remove {
      kind,
      path: path.into(),
      source,
    }),
  }
  if let Err(source) = fs::create_dir_all(path) {
    problems.push(DirProblem::Create {
      kind,
      path: path.into(),
      source,
    });
  }
  problems
}

/// Checks the configuration and prepares the output directories. Returns
/// every problem found; the run must not continue unless this is empty.
pub fn setup(config: &Config) -> Vec<String> {
  let mut problems = vec![];
  if config.platform().is_none() {
    problems.push("Platform ('os' grain) required".to_string());
  }
  if !config.source_dir.is_dir() {
    problems.push(format!(
      "Source directory {} not found",
      config.source_dir.display()
    ));
  }
  for (path, kind) in [
    (&config.dest_dir, "destination"),
    (&config.artifact_dir, "artifact"),
  ] {
    problems.extend(recreate_dir(path, kind).iter().map(ToString::to_string));
  }
  problems
}
