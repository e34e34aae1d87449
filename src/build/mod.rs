mod centos;
mod rpm;

use crate::command::Runner;
use crate::config::Config;
use crate::error::Fatal;
use crate::util::cp_into;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Platforms a package can be built for, by their `os` grain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
  Centos,
}

impl FromStr for Platform {
  type Err = Fatal;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match &*s.to_lowercase() {
      "centos" => Ok(Self::Centos),
      _ => Err(Fatal::UnsupportedPlatform(s.into())),
    }
  }
}

impl Platform {
  /// Runs the platform's build and returns the packages it produced.
  pub fn build(self, config: &Config, runner: &dyn Runner) -> anyhow::Result<Vec<PathBuf>> {
    match self {
      Self::Centos => centos::build(config, runner, Path::new(centos::RELEASE_FILE)),
    }
  }
}

/// Copies every built package into `artifact_dir`.
pub fn collect_artifacts(artifacts: &[PathBuf], artifact_dir: &Path) -> anyhow::Result<()> {
  info!(
    "Build complete. Artifacts will be stored in {}",
    artifact_dir.display()
  );
  for artifact in artifacts {
    cp_into(artifact, artifact_dir)?;
    info!("Copied {} to artifact directory", artifact.display());
  }
  Ok(())
}
