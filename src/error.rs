use std::path::PathBuf;
use thiserror::Error;

/// Conditions that end the run immediately.
#[derive(Debug, Error)]
pub enum Fatal {
  #[error("platform required")]
  MissingPlatform,
  #[error("unsupported platform {0:?}")]
  UnsupportedPlatform(String),
  #[error("unsupported major release: {0}")]
  UnsupportedRelease(u32),
  #[error("failed to install build dependencies (exit code {0})")]
  Dependencies(i32),
  #[error("failed to create sdist")]
  Sdist,
  #[error("no sdist matching salt-*.tar.gz found in {}", .0.display())]
  NoSdist(PathBuf),
  #[error("unable to make directory: {}", .0.display())]
  BuildDir(PathBuf),
  #[error("build failed")]
  Build,
}
