use super::rpm::BuildRoot;
use crate::command::{argv, run_command, Runner};
use crate::config::Config;
use crate::error::Fatal;
use crate::sdist::make_sdist;
use crate::segment_info;
use crate::version::SdistVersion;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const RELEASE_FILE: &str = "/etc/redhat-release";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unable to determine major release from contents {0:?}")]
pub struct ParseReleaseError(Box<str>);

/// Extracts `7` from e.g. `CentOS Linux release 7.2.1511 (Core)`. The
/// version is the token following the word `release`.
pub fn parse_major_release(contents: &str) -> Result<u32, ParseReleaseError> {
  let contents = contents.trim();
  contents
    .split_whitespace()
    .skip_while(|token| *token != "release")
    .nth(1)
    .and_then(|v| v.split('.').next())
    .and_then(|major| major.parse().ok())
    .ok_or_else(|| ParseReleaseError(contents.into()))
}

pub fn detect_major_release(release_file: &Path) -> anyhow::Result<u32> {
  let contents = fs::read_to_string(release_file)
    .with_context(|| format!("failed to read {}", release_file.display()))?;
  let major = parse_major_release(&contents)
    .with_context(|| format!("failed to parse {}", release_file.display()))?;
  Ok(major)
}

/// What differs between CentOS major releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseParams {
  pub python: &'static str,
  pub build_requires: Vec<&'static str>,
  /// Extra `--define` values passed to rpmbuild.
  pub defines: Vec<&'static str>,
}

impl ReleaseParams {
  pub fn for_major(major: u32) -> Result<Self, Fatal> {
    let (python, extra_requires, defines) = match major {
      5 => ("python26", vec!["python26-devel"], vec!["dist .el5"]),
      6 => ("python", vec!["python-devel"], vec![]),
      7 => ("python", vec!["python-devel", "systemd-units"], vec![]),
      _ => return Err(Fatal::UnsupportedRelease(major)),
    };
    let mut build_requires = vec!["rpm-build"];
    build_requires.extend(extra_requires);
    Ok(Self {
      python,
      build_requires,
      defines,
    })
  }

  fn rpmbuild_args(&self, topdir: &Path, spec: &Path) -> Vec<String> {
    let mut args = argv(["rpmbuild", "-bb", "--define"]);
    args.push(format!("_topdir {}", topdir.display()));
    for define in &self.defines {
      args.push("--define".into());
      args.push(define.to_string());
    }
    args.push(spec.display().to_string());
    args
  }
}

/// Builds noarch RPMs on a CentOS host and returns their paths.
pub fn build(config: &Config, runner: &dyn Runner, release_file: &Path) -> anyhow::Result<Vec<PathBuf>> {
  segment_info!("Building CentOS RPM");
  info!("Building CentOS RPM");
  info!("Detecting major release");
  let major = detect_major_release(release_file)?;
  info!("major_release: {major}");
  let params = ReleaseParams::for_major(major)?;

  segment_info!("Installing build dependencies...");
  let mut install = argv(["yum", "-y", "install"]);
  install.extend(params.build_requires.iter().map(|r| r.to_string()));
  let output = run_command(runner, &install, None)?;
  if !output.success() {
    return Err(Fatal::Dependencies(output.code).into());
  }

  segment_info!("Creating sdist...");
  let sdist = make_sdist(runner, &config.source_dir, params.python)?;
  let file_name = sdist
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or_default();
  let version: SdistVersion = file_name.parse()?;
  info!("salt_pkgver: {}", version.package_version());
  info!("salt_srcver: {}", version.source_version());

  segment_info!("Preparing build root...");
  let root = BuildRoot::create(&config.dest_dir)?;
  root.stage_sources(&sdist, &config.source_dir)?;
  let spec = root.write_spec(&config.spec_file, &version)?;

  segment_info!("Building packages:", "salt {}", version);
  let output = run_command(runner, &params.rpmbuild_args(&root.path, &spec), None)?;
  if !output.success() {
    return Err(Fatal::Build.into());
  }

  root.find_rpms(&version)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_major_release() {
    assert_eq!(
      parse_major_release("CentOS Linux release 7.2.1511 (Core)\n"),
      Ok(7)
    );
    assert_eq!(parse_major_release("CentOS release 6.8 (Final)"), Ok(6));
    assert_eq!(parse_major_release("CentOS release 5 (Final)"), Ok(5));
    assert_eq!(
      parse_major_release("CentOS Linux release 8.4.2105"),
      Ok(8)
    );
    assert_eq!(
      parse_major_release("Red Hat Enterprise Linux Server release 7.3 (Maipo)"),
      Ok(7)
    );
    assert_eq!(
      parse_major_release("CentOS Linux 7.2.1511 (Core)"),
      Err(ParseReleaseError("CentOS Linux 7.2.1511 (Core)".into()))
    );
    assert!(parse_major_release("CentOS release").is_err());
    assert!(parse_major_release("CentOS release Core").is_err());
    assert!(parse_major_release("").is_err());
  }

  #[test]
  fn test_detect_major_release_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(detect_major_release(&dir.path().join("redhat-release")).is_err());
  }

  #[test]
  fn test_release_params() {
    let el5 = ReleaseParams::for_major(5).unwrap();
    assert_eq!(el5.python, "python26");
    assert_eq!(el5.build_requires, ["rpm-build", "python26-devel"]);
    assert_eq!(el5.defines, ["dist .el5"]);

    let el6 = ReleaseParams::for_major(6).unwrap();
    assert_eq!(el6.python, "python");
    assert_eq!(el6.build_requires, ["rpm-build", "python-devel"]);
    assert!(el6.defines.is_empty());

    let el7 = ReleaseParams::for_major(7).unwrap();
    assert_eq!(el7.python, "python");
    assert_eq!(
      el7.build_requires,
      ["rpm-build", "python-devel", "systemd-units"]
    );

    let err = ReleaseParams::for_major(8).unwrap_err();
    assert!(matches!(err, Fatal::UnsupportedRelease(8)));
    assert_eq!(err.to_string(), "unsupported major release: 8");
  }

  #[test]
  fn test_rpmbuild_args() {
    let args = ReleaseParams::for_major(5)
      .unwrap()
      .rpmbuild_args(Path::new("/tmp/saltpkg"), Path::new("/tmp/saltpkg/SPECS/salt.spec"));
    assert_eq!(
      args,
      [
        "rpmbuild",
        "-bb",
        "--define",
        "_topdir /tmp/saltpkg",
        "--define",
        "dist .el5",
        "/tmp/saltpkg/SPECS/salt.spec",
      ]
    );
  }
}
