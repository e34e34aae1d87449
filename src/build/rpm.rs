use crate::error::Fatal;
use crate::util::{cp_into, mv_into};
use crate::version::SdistVersion;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

const BUILD_DIRS: [&str; 6] = ["BUILD", "BUILDROOT", "RPMS", "SOURCES", "SPECS", "SRPMS"];

/// Packaging files shipped in `pkg/rpm` of the source tree.
pub const EXTRA_SOURCES: [&str; 10] = [
  "salt-master",
  "salt-syndic",
  "salt-minion",
  "salt-api",
  "salt-master.service",
  "salt-syndic.service",
  "salt-minion.service",
  "salt-api.service",
  "README.fedora",
  "logrotate.salt",
];

const SRCVER_PREFIX: &[u8] = b"%global srcver ";
const VERSION_PREFIX: &[u8] = b"Version: ";

/// The `_topdir` tree rpmbuild works in.
#[derive(Debug, Clone)]
pub struct BuildRoot {
  pub path: PathBuf,
  pub sources: PathBuf,
  pub specs: PathBuf,
  pub rpms: PathBuf,
}

impl BuildRoot {
  /// Creates every rpmbuild directory under `path`. Directories that already
  /// exist are kept.
  pub fn create(path: &Path) -> anyhow::Result<Self> {
    for name in BUILD_DIRS {
      let dir = path.join(name);
      if let Err(e) = fs::create_dir_all(&dir) {
        debug!("Failed to create {}: {e}", dir.display());
      }
      if !dir.is_dir() {
        return Err(Fatal::BuildDir(dir).into());
      }
    }
    Ok(Self {
      path: path.into(),
      sources: path.join("SOURCES"),
      specs: path.join("SPECS"),
      rpms: path.join("RPMS"),
    })
  }

  /// Moves the sdist into `SOURCES` and copies the extra packaging files
  /// next to it.
  pub fn stage_sources(&self, sdist: &Path, source_dir: &Path) -> anyhow::Result<()> {
    let staged = mv_into(sdist, &self.sources)?;
    trace!("Moved {} to {}", sdist.display(), staged.display());

    let pkg_dir = source_dir.join("pkg").join("rpm");
    for name in EXTRA_SOURCES {
      cp_into(&pkg_dir.join(name), &self.sources)?;
    }
    Ok(())
  }

  /// Writes `SPECS/salt.spec` from `template` with the version fields
  /// filled in, returning its path.
  pub fn write_spec(&self, template: &Path, version: &SdistVersion) -> anyhow::Result<PathBuf> {
    let contents = fs::read(template)
      .with_context(|| format!("failed to read spec template {}", template.display()))?;
    let spec_path = self.specs.join("salt.spec");
    fs::write(&spec_path, rewrite_spec(&contents, version))
      .with_context(|| format!("failed to write {}", spec_path.display()))?;
    info!("Spec file written to {}", spec_path.display());
    Ok(spec_path)
  }

  /// Noarch packages rpmbuild produced for `version`.
  pub fn find_rpms(&self, version: &SdistVersion) -> anyhow::Result<Vec<PathBuf>> {
    let noarch = self.rpms.join("noarch");
    if !noarch.is_dir() {
      return Ok(vec![]);
    }
    let pkgver = version.package_version();
    let mut rpms = vec![];
    for entry in fs::read_dir(&noarch)? {
      let entry = entry?;
      let name = entry.file_name();
      if name.to_str().map_or(false, |n| is_rpm_for(n, &pkgver)) {
        rpms.push(entry.path());
      }
    }
    rpms.sort();
    Ok(rpms)
  }
}

/// Matches `salt-*<pkgver>*.noarch.rpm`.
fn is_rpm_for(name: &str, pkgver: &str) -> bool {
  name
    .strip_prefix("salt-")
    .and_then(|n| n.strip_suffix(".noarch.rpm"))
    .map_or(false, |middle| middle.contains(pkgver))
}

/// Replaces the `%global srcver` and `Version:` lines of a spec template.
/// Other lines are copied unchanged; every output line ends with a single
/// `\n`.
pub fn rewrite_spec(template: &[u8], version: &SdistVersion) -> Vec<u8> {
  let mut out = Vec::with_capacity(template.len());
  for line in spec_lines(template) {
    if line.starts_with(SRCVER_PREFIX) {
      out.extend_from_slice(SRCVER_PREFIX);
      out.extend_from_slice(version.source_version().as_bytes());
    } else if line.starts_with(VERSION_PREFIX) {
      out.extend_from_slice(VERSION_PREFIX);
      out.extend_from_slice(version.package_version().as_bytes());
    } else {
      out.extend_from_slice(line);
    }
    out.push(b'\n');
  }
  out
}

/// Splits on `\n`, `\r\n` or a lone `\r`. A final line break does not
/// start another line.
fn spec_lines<'a>(mut rest: &'a [u8]) -> impl Iterator<Item = &'a [u8]> {
  std::iter::from_fn(move || {
    if rest.is_empty() {
      return None;
    }
    let end = rest
      .iter()
      .position(|&b| b == b'\n' || b == b'\r')
      .unwrap_or(rest.len());
    let (line, tail) = rest.split_at(end);
    rest = match tail {
      [b'\r', b'\n', tail @ ..] => tail,
      [_, tail @ ..] => tail,
      [] => tail,
    };
    Some(line)
  })
}
