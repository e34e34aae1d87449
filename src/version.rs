use regex::Regex;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

// Git checkout: salt-2014.7.0rc1-1584-g666602e.tar.gz
// Tagged release: salt-2014.7.0.tar.gz
fn sdist_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^salt-([^-]+)(?:-(\d+)-(g[0-9a-f]+))?\.tar\.gz$").expect("sdist pattern is valid")
  })
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unable to extract version info from sdist filename {0:?}")]
pub struct ParseSdistError(pub Box<str>);

/// Commits since the last tag, plus the abbreviated object id (with its
/// leading `g`), as `git describe` reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offset {
  pub count: Box<str>,
  pub oid: Box<str>,
}

/// Version information carried by an sdist file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdistVersion {
  pub base: Box<str>,
  pub offset: Option<Offset>,
}

impl SdistVersion {
  /// Version for the RPM spec's `Version:` field, e.g. `2016.3.0.42.gabc1234`.
  pub fn package_version(&self) -> String {
    self.join('.')
  }

  /// Version used for the unpacked source directory, e.g.
  /// `2016.3.0-42-gabc1234`.
  pub fn source_version(&self) -> String {
    self.join('-')
  }

  fn join(&self, sep: char) -> String {
    match &self.offset {
      None => self.base.to_string(),
      Some(Offset { count, oid }) => format!("{}{sep}{count}{sep}{oid}", self.base),
    }
  }
}

impl FromStr for SdistVersion {
  type Err = ParseSdistError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let caps = sdist_re()
      .captures(s)
      .ok_or_else(|| ParseSdistError(s.into()))?;
    let offset = match (caps.get(2), caps.get(3)) {
      (Some(count), Some(oid)) => Some(Offset {
        count: count.as_str().into(),
        oid: oid.as_str().into(),
      }),
      _ => None,
    };
    Ok(Self {
      base: caps[1].into(),
      offset,
    })
  }
}

impl Display for SdistVersion {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str(&self.package_version())
  }
}
