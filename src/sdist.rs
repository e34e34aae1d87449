use crate::command::{argv, run_command, Runner};
use crate::error::Fatal;
use anyhow::Context;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::info;

const SDIST_PREFIX: &str = "salt-";
const SDIST_SUFFIX: &str = ".tar.gz";

fn is_sdist_name(name: &str) -> bool {
  name.len() >= SDIST_PREFIX.len() + SDIST_SUFFIX.len()
    && name.starts_with(SDIST_PREFIX)
    && name.ends_with(SDIST_SUFFIX)
}

/// Picks the sdist in `dist_dir` whose metadata changed last. Archives with
/// the same change time are ordered by file name, greatest wins.
pub fn newest_sdist(dist_dir: &Path) -> anyhow::Result<Option<PathBuf>> {
  let mut newest: Option<((i64, i64, String), PathBuf)> = None;
  let entries = fs::read_dir(dist_dir)
    .with_context(|| format!("failed to read {}", dist_dir.display()))?;
  for entry in entries {
    let entry = entry?;
    let Some(name) = entry.file_name().to_str().map(str::to_string) else {
      continue;
    };
    if !is_sdist_name(&name) {
      continue;
    }
    let meta = entry.metadata()?;
    let key = (meta.ctime(), meta.ctime_nsec(), name);
    if newest.as_ref().map_or(true, |(k, _)| key > *k) {
      newest = Some((key, entry.path()));
    }
  }
  Ok(newest.map(|(_, path)| path))
}

/// Runs `<python> setup.py sdist` inside `source_dir` and returns the path of
/// the archive it produced.
pub fn make_sdist(runner: &dyn Runner, source_dir: &Path, python: &str) -> anyhow::Result<PathBuf> {
  let output = run_command(
    runner,
    &argv([python, "setup.py", "sdist"]),
    Some(source_dir),
  )?;
  if !output.success() {
    return Err(Fatal::Sdist.into());
  }

  let dist_dir = source_dir.join("dist");
  let sdist = newest_sdist(&dist_dir)?.ok_or(Fatal::NoSdist(dist_dir))?;
  info!("sdist is located at {}", sdist.display());
  Ok(sdist)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::command::Output;
  use std::cell::RefCell;
  use std::time::Duration;
  use tempfile::tempdir;

  struct FakeSdist {
    code: i32,
    creates: Option<&'static str>,
    calls: RefCell<Vec<(Vec<String>, Option<PathBuf>)>>,
  }

  impl Runner for FakeSdist {
    fn output(&self, args: &[String], dir: Option<&Path>) -> anyhow::Result<Output> {
      self
        .calls
        .borrow_mut()
        .push((args.to_vec(), dir.map(Path::to_path_buf)));
      if let (Some(name), Some(dir)) = (self.creates, dir) {
        fs::create_dir_all(dir.join("dist"))?;
        fs::write(dir.join("dist").join(name), "")?;
      }
      Ok(Output {
        code: self.code,
        ..Default::default()
      })
    }
  }

  fn fake(code: i32, creates: Option<&'static str>) -> FakeSdist {
    FakeSdist {
      code,
      creates,
      calls: RefCell::new(vec![]),
    }
  }

  #[test]
  fn test_sdist_name_filter() {
    assert!(is_sdist_name("salt-2016.3.0.tar.gz"));
    assert!(!is_sdist_name("salt-2016.3.0.zip"));
    assert!(!is_sdist_name("pepper-1.0.tar.gz"));
    assert!(!is_sdist_name("salt-.tar.g"));
  }

  #[test]
  fn test_make_sdist_runs_in_source_dir() {
    let dir = tempdir().unwrap();
    let runner = fake(0, Some("salt-2016.3.0-42-gabc1234.tar.gz"));
    let sdist = make_sdist(&runner, dir.path(), "python26").unwrap();
    assert_eq!(
      sdist,
      dir.path().join("dist/salt-2016.3.0-42-gabc1234.tar.gz")
    );

    let calls = runner.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, ["python26", "setup.py", "sdist"]);
    assert_eq!(calls[0].1.as_deref(), Some(dir.path()));
  }

  #[test]
  fn test_make_sdist_failure_is_fatal() {
    let dir = tempdir().unwrap();
    let err = make_sdist(&fake(1, None), dir.path(), "python").unwrap_err();
    assert!(matches!(err.downcast_ref::<Fatal>(), Some(Fatal::Sdist)));
  }

  #[test]
  fn test_make_sdist_without_archive() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("dist")).unwrap();
    let err = make_sdist(&fake(0, None), dir.path(), "python").unwrap_err();
    assert!(matches!(err.downcast_ref::<Fatal>(), Some(Fatal::NoSdist(_))));
  }

  #[test]
  fn test_newest_sdist_ignores_other_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("salt-2015.8.0.tar.gz"), "").unwrap();
    fs::write(dir.path().join("salt-2016.3.0.zip"), "").unwrap();
    fs::write(dir.path().join("other-9.9.tar.gz"), "").unwrap();
    assert_eq!(
      newest_sdist(dir.path()).unwrap(),
      Some(dir.path().join("salt-2015.8.0.tar.gz"))
    );
  }

  #[test]
  fn test_newest_sdist_by_change_time() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("salt-2015.8.0.tar.gz");
    let new = dir.path().join("salt-2016.3.0.tar.gz");
    fs::write(&old, "").unwrap();
    std::thread::sleep(Duration::from_millis(20));
    fs::write(&new, "").unwrap();
    std::thread::sleep(Duration::from_millis(20));
    fs::write(&old, "rewritten").unwrap();
    assert_eq!(newest_sdist(dir.path()).unwrap(), Some(old));
  }

  #[test]
  fn test_newest_sdist_empty() {
    let dir = tempdir().unwrap();
    assert_eq!(newest_sdist(dir.path()).unwrap(), None);
    assert!(newest_sdist(&dir.path().join("missing")).is_err());
  }
}
