use anyhow::Context;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Prints a stage header to stdout.
#[macro_export]
macro_rules! segment_info {
  ($title:expr) => {
    println!(
      "{} {}",
      console::style("==>").green().bold(),
      console::style($title).bold()
    )
  };
  ($title:expr, $($arg:tt)+) => {
    println!(
      "{} {} {}",
      console::style("==>").green().bold(),
      console::style($title).bold(),
      format_args!($($arg)+)
    )
  };
}

/// Moves `from` into the directory `to_dir`, replacing a file of the same
/// name. Falls back to copy and remove when a rename crosses filesystems.
pub fn mv_into(from: &Path, to_dir: &Path) -> anyhow::Result<PathBuf> {
  let name = from
    .file_name()
    .with_context(|| format!("{} has no file name", from.display()))?;
  let to = to_dir.join(name);

  match fs::remove_file(&to) {
    Err(e) if e.kind() != io::ErrorKind::NotFound => {
      return Err(e).with_context(|| format!("failed to remove {}", to.display()));
    }
    _ => {}
  }

  fs::rename(from, &to)
    .or_else(|_e| fs::copy(from, &to).and_then(|_| fs::remove_file(from)))
    .with_context(|| format!("failed to move {} to {}", from.display(), to_dir.display()))?;
  Ok(to)
}

/// Copies `from` into the directory `to_dir`, keeping its file name.
pub fn cp_into(from: &Path, to_dir: &Path) -> anyhow::Result<PathBuf> {
  let name = from
    .file_name()
    .with_context(|| format!("{} has no file name", from.display()))?;
  let to = to_dir.join(name);
  fs::copy(from, &to)
    .with_context(|| format!("failed to copy {} to {}", from.display(), to_dir.display()))?;
  Ok(to)
}
